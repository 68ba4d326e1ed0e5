//! 여러 쓰기를 하나의 트랜잭션으로 묶는 범위 자원.
//!
//! `WriteBatch::commit`은 트랜잭션 시작, 순서대로 실행, 커밋을 한 번에 수행한다.
//! 중간에 에러로 빠져나가거나 타임아웃으로 future가 취소되면 트랜잭션이
//! drop되면서 롤백되므로 일부만 반영된 상태는 보이지 않는다.

use log::{debug, error};
use tokio_postgres::types::ToSql;

use logsearch_error::{Result, db_err};

/// 소유권을 가진 바인딩 값
pub type SqlParam = Box<dyn ToSql + Sync + Send>;

/// 배치 안의 쓰기 하나
pub struct Write {
    /// 에러 문맥에 쓰일 이름 (테이블 등)
    label: String,
    sql: String,
    params: Vec<SqlParam>,
}

/// 하나의 트랜잭션으로 커밋할 쓰기 목록
#[derive(Default)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 쓰기 추가, 실행은 추가한 순서를 따른다
    #[must_use]
    pub fn push(mut self, label: impl Into<String>, sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        self.writes.push(Write {
            label: label.into(),
            sql: sql.into(),
            params,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// 실행 순서대로 쓰기 이름
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.writes.iter().map(|w| w.label.as_str())
    }

    /// 트랜잭션으로 실행, 하나라도 실패하면 전체 롤백
    pub async fn commit(self, conn: &mut deadpool_postgres::Object) -> Result<()> {
        let tx = conn
            .transaction()
            .await
            .map_err(|e| db_err(format!("트랜잭션 시작 실패: {e}")))?;

        for write in &self.writes {
            let params: Vec<&(dyn ToSql + Sync)> = write
                .params
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();

            if let Err(e) = tx.execute(write.sql.as_str(), &params).await {
                error!("{} 쓰기 실패, 트랜잭션 롤백: {e}", write.label);
                // tx가 drop되면서 롤백
                return Err(db_err(format!("{} 삽입 실패: {e}", write.label)));
            }
            debug!("{} 쓰기 완료", write.label);
        }

        tx.commit()
            .await
            .map_err(|e| db_err(format!("트랜잭션 커밋 실패: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_keeps_insertion_order() {
        let batch = WriteBatch::new()
            .push("first", "INSERT INTO a VALUES ($1)", vec![Box::new(1_i64)])
            .push("second", "INSERT INTO b VALUES ($1)", vec![Box::new("x".to_string())]);

        assert_eq!(batch.len(), 2);
        let labels: Vec<&str> = batch.labels().collect();
        assert_eq!(labels, ["first", "second"]);
        assert!(WriteBatch::new().is_empty());
    }
}
