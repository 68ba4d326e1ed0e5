use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_postgres::RowStream;

use logsearch_db::{RawLogRecord, RequestInfoRecord, TableKind};
use logsearch_error::{Result, db_err};

use crate::builder::{BuiltQuery, QueryArg};

/// 검색 결과 행 하나
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    RawLog(RawLogRecord),
    RequestInfo(RequestInfoRecord),
}

/// 결과를 한 행씩 꺼내는 커서
#[async_trait]
pub trait RowCursor: Send {
    /// 다음 행, 끝이면 `None`
    async fn next_record(&mut self) -> Result<Option<Record>>;
}

/// PostgreSQL 결과 스트림 커서
///
/// 스트림이 끝날 때까지 풀 연결을 잡고 있는다.
pub struct PgRowCursor {
    _conn: deadpool_postgres::Object,
    stream: Pin<Box<RowStream>>,
    target: TableKind,
}

impl PgRowCursor {
    /// 쿼리를 실행하고 커서 생성
    pub async fn open(conn: deadpool_postgres::Object, query: &BuiltQuery) -> Result<Self> {
        let stream = conn
            .query_raw(query.sql.as_str(), query.args.iter().map(QueryArg::as_sql))
            .await
            .map_err(|e| db_err(format!("검색 쿼리 실행 실패: {e}")))?;

        Ok(Self {
            _conn: conn,
            stream: Box::pin(stream),
            target: query.target,
        })
    }
}

#[async_trait]
impl RowCursor for PgRowCursor {
    async fn next_record(&mut self) -> Result<Option<Record>> {
        let row = match self.stream.next().await {
            None => return Ok(None),
            Some(Ok(row)) => row,
            Some(Err(e)) => {
                return Err(db_err(format!("검색 결과 읽기 실패: {e}")));
            }
        };

        let record = match self.target {
            TableKind::RawLog => Record::RawLog(RawLogRecord::from_row(&row)?),
            TableKind::RequestInfo => Record::RequestInfo(RequestInfoRecord::from_row(&row)?),
        };
        Ok(Some(record))
    }
}

/// 메모리에 있는 행을 돌려주는 커서
#[derive(Debug, Default)]
pub struct VecCursor {
    records: VecDeque<Record>,
}

impl VecCursor {
    pub fn new(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }
}

#[async_trait]
impl RowCursor for VecCursor {
    async fn next_record(&mut self) -> Result<Option<Record>> {
        Ok(self.records.pop_front())
    }
}
