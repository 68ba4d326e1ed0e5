use std::time::Duration;

use log::{debug, error};
use tokio::io::AsyncWrite;

use logsearch_db::{DatabasePool, TableSet};
use logsearch_error::{LogSearchError, Result, within};

use crate::builder::{BuiltQuery, QueryBuilder};
use crate::cursor::PgRowCursor;
use crate::export::write_records;
use crate::request::{ExportFormat, SearchRequest};

/// 만들어진 쿼리를 실행하고 결과를 출력 스트림에 쓴다
#[derive(Clone)]
pub struct ResultExporter {
    pool: DatabasePool,
    timeout: Duration,
}

impl ResultExporter {
    pub fn new(pool: DatabasePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// 연결 획득부터 마지막 쓰기까지 타임아웃 안에서 수행
    pub async fn export<W>(
        &self,
        query: &BuiltQuery,
        sink: &mut W,
        format: ExportFormat,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        debug!("검색 쿼리: {} (인자 {}개)", query.sql, query.args.len());

        let phase = format!("{:?} 검색", query.target);
        let result = within(self.timeout, &phase, async {
            let conn = self.pool.acquire("연결 획득").await?;
            let mut cursor = PgRowCursor::open(conn, query).await?;
            write_records(&mut cursor, query.target, format, sink).await
        })
        .await
        .map_err(|e| match e {
            // within이 붙인 문맥을 중복하지 않는다
            LogSearchError::Timeout(_) => e,
            other => other.context(&phase),
        });

        if let Err(e) = &result {
            error!("{e}");
        }
        result
    }
}

/// 검색 요청 처리: 쿼리 생성 후 실행
#[derive(Clone)]
pub struct SearchService {
    builder: QueryBuilder,
    exporter: ResultExporter,
}

impl SearchService {
    pub fn new(pool: DatabasePool, tables: TableSet, timeout: Duration) -> Self {
        Self {
            builder: QueryBuilder::new(tables),
            exporter: ResultExporter::new(pool, timeout),
        }
    }

    /// 요청 검증과 쿼리 생성은 I/O 전에 끝난다
    pub async fn search<W>(&self, request: &SearchRequest, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let query = self.builder.build(request)?;
        self.exporter.export(&query, sink, request.export).await
    }
}
