use std::time::Duration;

use log::debug;

use logsearch_db::{DatabasePool, RawLogRecord, TableSet, WriteBatch};
use logsearch_error::{Result, within};
use logsearch_logging::log_unsaved_event;

use crate::event::{Event, is_empty_event};

/// 이벤트 하나를 두 테이블에 원자적으로 저장
pub struct IngestionPipeline {
    pool: DatabasePool,
    tables: TableSet,
    timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(pool: DatabasePool, tables: TableSet, timeout: Duration) -> Self {
        Self {
            pool,
            tables,
            timeout,
        }
    }

    /// 이벤트 저장
    ///
    /// 빈 본문은 아무것도 하지 않고 성공한다. 실패하면 원문을 로그에 남긴 뒤
    /// 에러를 돌려준다. 호출자가 재시도하지 않으면 이벤트는 유실된다.
    pub async fn insert(&self, payload: &[u8]) -> Result<()> {
        if is_empty_event(payload) {
            debug!("빈 이벤트 무시");
            return Ok(());
        }

        let result = self.try_insert(payload).await;
        if let Err(e) = &result {
            log_unsaved_event(payload, e);
        }
        result
    }

    async fn try_insert(&self, payload: &[u8]) -> Result<()> {
        let event = Event::parse(payload)?;
        let batch = write_batch(&self.tables, event);

        within(self.timeout, "이벤트 저장", async {
            let mut conn = self.pool.acquire("이벤트 저장").await?;
            batch.commit(&mut conn).await
        })
        .await
    }
}

/// 원본 로그 행, 요청 정보 행 순서의 쓰기 묶음
pub fn write_batch(tables: &TableSet, event: Event) -> WriteBatch {
    let raw = tables.raw_log();
    let info = tables.request_info();

    WriteBatch::new()
        .push(
            raw.name(),
            raw.insert_statement(),
            RawLogRecord::insert_params(event.time, event.document),
        )
        .push(
            info.name(),
            info.insert_statement(),
            event.request_info.insert_params(),
        )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use log::{LevelFilter, Log, Metadata, Record};
    use logsearch_config::DbConfig;
    use logsearch_error::LogSearchError;
    use logsearch_logging::UNSAVED_EVENT_TARGET;

    use super::*;

    /// 저장 실패 이벤트 로그만 모은다
    struct UnsavedCapture {
        lines: Mutex<Vec<String>>,
    }

    impl Log for UnsavedCapture {
        fn enabled(&self, metadata: &Metadata<'_>) -> bool {
            metadata.target() == UNSAVED_EVENT_TARGET
        }

        fn log(&self, record: &Record<'_>) {
            if self.enabled(record.metadata()) {
                self.lines.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: UnsavedCapture = UnsavedCapture {
        lines: Mutex::new(Vec::new()),
    };

    /// 연결을 내주지 않는 풀
    fn starved_pool() -> DatabasePool {
        let mut config = DbConfig::default();
        config.pool.max_connections = 0;
        config.pool.connection_timeout_seconds = 60;
        DatabasePool::new(&config).unwrap()
    }

    #[tokio::test]
    async fn stalled_store_times_out_and_logs_payload() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(LevelFilter::Trace);

        let pipeline =
            IngestionPipeline::new(starved_pool(), TableSet::default(), Duration::from_millis(20));
        let payload = br#"{"time":"2024-03-15T10:00:00Z","requestID":"stalled-1"}"#;

        let err = pipeline.insert(payload).await.unwrap_err();
        assert!(matches!(err, LogSearchError::Timeout(_)), "{err:?}");
        assert!(err.to_string().contains("이벤트 저장"));

        let lines = CAPTURE.lines.lock().unwrap();
        assert!(lines.iter().any(|line| line.contains("stalled-1")), "{lines:?}");
    }

    #[tokio::test]
    async fn empty_payload_never_touches_the_store() {
        let pipeline =
            IngestionPipeline::new(starved_pool(), TableSet::default(), Duration::from_millis(20));
        pipeline.insert(b"  \n").await.unwrap();
        pipeline.insert(b"{ }").await.unwrap();
    }

    #[test]
    fn raw_log_is_written_before_request_info() {
        let tables = TableSet::default();
        let event = Event::parse(br#"{"time":"2024-03-15T10:00:00Z","api":{"name":"PutObject"}}"#)
            .unwrap();

        let batch = write_batch(&tables, event);
        let labels: Vec<&str> = batch.labels().collect();
        assert_eq!(labels, ["audit_log_events", "request_info"]);
    }
}
