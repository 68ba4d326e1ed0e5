use std::fmt;
use std::io;
use std::time::Duration;

use deadpool_postgres::PoolError;
use serde_yml::Error as YmlError;
use thiserror::Error;
use tokio::time::error::Elapsed;
use tokio_postgres::Error as PgError;

/// 로그 저장소와 검색 엔진의 모든 에러 타입을 정의합니다.
#[derive(Debug, Error)]
pub enum LogSearchError {
    /// 설정 관련 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 입출력 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] io::Error),

    /// 잘못되었거나 모순된 검색 요청 (재시도 불가)
    #[error("잘못된 요청: {0}")]
    InvalidRequest(String),

    /// 해석할 수 없는 시각
    #[error("잘못된 시각: {0}")]
    InvalidTimestamp(String),

    /// 이벤트 본문 파싱 실패 (이벤트는 저장되지 않음)
    #[error("파싱 에러: {0}")]
    Parse(String),

    /// 연결, 쿼리, 트랜잭션 실패 (전체 작업 재시도 가능)
    #[error("데이터베이스 에러: {0}")]
    Database(String),

    /// 타임아웃 에러 (전체 작업 재시도 가능)
    #[error("타임아웃 에러: {0}")]
    Timeout(String),

    /// 스키마/파티션 보장 실패 (시작 단계에서 치명적)
    #[error("스키마 에러: {0}")]
    Schema(String),

    /// 출력 스트림 쓰기 실패
    #[error("출력 스트림 에러: {0}")]
    SinkWrite(String),

    /// 내부 상태 관련 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl LogSearchError {
    /// 같은 작업을 다시 시도해도 되는 에러인지 여부
    pub fn is_retryable(&self) -> bool {
        matches!(self, LogSearchError::Database(_) | LogSearchError::Timeout(_))
    }

    /// 에러 메시지 앞에 작업 문맥(테이블, 단계)을 붙인다
    #[must_use]
    pub fn context(self, ctx: &str) -> Self {
        match self {
            LogSearchError::Config(msg) => LogSearchError::Config(format!("{ctx}: {msg}")),
            LogSearchError::InvalidRequest(msg) => {
                LogSearchError::InvalidRequest(format!("{ctx}: {msg}"))
            }
            LogSearchError::InvalidTimestamp(msg) => {
                LogSearchError::InvalidTimestamp(format!("{ctx}: {msg}"))
            }
            LogSearchError::Parse(msg) => LogSearchError::Parse(format!("{ctx}: {msg}")),
            LogSearchError::Database(msg) => LogSearchError::Database(format!("{ctx}: {msg}")),
            LogSearchError::Timeout(msg) => LogSearchError::Timeout(format!("{ctx}: {msg}")),
            LogSearchError::Schema(msg) => LogSearchError::Schema(format!("{ctx}: {msg}")),
            LogSearchError::SinkWrite(msg) => LogSearchError::SinkWrite(format!("{ctx}: {msg}")),
            LogSearchError::Internal(msg) => LogSearchError::Internal(format!("{ctx}: {msg}")),
            LogSearchError::Io(err) => LogSearchError::Io(err),
        }
    }
}

/// Result 타입 별칭 정의
pub type Result<T> = std::result::Result<T, LogSearchError>;

impl From<PoolError> for LogSearchError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Timeout(kind) => {
                LogSearchError::Timeout(format!("DB 연결 대기 타임아웃: {kind:?}"))
            }
            other => LogSearchError::Database(format!("DB 풀 에러: {other}")),
        }
    }
}

impl From<PgError> for LogSearchError {
    fn from(err: PgError) -> Self {
        LogSearchError::Database(format!("PostgreSQL 에러: {err}"))
    }
}

impl From<Elapsed> for LogSearchError {
    fn from(err: Elapsed) -> Self {
        LogSearchError::Timeout(format!("작업 타임아웃: {err}"))
    }
}

impl From<YmlError> for LogSearchError {
    fn from(err: YmlError) -> Self {
        LogSearchError::Config(format!("YAML 파싱 에러: {err}"))
    }
}

/// 제한 시간 안에 끝나지 않으면 문맥을 붙인 `Timeout` 에러
///
/// 시간이 지나면 `fut`은 drop되므로 진행 중이던 트랜잭션은 롤백된다.
pub async fn within<T, F>(limit: Duration, ctx: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|e| LogSearchError::from(e).context(ctx))?
}

/// 에러 처리 유틸리티 함수
pub fn config_err<E: fmt::Display>(err: E) -> LogSearchError {
    LogSearchError::Config(format!("{err}"))
}

pub fn db_err<E: fmt::Display>(err: E) -> LogSearchError {
    LogSearchError::Database(format!("{err}"))
}

pub fn schema_err<E: fmt::Display>(err: E) -> LogSearchError {
    LogSearchError::Schema(format!("{err}"))
}

pub fn parse_err<E: fmt::Display>(err: E) -> LogSearchError {
    LogSearchError::Parse(format!("{err}"))
}

pub fn sink_err<E: fmt::Display>(err: E) -> LogSearchError {
    LogSearchError::SinkWrite(format!("{err}"))
}

pub fn invalid_request<E: fmt::Display>(err: E) -> LogSearchError {
    LogSearchError::InvalidRequest(format!("{err}"))
}

pub fn internal_err<E: fmt::Display>(err: E) -> LogSearchError {
    LogSearchError::Internal(format!("{err}"))
}
