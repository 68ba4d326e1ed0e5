use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

use logsearch_error::{Result, parse_err};

use crate::transaction::SqlParam;

/// 원본 로그 테이블 행, 로그 문서는 직렬화된 JSON 텍스트
#[derive(Debug, Clone, PartialEq)]
pub struct RawLogRecord {
    pub event_time: DateTime<Utc>,
    pub log: String,
}

impl RawLogRecord {
    /// 삽입 바인딩 값 (event_time, log), 문서는 JSONB로 저장
    pub fn insert_params(event_time: DateTime<Utc>, document: serde_json::Value) -> Vec<SqlParam> {
        vec![Box::new(event_time), Box::new(document)]
    }

    /// 검색 결과 행 해석
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            event_time: get(row, "event_time")?,
            log: get(row, "log")?,
        })
    }
}

/// 요청 정보 테이블 행
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfoRecord {
    pub time: DateTime<Utc>,
    pub api_name: String,
    pub access_key: String,
    pub bucket: String,
    pub object: String,
    pub time_to_response_ns: Option<u64>,
    pub remote_host: String,
    pub request_id: String,
    pub user_agent: String,
    pub response_status: String,
    pub response_status_code: i64,
    pub request_content_length: Option<u64>,
    pub response_content_length: Option<u64>,
}

impl RequestInfoRecord {
    /// 삽입 바인딩 값, 컬럼 순서와 같다
    pub fn insert_params(&self) -> Vec<SqlParam> {
        vec![
            Box::new(self.time),
            Box::new(self.api_name.clone()),
            Box::new(self.access_key.clone()),
            Box::new(self.bucket.clone()),
            Box::new(self.object.clone()),
            Box::new(to_int8(self.time_to_response_ns)),
            Box::new(self.remote_host.clone()),
            Box::new(self.request_id.clone()),
            Box::new(self.user_agent.clone()),
            Box::new(self.response_status.clone()),
            Box::new(self.response_status_code),
            Box::new(to_int8(self.request_content_length)),
            Box::new(to_int8(self.response_content_length)),
        ]
    }

    /// 검색 결과 행 해석
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            time: get(row, "time")?,
            api_name: get(row, "api_name")?,
            access_key: text(row, "access_key")?,
            bucket: text(row, "bucket")?,
            object: text(row, "object")?,
            time_to_response_ns: unsigned(row, "time_to_response_ns")?,
            remote_host: text(row, "remote_host")?,
            request_id: text(row, "request_id")?,
            user_agent: text(row, "user_agent")?,
            response_status: text(row, "response_status")?,
            response_status_code: get::<Option<i64>>(row, "response_status_code")?.unwrap_or(0),
            request_content_length: unsigned(row, "request_content_length")?,
            response_content_length: unsigned(row, "response_content_length")?,
        })
    }
}

/// INT8 범위를 넘는 값은 알 수 없음(NULL)으로 저장
fn to_int8(value: Option<u64>) -> Option<i64> {
    value.and_then(|v| i64::try_from(v).ok())
}

fn get<'a, T>(row: &'a Row, column: &str) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(column)
        .map_err(|e| parse_err(format!("{column} 컬럼 해석 실패: {e}")))
}

fn text(row: &Row, column: &str) -> Result<String> {
    Ok(get::<Option<String>>(row, column)?.unwrap_or_default())
}

fn unsigned(row: &Row, column: &str) -> Result<Option<u64>> {
    get::<Option<i64>>(row, column)?
        .map(|v| {
            u64::try_from(v)
                .map_err(|_| parse_err(format!("{column} 컬럼이 음수: {v}")))
        })
        .transpose()
}
