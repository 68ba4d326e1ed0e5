//! 감사 이벤트 문서 해석과 요청 정보 투영.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use logsearch_config::parse_duration;
use logsearch_db::RequestInfoRecord;
use logsearch_error::{Result, parse_err};

/// 저장할 감사 이벤트 하나
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// 이벤트 발생 시각
    pub time: DateTime<Utc>,
    /// 원본 문서 전체
    pub document: Value,
    /// 요청 정보 투영
    pub request_info: RequestInfoRecord,
}

/// 투영에 필요한 필드만 읽는다
#[derive(Debug, Deserialize)]
struct AuditDocument {
    time: String,
    #[serde(default)]
    api: ApiSection,
    #[serde(default, rename = "accessKey")]
    access_key: Option<String>,
    #[serde(default, rename = "remotehost")]
    remote_host: Option<String>,
    #[serde(default, rename = "requestID")]
    request_id: Option<String>,
    #[serde(default, rename = "userAgent")]
    user_agent: Option<String>,
    #[serde(default, rename = "requestHeader")]
    request_header: HashMap<String, Value>,
    #[serde(default, rename = "responseHeader")]
    response_header: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiSection {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    bucket: Option<String>,
    #[serde(default)]
    object: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "statusCode")]
    status_code: Option<i64>,
    #[serde(default, rename = "timeToResponse")]
    time_to_response: Option<Value>,
}

/// 공백뿐이거나 빈 객체인 본문
pub fn is_empty_event(payload: &[u8]) -> bool {
    let trimmed = payload.trim_ascii();
    if trimmed.is_empty() {
        return true;
    }
    trimmed.starts_with(b"{")
        && trimmed.ends_with(b"}")
        && trimmed[1..trimmed.len() - 1].trim_ascii().is_empty()
}

impl Event {
    /// 본문을 해석해 이벤트 생성
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let document: Value = serde_json::from_slice(payload)
            .map_err(|e| parse_err(format!("JSON 해석 실패: {e}")))?;
        if !document.is_object() {
            return Err(parse_err("이벤트는 JSON 객체여야 함"));
        }

        let audit = AuditDocument::deserialize(&document)
            .map_err(|e| parse_err(format!("감사 이벤트 형식 오류: {e}")))?;

        let time = DateTime::parse_from_rfc3339(&audit.time)
            .map_err(|e| parse_err(format!("time 필드 해석 실패 {:?}: {e}", audit.time)))?
            .with_timezone(&Utc);

        let request_info = RequestInfoRecord {
            time,
            api_name: audit.api.name.unwrap_or_default(),
            access_key: audit.access_key.unwrap_or_default(),
            bucket: audit.api.bucket.unwrap_or_default(),
            object: audit.api.object.unwrap_or_default(),
            time_to_response_ns: audit.api.time_to_response.as_ref().and_then(nanos),
            remote_host: audit.remote_host.unwrap_or_default(),
            request_id: audit.request_id.unwrap_or_default(),
            user_agent: audit.user_agent.unwrap_or_default(),
            response_status: audit.api.status.unwrap_or_default(),
            response_status_code: audit.api.status_code.unwrap_or_default(),
            request_content_length: content_length(&audit.request_header),
            response_content_length: content_length(&audit.response_header),
        };

        Ok(Self {
            time,
            document,
            request_info,
        })
    }
}

/// `"1.5ms"` 같은 기간 문자열이나 나노초 정수
fn nanos(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_duration(s)
            .ok()
            .and_then(|d| u64::try_from(d.as_nanos()).ok()),
        _ => None,
    }
}

/// Content-Length 헤더, 없거나 숫자가 아니면 알 수 없음
fn content_length(headers: &HashMap<String, Value>) -> Option<u64> {
    let value = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .map(|(_, v)| v)?;
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
