//! 검색 요청 모델과 파라미터 해석.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use logsearch_config::{SearchConfig, parse_duration};
use logsearch_db::TableKind;
use logsearch_error::{LogSearchError, Result, invalid_request};

/// 출력 형식, 페이지 조회 여부도 결정한다
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// 한 페이지를 JSON 배열로
    #[default]
    None,
    /// 한 줄에 JSON 객체 하나, 전체 결과
    Ndjson,
    /// 헤더가 있는 CSV, 전체 결과
    Csv,
}

impl ExportFormat {
    /// 페이지 없이 전체 결과를 스트리밍하는 형식인지
    pub fn is_streaming(self) -> bool {
        !matches!(self, ExportFormat::None)
    }
}

impl FromStr for ExportFormat {
    type Err = LogSearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Ok(ExportFormat::None),
            "ndjson" => Ok(ExportFormat::Ndjson),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(invalid_request(format!("지원하지 않는 export 형식: {other:?}"))),
        }
    }
}

/// 필터에 쓸 수 있는 컬럼 (허용 목록)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterColumn {
    ApiName,
    AccessKey,
    Bucket,
    Object,
    RemoteHost,
    RequestId,
    UserAgent,
    ResponseStatus,
    ResponseStatusCode,
}

impl FilterColumn {
    pub const ALL: [FilterColumn; 9] = [
        FilterColumn::ApiName,
        FilterColumn::AccessKey,
        FilterColumn::Bucket,
        FilterColumn::Object,
        FilterColumn::RemoteHost,
        FilterColumn::RequestId,
        FilterColumn::UserAgent,
        FilterColumn::ResponseStatus,
        FilterColumn::ResponseStatusCode,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            FilterColumn::ApiName => "api_name",
            FilterColumn::AccessKey => "access_key",
            FilterColumn::Bucket => "bucket",
            FilterColumn::Object => "object",
            FilterColumn::RemoteHost => "remote_host",
            FilterColumn::RequestId => "request_id",
            FilterColumn::UserAgent => "user_agent",
            FilterColumn::ResponseStatus => "response_status",
            FilterColumn::ResponseStatusCode => "response_status_code",
        }
    }

    /// 정수 비교 컬럼
    pub const fn is_integer(self) -> bool {
        matches!(self, FilterColumn::ResponseStatusCode)
    }

    /// 대상 테이블에서 이 컬럼을 가리키는 고정 식
    pub const fn expression(self, target: TableKind) -> &'static str {
        match target {
            TableKind::RequestInfo => self.name(),
            TableKind::RawLog => match self {
                FilterColumn::ApiName => "log->'api'->>'name'",
                FilterColumn::AccessKey => "log->>'accessKey'",
                FilterColumn::Bucket => "log->'api'->>'bucket'",
                FilterColumn::Object => "log->'api'->>'object'",
                FilterColumn::RemoteHost => "log->>'remotehost'",
                FilterColumn::RequestId => "log->>'requestID'",
                FilterColumn::UserAgent => "log->>'userAgent'",
                FilterColumn::ResponseStatus => "log->'api'->>'status'",
                FilterColumn::ResponseStatusCode => "(log->'api'->>'statusCode')::INT8",
            },
        }
    }
}

impl FromStr for FilterColumn {
    type Err = LogSearchError;

    fn from_str(s: &str) -> Result<Self> {
        FilterColumn::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| invalid_request(format!("필터할 수 없는 컬럼: {s:?}")))
    }
}

impl fmt::Display for FilterColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 컬럼 하나에 대한 일치/패턴 조건, 값에 `*`가 있으면 패턴
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: FilterColumn,
    pub value: String,
}

impl Filter {
    pub fn new(column: FilterColumn, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

impl FromStr for Filter {
    type Err = LogSearchError;

    /// `column:value` 형식
    fn from_str(s: &str) -> Result<Self> {
        let (column, value) = s
            .split_once(':')
            .ok_or_else(|| invalid_request(format!("필터는 column:value 형식이어야 함: {s:?}")))?;
        Ok(Self::new(column.trim().parse()?, value))
    }
}

/// 검색 요청
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// 조회할 논리 테이블
    pub target: TableKind,
    /// 포함 시작 시각
    pub start: Option<DateTime<Utc>>,
    /// 제외 끝 시각
    pub end: Option<DateTime<Utc>>,
    /// 최근 기간, 절대 범위와 함께 쓸 수 없음
    pub last: Option<Duration>,
    pub filters: Vec<Filter>,
    pub sort_descending: bool,
    pub export: ExportFormat,
    /// export가 None일 때만 사용
    pub page_number: u64,
    pub page_size: u64,
}

impl SearchRequest {
    /// 최신순 첫 페이지 요청
    pub fn new(target: TableKind) -> Self {
        Self {
            target,
            start: None,
            end: None,
            last: None,
            filters: Vec::new(),
            sort_descending: true,
            export: ExportFormat::None,
            page_number: 0,
            page_size: 10,
        }
    }

    /// 외부 요청 계층의 문자열 파라미터로부터 생성
    pub fn from_params(params: &SearchParams, config: &SearchConfig) -> Result<Self> {
        let target = match params.q.as_str() {
            "raw" => TableKind::RawLog,
            "reqinfo" => TableKind::RequestInfo,
            other => return Err(invalid_request(format!("잘못된 쿼리 대상: {other:?}"))),
        };

        let page_size = params
            .page_size
            .unwrap_or_else(|| u64::from(config.default_page_size));
        if page_size > u64::from(config.max_page_size) {
            return Err(invalid_request(format!(
                "pageSize {page_size} 가 최대값 {} 초과",
                config.max_page_size
            )));
        }

        let last = params
            .last
            .as_deref()
            .map(|text| parse_duration(text).map_err(|e| invalid_request(format!("last: {e}"))))
            .transpose()?;

        let filters = params
            .fp
            .iter()
            .map(|fp| fp.parse())
            .collect::<Result<Vec<Filter>>>()?;

        Ok(Self {
            target,
            start: parse_time("timeStart", params.time_start.as_deref())?,
            end: parse_time("timeEnd", params.time_end.as_deref())?,
            last,
            filters,
            sort_descending: !params.time_asc,
            export: params.export.parse()?,
            page_number: params.page_no.unwrap_or(0),
            page_size,
        })
    }
}

fn parse_time(name: &str, text: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    text.map(|t| {
        DateTime::parse_from_rfc3339(t)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| invalid_request(format!("{name} 시각 형식 오류 {t:?}: {e}")))
    })
    .transpose()
}

/// 요청 계층에서 받은 그대로의 검색 파라미터
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchParams {
    /// `raw` 또는 `reqinfo`
    pub q: String,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub last: Option<String>,
    pub time_asc: bool,
    /// `column:value` 목록
    pub fp: Vec<String>,
    /// `""`, `ndjson`, `csv`
    pub export: String,
    pub page_no: Option<u64>,
    pub page_size: Option<u64>,
}
