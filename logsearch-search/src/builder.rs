//! 검색 요청을 매개변수화된 쿼리로 변환.
//!
//! 쿼리 텍스트에는 고정된 조각(테이블/컬럼 이름, 허용 목록의 식, `$n` 자리표시자,
//! 검증된 정수)만 들어간다. 호출자가 준 값은 모두 `args`로 바인딩된다.

use chrono::{DateTime, Utc};
use tokio_postgres::types::ToSql;

use logsearch_db::{TableKind, TableSet};
use logsearch_error::{Result, invalid_request};

use crate::request::{Filter, SearchRequest};

/// 위치 바인딩 값
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryArg {
    Timestamp(DateTime<Utc>),
    Text(String),
    Int(i64),
}

impl QueryArg {
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            QueryArg::Timestamp(t) => t,
            QueryArg::Text(s) => s,
            QueryArg::Int(i) => i,
        }
    }
}

/// 실행 준비가 끝난 쿼리
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub target: TableKind,
    pub sql: String,
    pub args: Vec<QueryArg>,
}

/// WHERE 조건과 바인딩 값 누적기
#[derive(Default)]
struct Predicates {
    clauses: Vec<String>,
    args: Vec<QueryArg>,
}

impl Predicates {
    /// 다음 자리표시자 번호
    fn next_placeholder(&self) -> usize {
        self.args.len() + 1
    }

    fn bind(&mut self, template: impl FnOnce(usize) -> String, arg: QueryArg) {
        let clause = template(self.next_placeholder());
        self.clauses.push(clause);
        self.args.push(arg);
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// 검색 요청을 쿼리로 변환하는 순수 빌더
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    tables: TableSet,
}

impl QueryBuilder {
    pub fn new(tables: TableSet) -> Self {
        Self { tables }
    }

    /// 쿼리 생성, 아무것도 실행하지 않는다
    pub fn build(&self, request: &SearchRequest) -> Result<BuiltQuery> {
        validate(request)?;

        let table = self.tables.get(request.target);
        let time_column = table.time_column();
        let mut predicates = Predicates::default();

        if let Some(start) = request.start {
            predicates.bind(
                |n| format!("{time_column} >= ${n}"),
                QueryArg::Timestamp(start),
            );
        }
        if let Some(end) = request.end {
            predicates.bind(
                |n| format!("{time_column} < ${n}"),
                QueryArg::Timestamp(end),
            );
        }
        if let Some(last) = request.last {
            // 외부 문자열이 없는 검증된 정수이므로 리터럴로 넣는다
            let seconds = last.as_secs();
            predicates.clauses.push(format!(
                "{time_column} >= CURRENT_TIMESTAMP - INTERVAL '{seconds} seconds'"
            ));
        }

        for filter in &request.filters {
            add_filter(&mut predicates, request.target, filter)?;
        }

        let order = if request.sort_descending { "DESC" } else { "ASC" };
        let mut sql = format!(
            "SELECT {} FROM {}{} ORDER BY {time_column} {order}",
            request.target.select_list(),
            table.name(),
            predicates.where_clause(),
        );

        let mut args = predicates.args;
        if !request.export.is_streaming() {
            let (offset, limit) = page_bounds(request)?;
            let n = args.len() + 1;
            sql.push_str(&format!(" OFFSET ${n} LIMIT ${}", n + 1));
            args.push(QueryArg::Int(offset));
            args.push(QueryArg::Int(limit));
        }

        Ok(BuiltQuery {
            target: request.target,
            sql,
            args,
        })
    }
}

fn validate(request: &SearchRequest) -> Result<()> {
    if request.last.is_some() && (request.start.is_some() || request.end.is_some()) {
        return Err(invalid_request(
            "절대 시간 범위와 최근 기간(last)은 함께 쓸 수 없음",
        ));
    }
    if let Some(last) = request.last {
        if last.as_secs() == 0 {
            return Err(invalid_request("최근 기간(last)은 1초 이상이어야 함"));
        }
        if i64::try_from(last.as_secs()).is_err() {
            return Err(invalid_request("최근 기간(last)이 너무 큼"));
        }
    }
    if let (Some(start), Some(end)) = (request.start, request.end) {
        if start >= end {
            return Err(invalid_request(format!(
                "시작 시각 {start} 이 끝 시각 {end} 보다 앞서야 함"
            )));
        }
    }
    if !request.export.is_streaming() && request.page_size == 0 {
        return Err(invalid_request("pageSize는 0일 수 없음"));
    }
    Ok(())
}

/// (OFFSET, LIMIT)
fn page_bounds(request: &SearchRequest) -> Result<(i64, i64)> {
    let too_large = || invalid_request("페이지 범위가 너무 큼");
    let offset = request
        .page_number
        .checked_mul(request.page_size)
        .and_then(|o| i64::try_from(o).ok())
        .ok_or_else(too_large)?;
    let limit = i64::try_from(request.page_size).map_err(|_| too_large())?;
    Ok((offset, limit))
}

fn add_filter(predicates: &mut Predicates, target: TableKind, filter: &Filter) -> Result<()> {
    let expr = filter.column.expression(target);

    if filter.column.is_integer() {
        let value: i64 = filter.value.trim().parse().map_err(|_| {
            invalid_request(format!(
                "{} 필터 값은 정수여야 함: {:?}",
                filter.column, filter.value
            ))
        })?;
        predicates.bind(|n| format!("{expr} = ${n}"), QueryArg::Int(value));
    } else if filter.value.contains('*') {
        predicates.bind(
            |n| format!("{expr} LIKE ${n}"),
            QueryArg::Text(like_pattern(&filter.value)),
        );
    } else {
        predicates.bind(
            |n| format!("{expr} = ${n}"),
            QueryArg::Text(filter.value.clone()),
        );
    }
    Ok(())
}

/// `*`는 임의 문자열, 나머지 LIKE 특수문자는 그대로 비교
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        match c {
            '*' => pattern.push('%'),
            '%' | '_' | '\\' => {
                pattern.push('\\');
                pattern.push(c);
            }
            _ => pattern.push(c),
        }
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ExportFormat, FilterColumn};
    use chrono::TimeZone;
    use logsearch_error::LogSearchError;
    use proptest::prelude::*;
    use std::time::Duration;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn build(request: &SearchRequest) -> Result<BuiltQuery> {
        QueryBuilder::default().build(request)
    }

    #[test]
    fn time_range_and_filter_become_positional_args() {
        let mut request = SearchRequest::new(TableKind::RequestInfo);
        request.start = Some(utc(2024, 3, 1));
        request.end = Some(utc(2024, 4, 1));
        request.filters = vec![Filter::new(FilterColumn::ApiName, "PutObject")];

        let query = build(&request).unwrap();
        assert_eq!(
            query.sql,
            format!(
                "SELECT {} FROM request_info WHERE time >= $1 AND time < $2 AND api_name = $3 \
                 ORDER BY time DESC OFFSET $4 LIMIT $5",
                TableKind::RequestInfo.select_list()
            )
        );
        assert_eq!(
            query.args,
            vec![
                QueryArg::Timestamp(utc(2024, 3, 1)),
                QueryArg::Timestamp(utc(2024, 4, 1)),
                QueryArg::Text("PutObject".to_string()),
                QueryArg::Int(0),
                QueryArg::Int(10),
            ]
        );
    }

    #[test]
    fn no_predicates_means_no_where_clause() {
        let mut request = SearchRequest::new(TableKind::RawLog);
        request.sort_descending = false;
        request.export = ExportFormat::Ndjson;

        let query = build(&request).unwrap();
        assert_eq!(
            query.sql,
            "SELECT event_time, log::text AS log FROM audit_log_events ORDER BY event_time ASC"
        );
        assert!(query.args.is_empty());
    }

    #[test]
    fn streaming_exports_are_not_paged() {
        for export in [ExportFormat::Ndjson, ExportFormat::Csv] {
            let mut request = SearchRequest::new(TableKind::RequestInfo);
            request.export = export;
            request.page_size = 0;
            let query = build(&request).unwrap();
            assert!(!query.sql.contains("OFFSET"));
            assert!(!query.sql.contains("LIMIT"));
        }
    }

    #[test]
    fn page_offset_is_page_times_size() {
        let mut request = SearchRequest::new(TableKind::RequestInfo);
        request.page_number = 3;
        request.page_size = 25;
        let query = build(&request).unwrap();
        assert_eq!(query.args, vec![QueryArg::Int(75), QueryArg::Int(25)]);
        assert!(query.sql.ends_with("OFFSET $1 LIMIT $2"));
    }

    #[test]
    fn relative_window_uses_numeric_literal() {
        let mut request = SearchRequest::new(TableKind::RequestInfo);
        request.last = Some(Duration::from_secs(7200));
        request.filters = vec![Filter::new(FilterColumn::Bucket, "photos")];

        let query = build(&request).unwrap();
        assert!(query.sql.contains(
            "WHERE time >= CURRENT_TIMESTAMP - INTERVAL '7200 seconds' AND bucket = $1"
        ));
        assert_eq!(query.args[0], QueryArg::Text("photos".to_string()));
    }

    #[test]
    fn raw_table_filters_use_document_paths() {
        let mut request = SearchRequest::new(TableKind::RawLog);
        request.filters = vec![
            Filter::new(FilterColumn::ApiName, "PutObject"),
            Filter::new(FilterColumn::ResponseStatusCode, "200"),
        ];
        let query = build(&request).unwrap();
        assert!(query.sql.contains(
            "WHERE log->'api'->>'name' = $1 AND (log->'api'->>'statusCode')::INT8 = $2"
        ));
        assert_eq!(query.args[1], QueryArg::Int(200));
    }

    #[test]
    fn wildcard_values_become_escaped_like_patterns() {
        let mut request = SearchRequest::new(TableKind::RequestInfo);
        request.filters = vec![Filter::new(FilterColumn::Object, "2024_%/*.png")];
        let query = build(&request).unwrap();
        assert!(query.sql.contains("object LIKE $1"));
        assert_eq!(query.args[0], QueryArg::Text("2024\\_\\%/%.png".to_string()));
    }

    #[test]
    fn contradictory_or_empty_requests_are_rejected() {
        let mut both = SearchRequest::new(TableKind::RequestInfo);
        both.start = Some(utc(2024, 3, 1));
        both.last = Some(Duration::from_secs(60));

        let mut zero_page = SearchRequest::new(TableKind::RequestInfo);
        zero_page.page_size = 0;

        let mut inverted = SearchRequest::new(TableKind::RawLog);
        inverted.start = Some(utc(2024, 4, 1));
        inverted.end = Some(utc(2024, 3, 1));

        let mut sub_second = SearchRequest::new(TableKind::RawLog);
        sub_second.last = Some(Duration::from_millis(500));

        let mut bad_code = SearchRequest::new(TableKind::RequestInfo);
        bad_code.filters = vec![Filter::new(FilterColumn::ResponseStatusCode, "2xx")];

        let mut huge_page = SearchRequest::new(TableKind::RequestInfo);
        huge_page.page_number = u64::MAX;

        for request in [both, zero_page, inverted, sub_second, bad_code, huge_page] {
            assert!(
                matches!(build(&request), Err(LogSearchError::InvalidRequest(_))),
                "{request:?} should be rejected"
            );
        }
    }

    /// `*`가 없어 일치 비교로 가는 값
    fn adversarial_value() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 ]{0,6}('|\"|;|--|/|\\)|\\$1)[a-zA-Z0-9 '\";()=-]{0,16}"
    }

    /// `*`가 들어가 LIKE 패턴이 되는 값
    fn adversarial_pattern() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 ]{0,6}('|\"|;|--|%|_|\\\\)\\*[a-zA-Z0-9 '\";()=*%_\\\\-]{0,16}"
    }

    fn text_column() -> impl Strategy<Value = FilterColumn> {
        prop::sample::select(
            FilterColumn::ALL
                .into_iter()
                .filter(|c| !c.is_integer())
                .collect::<Vec<_>>(),
        )
    }

    fn filtered(target: TableKind, column: FilterColumn, value: &str) -> SearchRequest {
        let mut request = SearchRequest::new(target);
        request.start = Some(utc(2024, 3, 1));
        request.filters = vec![Filter::new(column, value)];
        request
    }

    fn target(raw: bool) -> TableKind {
        if raw { TableKind::RawLog } else { TableKind::RequestInfo }
    }

    proptest! {
        #[test]
        fn equality_values_never_reach_query_text(
            value in adversarial_value(),
            column in text_column(),
            raw in any::<bool>(),
        ) {
            let query = build(&filtered(target(raw), column, &value)).unwrap();
            let benign = build(&filtered(target(raw), column, "x")).unwrap();

            // 쿼리 텍스트는 값과 무관해야 한다
            prop_assert_eq!(&query.sql, &benign.sql);
            prop_assert_eq!(&query.args[1], &QueryArg::Text(value));
            prop_assert_eq!(query.sql.matches('$').count(), query.args.len());
        }

        #[test]
        fn pattern_values_never_reach_query_text(
            value in adversarial_pattern(),
            column in text_column(),
            raw in any::<bool>(),
        ) {
            let query = build(&filtered(target(raw), column, &value)).unwrap();
            let benign = build(&filtered(target(raw), column, "x*")).unwrap();

            prop_assert_eq!(&query.sql, &benign.sql);
            prop_assert!(query.sql.contains(" LIKE $2"));
            prop_assert_eq!(&query.args[1], &QueryArg::Text(like_pattern(&value)));
            prop_assert_eq!(query.sql.matches('$').count(), query.args.len());
        }
    }
}
