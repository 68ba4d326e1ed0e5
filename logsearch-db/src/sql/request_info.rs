/// 시간 컬럼
pub const TIME_COLUMN: &str = "time";

/// 검색 결과 컬럼, CSV 헤더와 같은 순서
pub const COLUMNS: [&str; 13] = [
    "time",
    "api_name",
    "access_key",
    "bucket",
    "object",
    "time_to_response_ns",
    "remote_host",
    "request_id",
    "user_agent",
    "response_status",
    "response_status_code",
    "request_content_length",
    "response_content_length",
];

/// 검색용 SELECT 목록
pub const SELECT_LIST: &str = "time, api_name, access_key, bucket, object, time_to_response_ns, \
     remote_host, request_id, user_agent, response_status, response_status_code, \
     request_content_length, response_content_length";

/// 테이블 생성 쿼리
pub fn create_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            time TIMESTAMPTZ NOT NULL,
            api_name TEXT NOT NULL,
            access_key TEXT,
            bucket TEXT,
            object TEXT,
            time_to_response_ns INT8,
            remote_host TEXT,
            request_id TEXT,
            user_agent TEXT,
            response_status TEXT,
            response_status_code INT8,
            request_content_length INT8,
            response_content_length INT8
        ) PARTITION BY RANGE (time)"
    )
}

/// 요청 정보 삽입 쿼리
pub fn insert(table: &str) -> String {
    format!(
        "INSERT INTO {table} ({SELECT_LIST})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
    )
}
