/// 시간 컬럼
pub const TIME_COLUMN: &str = "event_time";

/// 검색 결과 컬럼, CSV 헤더와 같은 순서
pub const COLUMNS: [&str; 2] = ["event_time", "log"];

/// 검색용 SELECT 목록, 로그 문서는 텍스트로 받아 직접 해석한다
pub const SELECT_LIST: &str = "event_time, log::text AS log";

/// 테이블 생성 쿼리
pub fn create_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            event_time TIMESTAMPTZ NOT NULL,
            log JSONB NOT NULL
        ) PARTITION BY RANGE (event_time)"
    )
}

/// 이벤트 삽입 쿼리
pub fn insert(table: &str) -> String {
    format!("INSERT INTO {table} (event_time, log) VALUES ($1, $2)")
}
