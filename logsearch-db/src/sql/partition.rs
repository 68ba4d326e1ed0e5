use chrono::{DateTime, Utc};

/// 파티션 범위 리터럴 형식
const BOUND_FORMAT: &str = "%Y-%m-%d %H:%M:%S+00";

/// 파티션 생성 쿼리, 경계값은 내부에서 계산한 시각만 사용
pub fn create_partition(
    parent: &str,
    partition: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {partition} PARTITION OF {parent} \
         FOR VALUES FROM ('{}') TO ('{}')",
        start.format(BOUND_FORMAT),
        end.format(BOUND_FORMAT)
    )
}

/// 테이블 존재 확인 쿼리, 카탈로그 조회 권한이 없어도 동작한다
pub fn exists_probe(table: &str) -> String {
    format!("SELECT 1 FROM {table} WHERE false")
}
