use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};

use logsearch_config::DbConfig;
use logsearch_error::Result;

use crate::pool::DatabasePool;
use crate::schema::SchemaManager;
use crate::table::TableSet;

/// 데이터베이스 초기화
///
/// 테이블과 이전/현재/다음 파티션을 보장한다. 실패하면 에러를 돌려주며
/// 호출자는 프로세스 시작을 중단해야 한다. `maintain`이 참이고 설정된 주기가
/// 0이 아니면 파티션 유지 작업도 시작한다.
pub async fn initialize_db(
    config: &DbConfig,
    pool: &DatabasePool,
    maintain: bool,
) -> Result<Arc<SchemaManager>> {
    debug!("데이터베이스 스키마 확인");
    let tables = TableSet::from_names(&config.tables)?;
    let schema = Arc::new(SchemaManager::new(
        pool.clone(),
        tables,
        Duration::from_secs(config.timeouts.schema_seconds),
    ));

    schema.bootstrap_all(Utc::now()).await?;

    let interval = config.partitioning.maintenance_interval_seconds;
    if maintain && interval > 0 {
        info!("파티션 유지 작업 시작 (주기: {interval}초)");
        schema.clone().spawn_maintenance(Duration::from_secs(interval));
    }

    Ok(schema)
}
