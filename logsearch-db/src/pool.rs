use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use log::{debug, info};
use tokio_postgres::{
    NoTls,
    config::{Config, SslMode},
};

use logsearch_config::{DbConfig, dbconfig::ConnectionConfig};
use logsearch_error::{LogSearchError, Result, config_err};

/// 수집과 검색이 함께 쓰는 연결 풀
///
/// 어떤 작업도 자기 호출이 끝난 뒤까지 연결을 잡고 있지 않는다.
#[derive(Clone)]
pub struct DatabasePool {
    pool: Pool,
}

impl DatabasePool {
    /// 연결 없이 풀만 구성, 첫 `acquire`에서 연결을 만든다
    pub fn new(dbconfig: &DbConfig) -> Result<Self> {
        let pg_config = pg_config(&dbconfig.connection, dbconfig.pool.connection_timeout_seconds)?;
        let mgr = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(mgr)
            .max_size(dbconfig.pool.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(Duration::from_secs(
                dbconfig.pool.connection_timeout_seconds,
            )))
            .recycle_timeout(Some(Duration::from_secs(dbconfig.pool.recycle_seconds)))
            .build()
            .map_err(|e| config_err(format!("db 풀 생성 실패: {e}")))?;

        Ok(Self { pool })
    }

    /// 풀을 만들고 `SELECT 1`로 접속 확인
    pub async fn connect(dbconfig: &DbConfig) -> Result<Self> {
        let conn = &dbconfig.connection;
        info!(
            "db 연결: {}@{}:{}/{} (최대 연결 수: {})",
            conn.user, conn.host, conn.port, conn.database, dbconfig.pool.max_connections
        );

        let pool = Self::new(dbconfig)?;
        pool.acquire("연결 확인")
            .await?
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| LogSearchError::from(e).context("연결 확인"))?;

        info!("db 연결 확인 완료");
        Ok(pool)
    }

    /// 작업 이름을 문맥으로 붙여 연결 획득
    pub async fn acquire(&self, phase: &str) -> Result<Object> {
        debug!("{phase}: 연결 요청");
        self.pool
            .get()
            .await
            .map_err(|e| LogSearchError::from(e).context(phase))
    }
}

fn ssl_mode(text: &str) -> Result<SslMode> {
    match text.to_ascii_lowercase().as_str() {
        "disable" => Ok(SslMode::Disable),
        "prefer" | "" => Ok(SslMode::Prefer),
        "require" => Ok(SslMode::Require),
        other => Err(config_err(format!("지원하지 않는 sslmode: {other:?}"))),
    }
}

fn pg_config(conn: &ConnectionConfig, connect_timeout_seconds: u64) -> Result<Config> {
    let mut pg_config = Config::new();
    pg_config
        .host(conn.host.as_str())
        .port(conn.port)
        .dbname(conn.database.as_str())
        .user(conn.user.as_str())
        .password(conn.password.as_str())
        .application_name("logsearch")
        .ssl_mode(ssl_mode(&conn.sslmode)?)
        .connect_timeout(Duration::from_secs(connect_timeout_seconds))
        .keepalives(true);
    Ok(pg_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_postgres::config::Host;

    #[test]
    fn connection_settings_are_applied() {
        let conn = ConnectionConfig {
            host: "db.internal".to_string(),
            port: 6543,
            database: "audit".to_string(),
            sslmode: "REQUIRE".to_string(),
            ..Default::default()
        };
        let config = pg_config(&conn, 7).unwrap();

        assert_eq!(config.get_hosts(), &[Host::Tcp("db.internal".to_string())]);
        assert_eq!(config.get_ports(), &[6543]);
        assert_eq!(config.get_dbname(), Some("audit"));
        assert_eq!(config.get_application_name(), Some("logsearch"));
        assert_eq!(config.get_ssl_mode(), SslMode::Require);
        assert_eq!(config.get_connect_timeout(), Some(&Duration::from_secs(7)));
    }

    #[test]
    fn unknown_sslmode_is_a_config_error() {
        let conn = ConnectionConfig {
            sslmode: "verify-full".to_string(),
            ..Default::default()
        };
        assert!(matches!(pg_config(&conn, 1), Err(LogSearchError::Config(_))));
    }

    #[tokio::test]
    async fn exhausted_pool_wait_is_a_timeout_with_phase() {
        let mut config = DbConfig::default();
        config.pool.max_connections = 0;
        config.pool.connection_timeout_seconds = 0;

        let pool = DatabasePool::new(&config).unwrap();
        let err = pool.acquire("request_info 검색").await.unwrap_err();
        assert!(matches!(err, LogSearchError::Timeout(_)), "{err:?}");
        assert!(err.to_string().contains("request_info 검색"));
    }
}
