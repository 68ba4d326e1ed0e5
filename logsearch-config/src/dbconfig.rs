use std::fs::File;
use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use logsearch_error::{LogSearchError, Result};

/// 테이블 이름으로 허용하는 식별자
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]{0,47}$").expect("identifier pattern is valid")
});

/// 데이터베이스 설정
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// 데이터베이스 연결 설정
    pub connection: ConnectionConfig,
    /// 연결 풀 설정
    pub pool: PoolConfig,
    /// 작업별 타임아웃
    pub timeouts: TimeoutConfig,
    /// 파티셔닝 설정
    pub partitioning: PartitionConfig,
    /// 부모 테이블 이름
    pub tables: TableNames,
}

impl DbConfig {
    /// 설정파일에서 db 설정 로드
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: DbConfig = serde_yml::from_str(&contents)?;
        config.tables.validate()?;

        Ok(config)
    }
}

/// db 연결설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub sslmode: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "logsearch".to_string(),
            user: "logsearch".to_string(),
            password: "logsearch".to_string(),
            sslmode: "disable".to_string(),
        }
    }
}

/// 데이터베이스 연결 풀 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// 최대 연결 수
    pub max_connections: usize,
    /// 연결 타임아웃(초)
    pub connection_timeout_seconds: u64,
    /// 연결 재사용 전 대기 시간(초)
    pub recycle_seconds: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 20, // 최대 연결풀
            connection_timeout_seconds: 30,  // 연결 시도 타임아웃 30초
            recycle_seconds: 21_600,    // 6시간마다 연결 갱신
        }
    }
}

/// 작업별 타임아웃 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// 테이블/파티션 확인 및 생성(초)
    pub schema_seconds: u64,
    /// 이벤트 저장(초)
    pub insert_seconds: u64,
    /// 검색 및 결과 전송(초)
    pub search_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            schema_seconds: 2,
            insert_seconds: 15,
            search_seconds: 15,
        }
    }
}

/// 데이터베이스 파티셔닝 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// 현재/다음 파티션 확인 주기(초), 0이면 비활성
    pub maintenance_interval_seconds: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            maintenance_interval_seconds: 3600,
        }
    }
}

/// 논리 테이블 이름
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    /// 원본 JSON 로그 테이블
    pub raw_log: String,
    /// 요청 정보 테이블
    pub request_info: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            raw_log: "audit_log_events".to_string(),
            request_info: "request_info".to_string(),
        }
    }
}

impl TableNames {
    /// 테이블 이름이 SQL 식별자로 안전한지 확인
    pub fn validate(&self) -> Result<()> {
        for name in [&self.raw_log, &self.request_info] {
            if !IDENTIFIER.is_match(name) {
                return Err(LogSearchError::Config(format!(
                    "허용되지 않는 테이블 이름: {name:?}"
                )));
            }
        }
        if self.raw_log == self.request_info {
            return Err(LogSearchError::Config(format!(
                "두 테이블 이름이 같음: {}",
                self.raw_log
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_startup_budget() {
        let config = DbConfig::default();
        assert_eq!(config.timeouts.schema_seconds, 2);
        assert_eq!(config.timeouts.insert_seconds, 15);
        assert_eq!(config.timeouts.search_seconds, 15);
        assert!(config.tables.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = "connection:\n  host: db.internal\ntables:\n  raw_log: raw_events\n";
        let config: DbConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.connection.host, "db.internal");
        assert_eq!(config.connection.port, 5432);
        assert_eq!(config.tables.raw_log, "raw_events");
        assert_eq!(config.tables.request_info, "request_info");
    }

    #[test]
    fn table_names_reject_non_identifiers() {
        let bad = TableNames {
            raw_log: "logs; DROP TABLE x".to_string(),
            request_info: "request_info".to_string(),
        };
        assert!(matches!(bad.validate(), Err(LogSearchError::Config(_))));

        let same = TableNames {
            raw_log: "events".to_string(),
            request_info: "events".to_string(),
        };
        assert!(same.validate().is_err());
    }
}
