use std::path::{Path, PathBuf};

use log::info;

use logsearch_error::{Result, config_err};

use crate::config::SearchConfig;
use crate::dbconfig::DbConfig;

const DB_CONFIG_ENV: &str = "LOGSEARCH_DB_CONFIG";
const SEARCH_CONFIG_ENV: &str = "LOGSEARCH_SEARCH_CONFIG";

/// 통합 세팅 인스턴스
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub database: DbConfig,
    pub search: SearchConfig,
}

impl Settings {
    /// Setting 생성
    pub fn new() -> Result<Self> {
        let database = Self::load_db_config()?;
        let search = Self::load_search_config()?;

        Ok(Self { database, search })
    }

    /// 환경변수가 있으면 그 경로, 없으면 기본 파일명
    fn config_path(env_key: &str, default: &str) -> PathBuf {
        std::env::var(env_key)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(default))
    }

    /// db 설정 로드
    fn load_db_config() -> Result<DbConfig> {
        let path = Self::config_path(DB_CONFIG_ENV, "db.yml");
        // yml 파일 유무 확인
        if Path::new(&path).exists() {
            info!("DB 설정파일 로드: {}", path.display());
            DbConfig::from_file(&path)
                .map_err(|e| config_err(format!("DB 설정파일 로드 실패: {e}")))
        } else {
            // 기본설정사용
            info!("DB 기본설정 사용");
            Ok(DbConfig::default())
        }
    }

    /// 검색 설정 로드
    fn load_search_config() -> Result<SearchConfig> {
        let path = Self::config_path(SEARCH_CONFIG_ENV, "search.yml");
        if Path::new(&path).exists() {
            info!("검색 설정파일 로드: {}", path.display());
            SearchConfig::from_file(&path)
                .map_err(|e| config_err(format!("검색 설정파일 로드 실패: {e}")))
        } else {
            info!("검색 기본설정 사용");
            Ok(SearchConfig::new())
        }
    }
}
