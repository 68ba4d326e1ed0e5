use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use logsearch_error::Result;

/// 검색 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// pageSize 미지정시 페이지 크기
    pub default_page_size: u32,
    /// 허용하는 최대 페이지 크기
    pub max_page_size: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchConfig {
    /// 기본설정으로 생성
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 1000,
        }
    }

    /// 설정파일에서 설정 로드
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config = serde_yml::from_str(&contents)?;

        Ok(config)
    }
}
