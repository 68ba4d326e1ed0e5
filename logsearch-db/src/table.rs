use logsearch_config::TableNames;
use logsearch_error::Result;

use crate::partition::PartitionWindow;
use crate::sql::{audit_log_events, partition, request_info};

/// 테이블 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// 원본 JSON 로그
    RawLog,
    /// 요청 정보 투영
    RequestInfo,
}

impl TableKind {
    /// 시간(파티션 키) 컬럼
    pub const fn time_column(self) -> &'static str {
        match self {
            TableKind::RawLog => audit_log_events::TIME_COLUMN,
            TableKind::RequestInfo => request_info::TIME_COLUMN,
        }
    }

    /// 검색 결과 컬럼 목록
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            TableKind::RawLog => &audit_log_events::COLUMNS,
            TableKind::RequestInfo => &request_info::COLUMNS,
        }
    }

    /// 검색용 SELECT 목록
    pub const fn select_list(self) -> &'static str {
        match self {
            TableKind::RawLog => audit_log_events::SELECT_LIST,
            TableKind::RequestInfo => request_info::SELECT_LIST,
        }
    }
}

/// 시간으로 파티셔닝되는 추가 전용 논리 테이블
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalTable {
    name: String,
    kind: TableKind,
}

impl LogicalTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn time_column(&self) -> &'static str {
        self.kind.time_column()
    }

    /// 부모 테이블 생성 쿼리
    pub fn create_statement(&self) -> String {
        match self.kind {
            TableKind::RawLog => audit_log_events::create_table(&self.name),
            TableKind::RequestInfo => request_info::create_table(&self.name),
        }
    }

    /// 삽입 쿼리
    pub fn insert_statement(&self) -> String {
        match self.kind {
            TableKind::RawLog => audit_log_events::insert(&self.name),
            TableKind::RequestInfo => request_info::insert(&self.name),
        }
    }

    /// 구간에 대응하는 파티션 테이블 이름
    pub fn partition_name(&self, window: &PartitionWindow) -> String {
        window.partition_name(&self.name)
    }

    /// 파티션 생성 쿼리
    pub fn create_partition_statement(&self, window: &PartitionWindow) -> String {
        partition::create_partition(
            &self.name,
            &self.partition_name(window),
            window.start(),
            window.end(),
        )
    }

    /// 파티션 존재 확인 쿼리
    pub fn partition_probe(&self, window: &PartitionWindow) -> String {
        partition::exists_probe(&self.partition_name(window))
    }
}

/// 두 논리 테이블 묶음
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSet {
    raw_log: LogicalTable,
    request_info: LogicalTable,
}

impl TableSet {
    /// 설정된 이름으로 생성, 이름은 식별자 규칙을 통과해야 한다
    pub fn from_names(names: &TableNames) -> Result<Self> {
        names.validate()?;
        Ok(Self {
            raw_log: LogicalTable {
                name: names.raw_log.clone(),
                kind: TableKind::RawLog,
            },
            request_info: LogicalTable {
                name: names.request_info.clone(),
                kind: TableKind::RequestInfo,
            },
        })
    }

    pub fn raw_log(&self) -> &LogicalTable {
        &self.raw_log
    }

    pub fn request_info(&self) -> &LogicalTable {
        &self.request_info
    }

    pub fn get(&self, kind: TableKind) -> &LogicalTable {
        match kind {
            TableKind::RawLog => &self.raw_log,
            TableKind::RequestInfo => &self.request_info,
        }
    }

    /// 생성 순서대로 모든 테이블
    pub fn all(&self) -> [&LogicalTable; 2] {
        [&self.raw_log, &self.request_info]
    }
}

impl Default for TableSet {
    fn default() -> Self {
        let names = TableNames::default();
        Self {
            raw_log: LogicalTable {
                name: names.raw_log,
                kind: TableKind::RawLog,
            },
            request_info: LogicalTable {
                name: names.request_info,
                kind: TableKind::RequestInfo,
            },
        }
    }
}
