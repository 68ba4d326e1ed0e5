use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio_postgres::error::SqlState;

use logsearch_error::{LogSearchError, Result, schema_err};

use crate::partition::PartitionWindow;
use crate::pool::DatabasePool;
use crate::table::{LogicalTable, TableSet};

/// 부모 테이블과 파티션의 생성을 전담하는 관리자
pub struct SchemaManager {
    pool: DatabasePool,
    tables: TableSet,
    timeout: Duration,
}

impl SchemaManager {
    pub fn new(pool: DatabasePool, tables: TableSet, timeout: Duration) -> Self {
        Self {
            pool,
            tables,
            timeout,
        }
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    /// 부모 테이블 생성 (이미 있으면 성공)
    pub async fn ensure_parent_table(&self, table: &LogicalTable) -> Result<()> {
        let phase = format!("{} 테이블 생성", table.name());
        self.run_ddl(&phase, &table.create_statement()).await?;
        info!("{} 테이블 확인 완료", table.name());
        Ok(())
    }

    /// 파티션 존재 여부 확인
    pub async fn partition_exists(
        &self,
        table: &LogicalTable,
        window: &PartitionWindow,
    ) -> Result<bool> {
        let partition = table.partition_name(window);
        let phase = format!("{partition} 파티션 확인");
        let probe = table.partition_probe(window);

        let result = self
            .bounded(&phase, async {
                let conn = self.pool.acquire(phase.as_str()).await?;
                match conn.query(probe.as_str(), &[]).await {
                    Ok(_) => Ok(true),
                    Err(e) if e.code() == Some(&SqlState::UNDEFINED_TABLE) => Ok(false),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        debug!("{partition} 파티션 존재 여부: {result}");
        Ok(result)
    }

    /// 시각을 포함하는 파티션이 없으면 생성
    pub async fn ensure_partition(
        &self,
        table: &LogicalTable,
        instant: DateTime<Utc>,
    ) -> Result<PartitionWindow> {
        let window = PartitionWindow::containing(instant).map_err(|e| {
            schema_err(format!("{} 파티션 계산 실패: {e}", table.name()))
        })?;

        if self.partition_exists(table, &window).await? {
            return Ok(window);
        }

        let partition = table.partition_name(&window);
        let phase = format!("{partition} 파티션 생성");
        self.run_ddl(&phase, &table.create_partition_statement(&window))
            .await?;
        info!("{partition} 파티션 생성 완료: {window}");

        Ok(window)
    }

    /// 부모 테이블과 이전/현재/다음 파티션 보장
    pub async fn bootstrap(&self, table: &LogicalTable, now: DateTime<Utc>) -> Result<()> {
        self.ensure_parent_table(table).await?;

        // 이전 파티션은 늦게 도착한 데이터의 수동 적재용
        let window_err =
            |e: LogSearchError| schema_err(format!("{} 파티션 계산 실패: {e}", table.name()));
        let current = PartitionWindow::containing(now).map_err(window_err)?;
        let previous = current.previous().map_err(window_err)?;
        let next = current.next().map_err(window_err)?;

        for instant in [previous.start(), now, next.start()] {
            self.ensure_partition(table, instant).await?;
        }
        Ok(())
    }

    /// 모든 테이블 부트스트랩, 실패하면 시작을 중단해야 한다
    pub async fn bootstrap_all(&self, now: DateTime<Utc>) -> Result<()> {
        for table in self.tables.all() {
            debug!("{} 부트스트랩", table.name());
            if let Err(e) = self.bootstrap(table, now).await {
                error!("{} 스키마 보장 실패: {e}", table.name());
                return Err(e);
            }
        }
        info!("스키마 부트스트랩 완료");
        Ok(())
    }

    /// 현재/다음 파티션을 주기적으로 확인하는 백그라운드 작업
    pub fn spawn_maintenance(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 첫 tick은 즉시 발생, 부트스트랩 직후이므로 건너뜀
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let now = Utc::now();
                if let Err(e) = self.maintain(now).await {
                    warn!("파티션 유지 작업 실패, 다음 주기에 재시도: {e}");
                }
            }
        })
    }

    /// 현재 구간과 다음 구간 파티션 확인
    pub async fn maintain(&self, now: DateTime<Utc>) -> Result<()> {
        let next_start = PartitionWindow::containing(now)
            .and_then(|w| w.next())
            .map_err(|e| schema_err(format!("파티션 계산 실패: {e}")))?
            .start();

        for table in self.tables.all() {
            self.ensure_partition(table, now).await?;
            self.ensure_partition(table, next_start).await?;
        }
        Ok(())
    }

    /// DDL 실행, 동시에 같은 테이블을 만든 경우도 성공으로 본다
    async fn run_ddl(&self, phase: &str, ddl: &str) -> Result<()> {
        self.bounded(phase, async {
            let conn = self.pool.acquire(phase).await?;
            match conn.batch_execute(ddl).await {
                Ok(()) => Ok(()),
                Err(e)
                    if e.code() == Some(&SqlState::DUPLICATE_TABLE)
                        || e.code() == Some(&SqlState::UNIQUE_VIOLATION) =>
                {
                    debug!("{phase}: 이미 존재함");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// 타임아웃을 적용하고 모든 실패를 스키마 에러로 변환
    async fn bounded<T, F>(&self, phase: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!("{phase} 실패: {e}");
                Err(schema_err(format!("{phase} 실패: {e}")))
            }
            Err(_) => {
                error!("{phase} 타임아웃 ({:?})", self.timeout);
                Err(schema_err(format!(
                    "{phase} 타임아웃 ({:?})",
                    self.timeout
                )))
            }
        }
    }
}
