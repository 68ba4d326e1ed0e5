use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use logsearch_config::Settings;
use logsearch_db::{DatabasePool, PartitionWindow, initialize_db};
use logsearch_error::Result;
use logsearch_ingest::IngestionPipeline;
use logsearch_logging::setup_logger;
use logsearch_search::{SearchParams, SearchRequest, SearchService};

/// 시간 파티션 감사 로그 저장소
#[derive(Parser, Debug)]
#[command(name = "logsearch", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 테이블과 파티션을 준비하고 종료
    Init {
        /// 과거 데이터 적재용으로 이 시각(RFC3339)의 파티션도 만든다, 여러 번 지정 가능
        #[arg(long = "backfill")]
        backfill: Vec<String>,
    },
    /// 표준입력의 한 줄을 이벤트 하나로 저장
    Ingest,
    /// 로그 검색, 결과는 표준출력으로
    Search(SearchArgs),
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// raw 또는 reqinfo
    #[arg(long, default_value = "reqinfo")]
    target: String,
    /// RFC3339 시작 시각(포함)
    #[arg(long)]
    start: Option<String>,
    /// RFC3339 끝 시각(제외)
    #[arg(long)]
    end: Option<String>,
    /// 최근 기간 (예: 15m, 2h)
    #[arg(long)]
    last: Option<String>,
    /// column:value, 여러 번 지정 가능
    #[arg(long = "filter")]
    filters: Vec<String>,
    /// 오래된 순 정렬
    #[arg(long)]
    asc: bool,
    /// ndjson 또는 csv
    #[arg(long, default_value = "")]
    export: String,
    #[arg(long)]
    page: Option<u64>,
    #[arg(long)]
    page_size: Option<u64>,
}

impl From<SearchArgs> for SearchParams {
    fn from(args: SearchArgs) -> Self {
        Self {
            q: args.target,
            time_start: args.start,
            time_end: args.end,
            last: args.last,
            time_asc: args.asc,
            fp: args.filters,
            export: args.export,
            page_no: args.page,
            page_size: args.page_size,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // 로거 세팅
    setup_logger();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    // 통합 설정 로드
    let settings = Settings::new()?;

    // db 세팅
    let db_pool = DatabasePool::connect(&settings.database).await?;

    // 스키마 준비 실패 시 시작 중단
    let maintain = matches!(command, Command::Ingest);
    let schema = initialize_db(&settings.database, &db_pool, maintain).await?;
    let tables = schema.tables().clone();
    let timeouts = &settings.database.timeouts;

    match command {
        Command::Init { backfill } => {
            for text in &backfill {
                let window = PartitionWindow::from_rfc3339(text)?;
                for table in tables.all() {
                    schema.ensure_partition(table, window.start()).await?;
                }
                info!("과거 데이터용 파티션 준비: {window}");
            }
            info!("스키마 준비 완료");
        }
        Command::Ingest => {
            let pipeline = IngestionPipeline::new(
                db_pool,
                tables,
                Duration::from_secs(timeouts.insert_seconds),
            );
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let (mut saved, mut failed) = (0u64, 0u64);

            while let Some(line) = lines.next_line().await? {
                // 실패한 이벤트는 파이프라인이 원문을 남긴다
                let mut result = pipeline.insert(line.as_bytes()).await;
                if matches!(&result, Err(e) if e.is_retryable()) {
                    debug!("일시적 오류, 한 번 재시도");
                    result = pipeline.insert(line.as_bytes()).await;
                }
                match result {
                    Ok(()) => saved += 1,
                    Err(e) => {
                        warn!("이벤트 저장 실패: {e}");
                        failed += 1;
                    }
                }
            }
            info!("수집 종료 (처리: {saved}, 실패: {failed})");
        }
        Command::Search(args) => {
            let request = SearchRequest::from_params(&args.into(), &settings.search)?;
            let service = SearchService::new(
                db_pool,
                tables,
                Duration::from_secs(timeouts.search_seconds),
            );

            let mut stdout = tokio::io::stdout();
            let count = service.search(&request, &mut stdout).await?;
            stdout.flush().await?;
            info!("검색 결과 {count}건");
        }
    }

    Ok(())
}
