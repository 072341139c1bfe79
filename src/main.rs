use claim_adjudicator::cli::{self, Cli, Command};
use claim_adjudicator::service::load_ledger;
use claim_adjudicator::{api, AppConfig, ClaimAdjudicator};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式；输出到 stderr，stdout 留给结果
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // 加载配置
    let config = AppConfig::load(cli.config.as_deref())?;
    info!("Loaded config: {:?}", config);

    match cli.command {
        Command::Serve => serve(config).await?,
        Command::Run(args) => {
            let ledger = load_ledger(&config, args.ledger.as_deref()).await?;
            let adjudicator = ClaimAdjudicator::from_config(ledger, &config)?;
            let outcome = cli::run_batch_file(&adjudicator, &args.claims).await?;
            cli::write_outcome(&outcome, args.format, args.export.as_deref(), std::io::stdout().lock())?;
        }
        Command::Ledger(args) => {
            let ledger = load_ledger(&config, args.ledger.as_deref()).await?;
            cli::write_ledger(&ledger, args.format, std::io::stdout().lock())?;
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    // 账本快照在启动时加载一次，运行期间只读
    let ledger = load_ledger(&config, None).await?;
    let adjudicator = Arc::new(ClaimAdjudicator::from_config(ledger, &config)?);

    let app = api::router(adjudicator, config.server.max_body_bytes);

    // 启动服务器
    let addr = config.bind_addr();
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /api/ledger              - ledger snapshot");
    info!("  POST /api/claims/batch        - JSON table batch");
    info!("  POST /api/claims/batch/csv    - CSV batch");
    info!("  POST /api/claims/batch/export - CSV batch, CSV report");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
