use crate::error::AdjudicationError;
use crate::models::BatchOutcome;
use crate::service::normalizer::read_csv_table;
use crate::service::reporter::{export_csv, render_table, report_rows};
use crate::service::{ClaimAdjudicator, Ledger};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(
    name = "claim-adjudicator",
    about = "Batch claim adjudication against an invoice line-item ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件 (默认读取 ./adjudicator.toml，若存在)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP service
    Serve,
    /// Adjudicate a claims CSV file and print the results
    Run(RunArgs),
    /// Print the ledger snapshot
    Ledger(LedgerArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Claims CSV (columns: billing_number, claim_amount, optional phrase_code)
    pub claims: PathBuf,

    /// Ledger seed CSV, overrides the configured source
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Also write the report as CSV to this path
    #[arg(long)]
    pub export: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct LedgerArgs {
    /// Ledger seed CSV, overrides the configured source
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// 读取索赔文件并裁决
pub async fn run_batch_file(
    adjudicator: &ClaimAdjudicator,
    claims: &Path,
) -> Result<BatchOutcome, AdjudicationError> {
    let file = std::fs::File::open(claims)?;
    let table = read_csv_table(file)?;
    tracing::info!("Read {} claim rows from {}", table.len(), claims.display());
    adjudicator.adjudicate(table).await
}

/// 输出裁决结果 (文本表格或 JSON)，可选导出 CSV
pub fn write_outcome<W: Write>(
    outcome: &BatchOutcome,
    format: OutputFormat,
    export: Option<&Path>,
    mut out: W,
) -> Result<(), AdjudicationError> {
    let rows = report_rows(&outcome.results);

    match format {
        OutputFormat::Text => {
            out.write_all(render_table(&rows).as_bytes())?;
            writeln!(out, "\n{}", outcome.summary)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &rows).map_err(std::io::Error::from)?;
            writeln!(out)?;
        }
    }

    if let Some(path) = export {
        export_csv(&rows, std::fs::File::create(path)?)?;
        tracing::info!("Report exported to {}", path.display());
    }
    Ok(())
}

/// 打印账本快照
pub fn write_ledger<W: Write>(
    ledger: &Ledger,
    format: OutputFormat,
    mut out: W,
) -> Result<(), AdjudicationError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, ledger.items()).map_err(std::io::Error::from)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for item in ledger.items() {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    item.billing_number, item.phrase_code, item.line_item_id, item.amount
                )?;
            }
        }
    }
    Ok(())
}
