use crate::infra::render_report;
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_tracker::applications::report_filter;
use loan_tracker::config::AppConfig;
use loan_tracker::error::AppError;
use loan_tracker::reports::ReportFormat;
use loan_tracker::telemetry;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "loan-tracker-api",
    about = "Serve the loan application tracker or export reports from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Render a summary report against the configured storage backend
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Output format: pdf or excel
    #[arg(long, default_value = "pdf")]
    pub(crate) format: String,
    /// Where to write the rendered report
    #[arg(long)]
    pub(crate) output: PathBuf,
    /// Only include applications with this status
    #[arg(long)]
    pub(crate) status: Option<String>,
    /// Lower bound on the application date (inclusive)
    #[arg(long)]
    pub(crate) start_date: Option<String>,
    /// Upper bound on the application date (inclusive)
    #[arg(long)]
    pub(crate) end_date: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report(args) => run_report(args).await,
    }
}

async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let format: ReportFormat = args.format.parse()?;
    let filter = report_filter(
        args.status.as_deref(),
        args.start_date.as_deref(),
        args.end_date.as_deref(),
    )?;

    let report = render_report(&config.storage, &filter, format).await?;
    tokio::fs::write(&args.output, &report.bytes).await?;

    info!(
        %format,
        output = %args.output.display(),
        bytes = report.bytes.len(),
        "report written"
    );
    println!(
        "Wrote {} report ({} bytes) to {}",
        format,
        report.bytes.len(),
        args.output.display()
    );
    Ok(())
}
