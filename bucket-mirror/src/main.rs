use anyhow::Result;
use bucket_mirror::cli::{run, Cli};
use bucket_mirror::logging;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let logger = logging::build_logger(cli.log_format);
    if !logging::install(&logger) {
        eprintln!("a global logger was already installed");
    }
    tracing::info!(log_format = ?cli.log_format, "CLI arguments parsed, invoking run");

    let result = run(cli, logger).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
