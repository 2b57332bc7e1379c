use anyhow::Result;
use clap::Parser;

use kochat::app::{run_ask_mode, run_repl_mode, run_web_server, setup_from_cli};
use kochat::telemetry::init_tracing;
use kochat::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let app_config = setup_from_cli(&cli).await?;

    match cli.command_or_default() {
        Commands::Serve { bind, port } => run_web_server(&bind, port, app_config).await,
        Commands::Chat => run_repl_mode(app_config).await,
        Commands::Ask { prompt } => run_ask_mode(&prompt, app_config).await,
    }
}
