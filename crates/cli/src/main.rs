use clap::Parser;
use error::CliError;
use std::path::PathBuf;
use std::process;
use tracing::{error, Level};

mod error;

#[derive(Parser)]
#[command(name = "cdc-pipeline", version, about = "Replication-log to audit-store CDC pipeline")]
struct Cli {
    /// KEY=VALUE configuration file overriding the process environment.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, "exiting");
            1
        }
    };

    process::exit(exit_code);
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = config::Settings::load(cli.env_file.as_deref())?;
    engine_runtime::run(settings).await?;
    Ok(())
}
