mod locate;
mod search;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use locate::PositionArgs;
use search::SearchArgs;

#[derive(Debug, Parser)]
#[command(name = "clinicfind")]
#[command(about = "Find nearby clinics and narrow them by specialization, facilities, and hours")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve the current location and show which strategy produced it
    Locate {
        #[command(flatten)]
        position: PositionArgs,
    },
    /// Search clinics near the current location and apply filters
    Search(SearchArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = clinicfind_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Locate { position } => locate::run_locate(&config, &position).await,
        Commands::Search(args) => search::run_search(&config, &args).await,
    }
}
