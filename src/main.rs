use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "ghostflow")]
#[command(
    version,
    about = "Human-assisted ghost-writing: relay directives between a planning and an executing AI"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./ghostflow.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full writing session
    Run(RunArgs),
    /// Run the response extractor on a saved planning response
    Extract {
        /// File holding the raw response text
        file: PathBuf,

        /// Only print the step count
        #[arg(long)]
        steps_only: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct RunArgs {
    /// Problem setting text
    #[arg(long, conflicts_with = "problem_file")]
    pub problem: Option<String>,

    /// Read the problem setting from a file
    #[arg(long)]
    pub problem_file: Option<PathBuf>,

    /// Solution hints text
    #[arg(long)]
    pub hints: Option<String>,

    /// Total step count; skips detection from the intro response
    #[arg(long)]
    pub steps: Option<u32>,

    /// Output root for session folders
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Seconds to poll for a response before giving up on a scrape
    #[arg(long)]
    pub response_timeout: Option<u64>,

    /// Skip the login confirmation before the first phase
    #[arg(long)]
    pub no_login_wait: bool,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default ghostflow.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match &cli.command {
        // logging starts once the session directory exists
        Commands::Run(args) => cmd::cmd_run(&cli, args).await?,
        Commands::Extract { file, steps_only } => {
            ghostflow::logging::init(cli.verbose, None)?;
            cmd::cmd_extract(&cli, file, *steps_only)?;
        }
        Commands::Config { command } => {
            ghostflow::logging::init(cli.verbose, None)?;
            cmd::cmd_config(&cli, command.clone())?;
        }
    }

    Ok(())
}
