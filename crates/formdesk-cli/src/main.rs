use anyhow::Result;
use clap::{Parser, Subcommand};
use formdesk_execution::{LoggingOptions, init_tracing};
use formdesk_infrastructure::{ConfigService, FormdeskPaths};
use std::path::PathBuf;

mod commands;

use commands::forms::{SearchBy, StatusArg};

#[derive(Parser)]
#[command(name = "formdesk")]
#[command(about = "formdesk - form-collection bot administration", long_about = None)]
struct Cli {
    /// Use this directory for config and data instead of the platform defaults
    #[arg(long, global = true, env = "FORMDESK_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show aggregate form statistics
    Stats,
    /// Search forms by a case-insensitive substring
    Search {
        #[arg(long, value_enum, default_value = "name")]
        by: SearchBy,
        query: String,
    },
    /// Set the status of a user's form
    Mark {
        user_id: i64,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// List transferred forms created in the last N days
    Transferred {
        #[arg(long, default_value_t = 30)]
        days: i64,
        /// Print only the count
        #[arg(long)]
        count: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config file if it does not exist
    Init,
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let service = ConfigService::with_paths(FormdeskPaths::new(cli.config_dir));

    if let Commands::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => commands::config::init(&service),
            ConfigAction::Show => commands::config::show(&service),
            ConfigAction::Path => commands::config::path(&service),
        };
    }

    let config = service.try_get_config()?;
    let log_dir = service.log_dir(&config)?;
    let _guard = init_tracing(
        LoggingOptions::new(config.logging.level.clone())
            .with_log_dir(log_dir)
            .with_file_prefix("formdesk-cli"),
    )?;

    let repository = commands::forms::open_repository(&service, &config)?;
    match cli.command {
        Commands::Stats => commands::forms::stats(&repository).await?,
        Commands::Search { by, query } => commands::forms::search(&repository, by, &query).await?,
        Commands::Mark { user_id, status } => {
            commands::forms::mark(&repository, user_id, status).await?
        }
        Commands::Transferred { days, count } => {
            commands::forms::transferred(&repository, days, count).await?
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
