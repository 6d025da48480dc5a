use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use govnews::config::Config;
use govnews::context::AppContext;

mod commands;

#[derive(Parser)]
#[command(
    name = "govnews",
    version,
    about = "Country data pipeline: statistics, news, conflicts and humanitarian feeds",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file; the environment is used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the country table
    Countries {
        /// Print as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Load the full dashboard of a country
    Country {
        /// Country name or ISO code (Turkish or English)
        name: String,

        /// Skip the generative-AI overview
        #[arg(long, default_value = "false")]
        no_summary: bool,

        /// Print as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// World Bank indicators of a country
    Worldbank {
        name: String,
    },

    /// Recent news articles about a country
    News {
        name: String,
    },

    /// Conflict events of a country
    Conflicts {
        name: String,

        /// Number of events to print
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Factbook profile of a country
    Factbook {
        name: String,
    },

    /// Ask the generative-AI service a question
    Ask {
        prompt: String,
    },

    /// Probe every source and print service status
    Status {
        /// Country used for probing
        #[arg(long, default_value = "TUR")]
        country: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    govnews::i18n::init_from_env();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::from_env().context("Failed to read configuration from environment")?,
    };

    // Initialize tracing/logging
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    config
        .validate_for_startup()
        .context("Invalid configuration")?;

    tracing::info!("govnews starting");
    let ctx = AppContext::new(config).context("Failed to initialize application context")?;

    match cli.command {
        Commands::Countries { json } => {
            commands::countries(&ctx, json)?;
        }

        Commands::Country {
            name,
            no_summary,
            json,
        } => {
            tracing::info!(name = %name, no_summary = %no_summary, "Starting country command");
            commands::country(&ctx, &name, !no_summary, json).await?;
        }

        Commands::Worldbank { name } => {
            commands::worldbank(&ctx, &name).await?;
        }

        Commands::News { name } => {
            commands::news(&ctx, &name).await?;
        }

        Commands::Conflicts { name, limit } => {
            commands::conflicts(&ctx, &name, limit).await?;
        }

        Commands::Factbook { name } => {
            commands::factbook(&ctx, &name).await?;
        }

        Commands::Ask { prompt } => {
            commands::ask(&ctx, &prompt).await?;
        }

        Commands::Status { country } => {
            tracing::info!(country = %country, "Starting status command");
            commands::status(&ctx, &country).await?;
        }
    }

    tracing::info!("govnews completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("govnews=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("govnews={level},warn"))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
