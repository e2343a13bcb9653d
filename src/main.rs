use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use cyoa::client::{self, PlayOutcome};
use cyoa::config::{parse_origins, Settings};
use cyoa::database::get_database_url;
use cyoa::server;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[clap(long)]
        host: Option<String>,
        #[clap(short, long)]
        port: Option<u16>,
        /// SQLite file or full database URL; overrides DATABASE_URL
        #[clap(short, long)]
        database: Option<String>,
        /// Comma separated origins; overrides ALLOWED_ORIGINS
        #[clap(long)]
        cors_origin: Option<String>,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    /// Request a story from a running server and play it in the terminal
    Play {
        #[clap(short, long)]
        theme: String,
        #[clap(short, long, default_value = "http://localhost:8000")]
        server: String,
        #[clap(long, default_value = "/api")]
        api_prefix: String,
        #[clap(long, default_value_t = client::DEFAULT_POLL_INTERVAL.as_secs())]
        poll_secs: u64,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
        #[clap(short, long)]
        database: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    match args.command {
        Commands::Serve {
            host,
            port,
            database,
            cors_origin,
        } => {
            let mut settings = load_settings(database.as_deref())?;
            setup_logging(&args.log_level, settings.debug);
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(origins) = cors_origin {
                settings.allowed_origins = parse_origins(&origins);
            }
            info!("Starting server on {}:{}", settings.host, settings.port);
            server::start_server(settings).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Migrate {
                direction,
                database,
            } => {
                let settings = load_settings(database.as_deref())?;
                setup_logging(&args.log_level, settings.debug);
                info!("Running database migration: {:?}", direction);
                server::migrate_database(&settings.database_url, direction).await?;
            }
        },
        Commands::Play {
            theme,
            server,
            api_prefix,
            poll_secs,
        } => {
            setup_logging(&args.log_level, false);
            let outcome =
                client::run_play(&server, &api_prefix, &theme, Duration::from_secs(poll_secs))
                    .await?;
            info!("Story finished: {:?}", outcome);
            if outcome == PlayOutcome::DeadEnd {
                info!("The story contained an option without a destination");
            }
        }
    }

    Ok(())
}

/// Reads the environment, letting `--database` stand in for DATABASE_URL.
fn load_settings(database: Option<&str>) -> Result<Settings> {
    let overrides: Vec<(&str, String)> = database
        .map(|database| vec![("DATABASE_URL", get_database_url(Some(database)))])
        .unwrap_or_default();
    Settings::from_env_with(&overrides)
}

fn setup_logging(log_level: &Option<String>, debug: bool) {
    let filter = match (log_level, std::env::var("RUST_LOG")) {
        (None, Ok(rust_log)) if !rust_log.is_empty() => EnvFilter::new(rust_log),
        _ => {
            let default_level = if debug { "debug" } else { "info" };
            let log_level = match log_level
                .as_deref()
                .unwrap_or(default_level)
                .to_lowercase()
                .as_str()
            {
                "trace" => Level::TRACE,
                "debug" => Level::DEBUG,
                "info" => Level::INFO,
                "warn" => Level::WARN,
                "error" => Level::ERROR,
                _ => Level::INFO,
            };
            EnvFilter::new(format!("sqlx=warn,hyper=warn,{}", log_level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
