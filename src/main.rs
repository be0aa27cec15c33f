use chrono::Local;
use clap::Parser;
use receipt_analytics::args::{Args, Command};
use receipt_analytics::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().receipts_home().path();
    let today = Local::now().date_naive();

    match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.plan()).await?.print(),

        Command::Import(import_args) => {
            let config = Config::load(home).await?;
            commands::import(config, import_args.clone()).await?.print()
        }

        Command::List(list_args) => {
            let config = Config::load(home).await?;
            commands::list(config, list_args.clone()).await?.print()
        }

        Command::Show(show_args) => {
            let config = Config::load(home).await?;
            commands::show(config, show_args.clone()).await?.print()
        }

        Command::Update(update_args) => {
            let config = Config::load(home).await?;
            commands::update(config, update_args.clone()).await?.print()
        }

        Command::Delete(delete_args) => {
            let config = Config::load(home).await?;
            commands::delete(config, delete_args.clone()).await?.print()
        }

        Command::Stats => commands::stats(Config::load(home).await?, today)
            .await?
            .print(),

        Command::Usage => commands::usage(Config::load(home).await?, today)
            .await?
            .print(),

        Command::Analytics(analytics_args) => {
            let config = Config::load(home).await?;
            commands::analytics(config, analytics_args.clone(), today)
                .await?
                .print()
        }

        Command::Export(export_args) => {
            let config = Config::load(home).await?;
            commands::export(config, export_args.clone(), today)
                .await?
                .print()
        }
    }
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for the library and this binary only.
            EnvFilter::new(format!(
                "receipt_analytics={level},{}={level}",
                env!("CARGO_CRATE_NAME")
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
