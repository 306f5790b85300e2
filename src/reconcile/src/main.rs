//! manage-roles - synchronize user roles in Azure App Configuration
//!
//! Reads a JSON list of `{ "name", "role" }` records and writes each user's
//! role to `users:<email>:roles`, optionally removing users not in the list.
//!
//! Exit codes: 0 success, 1 some updates or removals failed, 2 input file
//! not found, 3 input file not valid JSON, 4 reconciliation failed,
//! 10 unexpected error.
//!
//! The input file is read and parsed before the store settings are looked
//! at, so a missing file reports 2 even when no store is configured. Missing
//! store settings with a valid file report 4.

use clap::{Parser, ValueEnum};
use rolegate_appconfig::{ClientOptions, StoreSettings};
use rolegate_reconcile::{
    exit, load_desired_state, ReconcileError, ReconcileOptions, Reconciler, DEFAULT_BATCH_SIZE,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

/// Manage user roles in Azure App Configuration
#[derive(Parser)]
#[command(name = "manage-roles")]
#[command(about = "Manage user roles in Azure App Configuration")]
#[command(version)]
struct Cli {
    /// Path to users JSON file
    #[arg(long)]
    file: PathBuf,

    /// Azure App Configuration connection string
    #[arg(long, env = "AZURE_APPCONFIG_CONNECTION_STRING", hide_env_values = true)]
    connection_string: Option<String>,

    /// Azure App Configuration endpoint URL
    #[arg(long, env = "AZURE_APPCONFIG_ENDPOINT")]
    endpoint: Option<String>,

    /// Remove roles for users not in the input file
    #[arg(long)]
    remove_missing: bool,

    /// Number of users to process in each batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Log level used when RUST_LOG is not set
    #[arg(long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

async fn run(cli: Cli) -> i32 {
    info!("Starting role assignment process for {}", cli.file.display());

    // The input must be valid before anything talks to the store
    let users = match load_desired_state(&cli.file) {
        Ok(users) => users,
        Err(e) => {
            error!("{}", e);
            return exit::for_input_error(&e);
        }
    };

    let options = ReconcileOptions {
        remove_missing: cli.remove_missing,
        batch_size: cli.batch_size,
        ..Default::default()
    };
    if let Err(e) = options.validate() {
        error!("{}", e);
        return exit::RECONCILE_FAILED;
    }

    let settings = StoreSettings::new(cli.connection_string, cli.endpoint);
    let client = match settings.connect(ClientOptions::default()).await {
        Ok(client) => client,
        Err(e) => {
            error!("{}", ReconcileError::from_connect(e));
            return exit::RECONCILE_FAILED;
        }
    };

    let reconciler = Reconciler::new(Arc::new(client));
    match reconciler.reconcile(&users, &options).await {
        Ok(metrics) => {
            metrics.log_summary(options.remove_missing);
            exit::for_metrics(&metrics)
        }
        Err(failure) => {
            info!(
                "Total execution time: {} seconds",
                failure.metrics.execution_time_seconds
            );
            exit::for_failure(&failure)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // HTTP client internals stay quiet unless RUST_LOG asks for them
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},hyper=warn,reqwest=warn", cli.log_level.directive()).into()
            }),
        )
        .with_target(true)
        .init();

    let code = run(cli).await;
    std::process::exit(code);
}
