//! Access Surface
//!
//! Prints the access surface of one actor against a configured registry.

use access_surface::{
    config::{LogFormat, build_registry, load_config},
    isolation::{AccessRequest, Actor},
    service::AccessService,
    storage::{MemoryStore, SharedStorage},
};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Access Surface - compute what an actor may do across collections and globals
#[derive(Parser, Debug)]
#[command(name = "access-surface")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "ACCESS_SURFACE_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ACCESS_SURFACE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Actor id (omit with --anonymous)
    #[arg(long, default_value = "cli")]
    actor_id: String,

    /// Auth collection the actor belongs to
    #[arg(long, default_value = "users")]
    actor_collection: String,

    /// Actor role (repeatable)
    #[arg(long = "role")]
    roles: Vec<String>,

    /// Resolve for an unauthenticated request
    #[arg(long)]
    anonymous: bool,

    /// JSON file with committed documents: { "<collection>": { "<id>": { ... } } }
    #[arg(long)]
    seed: Option<String>,

    /// Print compact JSON instead of pretty JSON
    #[arg(long)]
    compact: bool,
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }
}

fn load_storage(seed: Option<&str>) -> anyhow::Result<SharedStorage> {
    let store = match seed {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let value: serde_json::Value = serde_json::from_str(&raw)?;
            MemoryStore::from_json(value)?
        }
        None => MemoryStore::new(),
    };
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration before logging so its format and level apply
    let config = load_config(args.config.as_deref());
    let (level, format) = match &config {
        Ok(c) => (
            args.log_level.clone().unwrap_or_else(|| c.logging.level.clone()),
            c.logging.format,
        ),
        Err(_) => (
            args.log_level.clone().unwrap_or_else(|| "info".to_string()),
            LogFormat::Pretty,
        ),
    };
    init_logging(&level, format);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting access-surface");

    let config = config.inspect_err(|e| error!(error = %e, "Failed to load configuration"))?;

    let registry = Arc::new(
        build_registry(&config).inspect_err(|e| error!(error = %e, "Failed to build registry"))?,
    );
    info!(
        collections = registry.collections().len(),
        globals = registry.globals().len(),
        "Registry loaded"
    );

    let storage = load_storage(args.seed.as_deref())
        .inspect_err(|e| error!(error = %e, "Failed to load seed documents"))?;

    let service = AccessService::new(registry, storage, &config.access);

    let request = if args.anonymous {
        AccessRequest::anonymous()
    } else {
        let actor = args
            .roles
            .iter()
            .fold(Actor::new(&args.actor_id, &args.actor_collection), |actor, role| {
                actor.with_role(role)
            });
        AccessRequest::for_actor(actor)
    };

    // Abandon the computation on Ctrl-C
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling access computation");
            signal_token.cancel();
        }
    });

    let response = service
        .resolve_with_cancel(&request, &cancel)
        .await
        .inspect_err(|e| error!(error = %e, "Access computation failed"))?;

    let output = if args.compact {
        serde_json::to_string(&response)?
    } else {
        serde_json::to_string_pretty(&response)?
    };
    println!("{}", output);

    Ok(())
}
