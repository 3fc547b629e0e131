//! `TaskDesk` reference server.
//!
//! Serves the task-management REST API from memory. Data is lost on exit.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8080
//! cargo run --bin taskdesk-server
//!
//! # Seed an administrator and bind elsewhere
//! TASKDESK_ADMIN_EMAIL=admin@example.com TASKDESK_ADMIN_PASSWORD=admin \
//!     cargo run --bin taskdesk-server -- --bind 127.0.0.1:9090
//! ```

use std::sync::Arc;

use clap::Parser;
use taskdesk_server::config::{ServerCliArgs, ServerConfig};
use taskdesk_server::server::{self, AppState};
use taskdesk_server::store::TaskStore;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = match &config.seed_admin {
        Some((email, password)) => match TaskStore::with_admin(email, password) {
            Ok(store) => {
                tracing::info!(%email, "seeded administrator");
                store
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to seed administrator");
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("no administrator seeded");
            TaskStore::new()
        }
    };
    let state = Arc::new(AppState::with_config(config.max_upload_size, store));

    tracing::info!(addr = %config.bind_addr, "starting taskdesk server");

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "taskdesk server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
