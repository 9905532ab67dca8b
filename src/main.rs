//! Washlink - Car-Wash Fleet Backend
//!
//! Entry point. Architecture:
//!
//! ```text
//! ┌──────────┐    ┌───────────────┐    ┌──────────────┐
//! │ Devices  │───▶│ Event         │───▶│ Store        │
//! │ (HTTP cb)│    │ Processor     │    │ (Postgres /  │
//! └──────────┘    └───────────────┘    │  in-memory)  │
//! ┌──────────┐    ┌───────────────┐    │              │
//! │ Clients  │───▶│ Order         │───▶│              │
//! │ (HTTP)   │    │ Lifecycle Mgr │    └──────────────┘
//! └──────────┘    └───────┬───────┘           ▲
//!                         ▼                   │
//!                  Ephemeral TTL cache ───────┘  (best-effort mirror)
//! ```

use std::sync::Arc;

use washlink::cache::MemoryCache;
use washlink::config::AppConfig;
use washlink::gateway::{self, AppState};
use washlink::store::Store;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

fn main() {
    let env = get_env();
    let app_config = AppConfig::load(&env);
    let _log_guard = washlink::logging::init_logging(&app_config);

    tracing::info!("Starting Washlink in {} mode", env);

    let port = get_port_override().unwrap_or(app_config.gateway.port);
    let host = app_config.gateway.host.clone();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let store: Arc<dyn Store> = match &app_config.postgres_url {
            Some(url) => {
                tracing::info!("Connecting to PostgreSQL...");
                match washlink::store::PgStore::connect(url).await {
                    Ok(store) => {
                        tracing::info!("PostgreSQL connected, schema ensured");
                        Arc::new(store)
                    }
                    Err(e) => {
                        eprintln!("FATAL: Failed to connect to PostgreSQL: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            None => mem_store_fallback(),
        };

        let cache = Arc::new(MemoryCache::new());
        let state = AppState::new(store, cache);

        gateway::run_server(state, &host, port).await;
    });
}

/// [SECURITY] In-memory store with demo seed data - only compiled when the
/// 'mem-store' feature is enabled. Production builds MUST set postgres_url
/// and be compiled with `--no-default-features`.
#[cfg(feature = "mem-store")]
fn mem_store_fallback() -> Arc<dyn Store> {
    tracing::warn!("No postgres_url configured - using in-memory store with demo data");
    let store = washlink::store::MemStore::new();
    let user = store.seed_user("demo", 10_000);
    let device = store.seed_device("CW-DEMO-01", "demo bay");
    tracing::info!(
        user_id = user.id,
        devid = %device.devid,
        "Seeded demo user and device"
    );
    Arc::new(store)
}

#[cfg(not(feature = "mem-store"))]
fn mem_store_fallback() -> Arc<dyn Store> {
    eprintln!("FATAL: postgres_url is required (built without mem-store)");
    std::process::exit(1);
}
