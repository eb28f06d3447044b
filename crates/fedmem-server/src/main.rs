//! `fedmem-server` — reference HTTP/SSE transport and agent tool surface
//! (C8) for the federated memory service.
//!
//! Per spec §1 the transport, auth surface, and tool surface are external
//! collaborators whose *contracts* matter; this binary is a lightweight
//! reference implementation (no OAuth, no CORS policy engine, no admin
//! CLI), not a hardened production gateway.

mod error_response;
mod rpc;
mod sse;
mod state;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use dashmap::DashSet;
use fedmem_core::prelude::*;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use state::AppState;

/// Parsed CLI arguments. Mirrors the teacher's hand-rolled `parse_args`
/// shape (`--data-dir`, `--help`, `--version`) generalized with the two
/// flags an HTTP transport additionally needs.
struct Args {
    data_dir: Option<PathBuf>,
    host: String,
    port: u16,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut data_dir: Option<PathBuf> = None;
    let mut host = "127.0.0.1".to_string();
    let mut port: u16 = 8787;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!("fedmem-server v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("Federated long-term memory service — HTTP/SSE reference transport.");
                println!();
                println!("USAGE:");
                println!("    fedmem-server [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help              Print help information");
                println!("    -V, --version           Print version information");
                println!("    --data-dir <PATH>       Custom SQLite data directory ('-' for in-memory)");
                println!("    --host <HOST>           Bind host (default 127.0.0.1)");
                println!("    --port <PORT>           Bind port (default 8787)");
                println!();
                println!("ENVIRONMENT:");
                println!("    RUST_LOG                Log level filter (e.g. debug, info, warn)");
                println!("    FEDMEM_DATA_DIR         Same as --data-dir");
                println!("    FEDMEM_DEV_TOKEN        If set, a UUIDv4 token pre-registered for tenant \"dev\"");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("fedmem-server {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--data-dir" => {
                i += 1;
                data_dir = args.get(i).map(PathBuf::from);
            }
            "--host" => {
                i += 1;
                if let Some(v) = args.get(i) {
                    host = v.clone();
                }
            }
            "--port" => {
                i += 1;
                if let Some(v) = args.get(i).and_then(|v| v.parse().ok()) {
                    port = v;
                }
            }
            arg => {
                eprintln!("error: unknown argument '{}'", arg);
                eprintln!("Try 'fedmem-server --help' for more information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    Args { data_dir, host, port }
}

/// Wires every component from spec §2 into one running backend: opens the
/// reference SQLite store, registers the six built-in modules plus the two
/// domain-service modules, and constructs the CMI / write pipeline /
/// notifier / reconciliation job around shared handles to it.
fn build_backend(config: Config) -> AppState {
    let store = if config.data_dir.to_str() == Some("-") {
        SqliteVectorStore::open_in_memory()
    } else {
        std::fs::create_dir_all(&config.data_dir).ok();
        SqliteVectorStore::open(config.data_dir.join("fedmem.sqlite3"))
    }
    .unwrap_or_else(|e| {
        error!("failed to open vector store: {}", e);
        std::process::exit(1);
    });

    let cmi_table = Arc::new(store.cmi_table());
    let relationship_table = Arc::new(store.relationship_table());
    let cmi = Arc::new(Cmi::new(cmi_table, relationship_table, &config));

    let registry = Arc::new(ModuleRegistry::new(store));
    registry.register_builtins().unwrap_or_else(|e| {
        error!("failed to register built-in modules: {}", e);
        std::process::exit(1);
    });
    registry
        .register(fedmem_core::domain::project::module_config())
        .expect("projects module registration");
    registry
        .register(fedmem_core::domain::people::module_config())
        .expect("people module registration");

    let provider: Arc<dyn EmbeddingProvider> = Arc::new(DeterministicEmbeddingProvider::new(&config));
    let notifier = Arc::new(ChangeNotifier::new());
    let tenants: TenantDirectory = Arc::new(DashSet::new());

    let pipeline = Arc::new(WritePipeline::new(
        registry.clone(),
        cmi.clone(),
        provider.clone(),
        notifier.clone(),
        tenants.clone(),
        config.clone(),
    ));

    let reconciliation = Arc::new(ReconciliationJob::new(
        registry,
        cmi.clone(),
        provider,
        tenants,
        config.reconciliation_interval,
    ));
    reconciliation.spawn();
    cmi.spawn_access_counter_flush(config.access_count_batch_window);

    let in_memory_auth = InMemoryAuthenticator::default();
    if let Ok(token) = std::env::var("FEDMEM_DEV_TOKEN") {
        info!("registering FEDMEM_DEV_TOKEN for tenant \"dev\"");
        in_memory_auth.register_tenant(token, "dev");
    }
    let authenticator: Arc<dyn Authenticator> = Arc::new(in_memory_auth);

    let projects = Arc::new(ProjectService::new(pipeline.clone()));
    let people = Arc::new(PeopleService::new(pipeline.clone()));

    AppState {
        pipeline,
        projects,
        people,
        notifier,
        authenticator,
        config,
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(state::healthz))
        .route("/tools", get(rpc::list_tools))
        .route("/tools/{name}", post(rpc::invoke_tool))
        .route("/events", get(sse::subscribe))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    let args = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    info!("fedmem-server v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env();
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    let state = build_backend(config);
    let notifier = state.notifier.clone();
    let app = build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("fedmem-server listening on http://{}", addr);

    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received, notifying subscribers");
        notifier.shutdown();
        // Give SSE streams a moment to flush the terminal event before the
        // listener is torn down.
        tokio::time::sleep(Duration::from_millis(200)).await;
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        error!("server error: {}", e);
        std::process::exit(1);
    }

    info!("fedmem-server shut down");
}
