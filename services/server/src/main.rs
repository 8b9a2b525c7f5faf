use server::db::Store;
use server::state::AppState;
use std::env;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let db_path =
        env::var("DATABASE_PATH").unwrap_or_else(|_| "/var/lib/simbridge/server.sqlite3".to_owned());
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());

    info!(path = %db_path, "opening store");
    let store = match Store::open(Path::new(&db_path)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("FATAL: failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(store);
    let router = server::build_router(state);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("FATAL: failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };
    info!(addr = %bind_addr, "server listening");
    if let Err(e) = axum::serve(listener, router).await {
        eprintln!("FATAL: server error: {}", e);
        std::process::exit(1);
    }
}
