use std::sync::Arc;

use lectern_api::app::{self, AppState};
use lectern_auth::AuthConfig;
use lectern_store::{MemoryStore, PgStore};

#[tokio::main]
async fn main() {
    lectern_observability::init();

    let config = AuthConfig::from_env();
    let sink = lectern_email::from_env();

    let state = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PgStore::connect(&url)
                .await
                .expect("failed to connect to postgres");
            store
                .ensure_schema()
                .await
                .expect("failed to apply database schema");
            AppState::new(&config, Arc::new(store), sink)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using volatile in-memory store");
            AppState::new(&config, Arc::new(MemoryStore::new()), sink)
        }
    };

    let app = app::build_app(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("failed to bind listener");

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
