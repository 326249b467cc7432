use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::auth::AuthProvider;
use crate::storage::Store;

pub mod routes;

/// Server state
///
/// The store handle is not thread-safe, so every request goes through the
/// mutex; that is the only serialization the store gets.
pub struct AppState {
    pub store: Arc<Mutex<Store>>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(store: Store, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            auth,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rpc/{name}", post(routes::call_rpc))
        .route("/status", get(routes::get_status))
        .route("/auth/session", get(routes::get_session))
        .route("/auth/user", get(routes::get_user))
        .route("/auth/signout", post(routes::sign_out))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = router(Arc::new(state));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
