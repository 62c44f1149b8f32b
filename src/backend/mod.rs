mod handlers;
mod routes;

use axum::{
    routing::get,
    Router,
};
use sqlx::{Pool, Sqlite};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::notify::ReminderNotifier;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub notifier: Arc<dyn ReminderNotifier>,
}

pub async fn run_server(
    pool: Pool<Sqlite>,
    notifier: Arc<dyn ReminderNotifier>,
    port: u16,
) -> anyhow::Result<()> {
    let state = AppState { db: pool, notifier };

    let app = Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
