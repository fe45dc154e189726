//! REST backend for task documents.
//!
//! All routes live under `/api/tasks` and require a bearer token:
//!
//! - `GET /api/tasks` lists the caller's tasks, filtered by `category`, `status` and `search`
//! - `POST /api/tasks` creates a task
//! - `GET /api/tasks/summary` counts total, completed and pending tasks
//! - `PUT /api/tasks/{id}` applies a partial update
//! - `DELETE /api/tasks/{id}` removes a task

pub mod auth;
pub mod error;
pub mod repository;
pub mod routes;
pub mod validation;

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, put};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use error::ApiError;
pub use repository::TaskRepository;

#[derive(Clone)]
pub struct ApiState {
    pub repo: TaskRepository,
    /// Bearer token -> user id.
    pub tokens: Arc<BTreeMap<String, String>>,
}

impl ApiState {
    pub fn new(repo: TaskRepository, tokens: BTreeMap<String, String>) -> Self {
        Self {
            repo,
            tokens: Arc::new(tokens),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/tasks",
            get(routes::list_tasks).post(routes::create_task),
        )
        .route(
            "/api/tasks/summary",
            get(routes::task_summary)
                .put(routes::update_summary_path)
                .delete(routes::delete_summary_path),
        )
        .route(
            "/api/tasks/{id}",
            put(routes::update_task).delete(routes::delete_task),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_user,
        ))
        .with_state(state)
}

/// Serves on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("task API listening on {addr}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Binds `addr` and serves in a background task, returning the bound address.
pub async fn start_server(
    addr: &str,
    state: ApiState,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(err) = serve(listener, state, std::future::pending()).await {
            log::error!("task API server error: {err}");
        }
    });
    Ok((bound, handle))
}
