//! HTTP API over the user network core.
//!
//! # Responsibility
//! - Translate JSON requests into `UserService` calls.
//! - Map service errors to status codes with a `{"message"}` body.
//!
//! # Invariants
//! - Every store operation runs on the blocking pool while holding the
//!   single connection lock, so mutations are serialized.
//! - Handlers never expose internal error details to clients.

pub mod config;
pub mod error;
pub mod handlers;
pub mod types;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use error::ApiError;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use usernet_core::{ServiceResult, SqliteUserRepository, UserService};

/// Shared server state.
pub struct AppState {
    conn: Mutex<Connection>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wraps an opened and migrated connection.
    pub fn new(conn: Connection) -> SharedState {
        Arc::new(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Locks the connection, recovering it after a panicked operation.
    ///
    /// A panic mid-operation drops its open transaction, which rolls back,
    /// so the connection is left in a committed state.
    fn lock_connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            log::warn!("event=db_lock module=server status=recovered reason=poisoned");
            self.conn.clear_poison();
            poisoned.into_inner()
        })
    }
}

/// Runs one service operation against the shared connection.
pub async fn with_service<T, F>(state: &SharedState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: for<'c> FnOnce(&UserService<SqliteUserRepository<'c>>) -> ServiceResult<T>
        + Send
        + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || {
        let conn = state.lock_connection();
        let repo = SqliteUserRepository::try_new(&conn)
            .map_err(|err| ApiError::internal("repo_init", &err))?;
        op(&UserService::new(repo)).map_err(ApiError::from)
    })
    .await
    .map_err(|err| ApiError::internal("blocking_task", &err))?
}

/// Builds the full router without CORS; callers layer CORS on top.
pub fn build_router(state: SharedState) -> Router {
    use handlers::{health, users};

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/graph", get(users::graph))
        .route("/api/users/hobbies", get(users::hobbies))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/users/{id}/link", post(users::link_users))
        .route("/api/users/{id}/unlink", delete(users::unlink_users))
        .route("/api/users/{id}/hobbies", post(users::add_hobby))
        .fallback(handlers::route_not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_requests))
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    log::info!(
        "event=http_request module=server status={} method={method} path={path} elapsed_ms={}",
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

#[cfg(test)]
mod tests {
    use super::{with_service, AppState};
    use std::sync::Arc;
    use usernet_core::db::open_db_in_memory;
    use usernet_core::NewUser;

    #[tokio::test]
    async fn panicked_operation_does_not_wedge_the_connection() {
        let state = AppState::new(open_db_in_memory().unwrap());
        with_service(&state, |service| {
            service.create_user(NewUser {
                username: "kept".to_string(),
                age: 30,
                hobbies: vec!["chess".to_string()],
            })
        })
        .await
        .unwrap();

        let holder = Arc::clone(&state);
        let joined = std::thread::spawn(move || {
            let _guard = holder.conn.lock().unwrap();
            panic!("operation panicked while holding the connection");
        })
        .join();
        assert!(joined.is_err());
        assert!(state.conn.is_poisoned());

        let users = with_service(&state, |service| service.list_users())
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert!(!state.conn.is_poisoned());
    }
}
