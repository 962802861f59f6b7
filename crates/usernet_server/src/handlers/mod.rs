//! Route handlers.

pub mod health;
pub mod users;

use crate::error::ApiError;

/// Fallback for unknown routes.
pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
