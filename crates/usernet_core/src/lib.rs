//! Core domain logic for the user network.
//! This crate is the single source of truth for graph invariants and scoring.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{
    default_log_level, init_console_logging, init_logging, logging_status, LogTarget,
};
pub use model::user::{NewUser, ScoredUser, User, UserId, UserPatch, UserValidationError};
pub use repo::user_repo::{
    RepoError, RepoResult, SqliteUserRepository, UserNeighborhood, UserRepository, UserSnapshot,
};
pub use service::projection::{GraphEdge, GraphNode, GraphView, ScoreTier};
pub use service::score::{popularity_score, HobbyLookup};
pub use service::user_service::{Ack, ErrorKind, ServiceResult, UserService, UserServiceError};

/// Returns the core crate version, reported by the health endpoint.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
