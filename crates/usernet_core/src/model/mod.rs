//! Domain model for the user network.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep field-level validation next to the data it guards.
//!
//! # Invariants
//! - Every user is identified by a stable `UserId`.
//! - Graph-level invariants (symmetry, no duplicates) live in the store.

pub mod user;
