//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `User::validate()` before persistence.
//! - Friendship guards are checked inside the same transaction that mutates.
//! - Repository APIs return semantic errors (`NotFound`, `AlreadyLinked`, ...)
//!   in addition to DB transport errors.

pub mod user_repo;
