//! User domain model.
//!
//! # Responsibility
//! - Define the canonical user record and its scored read model.
//! - Validate field shapes before any persistence or graph mutation.
//!
//! # Invariants
//! - `id` is stable and never reused for another user.
//! - `created_at` is assigned once and never changes.
//! - `friends` never contains `id` itself and never repeats an entry.
//! - `age >= 1`, `username` is non-blank, `hobbies` is non-empty.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for every user record.
pub type UserId = Uuid;

/// Smallest accepted age.
pub const MIN_AGE: i64 = 1;

/// Field-level validation failures for user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// Username is empty after trimming.
    BlankUsername,
    /// Age is below [`MIN_AGE`].
    AgeOutOfRange(i64),
    /// Hobby list has no entries.
    EmptyHobbies,
    /// One hobby entry is empty after trimming.
    BlankHobby,
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankUsername => write!(f, "username must not be blank"),
            Self::AgeOutOfRange(age) => {
                write!(f, "age must be a positive number, got {age}")
            }
            Self::EmptyHobbies => write!(f, "hobbies must contain at least one entry"),
            Self::BlankHobby => write!(f, "hobby must not be blank"),
        }
    }
}

impl Error for UserValidationError {}

/// Canonical user record.
///
/// Serialized with camelCase keys to match the JSON shape clients consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub age: i64,
    /// Ordered, not deduplicated.
    pub hobbies: Vec<String>,
    /// Ordered friend ids. Mirrored on each friend's record.
    pub friends: Vec<UserId>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl User {
    /// Creates a new user with a generated id, current timestamp and no friends.
    ///
    /// Does not validate; call [`User::validate`] before persisting.
    pub fn new(username: impl Into<String>, age: i64, hobbies: Vec<String>) -> Self {
        Self::with_id(Uuid::new_v4(), username, age, hobbies)
    }

    /// Creates a new user with a caller-provided id.
    ///
    /// Used by import paths and tests that need deterministic ids.
    pub fn with_id(id: UserId, username: impl Into<String>, age: i64, hobbies: Vec<String>) -> Self {
        Self {
            id,
            username: username.into(),
            age,
            hobbies,
            friends: Vec::new(),
            created_at: now_epoch_ms(),
        }
    }

    /// Checks field-level invariants.
    ///
    /// Friend-list invariants are graph-level and enforced by the store.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        validate_username(&self.username)?;
        validate_age(self.age)?;
        validate_hobbies(&self.hobbies)
    }
}

/// User record annotated with its derived popularity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredUser {
    #[serde(flatten)]
    pub user: User,
    pub popularity_score: f64,
}

/// Creation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub age: i64,
    pub hobbies: Vec<String>,
}

/// Partial update input. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub age: Option<i64>,
    pub hobbies: Option<Vec<String>>,
}

impl UserPatch {
    /// Returns whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.age.is_none() && self.hobbies.is_none()
    }

    /// Applies provided fields onto `user`.
    pub fn apply_to(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(age) = self.age {
            user.age = age;
        }
        if let Some(hobbies) = self.hobbies {
            user.hobbies = hobbies;
        }
    }
}

/// Trims a username and rejects blank values.
pub fn normalize_username(value: &str) -> Result<String, UserValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(UserValidationError::BlankUsername);
    }
    Ok(trimmed.to_string())
}

/// Trims one hobby entry and rejects blank values.
pub fn normalize_hobby(value: &str) -> Result<String, UserValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(UserValidationError::BlankHobby);
    }
    Ok(trimmed.to_string())
}

fn validate_username(value: &str) -> Result<(), UserValidationError> {
    if value.trim().is_empty() {
        return Err(UserValidationError::BlankUsername);
    }
    Ok(())
}

fn validate_age(age: i64) -> Result<(), UserValidationError> {
    if age < MIN_AGE {
        return Err(UserValidationError::AgeOutOfRange(age));
    }
    Ok(())
}

fn validate_hobbies(hobbies: &[String]) -> Result<(), UserValidationError> {
    if hobbies.is_empty() {
        return Err(UserValidationError::EmptyHobbies);
    }
    if hobbies.iter().any(|hobby| hobby.trim().is_empty()) {
        return Err(UserValidationError::BlankHobby);
    }
    Ok(())
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
