//! User network use-case service.
//!
//! # Responsibility
//! - Validate and normalize user input above the repository layer.
//! - Annotate records with popularity scores via the score calculator.
//! - Expose graph and hobby-catalog projections.
//!
//! # Invariants
//! - Scores are always computed from one consistent repository read.
//! - Self-links are rejected before any lookup happens.
//! - Service APIs never bypass repository transactions for graph mutations.

use crate::model::user::{
    normalize_hobby, normalize_username, NewUser, ScoredUser, User, UserId, UserPatch,
    UserValidationError,
};
use crate::repo::user_repo::{RepoError, UserRepository, UserSnapshot};
use crate::service::projection::{hobby_catalog, project, GraphView};
use crate::service::score::{popularity_score, HobbyLookup};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Coarse error classification shared by every outer surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input shape or range; caller can correct it.
    Validation,
    /// Referenced user is absent.
    NotFound,
    /// Operation would break a graph invariant.
    Conflict,
    /// Unexpected storage failure.
    Internal,
}

/// Errors from user service operations.
#[derive(Debug)]
pub enum UserServiceError {
    /// Field-level input validation failed.
    Validation(UserValidationError),
    /// Target user does not exist.
    UserNotFound(UserId),
    /// Link source and target are the same user.
    SelfLink(UserId),
    /// Pair is already linked.
    AlreadyLinked { user: UserId, friend: UserId },
    /// Delete refused: user still lists friends.
    HasFriends { user: UserId, friend_count: usize },
    /// Delete refused: another user still lists this user.
    ReferencedBy { user: UserId, referrer: UserId },
    /// Repository-level failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl UserServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::SelfLink(_)
            | Self::AlreadyLinked { .. }
            | Self::HasFriends { .. }
            | Self::ReferencedBy { .. } => ErrorKind::Conflict,
            Self::Repo(_) | Self::InconsistentState(_) => ErrorKind::Internal,
        }
    }
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UserNotFound(_) => write!(f, "User not found"),
            Self::SelfLink(_) => write!(f, "Cannot link user to themselves"),
            Self::AlreadyLinked { .. } => write!(f, "Users are already friends"),
            Self::HasFriends { .. } => write!(
                f,
                "Cannot delete user with active friendships. Please unlink all friends first."
            ),
            Self::ReferencedBy { .. } => write!(
                f,
                "Cannot delete user who is friends with others. Please unlink all friendships first."
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent user state: {details}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for UserServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::UserNotFound(id),
            RepoError::SelfLink(id) => Self::SelfLink(id),
            RepoError::AlreadyLinked { user, friend } => Self::AlreadyLinked { user, friend },
            RepoError::HasFriends { user, friend_count } => {
                Self::HasFriends { user, friend_count }
            }
            RepoError::ReferencedBy { user, referrer } => Self::ReferencedBy { user, referrer },
            other => Self::Repo(other),
        }
    }
}

impl From<UserValidationError> for UserServiceError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type ServiceResult<T> = Result<T, UserServiceError>;

/// Acknowledgement returned by mutations that have no record to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// User network service facade over repository implementations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one user with no friends.
    pub fn create_user(&self, input: NewUser) -> ServiceResult<ScoredUser> {
        let user = User::new(
            normalize_username(&input.username)?,
            input.age,
            normalize_hobbies(input.hobbies)?,
        );
        user.validate()?;

        let id = self.repo.create_user(&user)?;
        info!("event=user_create module=service status=ok user_id={id}");
        self.scored(id)?
            .ok_or(UserServiceError::InconsistentState(
                "created user not found in read-back",
            ))
    }

    /// Lists every user with its popularity score.
    ///
    /// Order is `created_at ASC, id ASC`.
    pub fn list_users(&self) -> ServiceResult<Vec<ScoredUser>> {
        let snapshot = self.repo.load_snapshot()?;
        Ok(score_snapshot(&snapshot))
    }

    /// Gets one user with its popularity score.
    pub fn get_user(&self, id: UserId) -> ServiceResult<ScoredUser> {
        self.scored(id)?.ok_or(UserServiceError::UserNotFound(id))
    }

    /// Applies only the provided fields.
    ///
    /// An empty patch returns the current record unchanged.
    pub fn update_user(&self, id: UserId, patch: UserPatch) -> ServiceResult<ScoredUser> {
        if patch.is_empty() {
            return self.get_user(id);
        }

        let patch = UserPatch {
            username: patch
                .username
                .map(|value| normalize_username(&value))
                .transpose()?,
            age: patch.age,
            hobbies: patch.hobbies.map(normalize_hobbies).transpose()?,
        };
        self.repo.update_user(id, &patch)?;
        info!("event=user_update module=service status=ok user_id={id}");
        self.get_user(id)
    }

    /// Appends one hobby unless the user already lists it.
    pub fn add_hobby(&self, id: UserId, hobby: &str) -> ServiceResult<ScoredUser> {
        let hobby = normalize_hobby(hobby)?;
        let added = self.repo.append_hobby(id, hobby.as_str())?;
        info!("event=user_add_hobby module=service status=ok user_id={id} added={added}");
        self.get_user(id)
    }

    /// Deletes one user that has no friendships on either side.
    pub fn delete_user(&self, id: UserId) -> ServiceResult<Ack> {
        self.repo.delete_user(id).map_err(|err| {
            warn!("event=user_delete module=service status=error user_id={id} error={err}");
            UserServiceError::from(err)
        })?;
        info!("event=user_delete module=service status=ok user_id={id}");
        Ok(Ack::new("User deleted successfully"))
    }

    /// Creates a mutual friendship between two distinct users.
    pub fn link_users(&self, user: UserId, friend: UserId) -> ServiceResult<Ack> {
        if user == friend {
            return Err(UserServiceError::SelfLink(user));
        }
        self.repo.link_users(user, friend)?;
        info!("event=user_link module=service status=ok user_id={user} friend_id={friend}");
        Ok(Ack::new("Users linked successfully"))
    }

    /// Removes a mutual friendship. Unlinking an absent edge succeeds.
    pub fn unlink_users(&self, user: UserId, friend: UserId) -> ServiceResult<Ack> {
        self.repo.unlink_users(user, friend)?;
        info!("event=user_unlink module=service status=ok user_id={user} friend_id={friend}");
        Ok(Ack::new("Users unlinked successfully"))
    }

    /// Builds the node/edge view of the whole network.
    pub fn graph(&self) -> ServiceResult<GraphView> {
        let users = self.list_users()?;
        Ok(project(&users))
    }

    /// Lists distinct hobbies, optionally filtered by substring.
    pub fn hobbies(&self, query: Option<&str>) -> ServiceResult<Vec<String>> {
        let snapshot = self.repo.load_snapshot()?;
        Ok(hobby_catalog(snapshot.users(), query))
    }

    fn scored(&self, id: UserId) -> ServiceResult<Option<ScoredUser>> {
        let Some(neighborhood) = self.repo.get_neighborhood(id)? else {
            return Ok(None);
        };
        Ok(Some(score_user(neighborhood.user, &neighborhood.friends)))
    }
}

fn score_snapshot(snapshot: &UserSnapshot) -> Vec<ScoredUser> {
    snapshot
        .users()
        .iter()
        .map(|user| score_user(user.clone(), snapshot))
        .collect()
}

fn score_user(user: User, lookup: &impl HobbyLookup) -> ScoredUser {
    let popularity_score = popularity_score(&user, lookup);
    ScoredUser {
        user,
        popularity_score,
    }
}

fn normalize_hobbies(hobbies: Vec<String>) -> Result<Vec<String>, UserValidationError> {
    if hobbies.is_empty() {
        return Err(UserValidationError::EmptyHobbies);
    }
    hobbies.iter().map(|hobby| normalize_hobby(hobby)).collect()
}
