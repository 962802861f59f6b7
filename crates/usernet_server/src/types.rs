//! Request bodies and their primitive shape checks.
//!
//! Shape checks (missing fields, wrong JSON types) happen here so the core
//! only ever sees well-typed input. Range checks stay in the core.

use crate::error::ApiError;
use serde::Deserialize;
use serde_json::Value;
use usernet_core::{NewUser, UserId, UserPatch};
use uuid::Uuid;

/// `POST /api/users` body. Fields stay loose so shape errors become 400s
/// with a readable message instead of a generic deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<Value>,
    pub age: Option<Value>,
    pub hobbies: Option<Value>,
}

impl CreateUserRequest {
    pub fn into_new_user(self) -> Result<NewUser, ApiError> {
        let (Some(username), Some(age), Some(hobbies)) = (self.username, self.age, self.hobbies)
        else {
            return Err(ApiError::bad_request(
                "Username, age, and hobbies are required",
            ));
        };

        let username = match username {
            Value::String(value) if !value.trim().is_empty() => value,
            _ => {
                return Err(ApiError::bad_request(
                    "Username, age, and hobbies are required",
                ))
            }
        };
        let age = parse_age(&age)?;
        let hobbies = parse_hobbies(hobbies)?;
        if hobbies.is_empty() {
            return Err(ApiError::bad_request("Hobbies must not be empty"));
        }

        Ok(NewUser {
            username,
            age,
            hobbies,
        })
    }
}

/// `PUT /api/users/{id}` body. Absent or `null` fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub age: Option<Value>,
    pub hobbies: Option<Value>,
}

impl UpdateUserRequest {
    pub fn into_patch(self) -> Result<UserPatch, ApiError> {
        let age = match self.age {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_age(&value)?),
        };
        let hobbies = match self.hobbies {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_hobbies(value)?),
        };
        Ok(UserPatch {
            username: self.username,
            age,
            hobbies,
        })
    }
}

/// `POST /link` and `DELETE /unlink` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub friend_id: Option<String>,
}

impl FriendRequest {
    pub fn friend_id(&self) -> Result<UserId, ApiError> {
        match self.friend_id.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => parse_user_id(value),
            _ => Err(ApiError::bad_request("Friend ID is required")),
        }
    }
}

/// `POST /api/users/{id}/hobbies` body.
#[derive(Debug, Default, Deserialize)]
pub struct AddHobbyRequest {
    pub hobby: Option<String>,
}

/// `GET /api/users/hobbies` query.
#[derive(Debug, Default, Deserialize)]
pub struct HobbyQuery {
    pub q: Option<String>,
}

/// Resolves a user id from a path segment or body field.
///
/// Text that is not a UUID cannot name a stored user and is reported as an
/// unknown user.
pub fn parse_user_id(value: &str) -> Result<UserId, ApiError> {
    Uuid::parse_str(value.trim()).map_err(|_| ApiError::not_found(USER_NOT_FOUND))
}

const USER_NOT_FOUND: &str = "User not found";

fn parse_age(value: &Value) -> Result<i64, ApiError> {
    match value.as_i64() {
        Some(age) if age >= 1 => Ok(age),
        _ => Err(ApiError::bad_request("Age must be a positive number")),
    }
}

fn parse_hobbies(value: Value) -> Result<Vec<String>, ApiError> {
    let Value::Array(items) = value else {
        return Err(ApiError::bad_request("Hobbies must be an array"));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(hobby) => Ok(hobby),
            _ => Err(ApiError::bad_request("Hobbies must be an array of strings")),
        })
        .collect()
}
