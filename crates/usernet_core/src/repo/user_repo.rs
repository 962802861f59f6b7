//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist user records with their ordered hobby and friend lists.
//! - Apply every friendship mutation as one atomic transition.
//!
//! # Invariants
//! - A friendship is stored as two directed rows, written and removed
//!   together inside one `IMMEDIATE` transaction.
//! - `link` never creates a self-loop or a duplicate edge.
//! - `delete` never leaves a dangling friend reference behind.
//! - Multi-row reads run inside one transaction so callers never see a
//!   half-applied mutation.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::user::{now_epoch_ms, User, UserId, UserPatch, UserValidationError};
use crate::service::score::HobbyLookup;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT id, username, age, created_at FROM users";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for user persistence and graph mutations.
#[derive(Debug)]
pub enum RepoError {
    /// Record failed field-level validation.
    Validation(UserValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Referenced user does not exist.
    NotFound(UserId),
    /// Link source and target are the same user.
    SelfLink(UserId),
    /// Pair is already linked.
    AlreadyLinked { user: UserId, friend: UserId },
    /// User still lists friends of its own.
    HasFriends { user: UserId, friend_count: usize },
    /// Another user still lists this user as a friend.
    ReferencedBy { user: UserId, referrer: UserId },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::SelfLink(id) => write!(f, "cannot link user to themselves: {id}"),
            Self::AlreadyLinked { user, friend } => {
                write!(f, "users are already friends: {user} and {friend}")
            }
            Self::HasFriends { user, friend_count } => write!(
                f,
                "cannot delete user {user} with {friend_count} active friendship(s); unlink all friends first"
            ),
            Self::ReferencedBy { user, referrer } => write!(
                f,
                "cannot delete user {user} who is still a friend of {referrer}; unlink all friendships first"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "user repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Consistent read of every user, ordered by `created_at ASC, id ASC`.
#[derive(Debug, Clone, Default)]
pub struct UserSnapshot {
    users: Vec<User>,
    index: HashMap<UserId, usize>,
}

impl UserSnapshot {
    /// Builds a snapshot from already ordered records.
    pub fn new(users: Vec<User>) -> Self {
        let index = users
            .iter()
            .enumerate()
            .map(|(position, user)| (user.id, position))
            .collect();
        Self { users, index }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn get(&self, id: UserId) -> Option<&User> {
        self.index.get(&id).map(|position| &self.users[*position])
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl HobbyLookup for UserSnapshot {
    fn hobbies_of(&self, id: UserId) -> Option<&[String]> {
        self.get(id).map(|user| user.hobbies.as_slice())
    }
}

/// One user plus the current records of its direct friends.
///
/// Friends with no backing record are absent from `friends`.
#[derive(Debug, Clone)]
pub struct UserNeighborhood {
    pub user: User,
    pub friends: HashMap<UserId, User>,
}

/// Repository interface for user CRUD and friendship mutations.
pub trait UserRepository {
    /// Inserts a new validated user.
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    /// Loads one user by id.
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Loads one user together with its friends' records.
    fn get_neighborhood(&self, id: UserId) -> RepoResult<Option<UserNeighborhood>>;
    /// Loads every user in one consistent read.
    fn load_snapshot(&self) -> RepoResult<UserSnapshot>;
    /// Applies provided fields and returns the updated record.
    fn update_user(&self, id: UserId, patch: &UserPatch) -> RepoResult<User>;
    /// Appends one hobby unless already present. Returns whether it was added.
    fn append_hobby(&self, id: UserId, hobby: &str) -> RepoResult<bool>;
    /// Deletes one user with no friendships on either side.
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
    /// Creates a mutual friendship.
    fn link_users(&self, user: UserId, friend: UserId) -> RepoResult<()>;
    /// Removes a mutual friendship if present.
    fn unlink_users(&self, user: UserId, friend: UserId) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn begin(&self, behavior: TransactionBehavior) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(self.conn, behavior)?)
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;
        if !user.friends.is_empty() {
            return Err(RepoError::InvalidData(format!(
                "new user {} must not carry friends",
                user.id
            )));
        }

        let tx = self.begin(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO users (id, username, age, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                user.id.to_string(),
                user.username.as_str(),
                user.age,
                user.created_at
            ],
        )?;
        write_hobbies(&tx, user.id, &user.hobbies)?;
        tx.commit()?;

        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let tx = self.begin(TransactionBehavior::Deferred)?;
        let user = load_user(&tx, id)?;
        tx.commit()?;
        Ok(user)
    }

    fn get_neighborhood(&self, id: UserId) -> RepoResult<Option<UserNeighborhood>> {
        let tx = self.begin(TransactionBehavior::Deferred)?;
        let Some(user) = load_user(&tx, id)? else {
            return Ok(None);
        };

        let mut friends = HashMap::with_capacity(user.friends.len());
        for friend_id in &user.friends {
            if let Some(friend) = load_user(&tx, *friend_id)? {
                friends.insert(*friend_id, friend);
            }
        }
        tx.commit()?;

        Ok(Some(UserNeighborhood { user, friends }))
    }

    fn load_snapshot(&self) -> RepoResult<UserSnapshot> {
        let tx = self.begin(TransactionBehavior::Deferred)?;

        let mut hobbies = load_list_rows(
            &tx,
            "SELECT user_id, hobby FROM user_hobbies ORDER BY user_id, position;",
            "user_hobbies.user_id",
            Ok,
        )?;
        let mut friends = load_list_rows(
            &tx,
            "SELECT user_id, friend_id FROM user_friends ORDER BY user_id, position;",
            "user_friends.user_id",
            |value| parse_uuid(&value, "user_friends.friend_id"),
        )?;

        let mut stmt = tx.prepare(&format!("{USER_SELECT_SQL} ORDER BY created_at ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            let mut user = parse_user_row(row)?;
            user.hobbies = hobbies.remove(&user.id).unwrap_or_default();
            user.friends = friends.remove(&user.id).unwrap_or_default();
            validate_persisted(&user)?;
            users.push(user);
        }
        drop(rows);
        drop(stmt);
        tx.commit()?;

        Ok(UserSnapshot::new(users))
    }

    fn update_user(&self, id: UserId, patch: &UserPatch) -> RepoResult<User> {
        let tx = self.begin(TransactionBehavior::Immediate)?;
        let mut user = load_user(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        patch.clone().apply_to(&mut user);
        user.validate()?;

        tx.execute(
            "UPDATE users
             SET username = ?2,
                 age = ?3,
                 updated_at = ?4
             WHERE id = ?1;",
            params![
                id.to_string(),
                user.username.as_str(),
                user.age,
                now_epoch_ms()
            ],
        )?;
        if patch.hobbies.is_some() {
            write_hobbies(&tx, id, &user.hobbies)?;
        }
        tx.commit()?;

        Ok(user)
    }

    fn append_hobby(&self, id: UserId, hobby: &str) -> RepoResult<bool> {
        let tx = self.begin(TransactionBehavior::Immediate)?;
        let user = load_user(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        if user.hobbies.iter().any(|existing| existing == hobby) {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO user_hobbies (user_id, position, hobby)
             VALUES (?1, ?2, ?3);",
            params![id.to_string(), user.hobbies.len() as i64, hobby],
        )?;
        touch_user(&tx, id)?;
        tx.commit()?;
        Ok(true)
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let tx = self.begin(TransactionBehavior::Immediate)?;
        if !user_exists(&tx, id)? {
            return Err(RepoError::NotFound(id));
        }

        let friend_count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM user_friends WHERE user_id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if friend_count > 0 {
            return Err(RepoError::HasFriends {
                user: id,
                friend_count: friend_count as usize,
            });
        }

        let referrer: Option<String> = tx
            .query_row(
                "SELECT user_id FROM user_friends WHERE friend_id = ?1 ORDER BY user_id LIMIT 1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(referrer) = referrer {
            return Err(RepoError::ReferencedBy {
                user: id,
                referrer: parse_uuid(&referrer, "user_friends.user_id")?,
            });
        }

        tx.execute("DELETE FROM users WHERE id = ?1;", [id.to_string()])?;
        tx.commit()?;
        Ok(())
    }

    fn link_users(&self, user: UserId, friend: UserId) -> RepoResult<()> {
        if user == friend {
            return Err(RepoError::SelfLink(user));
        }

        let tx = self.begin(TransactionBehavior::Immediate)?;
        for id in [user, friend] {
            if !user_exists(&tx, id)? {
                return Err(RepoError::NotFound(id));
            }
        }

        let linked: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM user_friends
                WHERE (user_id = ?1 AND friend_id = ?2)
                   OR (user_id = ?2 AND friend_id = ?1)
            );",
            params![user.to_string(), friend.to_string()],
            |row| row.get(0),
        )?;
        if linked == 1 {
            return Err(RepoError::AlreadyLinked { user, friend });
        }

        for (from, to) in [(user, friend), (friend, user)] {
            tx.execute(
                "INSERT INTO user_friends (user_id, friend_id, position)
                 VALUES (
                    ?1,
                    ?2,
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM user_friends WHERE user_id = ?1)
                 );",
                params![from.to_string(), to.to_string()],
            )?;
            touch_user(&tx, from)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn unlink_users(&self, user: UserId, friend: UserId) -> RepoResult<()> {
        let tx = self.begin(TransactionBehavior::Immediate)?;
        for id in [user, friend] {
            if !user_exists(&tx, id)? {
                return Err(RepoError::NotFound(id));
            }
        }

        let removed = tx.execute(
            "DELETE FROM user_friends
             WHERE (user_id = ?1 AND friend_id = ?2)
                OR (user_id = ?2 AND friend_id = ?1);",
            params![user.to_string(), friend.to_string()],
        )?;
        if removed > 0 {
            touch_user(&tx, user)?;
            touch_user(&tx, friend)?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn load_user(conn: &Connection, id: UserId) -> RepoResult<Option<User>> {
    let mut stmt = conn.prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let mut user = parse_user_row(row)?;
    user.hobbies = load_hobbies(conn, id)?;
    user.friends = load_friend_ids(conn, id)?;
    validate_persisted(&user)?;
    Ok(Some(user))
}

fn load_hobbies(conn: &Connection, id: UserId) -> RepoResult<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT hobby FROM user_hobbies WHERE user_id = ?1 ORDER BY position;")?;
    let hobbies = stmt
        .query_map([id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hobbies)
}

fn load_friend_ids(conn: &Connection, id: UserId) -> RepoResult<Vec<UserId>> {
    let mut stmt =
        conn.prepare("SELECT friend_id FROM user_friends WHERE user_id = ?1 ORDER BY position;")?;
    let raw = stmt
        .query_map([id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    raw.iter()
        .map(|value| parse_uuid(value, "user_friends.friend_id"))
        .collect()
}

/// Groups `(user_id, value)` rows by user, preserving row order.
fn load_list_rows<T>(
    conn: &Connection,
    sql: &str,
    owner_column: &'static str,
    convert: impl Fn(String) -> RepoResult<T>,
) -> RepoResult<HashMap<UserId, Vec<T>>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut grouped: HashMap<UserId, Vec<T>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let owner: String = row.get(0)?;
        let value: String = row.get(1)?;
        grouped
            .entry(parse_uuid(&owner, owner_column)?)
            .or_default()
            .push(convert(value)?);
    }
    Ok(grouped)
}

fn write_hobbies(conn: &Connection, id: UserId, hobbies: &[String]) -> RepoResult<()> {
    conn.execute("DELETE FROM user_hobbies WHERE user_id = ?1;", [id.to_string()])?;
    for (position, hobby) in hobbies.iter().enumerate() {
        conn.execute(
            "INSERT INTO user_hobbies (user_id, position, hobby)
             VALUES (?1, ?2, ?3);",
            params![id.to_string(), position as i64, hobby.as_str()],
        )?;
    }
    Ok(())
}

fn touch_user(conn: &Connection, id: UserId) -> RepoResult<()> {
    conn.execute(
        "UPDATE users SET updated_at = ?2 WHERE id = ?1;",
        params![id.to_string(), now_epoch_ms()],
    )?;
    Ok(())
}

fn user_exists(conn: &Connection, id: UserId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    Ok(User {
        id: parse_uuid(&id_text, "users.id")?,
        username: row.get("username")?,
        age: row.get("age")?,
        hobbies: Vec::new(),
        friends: Vec::new(),
        created_at: row.get("created_at")?,
    })
}

fn validate_persisted(user: &User) -> RepoResult<()> {
    user
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("user {}: {err}", user.id)))
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
