//! Popularity score calculator.
//!
//! # Responsibility
//! - Own the single definition of the popularity score formula.
//!
//! # Invariants
//! - Pure: reads the user and the lookup, never mutates anything.
//! - Friends the lookup cannot resolve add to the friend count but
//!   contribute no shared hobbies.
//! - Result does not depend on friend-list order.

use crate::model::user::{User, UserId};
use std::collections::HashMap;

/// Weight applied to each shared hobby.
pub const SHARED_HOBBY_WEIGHT: f64 = 0.5;

/// Resolves a friend id to that friend's current hobby list.
pub trait HobbyLookup {
    /// Returns `None` for ids with no backing record.
    fn hobbies_of(&self, id: UserId) -> Option<&[String]>;
}

impl HobbyLookup for HashMap<UserId, Vec<String>> {
    fn hobbies_of(&self, id: UserId) -> Option<&[String]> {
        self.get(&id).map(Vec::as_slice)
    }
}

impl HobbyLookup for HashMap<UserId, User> {
    fn hobbies_of(&self, id: UserId) -> Option<&[String]> {
        self.get(&id).map(|user| user.hobbies.as_slice())
    }
}

/// Computes `|friends| + 0.5 * shared hobbies summed over friends`.
///
/// Every entry of `user.hobbies` found in a friend's list counts once, so a
/// hobby repeated in the user's own list counts once per repetition.
pub fn popularity_score(user: &User, lookup: &impl HobbyLookup) -> f64 {
    let shared: usize = user
        .friends
        .iter()
        .filter_map(|friend_id| lookup.hobbies_of(*friend_id))
        .map(|friend_hobbies| shared_hobby_count(&user.hobbies, friend_hobbies))
        .sum();

    user.friends.len() as f64 + shared as f64 * SHARED_HOBBY_WEIGHT
}

/// Counts entries of `own` that also appear in `other`.
pub fn shared_hobby_count(own: &[String], other: &[String]) -> usize {
    own.iter().filter(|hobby| other.contains(hobby)).count()
}
