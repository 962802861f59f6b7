//! Read-only views derived from scored users.
//!
//! # Responsibility
//! - Build the node/edge view consumed by graph visualizations.
//! - Build the distinct hobby catalog.
//!
//! # Invariants
//! - One edge per undirected friendship; `A->B` and `B->A` collapse.
//! - Node order follows input order.
//! - Catalog keeps first-seen order and lists each hobby once.

use crate::model::user::{ScoredUser, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Scores strictly above this value are rendered as high-score nodes.
pub const HIGH_SCORE_THRESHOLD: f64 = 5.0;

/// Display bucket for a popularity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    High,
    Low,
}

impl ScoreTier {
    pub fn for_score(score: f64) -> Self {
        if score > HIGH_SCORE_THRESHOLD {
            Self::High
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: UserId,
    pub username: String,
    pub age: i64,
    pub popularity_score: f64,
    pub tier: ScoreTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: UserId,
    pub target: UserId,
}

/// Node/edge projection of the whole network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Projects scored users into nodes and deduplicated undirected edges.
///
/// The first user that mentions a pair becomes the edge `source`.
pub fn project(users: &[ScoredUser]) -> GraphView {
    let nodes = users
        .iter()
        .map(|scored| GraphNode {
            id: scored.user.id,
            username: scored.user.username.clone(),
            age: scored.user.age,
            popularity_score: scored.popularity_score,
            tier: ScoreTier::for_score(scored.popularity_score),
        })
        .collect();

    let mut seen: HashSet<(UserId, UserId)> = HashSet::new();
    let mut edges = Vec::new();
    for scored in users {
        let source = scored.user.id;
        for target in &scored.user.friends {
            if seen.insert(edge_key(source, *target)) {
                edges.push(GraphEdge {
                    source,
                    target: *target,
                });
            }
        }
    }

    GraphView { nodes, edges }
}

fn edge_key(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Lists distinct hobbies across `users` in first-seen order.
///
/// `query` filters by case-insensitive substring; blank queries match all.
pub fn hobby_catalog<'a>(
    users: impl IntoIterator<Item = &'a User>,
    query: Option<&str>,
) -> Vec<String> {
    let needle = query
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty());

    let mut seen: HashSet<&str> = HashSet::new();
    let mut catalog = Vec::new();
    for user in users {
        for hobby in &user.hobbies {
            if !seen.insert(hobby.as_str()) {
                continue;
            }
            let matches = needle
                .as_deref()
                .map_or(true, |needle| hobby.to_lowercase().contains(needle));
            if matches {
                catalog.push(hobby.clone());
            }
        }
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::{hobby_catalog, project, ScoreTier};
    use crate::model::user::{ScoredUser, User};

    fn scored(user: User, score: f64) -> ScoredUser {
        ScoredUser {
            user,
            popularity_score: score,
        }
    }

    fn hobbies(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn mutual_references_collapse_into_one_edge() {
        let mut alice = User::new("alice", 25, hobbies(&["reading"]));
        let mut bob = User::new("bob", 30, hobbies(&["music"]));
        let mut carol = User::new("carol", 41, hobbies(&["chess"]));
        alice.friends = vec![bob.id, carol.id];
        bob.friends = vec![alice.id];
        carol.friends = vec![alice.id];

        let view = project(&[
            scored(alice.clone(), 2.0),
            scored(bob.clone(), 1.0),
            scored(carol, 1.0),
        ]);

        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.edges.len(), 2);
        assert!(view.edges.iter().all(|edge| edge.source == alice.id));
        assert!(view
            .edges
            .iter()
            .any(|edge| edge.target == bob.id));
    }

    #[test]
    fn empty_input_yields_empty_view() {
        let view = project(&[]);
        assert!(view.nodes.is_empty());
        assert!(view.edges.is_empty());
    }

    #[test]
    fn tier_threshold_is_exclusive() {
        assert_eq!(ScoreTier::for_score(5.0), ScoreTier::Low);
        assert_eq!(ScoreTier::for_score(5.5), ScoreTier::High);
        assert_eq!(ScoreTier::for_score(0.0), ScoreTier::Low);
    }

    #[test]
    fn nodes_carry_score_and_serialize_camel_case() {
        let user = User::new("dana", 19, hobbies(&["climbing"]));
        let view = project(&[scored(user, 6.0)]);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["nodes"][0]["popularityScore"], 6.0);
        assert_eq!(json["nodes"][0]["tier"], "high");
        assert!(json["edges"].as_array().unwrap().is_empty());
    }

    #[test]
    fn catalog_is_distinct_in_first_seen_order_and_filters() {
        let first = User::new("a", 20, hobbies(&["Reading", "gaming", "Reading"]));
        let second = User::new("b", 21, hobbies(&["music", "gaming", "Board games"]));

        let all = hobby_catalog([&first, &second], None);
        assert_eq!(all, hobbies(&["Reading", "gaming", "music", "Board games"]));

        let filtered = hobby_catalog([&first, &second], Some(" GAM "));
        assert_eq!(filtered, hobbies(&["gaming", "Board games"]));

        let blank = hobby_catalog([&first], Some("  "));
        assert_eq!(blank.len(), 2);
    }
}
