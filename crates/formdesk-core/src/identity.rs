//! Conversant identities and the administrator allow-list.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::FormdeskError;

/// Opaque numeric identity of a conversant on the messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = FormdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(UserId)
            .map_err(|e| FormdeskError::invalid_input(format!("invalid user id '{}': {}", s, e)))
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        UserId(value)
    }
}

/// Static set of identities with administrative capability.
///
/// Configured once at process start; membership is plain set containment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    ids: HashSet<UserId>,
    // Broadcast order follows configuration order.
    ordered: Vec<UserId>,
}

impl AllowList {
    pub fn new(ids: impl IntoIterator<Item = UserId>) -> Self {
        let mut set = HashSet::new();
        let mut ordered = Vec::new();
        for id in ids {
            if set.insert(id) {
                ordered.push(id);
            }
        }
        Self { ids: set, ordered }
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.ids.contains(&id)
    }

    /// Iterates members in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.ordered.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl FromIterator<i64> for AllowList {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(UserId))
    }
}
