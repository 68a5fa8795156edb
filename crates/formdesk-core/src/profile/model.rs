use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// All profiles keyed by name.
pub type ProfileMap = BTreeMap<String, Profile>;

/// A named bag of settings with bookkeeping timestamps.
///
/// User fields are flattened next to the timestamps so the stored JSON
/// stays a flat object per profile.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Profile {
    #[serde(flatten)]
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(data: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            data: strip_reserved(data),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges `data` into the profile and bumps `updated_at`.
    pub fn merge(&mut self, data: Map<String, Value>) {
        self.data.extend(strip_reserved(data));
        self.updated_at = Utc::now();
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

fn strip_reserved(mut data: Map<String, Value>) -> Map<String, Value> {
    data.remove("created_at");
    data.remove("updated_at");
    data
}
