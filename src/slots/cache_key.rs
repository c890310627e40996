use serde::{Deserialize, Serialize};
use std::fmt;

use super::Slots;

const WILDCARD: &str = "*";

/// Deterministic identifier for a class of equivalent requests.
///
/// Layout: `operation:table:app:environment:time:limit`, where the time part is
/// itself `unit:value`, and any absent part is `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for `slots`.
    ///
    /// The specific date never appears in the key, and a time range recorded
    /// alongside a specific date is left out as well. App names are used as
    /// extracted, without case folding.
    pub fn build(slots: &Slots) -> Self {
        let time = match (&slots.time_range, &slots.specific_date) {
            (Some(range), None) => format!("{}:{}", range.unit.as_str(), range.value),
            _ => WILDCARD.to_string(),
        };

        let parts = [
            slots.operation_type.as_str().to_string(),
            slots.table_hint.clone(),
            slots.app_name.clone().unwrap_or_else(|| WILDCARD.to_string()),
            slots
                .environment
                .map(|env| env.as_str().to_string())
                .unwrap_or_else(|| WILDCARD.to_string()),
            time,
            slots
                .limit
                .map(|limit| limit.to_string())
                .unwrap_or_else(|| WILDCARD.to_string()),
        ];

        Self(parts.join(":"))
    }

    /// Wraps a key string handed back by a caller.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
