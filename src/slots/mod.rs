//! Slot extraction: free-text operational queries in, typed slot records out.
//!
//! The pipeline is strictly one-way:
//! `rules` (ordered pattern cascades) → `extract` (category scans, app name last)
//! → `normalize` (canonical units, dates, confidence) → `validate` / `cache_key`.
//!
//! Nothing in this module performs I/O. Every type here is built once per query
//! and never mutated after it is handed back to the caller.

pub mod cache_key;
pub mod extract;
pub mod known_apps;
pub mod normalize;
pub mod rules;
pub mod validate;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use cache_key::CacheKey;
pub use extract::SlotExtractor;
pub use known_apps::KnownApps;
pub use rules::RuleSet;
pub use validate::{SlotValidator, ValidationResult};

/// Table assumed when no table keyword is present in the query.
pub const DEFAULT_TABLE: &str = "deployment_data";

/// Unit of a relative time window, kept exactly as the user wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Days => "days",
            TimeUnit::Weeks => "weeks",
            TimeUnit::Months => "months",
            TimeUnit::Years => "years",
        }
    }

    /// Singular form, as used inside SQL interval literals.
    pub fn singular(&self) -> &'static str {
        match self {
            TimeUnit::Days => "day",
            TimeUnit::Weeks => "week",
            TimeUnit::Months => "month",
            TimeUnit::Years => "year",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relative time window such as "last 3 weeks".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub value: u32,
    pub unit: TimeUnit,
    pub raw_text: String,
}

impl TimeRange {
    pub fn new(value: u32, unit: TimeUnit, raw_text: impl Into<String>) -> Self {
        Self {
            value,
            unit,
            raw_text: raw_text.into(),
        }
    }

    /// `"3 week"` style literal for `INTERVAL '...'` expressions.
    pub fn interval_literal(&self) -> String {
        format!("{} {}", self.value, self.unit.singular())
    }

    /// Renders a `column >= 'yyyy-mm-dd'` filter relative to `today`.
    ///
    /// Months are approximated as 30 days and years as 365 days.
    pub fn to_sql_filter(&self, date_column: &str, today: NaiveDate) -> String {
        let value = i64::from(self.value);
        let days = match self.unit {
            TimeUnit::Days => value,
            TimeUnit::Weeks => value * 7,
            TimeUnit::Months => value * 30,
            TimeUnit::Years => value * 365,
        };
        let start = Duration::try_days(days)
            .and_then(|span| today.checked_sub_signed(span))
            .unwrap_or(NaiveDate::MIN);
        format!("{} >= '{}'", date_column, start.format("%Y-%m-%d"))
    }

    /// Lossy conversion to whole months, kept for callers that only understand
    /// month windows. Never used when building cache keys.
    pub fn to_months_approx(&self) -> u32 {
        match self.unit {
            TimeUnit::Months => self.value,
            TimeUnit::Weeks => (self.value / 4).max(1),
            TimeUnit::Days => (self.value / 30).max(1),
            TimeUnit::Years => self.value.saturating_mul(12),
        }
    }
}

/// Deployment environment, canonicalized from its spoken synonyms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    Prod,
    Staging,
    Dev,
    Qa,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Prod,
        Environment::Staging,
        Environment::Dev,
        Environment::Qa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Prod => "PROD",
            Environment::Staging => "STAGING",
            Environment::Dev => "DEV",
            Environment::Qa => "QA",
        }
    }

    /// Maps a single word (canonical name or synonym) to an environment.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "prod" | "production" => Some(Environment::Prod),
            "stag" | "staging" => Some(Environment::Staging),
            "dev" | "development" => Some(Environment::Dev),
            "qa" | "test" => Some(Environment::Qa),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL verb category inferred from the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    #[default]
    Select,
    Count,
    SelectLatest,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Select => "SELECT",
            OperationType::Count => "COUNT",
            OperationType::SelectLatest => "SELECT_LATEST",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse label for how many of the core slots were filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Structured meaning extracted from one query.
///
/// Optional fields are genuinely optional: an absent slot is `None`, never an
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slots {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    pub table_hint: String,
    pub operation_type: OperationType,
    pub confidence: Confidence,
    pub raw_query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Slots {
    /// An empty record for `raw_query`: default table, plain SELECT, low confidence.
    pub fn empty(raw_query: impl Into<String>) -> Self {
        Self {
            app_name: None,
            environment: None,
            time_range: None,
            specific_date: None,
            version: None,
            branch: None,
            limit: None,
            table_hint: DEFAULT_TABLE.to_string(),
            operation_type: OperationType::Select,
            confidence: Confidence::Low,
            raw_query: raw_query.into(),
            warnings: Vec::new(),
        }
    }

    /// True when none of app, environment, time range or date were found.
    pub fn is_too_vague(&self) -> bool {
        self.app_name.is_none()
            && self.environment.is_none()
            && self.time_range.is_none()
            && self.specific_date.is_none()
    }

    /// Specific date in ISO `yyyy-mm-dd` form.
    pub fn specific_date_iso(&self) -> Option<String> {
        self.specific_date
            .map(|date| date.format("%Y-%m-%d").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn interval_literal_uses_singular_unit() {
        let range = TimeRange::new(3, TimeUnit::Weeks, "last 3 weeks");
        assert_eq!(range.interval_literal(), "3 week");
    }

    #[test]
    fn sql_filter_counts_back_from_today() {
        let today = date(2024, 3, 31);
        let weeks = TimeRange::new(2, TimeUnit::Weeks, "last 2 weeks");
        assert_eq!(weeks.to_sql_filter("date", today), "date >= '2024-03-17'");

        let months = TimeRange::new(1, TimeUnit::Months, "last month");
        assert_eq!(
            months.to_sql_filter("deployed_at", today),
            "deployed_at >= '2024-03-01'"
        );

        let years = TimeRange::new(1, TimeUnit::Years, "past 1 year");
        assert_eq!(years.to_sql_filter("date", today), "date >= '2023-04-01'");
    }

    #[test]
    fn months_approximation_is_lossy_but_never_zero() {
        assert_eq!(TimeRange::new(3, TimeUnit::Months, "").to_months_approx(), 3);
        assert_eq!(TimeRange::new(2, TimeUnit::Weeks, "").to_months_approx(), 1);
        assert_eq!(TimeRange::new(9, TimeUnit::Weeks, "").to_months_approx(), 2);
        assert_eq!(TimeRange::new(7, TimeUnit::Days, "").to_months_approx(), 1);
        assert_eq!(TimeRange::new(90, TimeUnit::Days, "").to_months_approx(), 3);
        assert_eq!(TimeRange::new(2, TimeUnit::Years, "").to_months_approx(), 24);
    }

    #[test]
    fn environment_tokens() {
        assert_eq!(Environment::from_token("Production"), Some(Environment::Prod));
        assert_eq!(Environment::from_token("stag"), Some(Environment::Staging));
        assert_eq!(Environment::from_token("test"), Some(Environment::Qa));
        assert_eq!(Environment::from_token("frontend"), None);
    }

    #[test]
    fn slots_serialize_without_absent_fields() {
        let mut slots = Slots::empty("list deployments on 2024-01-15");
        slots.specific_date = Some(date(2024, 1, 15));
        slots.environment = Some(Environment::Prod);

        let json = serde_json::to_value(&slots).unwrap();
        assert_eq!(json["specific_date"], "2024-01-15");
        assert_eq!(json["environment"], "PROD");
        assert_eq!(json["operation_type"], "SELECT");
        assert_eq!(json["confidence"], "low");
        assert!(json.get("app_name").is_none());
        assert!(json.get("time_range").is_none());
        assert!(json.get("warnings").is_none());
    }

    #[test]
    fn operation_type_serializes_screaming_snake() {
        let json = serde_json::to_value(OperationType::SelectLatest).unwrap();
        assert_eq!(json, "SELECT_LATEST");
    }

    #[test]
    fn vagueness_ignores_secondary_slots() {
        let mut slots = Slots::empty("v1.2 on main branch");
        slots.version = Some("1.2".into());
        slots.branch = Some("main".into());
        slots.limit = Some(5);
        assert!(slots.is_too_vague());

        slots.specific_date = Some(date(2024, 1, 15));
        assert!(!slots.is_too_vague());
    }
}
