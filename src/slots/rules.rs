//! Ordered pattern cascades, one list per slot category.
//!
//! Within a category the first rule whose pattern matches supplies the value and
//! later rules are never consulted. Rule order is therefore part of the
//! contract: reordering a list changes extraction results.
//!
//! A `RuleSet` is compiled once at startup and shared read-only.

use regex::{Captures, CaptureMatches, Regex};
use std::collections::HashSet;

use super::{Environment, OperationType, TimeUnit};

/// A named pattern carrying the value it yields on a match.
#[derive(Debug)]
pub struct Rule<T> {
    name: &'static str,
    pattern: Regex,
    value: T,
}

/// A rule whose useful output is its capture groups rather than a fixed value.
pub type CaptureRule = Rule<()>;

impl<T> Rule<T> {
    pub fn new(name: &'static str, pattern: &str, value: T) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            value,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.pattern.captures(text)
    }

    pub fn captures_iter<'r, 't>(&'r self, text: &'t str) -> CaptureMatches<'r, 't> {
        self.pattern.captures_iter(text)
    }
}

impl CaptureRule {
    fn capture(name: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        Self::new(name, pattern, ())
    }
}

/// First rule in `rules` (declaration order) whose pattern matches `text`.
pub fn first_match<'r, T>(rules: &'r [Rule<T>], text: &str) -> Option<&'r Rule<T>> {
    rules.iter().find(|rule| rule.is_match(text))
}

/// All compiled extraction rules.
#[derive(Debug)]
pub struct RuleSet {
    environments: Vec<Rule<Environment>>,
    time_spans: Vec<CaptureRule>,
    relative_times: Vec<Rule<(u32, TimeUnit)>>,
    dates: Vec<Rule<&'static str>>,
    versions: Vec<CaptureRule>,
    branches: Vec<CaptureRule>,
    limits: Vec<CaptureRule>,
    table_hints: Vec<Rule<&'static str>>,
    operations: Vec<Rule<OperationType>>,
    app_names: Vec<CaptureRule>,
    app_blocklist: HashSet<&'static str>,
    trailing_time_unit: Regex,
    time_context_phrases: Vec<&'static str>,
}

const APP_BLOCKLIST: &[&str] = &[
    // time and filler words
    "the", "last", "past", "previous", "next", "this", "that", "in", "for", "of", "to", "about",
    "day", "days", "week", "weeks", "month", "months", "year", "years", "all", "any",
    // query verbs
    "list", "show", "get", "find", "display", "count", "select", "what", "how", "many", "give",
    "me",
    // record nouns
    "app", "application", "deployment", "deployments", "test", "tests", "release", "releases",
    "build", "builds", "result", "results", "record", "records",
];

impl RuleSet {
    /// The built-in English rule cascade.
    pub fn standard() -> Result<Self, regex::Error> {
        let environments = vec![
            Rule::new("prod", r"\b(?:prod|production)\b", Environment::Prod)?,
            Rule::new("staging", r"\b(?:stag|staging)\b", Environment::Staging)?,
            Rule::new("dev", r"\b(?:dev|development)\b", Environment::Dev)?,
            Rule::new("qa", r"\b(?:qa|test)\b", Environment::Qa)?,
        ];

        let time_spans = vec![
            CaptureRule::capture(
                "last_n_units",
                r"\b(?:last|past|previous|in\s+the\s+last|in\s+the\s+past)\s+(?P<value>\d+)\s+(?P<unit>day|week|month|year)s?\b",
            )?,
            CaptureRule::capture(
                "n_units_ago",
                r"\b(?P<value>\d+)\s+(?P<unit>day|week|month|year)s?\s+ago\b",
            )?,
            CaptureRule::capture(
                "in_the_last_unit",
                r"\b(?:in\s+the\s+last|in\s+the\s+past|over\s+the\s+last|over\s+the\s+past)\s+(?P<unit>week|month|year)\b",
            )?,
        ];

        // Calendar phrases are approximated by flat day counts; "this month"
        // and "last month" intentionally share the same 30-day window.
        let relative_times = vec![
            Rule::new("today", r"\btoday\b", (0, TimeUnit::Days))?,
            Rule::new("yesterday", r"\byesterday\b", (1, TimeUnit::Days))?,
            Rule::new("this_week", r"\bthis\s+week\b", (7, TimeUnit::Days))?,
            Rule::new("last_week", r"\blast\s+week\b", (7, TimeUnit::Days))?,
            Rule::new("this_month", r"\bthis\s+month\b", (30, TimeUnit::Days))?,
            Rule::new("last_month", r"\blast\s+month\b", (30, TimeUnit::Days))?,
        ];

        let dates = vec![
            Rule::new("iso", r"\b(\d{4}-\d{2}-\d{2})\b", "%Y-%m-%d")?,
            Rule::new("us", r"\b(\d{1,2}/\d{1,2}/\d{4})\b", "%m/%d/%Y")?,
        ];

        let versions = vec![
            CaptureRule::capture("version_keyword", r#"(?i)\bversion\s+["']?(\d+(?:\.\d+)*)"#)?,
            CaptureRule::capture("v_prefix", r"(?i)\bv(\d+(?:\.\d+)*)\b")?,
        ];

        let branches = vec![
            CaptureRule::capture("branch_keyword", r#"(?i)\bbranch\s+["']?([\w/-]+)"#)?,
            CaptureRule::capture("on_x_branch", r#"(?i)\bon\s+["']?([\w/-]+)["']?\s+branch\b"#)?,
        ];

        let limits = vec![
            CaptureRule::capture(
                "latest_n_records",
                r"\b(?:last|latest|most\s+recent)\s+(\d+)\s+(?:deployment|test|result|record)s?\b",
            )?,
            CaptureRule::capture("show_n", r"\b(?:show|get|give)\s+(?:me\s+)?(?:the\s+)?(\d+)\b")?,
            CaptureRule::capture("top_n", r"\b(?:top|first)\s+(\d+)\b")?,
            CaptureRule::capture("limit_n", r"\blimit\s+(?:to\s+)?(\d+)\b")?,
            CaptureRule::capture("n_results", r"\b(\d+)\s+(?:result|record)s?\b")?,
        ];

        // Test keywords are more specific than deployment keywords, so they go first.
        let table_hints = vec![
            Rule::new("tests", r"\b(?:tests?|testing|test\s+results?)\b", "test_data")?,
            Rule::new(
                "deployments",
                r"\b(?:deployments?|deploy|release|rollback)\b",
                "deployment_data",
            )?,
        ];

        let operations = vec![
            Rule::new("count", r"\b(?:how\s+many|count|total|number)\b", OperationType::Count)?,
            Rule::new("select", r"\b(?:list|show|get|what|find|display)\b", OperationType::Select)?,
            Rule::new(
                "select_latest",
                r"\b(?:latest|last|most\s+recent)\b",
                OperationType::SelectLatest,
            )?,
        ];

        let app_names = vec![
            CaptureRule::capture(
                "prep_app_keyword",
                r#"(?i)\b(?:for|of|about)\s+app(?:lication)?\s+["']?([a-z][\w/-]+)"#,
            )?,
            CaptureRule::capture("app_keyword", r#"(?i)\bapp(?:lication)?\s+["']?([a-z][\w/-]+)"#)?,
            CaptureRule::capture(
                "before_time_phrase",
                r"(?i)\b(?:for|of|about)\s+([a-z][\w/-]+)\s+(?:app\s+)?(?:in\s+the\s+(?:last|past)|over\s+the)\b",
            )?,
            CaptureRule::capture("quoted", r#"(?i)["']([a-z][\w/-]+)["']"#)?,
            CaptureRule::capture(
                "before_record_noun",
                r"(?i)\b(?:for|of)\s+([a-z][\w/-]+)\s+(?:deployment|test|release|build)s?\b",
            )?,
            CaptureRule::capture("prepositional", r"(?i)\b(?:for|of|about)\s+([a-z][\w/-]+)")?,
        ];

        Ok(Self {
            environments,
            time_spans,
            relative_times,
            dates,
            versions,
            branches,
            limits,
            table_hints,
            operations,
            app_names,
            app_blocklist: APP_BLOCKLIST.iter().copied().collect(),
            trailing_time_unit: Regex::new(r"^\s+(?:day|week|month|year)s?\b")?,
            time_context_phrases: vec!["in the last", "in the past", "over the"],
        })
    }

    pub fn environments(&self) -> &[Rule<Environment>] {
        &self.environments
    }

    /// Explicit numeric/unit spans; named groups `value` (optional) and `unit`.
    pub fn time_spans(&self) -> &[CaptureRule] {
        &self.time_spans
    }

    /// Keyword windows, consulted only when no explicit span matched.
    pub fn relative_times(&self) -> &[Rule<(u32, TimeUnit)>] {
        &self.relative_times
    }

    /// Date patterns paired with the chrono format that must parse the capture.
    pub fn dates(&self) -> &[Rule<&'static str>] {
        &self.dates
    }

    pub fn versions(&self) -> &[CaptureRule] {
        &self.versions
    }

    pub fn branches(&self) -> &[CaptureRule] {
        &self.branches
    }

    pub fn limits(&self) -> &[CaptureRule] {
        &self.limits
    }

    pub fn table_hints(&self) -> &[Rule<&'static str>] {
        &self.table_hints
    }

    pub fn operations(&self) -> &[Rule<OperationType>] {
        &self.operations
    }

    pub fn app_names(&self) -> &[CaptureRule] {
        &self.app_names
    }

    /// Words that can never be an application name.
    pub fn is_blocked_app_word(&self, candidate: &str) -> bool {
        self.app_blocklist
            .contains(candidate.to_lowercase().as_str())
    }

    /// True when `rest` (the text right after a candidate) starts with a time unit.
    pub fn starts_with_time_unit(&self, rest: &str) -> bool {
        self.trailing_time_unit.is_match(rest)
    }

    pub fn time_context_phrases(&self) -> &[&'static str] {
        &self.time_context_phrases
    }
}
