//! Category-by-category slot extraction.
//!
//! Categories run in a fixed order: environment, time range, specific date,
//! version, branch, limit, table hint, operation type, and app name last, since
//! app-name disambiguation looks at what the earlier categories found.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::trace;

use super::normalize;
use super::rules::{first_match, CaptureRule, RuleSet};
use super::{DEFAULT_TABLE, Environment, KnownApps, OperationType, Slots, TimeRange};

/// Turns raw query text into `Slots`. Pure: no I/O, no shared mutable state.
#[derive(Debug, Clone)]
pub struct SlotExtractor {
    rules: Arc<RuleSet>,
    known_apps: Arc<KnownApps>,
}

impl SlotExtractor {
    pub fn new(rules: Arc<RuleSet>, known_apps: Arc<KnownApps>) -> Self {
        Self { rules, known_apps }
    }

    pub fn known_apps(&self) -> &KnownApps {
        &self.known_apps
    }

    /// Extracts every slot category from `query`. Never fails; unmatched
    /// categories are simply left empty.
    pub fn extract(&self, query: &str) -> Slots {
        let lower = query.to_lowercase();
        let mut slots = Slots::empty(query);

        slots.environment = self.environment(&lower);
        slots.time_range = self.time_range(&lower);
        slots.specific_date = self.specific_date(&lower, &mut slots.warnings);
        slots.version = first_capture(self.rules.versions(), query);
        slots.branch = first_capture(self.rules.branches(), query);
        slots.limit = self.limit(&lower);
        slots.table_hint = self.table_hint(&lower);
        slots.operation_type = self.operation_type(&lower);
        slots.app_name = self.app_name(query, &slots);

        if let (Some(date), Some(range)) = (&slots.specific_date, &slots.time_range) {
            slots.warnings.push(format!(
                "Both a specific date ({}) and a time range ('{}') were given; the specific date takes precedence",
                date.format("%Y-%m-%d"),
                range.raw_text
            ));
        }

        slots.confidence = normalize::confidence(&slots);
        trace!("Extracted slots for '{}': {:?}", query, slots);
        slots
    }

    fn environment(&self, lower: &str) -> Option<Environment> {
        first_match(self.rules.environments(), lower).map(|rule| *rule.value())
    }

    fn time_range(&self, lower: &str) -> Option<TimeRange> {
        for rule in self.rules.time_spans() {
            let Some(caps) = rule.captures(lower) else {
                continue;
            };
            // A span without a number ("in the last week") means one unit.
            let value = match caps.name("value") {
                Some(value) => match value.as_str().parse::<u32>() {
                    Ok(value) => value,
                    Err(_) => continue,
                },
                None => 1,
            };
            let Some(unit) = caps
                .name("unit")
                .and_then(|unit| normalize::time_unit(unit.as_str()))
            else {
                continue;
            };
            let raw = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            return Some(TimeRange::new(value, unit, raw));
        }

        for rule in self.rules.relative_times() {
            if let Some(hit) = rule.captures(lower).and_then(|caps| caps.get(0)) {
                let (value, unit) = *rule.value();
                return Some(TimeRange::new(value, unit, hit.as_str()));
            }
        }

        None
    }

    fn specific_date(&self, lower: &str, warnings: &mut Vec<String>) -> Option<NaiveDate> {
        for rule in self.rules.dates() {
            for caps in rule.captures_iter(lower) {
                let Some(raw) = caps.get(1).map(|m| m.as_str()) else {
                    continue;
                };
                match normalize::calendar_date(raw, rule.value()) {
                    Some(date) => return Some(date),
                    None => warnings.push(format!("Ignored '{}': not a valid calendar date", raw)),
                }
            }
        }
        None
    }

    fn limit(&self, lower: &str) -> Option<u32> {
        self.rules.limits().iter().find_map(|rule| {
            rule.captures(lower)
                .and_then(|caps| caps.get(1))
                .and_then(|raw| normalize::positive_limit(raw.as_str()))
        })
    }

    fn table_hint(&self, lower: &str) -> String {
        first_match(self.rules.table_hints(), lower)
            .map(|rule| *rule.value())
            .unwrap_or(DEFAULT_TABLE)
            .to_string()
    }

    fn operation_type(&self, lower: &str) -> OperationType {
        first_match(self.rules.operations(), lower)
            .map(|rule| *rule.value())
            .unwrap_or_default()
    }

    fn app_name(&self, query: &str, slots: &Slots) -> Option<String> {
        // An exact known-app mention beats every generic pattern.
        if let Some(name) = self.known_apps.find_in(query) {
            return Some(name.to_string());
        }

        for rule in self.rules.app_names() {
            for caps in rule.captures_iter(query) {
                let (Some(whole), Some(group)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let candidate = normalize::clean_capture(group.as_str());
                if !self.accepts_app_candidate(query, candidate, whole.start(), group.end(), slots)
                {
                    continue;
                }
                trace!("App name '{}' matched rule {}", candidate, rule.name());
                return Some(candidate.to_string());
            }
        }

        None
    }

    fn accepts_app_candidate(
        &self,
        query: &str,
        candidate: &str,
        match_start: usize,
        candidate_end: usize,
        slots: &Slots,
    ) -> bool {
        if candidate.is_empty() || self.rules.is_blocked_app_word(candidate) {
            return false;
        }

        if let Some(env) = Environment::from_token(candidate) {
            trace!("Rejected app candidate '{}': environment {}", candidate, env);
            return false;
        }
        if slots
            .environment
            .is_some_and(|env| env.as_str().eq_ignore_ascii_case(candidate))
        {
            return false;
        }

        let rest = query[candidate_end..].to_lowercase();
        if self.rules.starts_with_time_unit(&rest) {
            return false;
        }

        // "...in the last frontend..." style captures belong to the time phrase.
        let preceding = preceding_chars(query, match_start, 20);
        let in_time_phrase = self
            .rules
            .time_context_phrases()
            .iter()
            .any(|phrase| preceding.contains(phrase));
        if in_time_phrase && query[match_start..].to_lowercase().contains("last") {
            return false;
        }

        true
    }
}

/// First capture group of the first rule that matches.
fn first_capture(rules: &[CaptureRule], text: &str) -> Option<String> {
    rules.iter().find_map(|rule| {
        rule.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| normalize::clean_capture(m.as_str()).to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Up to `count` characters before byte offset `end`, lowercased.
fn preceding_chars(text: &str, end: usize, count: usize) -> String {
    let mut chars: Vec<char> = text[..end].chars().rev().take(count).collect();
    chars.reverse();
    chars.into_iter().collect::<String>().to_lowercase()
}
