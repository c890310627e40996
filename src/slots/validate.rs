use serde::Serialize;

use super::Slots;

/// How many valid app names a suggestion lists.
const MAX_SUGGESTED_APPS: usize = 5;

/// Outcome of cross-checking slots against known values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    fn valid() -> Self {
        Self {
            is_valid: true,
            warnings: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

/// Checks extracted slots against the apps and environments that exist.
///
/// Unknown values only warn. The one hard failure is a query that names no
/// app, environment, time range or date at all.
#[derive(Debug, Clone, Default)]
pub struct SlotValidator {
    valid_apps: Vec<String>,
    valid_envs: Vec<String>,
}

impl SlotValidator {
    /// Empty lists disable the corresponding soft check.
    pub fn new<A, E>(valid_apps: A, valid_envs: E) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            valid_apps: valid_apps
                .into_iter()
                .map(|app| app.as_ref().to_lowercase())
                .collect(),
            valid_envs: valid_envs
                .into_iter()
                .map(|env| env.as_ref().to_uppercase())
                .collect(),
        }
    }

    pub fn validate(&self, slots: &Slots) -> ValidationResult {
        let mut result = ValidationResult::valid();

        if let Some(app) = &slots.app_name {
            if !self.valid_apps.is_empty() && !self.valid_apps.contains(&app.to_lowercase()) {
                result
                    .warnings
                    .push(format!("App '{}' not found in database", app));
                let shown: Vec<&str> = self
                    .valid_apps
                    .iter()
                    .take(MAX_SUGGESTED_APPS)
                    .map(String::as_str)
                    .collect();
                result
                    .suggestions
                    .push(format!("Valid apps: {}", shown.join(", ")));
            }
        }

        if let Some(env) = slots.environment {
            if !self.valid_envs.is_empty() && !self.valid_envs.iter().any(|valid| valid == env.as_str()) {
                result
                    .warnings
                    .push(format!("Environment '{}' not found in database", env));
                result
                    .suggestions
                    .push(format!("Valid environments: {}", self.valid_envs.join(", ")));
            }
        }

        if slots.is_too_vague() {
            result.is_valid = false;
            result.warnings.push(
                "Query too vague - please specify app, environment, or time range".to_string(),
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::{Environment, TimeRange, TimeUnit};

    fn validator() -> SlotValidator {
        SlotValidator::new(
            ["frontend", "backend", "api-gateway", "auth-service", "user-service", "billing"],
            ["PROD", "STAGING", "DEV", "QA"],
        )
    }

    #[test]
    fn known_values_pass_cleanly() {
        let mut slots = Slots::empty("q");
        slots.app_name = Some("Frontend".into());
        slots.environment = Some(Environment::Prod);

        let result = validator().validate(&slots);
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn unknown_app_warns_but_stays_valid() {
        let mut slots = Slots::empty("q");
        slots.app_name = Some("payments".into());

        let result = validator().validate(&slots);
        assert!(result.is_valid);
        assert_eq!(result.warnings, ["App 'payments' not found in database"]);
        assert_eq!(
            result.suggestions,
            ["Valid apps: frontend, backend, api-gateway, auth-service, user-service"]
        );
    }

    #[test]
    fn unknown_environment_warns_but_stays_valid() {
        let mut slots = Slots::empty("q");
        slots.environment = Some(Environment::Qa);

        let result = SlotValidator::new(Vec::<String>::new(), ["prod", "dev"]).validate(&slots);
        assert!(result.is_valid);
        assert_eq!(result.warnings, ["Environment 'QA' not found in database"]);
        assert_eq!(result.suggestions, ["Valid environments: PROD, DEV"]);
    }

    #[test]
    fn empty_reference_lists_skip_soft_checks() {
        let mut slots = Slots::empty("q");
        slots.app_name = Some("anything".into());
        let result = SlotValidator::default().validate(&slots);
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn query_without_core_slots_is_invalid() {
        let mut slots = Slots::empty("show me stuff");
        slots.limit = Some(10);

        let result = validator().validate(&slots);
        assert!(!result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("Query too vague"));
    }

    #[test]
    fn any_single_core_slot_is_enough() {
        let mut slots = Slots::empty("q");
        slots.time_range = Some(TimeRange::new(2, TimeUnit::Days, "last 2 days"));
        assert!(validator().validate(&slots).is_valid);
    }
}
