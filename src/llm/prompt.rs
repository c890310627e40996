use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::InstructionError;
use crate::db::TableInfo;
use crate::slots::{OperationType, Slots};

const TEMPLATE_NAME: &str = "generation_instruction.txt";

/// Target dialect and the column time filters apply to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub dialect: String,
    pub date_column: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            dialect: "DuckDB".to_string(),
            date_column: "date".to_string(),
        }
    }
}

/// Renders the instruction handed to the SQL generator on a cache miss.
///
/// Output depends only on the slots and the schema snapshot, never on the
/// clock, so identical inputs always produce identical text.
pub struct InstructionBuilder {
    env: Environment<'static>,
    settings: GenerationSettings,
}

impl InstructionBuilder {
    pub fn new(settings: GenerationSettings) -> Result<Self, InstructionError> {
        let mut env = Environment::new();
        env.add_template(
            TEMPLATE_NAME,
            include_str!("../../templates/generation_instruction.txt"),
        )?;
        Ok(Self { env, settings })
    }

    pub fn render(&self, slots: &Slots, schema: &TableInfo) -> Result<String, InstructionError> {
        let columns = schema
            .columns
            .iter()
            .map(|col| format!("{} ({})", col.name, col.data_type))
            .collect::<Vec<_>>()
            .join(", ");
        let sample_data = serde_json::to_string_pretty(&schema.sample_values)?;

        let template = self.env.get_template(TEMPLATE_NAME)?;
        let rendered = template.render(context! {
            dialect => &self.settings.dialect,
            user_query => &slots.raw_query,
            app_name => slots.app_name.as_deref().unwrap_or("Any"),
            environment => slots.environment.map(|e| e.as_str()).unwrap_or("Any"),
            time_range => slots
                .time_range
                .as_ref()
                .map(|r| format!("{} {}", r.value, r.unit))
                .unwrap_or_else(|| "None".to_string()),
            specific_date => slots.specific_date_iso().unwrap_or_else(|| "None".to_string()),
            version => slots.version.as_deref().unwrap_or("Any"),
            branch => slots.branch.as_deref().unwrap_or("Any"),
            limit => slots
                .limit
                .map(|l| l.to_string())
                .unwrap_or_else(|| "No limit".to_string()),
            operation => slots.operation_type.as_str(),
            table_name => &schema.table_name,
            columns => columns,
            sample_data => sample_data,
            requirements => self.requirements(slots, &schema.table_name),
        })?;

        debug!("Rendered generation instruction for {}", schema.table_name);
        Ok(rendered)
    }

    /// The numbered requirement lines, in the order they are rendered.
    pub fn requirements(&self, slots: &Slots, table: &str) -> Vec<String> {
        let date_column = &self.settings.date_column;
        let mut out = vec![format!("Query the {} table", table)];

        out.push(match slots.operation_type {
            OperationType::Count => "Return the number of matching rows using COUNT(*)".to_string(),
            OperationType::SelectLatest => "Return the most recent matching rows".to_string(),
            OperationType::Select => "Return the matching rows".to_string(),
        });

        if let Some(app) = &slots.app_name {
            out.push(format!("Filter by app_name = '{}'", app));
        }
        if let Some(env) = slots.environment {
            out.push(format!("Filter by deploy_env = '{}'", env));
        }
        if let Some(version) = &slots.version {
            out.push(format!("Filter by app_version = '{}' if the table has that column", version));
        }
        if let Some(branch) = &slots.branch {
            out.push(format!("Filter by branch = '{}' if the table has that column", branch));
        }

        out.push(match (&slots.specific_date_iso(), &slots.time_range) {
            (Some(date), _) => format!("Filter by {} = '{}'", date_column, date),
            (None, Some(range)) => format!(
                "Filter by {} >= CURRENT_DATE - INTERVAL '{}'",
                date_column,
                range.interval_literal()
            ),
            (None, None) => "No time filter needed".to_string(),
        });

        if slots.operation_type != OperationType::Count {
            out.push(format!("Order by {} DESC", date_column));
        }

        out.push(match slots.limit {
            Some(limit) => format!("Limit to {} results", limit),
            None => "No limit".to_string(),
        });

        out
    }
}
