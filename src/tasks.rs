use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EeError;

/// Long-running operation as returned by the `operations` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub metadata: OperationMetadata,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    #[serde(default)]
    pub state: String,
    #[serde(default, rename = "type")]
    pub operation_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub batch_eecu_usage_seconds: Option<f64>,
}

pub trait TaskClient: Send + Sync {
    fn list_operations(&self) -> Result<Vec<Operation>, EeError>;
}

impl<T: TaskClient + ?Sized> TaskClient for &T {
    fn list_operations(&self) -> Result<Vec<Operation>, EeError> {
        (**self).list_operations()
    }
}

/// A fixed set of operations, for the demo browser and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTasks(pub Vec<Operation>);

impl TaskClient for StaticTasks {
    fn list_operations(&self) -> Result<Vec<Operation>, EeError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskSummary {
    pub id: String,
    pub description: String,
    pub state: String,
    pub operation_type: String,
    pub attempted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumption: Option<String>,
    pub status_icon: &'static str,
    pub status_color: &'static str,
    pub type_icon: &'static str,
}

impl TaskSummary {
    pub fn from_operation(operation: &Operation) -> Self {
        let meta = &operation.metadata;
        let finished = matches!(meta.state.as_str(), "SUCCEEDED" | "FAILED");
        let runtime = if finished {
            runtime(meta.start_time.as_deref(), meta.end_time.as_deref())
        } else {
            None
        };
        let consumption = (meta.state == "SUCCEEDED")
            .then_some(meta.batch_eecu_usage_seconds)
            .flatten()
            .map(|eecu| format!("{eecu:.6} EECU/s"));
        let (status_icon, status_color) = status_icon(&meta.state);

        Self {
            id: operation
                .name
                .rsplit('/')
                .next()
                .unwrap_or(&operation.name)
                .to_string(),
            description: meta.description.clone(),
            state: meta.state.clone(),
            operation_type: meta.operation_type.clone(),
            attempted: format!("{} time", meta.attempt),
            runtime,
            consumption,
            status_icon,
            status_color,
            type_icon: type_icon(&meta.operation_type),
        }
    }

    /// Key/value lines shown in the expanded task panel.
    pub fn details(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![
            ("id", self.id.clone()),
            ("phase", self.state.clone()),
            ("attempted", self.attempted.clone()),
        ];
        if let Some(runtime) = &self.runtime {
            lines.push(("runtime", runtime.clone()));
        }
        if let Some(consumption) = &self.consumption {
            lines.push(("consumption", consumption.clone()));
        }
        lines
    }
}

pub fn list_tasks<T: TaskClient + ?Sized>(client: &T) -> Result<Vec<TaskSummary>, EeError> {
    Ok(client
        .list_operations()?
        .iter()
        .map(TaskSummary::from_operation)
        .collect())
}

fn runtime(start: Option<&str>, end: Option<&str>) -> Option<String> {
    let start = parse_time(start?)?;
    let end = parse_time(end?)?;
    let seconds = (end - start).num_seconds().max(0);
    let (hours, rest) = (seconds / 3600, seconds % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    Some(format!("{hours:02}:{minutes:02}:{seconds:02}"))
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

pub fn status_icon(state: &str) -> (&'static str, &'static str) {
    match state {
        "RUNNING" => ("mdi-cog", "primary"),
        "SUCCEEDED" => ("mdi-check", "success"),
        "FAILED" => ("mdi-alert", "error"),
        _ => ("mdi-timer-sand", "secondary"),
    }
}

pub fn type_icon(operation_type: &str) -> &'static str {
    match operation_type {
        "EXPORT_IMAGE" => "mdi-image-outline",
        "EXPORT_FEATURES" => "mdi-table",
        _ => "mdi-cog-outline",
    }
}
