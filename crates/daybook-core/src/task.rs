use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::datetime::clock_serde;
use crate::error::ValidationError;

pub const NEW_TASK_TITLE: &str = "New Task";
pub const UNTITLED_TASK_TITLE: &str = "Untitled Task";

/// Which editor applies to a date's task list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Time,
    Simple,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Time => "time",
            Mode::Simple => "simple",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" | "a" => Ok(Mode::Time),
            "simple" | "b" => Ok(Mode::Simple),
            other => Err(ValidationError::UnknownMode(other.to_string())),
        }
    }
}

/// Aggregate completion state of a date's task list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    #[default]
    Pending,
    Partial,
    Completed,
    Missed,
}

impl DayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DayStatus::Pending => "pending",
            DayStatus::Partial => "partial",
            DayStatus::Completed => "completed",
            DayStatus::Missed => "missed",
        }
    }
}

/// Opaque task identifier. Fresh ids are random v4 UUIDs; numeric ids
/// written by older clients are kept as their decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, enough to tell tasks of one day apart.
    /// Numeric ids are millisecond timestamps whose leading digits are
    /// shared, so they are shown whole.
    pub fn short(&self) -> &str {
        if self.0.bytes().all(|b| b.is_ascii_digit()) {
            return &self.0;
        }
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => TaskId(text),
            RawId::Number(num) => TaskId(num.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Pending,
    Completed,
    /// `reason` is empty only when a completed task was unchecked.
    Incomplete { reason: String },
}

impl TaskState {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskState::Completed)
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, TaskState::Incomplete { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            TaskState::Incomplete { reason } => Some(reason.as_str()),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Completed => "done",
            TaskState::Incomplete { .. } => "missed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredTask", into = "StoredTask")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub state: TaskState,
    pub editing: bool,
}

impl Task {
    pub fn new(mode: Mode) -> Self {
        let (start_time, end_time) = match mode {
            Mode::Time => (
                NaiveTime::from_hms_opt(9, 0, 0),
                NaiveTime::from_hms_opt(10, 0, 0),
            ),
            Mode::Simple => (None, None),
        };
        Self {
            id: TaskId::generate(),
            title: NEW_TASK_TITLE.to_string(),
            start_time,
            end_time,
            state: TaskState::Pending,
            editing: true,
        }
    }

    pub fn from_template(template: &TaskTemplate) -> Self {
        Self {
            id: TaskId::generate(),
            title: template.title.clone(),
            start_time: template.start_time,
            end_time: template.end_time,
            state: TaskState::Pending,
            editing: false,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED_TASK_TITLE
        } else {
            &self.title
        }
    }
}

/// On-disk shape: the three completion flags as separate fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
    id: TaskId,
    #[serde(default)]
    title: String,
    #[serde(
        default,
        with = "clock_serde",
        skip_serializing_if = "Option::is_none"
    )]
    start_time: Option<NaiveTime>,
    #[serde(
        default,
        with = "clock_serde",
        skip_serializing_if = "Option::is_none"
    )]
    end_time: Option<NaiveTime>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    incomplete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(default)]
    editing: bool,
}

impl From<StoredTask> for Task {
    fn from(raw: StoredTask) -> Self {
        // `completed` wins if both flags were somehow set.
        let state = if raw.completed {
            TaskState::Completed
        } else if raw.incomplete {
            TaskState::Incomplete {
                reason: raw.reason.unwrap_or_default(),
            }
        } else {
            TaskState::Pending
        };
        Self {
            id: raw.id,
            title: raw.title,
            start_time: raw.start_time,
            end_time: raw.end_time,
            state,
            editing: raw.editing,
        }
    }
}

impl From<Task> for StoredTask {
    fn from(task: Task) -> Self {
        let (completed, incomplete, reason) = match task.state {
            TaskState::Pending => (false, false, None),
            TaskState::Completed => (true, false, None),
            TaskState::Incomplete { reason } => (false, true, Some(reason)),
        };
        Self {
            id: task.id,
            title: task.title,
            start_time: task.start_time,
            end_time: task.end_time,
            completed,
            incomplete,
            reason,
            editing: task.editing,
        }
    }
}

/// A reusable task definition in the weekly template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    #[serde(default)]
    pub title: String,
    #[serde(
        default,
        with = "clock_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<NaiveTime>,
    #[serde(
        default,
        with = "clock_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<NaiveTime>,
}

impl TaskTemplate {
    pub fn simple(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            start_time: None,
            end_time: None,
        }
    }

    pub fn timed(title: impl Into<String>, start: NaiveTime, end: Option<NaiveTime>) -> Self {
        Self {
            title: title.into(),
            start_time: Some(start),
            end_time: end,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub completed: usize,
    pub incomplete: usize,
    pub pending: usize,
}

pub fn compute_status(tasks: &[Task]) -> DayStatus {
    if tasks.is_empty() {
        return DayStatus::Pending;
    }
    if tasks.iter().all(|t| t.state.is_incomplete()) {
        DayStatus::Missed
    } else if tasks.iter().all(|t| t.state.is_completed()) {
        DayStatus::Completed
    } else {
        DayStatus::Partial
    }
}

pub fn count_states(tasks: &[Task]) -> TaskCounts {
    tasks.iter().fold(TaskCounts::default(), |mut acc, task| {
        match task.state {
            TaskState::Pending => acc.pending += 1,
            TaskState::Completed => acc.completed += 1,
            TaskState::Incomplete { .. } => acc.incomplete += 1,
        }
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_state(state: TaskState) -> Task {
        let mut task = Task::new(Mode::Simple);
        task.state = state;
        task
    }

    fn missed() -> Task {
        with_state(TaskState::Incomplete {
            reason: "sick".to_string(),
        })
    }

    #[test]
    fn status_of_empty_list_is_pending() {
        assert_eq!(compute_status(&[]), DayStatus::Pending);
    }

    #[test]
    fn status_follows_task_states() {
        let done = with_state(TaskState::Completed);
        let pending = with_state(TaskState::Pending);

        assert_eq!(compute_status(&[done.clone(), done.clone()]), DayStatus::Completed);
        assert_eq!(compute_status(&[missed(), missed()]), DayStatus::Missed);
        assert_eq!(compute_status(&[missed(), done.clone()]), DayStatus::Partial);
        assert_eq!(compute_status(&[pending.clone(), done]), DayStatus::Partial);
        assert_eq!(compute_status(&[pending]), DayStatus::Partial);
    }

    #[test]
    fn counts_each_state() {
        let tasks = vec![
            with_state(TaskState::Completed),
            missed(),
            with_state(TaskState::Pending),
            with_state(TaskState::Pending),
        ];
        assert_eq!(
            count_states(&tasks),
            TaskCounts {
                completed: 1,
                incomplete: 1,
                pending: 2,
            }
        );
    }

    #[test]
    fn loads_legacy_browser_task() {
        let raw = r#"{"id":1729331200000,"title":"Read","startTime":"09:00","endTime":"","completed":false,"incomplete":true,"reason":"tired","editing":false}"#;
        let task: Task = serde_json::from_str(raw).expect("legacy task");
        assert_eq!(task.id.as_str(), "1729331200000");
        assert_eq!(task.end_time, None);
        assert_eq!(task.state.reason(), Some("tired"));
    }

    #[test]
    fn stored_shape_uses_flag_fields() {
        let mut task = Task::new(Mode::Time);
        task.state = TaskState::Completed;
        let value = serde_json::to_value(&task).expect("serialize");
        assert_eq!(value["completed"], true);
        assert_eq!(value["incomplete"], false);
        assert_eq!(value["startTime"], "09:00");
        assert!(value.get("reason").is_none());
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn numeric_ids_show_in_full() {
        let first: TaskId = serde_json::from_str("1729300000000").expect("numeric id");
        let second: TaskId = serde_json::from_str("1729300000001").expect("numeric id");
        assert_eq!(first.short(), "1729300000000");
        assert_ne!(first.short(), second.short());
    }
}
