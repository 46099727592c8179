//! A single date's task list and the operations that mutate it.
//!
//! Every operation addresses a task by its [`TaskId`]; list position is
//! display order only. Operations on an unknown id change nothing and
//! report `false`. Status is recomputed after any change that can affect
//! it, so [`DateRecord::status`] always agrees with the task list.

use serde::{Deserialize, Serialize};

use crate::datetime::parse_clock_time;
use crate::error::ValidationError;
use crate::task::{
    DayStatus, Mode, Task, TaskCounts, TaskId, TaskState, TaskTemplate, UNTITLED_TASK_TITLE,
    compute_status, count_states,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSlot {
    Start,
    End,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRecord {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    status: DayStatus,
}

impl DateRecord {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            tasks: vec![],
            status: DayStatus::Pending,
        }
    }

    pub fn status(&self) -> DayStatus {
        self.status
    }

    pub fn counts(&self) -> TaskCounts {
        count_states(&self.tasks)
    }

    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Re-derives the stored status; records loaded from older data may
    /// carry a stale or missing value.
    pub fn refresh_status(&mut self) -> bool {
        let status = compute_status(&self.tasks);
        let changed = status != self.status;
        self.status = status;
        changed
    }

    pub fn add_task(&mut self, mode: Mode) -> TaskId {
        let task = Task::new(mode);
        let id = task.id.clone();
        self.tasks.push(task);
        self.refresh_status();
        id
    }

    /// `completed = false` is the un-check path: the task becomes
    /// incomplete with an empty reason.
    pub fn mark_complete(&mut self, id: &TaskId, completed: bool) -> bool {
        let Some(task) = self.task_mut(id) else {
            return false;
        };
        task.state = if completed {
            TaskState::Completed
        } else {
            TaskState::Incomplete {
                reason: String::new(),
            }
        };
        task.editing = false;
        self.refresh_status();
        true
    }

    pub fn mark_incomplete(&mut self, id: &TaskId, reason: &str) -> Result<bool, ValidationError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::EmptyReason);
        }
        let Some(task) = self.task_mut(id) else {
            return Ok(false);
        };
        task.state = TaskState::Incomplete {
            reason: reason.to_string(),
        };
        task.editing = false;
        self.refresh_status();
        Ok(true)
    }

    pub fn set_title(&mut self, id: &TaskId, raw_title: &str) -> bool {
        let Some(task) = self.task_mut(id) else {
            return false;
        };
        let title = raw_title.trim();
        task.title = if title.is_empty() {
            UNTITLED_TASK_TITLE.to_string()
        } else {
            title.to_string()
        };
        task.editing = false;
        true
    }

    pub fn set_time(
        &mut self,
        id: &TaskId,
        slot: TimeSlot,
        value: &str,
    ) -> Result<bool, ValidationError> {
        let time = parse_clock_time(value)?;
        let Some(task) = self.task_mut(id) else {
            return Ok(false);
        };
        match slot {
            TimeSlot::Start => task.start_time = Some(time),
            TimeSlot::End => task.end_time = Some(time),
        }
        Ok(true)
    }

    pub fn toggle_editing(&mut self, id: &TaskId) -> bool {
        let Some(task) = self.task_mut(id) else {
            return false;
        };
        task.editing = !task.editing;
        true
    }

    pub fn delete_task(&mut self, id: &TaskId) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        self.tasks.remove(idx);
        self.refresh_status();
        true
    }

    /// Fills an empty list from template entries. Returns `false` and
    /// leaves the record alone when it already has tasks.
    pub fn apply_template(&mut self, templates: &[TaskTemplate]) -> bool {
        if !self.tasks.is_empty() || templates.is_empty() {
            return false;
        }
        self.tasks = templates.iter().map(Task::from_template).collect();
        self.mode = if templates[0].start_time.is_some() {
            Mode::Time
        } else {
            Mode::Simple
        };
        self.refresh_status();
        true
    }

    fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }
}
