//! Milestone and task data structures.
//!
//! A milestone is one phase of the graduate programme. It owns an ordered list
//! of checkbox-style tasks, and its status is derived from how many of those
//! tasks the student has ticked.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::fields::*;

/// Opaque milestone identifier, unique within a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneId(pub String);

/// Opaque task identifier, unique within its milestone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

/// Opaque identifier of the signed-in graduate, as returned by `/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraduateId(pub String);

impl fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for GraduateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single unit of work inside a milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "task_id")]
    pub id: TaskId,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

/// A named phase of the programme with its ordered tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    #[serde(rename = "milestone_id")]
    pub id: MilestoneId,
    pub week_label: String,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default = "default_status")]
    pub status: MilestoneStatus,
    #[serde(default)]
    pub admin_status: Option<AdminStatus>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_status() -> MilestoneStatus {
    MilestoneStatus::Upcoming
}

/// Accept RFC 3339 timestamps and treat anything else as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}

/// Derive a milestone status from its tasks.
///
/// An empty task list is `Upcoming`, never vacuously `Completed`.
pub fn derive_status(tasks: &[Task]) -> MilestoneStatus {
    let done = tasks.iter().filter(|t| t.completed).count();
    if tasks.is_empty() || done == 0 {
        MilestoneStatus::Upcoming
    } else if done == tasks.len() {
        MilestoneStatus::Completed
    } else {
        MilestoneStatus::InProgress
    }
}

impl Milestone {
    /// Number of tasks the student has ticked.
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    /// Whether an administrator has marked this milestone completed.
    ///
    /// A locked milestone renders as completed and rejects toggles, while its
    /// underlying task data stays untouched.
    pub fn is_admin_locked(&self) -> bool {
        self.admin_status == Some(AdminStatus::Completed)
    }

    /// Status to show, with the administrative override applied.
    pub fn display_status(&self) -> MilestoneStatus {
        if self.is_admin_locked() {
            MilestoneStatus::Completed
        } else {
            self.status
        }
    }

    /// Whether a task should be shown as ticked.
    pub fn shows_task_completed(&self, task: &Task) -> bool {
        self.is_admin_locked() || task.completed
    }

    /// Number of tasks shown as ticked, with the override applied.
    pub fn displayed_completed_count(&self) -> usize {
        if self.is_admin_locked() {
            self.tasks.len()
        } else {
            self.completed_count()
        }
    }

    /// Displayed completion as a whole percentage; 0 for an empty milestone.
    pub fn progress_percent(&self) -> u8 {
        percent(self.displayed_completed_count(), self.tasks.len())
    }
}

/// Aggregated progress across a whole timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverallProgress {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub percent: u8,
    pub total_milestones: usize,
    pub completed_milestones: usize,
}

impl OverallProgress {
    /// Summarise a milestone list as shown to the student.
    pub fn from_milestones(milestones: &[Milestone]) -> Self {
        let total_tasks = milestones.iter().map(|m| m.tasks.len()).sum();
        let completed_tasks = milestones.iter().map(|m| m.displayed_completed_count()).sum();
        let completed_milestones = milestones
            .iter()
            .filter(|m| m.display_status() == MilestoneStatus::Completed)
            .count();

        OverallProgress {
            total_tasks,
            completed_tasks,
            percent: percent(completed_tasks, total_tasks),
            total_milestones: milestones.len(),
            completed_milestones,
        }
    }
}

/// Rounded percentage of `part` in `whole`, 0 when `whole` is 0.
fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u8
}
