//! Milestone progress controller.
//!
//! [`Timeline`] owns the ordered milestone list for one view's lifetime. It
//! keeps every milestone's status consistent with its tasks, applies task
//! toggles optimistically, and hands the resulting backend request back to
//! the caller. The caller reports the outcome through [`Timeline::settle`].
//! On failure the list is restored from the snapshot taken when the toggle
//! started.
//!
//! Toggles are serialized: while one sync is in flight, further toggles are
//! queued and only applied once it settles, so a rollback never discards
//! another toggle's edit.
//!
//! Side effects the view should perform (celebration, scrolling a neighbour
//! into view) are returned as [`Effect`] values rather than performed here.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::fields::MilestoneStatus;
use crate::milestone::{derive_status, GraduateId, Milestone, MilestoneId, TaskId};

/// Reasons a toggle or load is refused. None of these change any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("milestone is marked completed by an administrator")]
    AdminLocked,

    #[error("no milestone at position {0}")]
    NoSuchMilestone(usize),

    #[error("milestone {milestone} has no task at position {task}")]
    NoSuchTask { milestone: usize, task: usize },

    #[error("not signed in")]
    NotAuthenticated,

    #[error("a task update is still being saved")]
    SyncInFlight,
}

/// A side effect for the hosting view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// A milestone was completed for the first time since it was last open.
    Celebrate { milestone_id: MilestoneId, title: String },
    /// Bring the milestone at this index into view once `after` has elapsed.
    ScrollTo { milestone_index: usize, after: Duration },
}

/// The backend call that confirms an optimistic toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub graduate_id: GraduateId,
    pub task_id: TaskId,
    pub completed: bool,
}

/// A toggle that has been applied locally and now needs confirming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedToggle {
    pub request: SyncRequest,
    pub effects: Vec<Effect>,
}

/// Result of asking for a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Applied locally; dispatch `request` to the backend.
    Started(StartedToggle),
    /// Another toggle is being saved; this one runs after it settles.
    Queued,
}

/// How an in-flight toggle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Confirmed,
    RolledBack(ApiError),
    /// `settle` was called with nothing in flight.
    Idle,
}

/// Result of settling a sync, plus the next queued toggle if one started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub outcome: SyncOutcome,
    pub next: Option<StartedToggle>,
}

/// Copy of the controller state taken before a toggle is applied.
#[derive(Debug, Clone)]
struct Snapshot {
    milestones: Vec<Milestone>,
    seen_completed: HashSet<MilestoneId>,
}

/// A toggle waiting behind the in-flight one, with the value the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueuedToggle {
    milestone_index: usize,
    task_index: usize,
    completed: bool,
}

#[derive(Debug)]
struct InFlight {
    snapshot: Snapshot,
    request: SyncRequest,
}

/// In-memory milestone list with optimistic, rollback-capable task toggles.
#[derive(Debug)]
pub struct Timeline {
    milestones: Vec<Milestone>,
    seen_completed: HashSet<MilestoneId>,
    graduate: Option<GraduateId>,
    scroll_delay: Duration,
    in_flight: Option<InFlight>,
    queued: VecDeque<QueuedToggle>,
}

impl Timeline {
    /// Create an empty timeline with no signed-in graduate. Neighbouring
    /// milestones are scrolled into view `scroll_delay` after a toggle.
    pub fn new(scroll_delay: Duration) -> Self {
        Timeline {
            milestones: Vec::new(),
            seen_completed: HashSet::new(),
            graduate: None,
            scroll_delay,
            in_flight: None,
            queued: VecDeque::new(),
        }
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn graduate(&self) -> Option<&GraduateId> {
        self.graduate.as_ref()
    }

    /// Set or clear the graduate that toggles are saved for.
    pub fn set_graduate(&mut self, graduate: Option<GraduateId>) {
        self.graduate = graduate;
    }

    /// Whether a sync is waiting on the backend.
    pub fn is_syncing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Number of toggles waiting behind the in-flight one.
    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Replace the whole list with freshly fetched milestones.
    ///
    /// Statuses are re-derived from tasks, and milestones that are already
    /// completed are recorded as seen so loading never celebrates.
    pub fn replace(&mut self, milestones: Vec<Milestone>) -> Result<(), TimelineError> {
        if self.in_flight.is_some() {
            return Err(TimelineError::SyncInFlight);
        }
        self.milestones = milestones;
        self.queued.clear();
        self.refresh_statuses();
        self.seen_completed = self
            .milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Completed)
            .map(|m| m.id.clone())
            .collect();
        debug!(count = self.milestones.len(), "timeline replaced");
        Ok(())
    }

    /// Bring every milestone's status back in line with its tasks.
    ///
    /// Never emits effects; a milestone that is still completed stays seen.
    pub fn refresh_statuses(&mut self) {
        for milestone in &mut self.milestones {
            let derived = derive_status(&milestone.tasks);
            if milestone.status != derived {
                debug!(
                    milestone = %milestone.id,
                    from = ?milestone.status,
                    to = ?derived,
                    "status re-derived"
                );
                milestone.status = derived;
            }
        }
    }

    /// Check that a toggle could be applied right now.
    fn check_toggle(
        &self,
        milestone_index: usize,
        task_index: usize,
    ) -> Result<(), TimelineError> {
        if self.graduate.is_none() {
            return Err(TimelineError::NotAuthenticated);
        }
        let milestone = self
            .milestones
            .get(milestone_index)
            .ok_or(TimelineError::NoSuchMilestone(milestone_index))?;
        if milestone.is_admin_locked() {
            return Err(TimelineError::AdminLocked);
        }
        if task_index >= milestone.tasks.len() {
            return Err(TimelineError::NoSuchTask {
                milestone: milestone_index,
                task: task_index,
            });
        }
        Ok(())
    }

    /// Toggle one task's completion.
    ///
    /// On `Started`, the change is already visible in [`Timeline::milestones`]
    /// and the returned request must be sent to the backend, with the result
    /// passed to [`Timeline::settle`].
    pub fn toggle_task(
        &mut self,
        milestone_index: usize,
        task_index: usize,
    ) -> Result<ToggleOutcome, TimelineError> {
        self.check_toggle(milestone_index, task_index)?;

        // A toggle flips what the user currently sees, including any
        // earlier toggles of the same task still waiting in the queue.
        let shown = self
            .queued
            .iter()
            .rev()
            .find(|q| q.milestone_index == milestone_index && q.task_index == task_index)
            .map_or(
                self.milestones[milestone_index].tasks[task_index].completed,
                |q| q.completed,
            );
        let completed = !shown;

        if self.in_flight.is_some() {
            debug!(milestone_index, task_index, completed, "toggle queued behind in-flight sync");
            self.queued.push_back(QueuedToggle {
                milestone_index,
                task_index,
                completed,
            });
            return Ok(ToggleOutcome::Queued);
        }

        Ok(ToggleOutcome::Started(self.start(milestone_index, task_index, completed)))
    }

    /// Record the backend's answer for the in-flight toggle.
    ///
    /// A failure restores the list exactly as it was before that toggle.
    /// Either way, the next queued toggle (if any) is started and returned.
    pub fn settle(&mut self, result: Result<(), ApiError>) -> Settlement {
        let Some(in_flight) = self.in_flight.take() else {
            warn!("sync result arrived with nothing in flight");
            return Settlement {
                outcome: SyncOutcome::Idle,
                next: None,
            };
        };

        let outcome = match result {
            Ok(()) => {
                info!(
                    task = %in_flight.request.task_id,
                    completed = in_flight.request.completed,
                    "task progress saved"
                );
                SyncOutcome::Confirmed
            }
            Err(e) => {
                warn!(
                    task = %in_flight.request.task_id,
                    error = %e,
                    "task progress not saved, rolling back"
                );
                self.milestones = in_flight.snapshot.milestones;
                self.seen_completed = in_flight.snapshot.seen_completed;
                SyncOutcome::RolledBack(e)
            }
        };

        Settlement {
            outcome,
            next: self.start_next_queued(),
        }
    }

    /// Start queued toggles in order until one applies.
    ///
    /// A queued toggle whose task already holds the requested value (for
    /// example after the toggle before it was rolled back) is dropped.
    fn start_next_queued(&mut self) -> Option<StartedToggle> {
        while let Some(queued) = self.queued.pop_front() {
            let QueuedToggle {
                milestone_index,
                task_index,
                completed,
            } = queued;
            if let Err(e) = self.check_toggle(milestone_index, task_index) {
                debug!(milestone_index, task_index, error = %e, "dropping queued toggle");
                continue;
            }
            if self.milestones[milestone_index].tasks[task_index].completed == completed {
                debug!(milestone_index, task_index, completed, "queued toggle already satisfied");
                continue;
            }
            return Some(self.start(milestone_index, task_index, completed));
        }
        None
    }

    /// Snapshot, apply optimistically, and mark the request in flight.
    fn start(
        &mut self,
        milestone_index: usize,
        task_index: usize,
        completed: bool,
    ) -> StartedToggle {
        let snapshot = Snapshot {
            milestones: self.milestones.clone(),
            seen_completed: self.seen_completed.clone(),
        };
        let (task_id, effects) = self.apply(milestone_index, task_index, completed);
        let request = SyncRequest {
            // check_toggle guarantees a graduate
            graduate_id: self.graduate.clone().unwrap_or_else(|| GraduateId(String::new())),
            task_id,
            completed,
        };
        self.in_flight = Some(InFlight {
            snapshot,
            request: request.clone(),
        });
        StartedToggle { request, effects }
    }

    /// Set a task's completion and run the status, celebration and cascade rules.
    fn apply(
        &mut self,
        milestone_index: usize,
        task_index: usize,
        completed: bool,
    ) -> (TaskId, Vec<Effect>) {
        let mut effects = Vec::new();
        let scroll_delay = self.scroll_delay;

        let milestone = &mut self.milestones[milestone_index];
        let old_status = milestone.status;
        let task = &mut milestone.tasks[task_index];
        task.completed = completed;
        let task_id = task.id.clone();

        let new_status = derive_status(&milestone.tasks);
        milestone.status = new_status;
        let milestone_id = milestone.id.clone();
        let title = milestone.title.clone();
        debug!(
            milestone = %milestone_id,
            task = %task_id,
            completed,
            from = ?old_status,
            to = ?new_status,
            "task toggled"
        );

        if new_status == MilestoneStatus::Completed
            && self.seen_completed.insert(milestone_id.clone())
        {
            effects.push(Effect::Celebrate {
                milestone_id: milestone_id.clone(),
                title,
            });
            if let Some(next) = self.milestones.get_mut(milestone_index + 1) {
                if next.status == MilestoneStatus::Upcoming {
                    debug!(milestone = %next.id, "opening next milestone");
                    next.status = MilestoneStatus::InProgress;
                }
                effects.push(Effect::ScrollTo {
                    milestone_index: milestone_index + 1,
                    after: scroll_delay,
                });
            }
        }

        if old_status == MilestoneStatus::Completed && new_status != MilestoneStatus::Completed {
            self.seen_completed.remove(&milestone_id);
            if let Some(next) = self.milestones.get_mut(milestone_index + 1) {
                if next.status == MilestoneStatus::InProgress && next.completed_count() == 0 {
                    debug!(milestone = %next.id, "closing next milestone again");
                    next.status = MilestoneStatus::Upcoming;
                }
            }
        }

        if old_status.is_active()
            && new_status == MilestoneStatus::Upcoming
            && milestone_index > 0
        {
            effects.push(Effect::ScrollTo {
                milestone_index: milestone_index - 1,
                after: scroll_delay,
            });
        }

        (task_id, effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::AdminStatus;
    use crate::milestone::tests::milestone;

    fn timeline(list: Vec<Milestone>) -> Timeline {
        let mut t = Timeline::new(Duration::from_millis(300));
        t.replace(list).unwrap();
        t.set_graduate(Some(GraduateId("grad-1".to_string())));
        t
    }

    fn started(outcome: ToggleOutcome) -> StartedToggle {
        match outcome {
            ToggleOutcome::Started(s) => s,
            ToggleOutcome::Queued => panic!("expected toggle to start"),
        }
    }

    fn celebrations(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::Celebrate { .. }))
            .count()
    }

    #[test]
    fn test_toggle_applies_before_sync() {
        let mut t = timeline(vec![milestone("m0", &[false, false])]);
        let s = started(t.toggle_task(0, 0).unwrap());
        assert_eq!(s.request.task_id, TaskId("m0-t0".to_string()));
        assert!(s.request.completed);
        assert_eq!(s.request.graduate_id, GraduateId("grad-1".to_string()));
        assert!(t.milestones()[0].tasks[0].completed);
        assert_eq!(t.milestones()[0].status, MilestoneStatus::InProgress);
        assert!(t.is_syncing());

        assert_eq!(t.settle(Ok(())).outcome, SyncOutcome::Confirmed);
        assert!(!t.is_syncing());
        assert!(t.milestones()[0].tasks[0].completed);
    }

    #[test]
    fn test_status_follows_tasks_after_each_toggle() {
        let mut t = timeline(vec![milestone("m0", &[false, false])]);
        let expected = [
            ((0, 0), MilestoneStatus::InProgress),
            ((0, 1), MilestoneStatus::Completed),
            ((0, 0), MilestoneStatus::InProgress),
            ((0, 1), MilestoneStatus::Upcoming),
        ];
        for ((m, k), status) in expected {
            started(t.toggle_task(m, k).unwrap());
            t.settle(Ok(()));
            let ms = &t.milestones()[0];
            assert_eq!(ms.status, status);
            assert_eq!(ms.status, derive_status(&ms.tasks));
        }
    }

    #[test]
    fn test_celebration_fires_once_per_completion() {
        let mut t = timeline(vec![milestone("m0", &[true, false])]);
        let s = started(t.toggle_task(0, 1).unwrap());
        t.settle(Ok(()));
        assert_eq!(celebrations(&s.effects), 1);
        assert_eq!(
            s.effects[0],
            Effect::Celebrate {
                milestone_id: MilestoneId("m0".to_string()),
                title: "Milestone m0".to_string()
            }
        );

        // Re-deriving (a re-render) never celebrates again.
        t.refresh_statuses();
        assert_eq!(t.milestones()[0].status, MilestoneStatus::Completed);

        // Reopening and completing again is a new, distinct completion.
        let off = started(t.toggle_task(0, 1).unwrap());
        t.settle(Ok(()));
        assert_eq!(celebrations(&off.effects), 0);
        let on = started(t.toggle_task(0, 1).unwrap());
        t.settle(Ok(()));
        assert_eq!(celebrations(&on.effects), 1);
    }

    #[test]
    fn test_loading_completed_milestone_does_not_celebrate() {
        let mut t = timeline(vec![
            milestone("m0", &[true, true]),
            milestone("m1", &[false]),
        ]);
        // m1 was never completed, completing it celebrates; m0 was seen on load.
        let s = started(t.toggle_task(1, 0).unwrap());
        t.settle(Ok(()));
        assert_eq!(celebrations(&s.effects), 1);
        assert!(s.effects.contains(&Effect::Celebrate {
            milestone_id: MilestoneId("m1".to_string()),
            title: "Milestone m1".to_string()
        }));
    }

    #[test]
    fn test_cascade_forward_opens_next_milestone() {
        let mut t = timeline(vec![
            milestone("m0", &[true, false]),
            milestone("m1", &[false, false]),
        ]);
        assert_eq!(t.milestones()[1].status, MilestoneStatus::Upcoming);

        let s = started(t.toggle_task(0, 1).unwrap());
        assert_eq!(t.milestones()[0].status, MilestoneStatus::Completed);
        assert_eq!(t.milestones()[1].status, MilestoneStatus::InProgress);
        assert!(s.effects.contains(&Effect::ScrollTo {
            milestone_index: 1,
            after: Duration::from_millis(300)
        }));
        t.settle(Ok(()));
        assert_eq!(t.milestones()[1].status, MilestoneStatus::InProgress);
    }

    #[test]
    fn test_cascade_reversal_closes_untouched_next_milestone() {
        let mut t = timeline(vec![
            milestone("m0", &[true, false]),
            milestone("m1", &[false, false]),
        ]);
        started(t.toggle_task(0, 1).unwrap());
        t.settle(Ok(()));

        let s = started(t.toggle_task(0, 1).unwrap());
        t.settle(Ok(()));
        assert_eq!(t.milestones()[0].status, MilestoneStatus::InProgress);
        assert_eq!(t.milestones()[1].status, MilestoneStatus::Upcoming);
        assert!(s.effects.is_empty());
    }

    #[test]
    fn test_cascade_reversal_keeps_started_next_milestone() {
        let mut t = timeline(vec![milestone("m0", &[true]), milestone("m1", &[false, false])]);
        // m0 was loaded completed; the student then started m1 on their own.
        started(t.toggle_task(1, 0).unwrap());
        t.settle(Ok(()));

        started(t.toggle_task(0, 0).unwrap());
        t.settle(Ok(()));
        assert_eq!(t.milestones()[0].status, MilestoneStatus::Upcoming);
        assert_eq!(t.milestones()[1].status, MilestoneStatus::InProgress);
    }

    #[test]
    fn test_dropping_to_upcoming_scrolls_back() {
        let mut t = timeline(vec![milestone("m0", &[true]), milestone("m1", &[false, false])]);
        started(t.toggle_task(1, 0).unwrap());
        t.settle(Ok(()));

        let s = started(t.toggle_task(1, 0).unwrap());
        assert_eq!(t.milestones()[1].status, MilestoneStatus::Upcoming);
        assert_eq!(
            s.effects,
            vec![Effect::ScrollTo {
                milestone_index: 0,
                after: Duration::from_millis(300)
            }]
        );
    }

    #[test]
    fn test_first_milestone_never_scrolls_back() {
        let mut t = timeline(vec![milestone("m0", &[true])]);
        let s = started(t.toggle_task(0, 0).unwrap());
        assert_eq!(t.milestones()[0].status, MilestoneStatus::Upcoming);
        assert!(s.effects.is_empty());
    }

    #[test]
    fn test_rollback_restores_snapshot_exactly() {
        let list = vec![
            milestone("m0", &[true, false]),
            milestone("m1", &[false, false]),
        ];
        let mut t = timeline(list.clone());

        let s = started(t.toggle_task(0, 1).unwrap());
        assert_eq!(celebrations(&s.effects), 1);
        assert_eq!(t.milestones()[0].status, MilestoneStatus::Completed);
        assert_eq!(t.milestones()[1].status, MilestoneStatus::InProgress);

        let settled = t.settle(Err(ApiError::Transport("connection refused".to_string())));
        assert_eq!(
            settled.outcome,
            SyncOutcome::RolledBack(ApiError::Transport("connection refused".to_string()))
        );
        assert_eq!(t.milestones(), list.as_slice());
        assert_eq!(t.milestones()[0].status, MilestoneStatus::InProgress);
        assert!(!t.milestones()[0].tasks[1].completed);

        // The celebration was rolled back with it, so a retry celebrates again.
        let retry = started(t.toggle_task(0, 1).unwrap());
        assert_eq!(celebrations(&retry.effects), 1);
    }

    #[test]
    fn test_admin_locked_milestone_rejects_toggle() {
        let mut locked = milestone("m0", &[false, false]);
        locked.admin_status = Some(AdminStatus::Completed);
        let mut t = timeline(vec![locked.clone()]);

        assert_eq!(t.toggle_task(0, 0), Err(TimelineError::AdminLocked));
        assert!(!t.is_syncing());
        assert_eq!(t.milestones()[0], locked);
        assert_eq!(t.milestones()[0].display_status(), MilestoneStatus::Completed);
    }

    #[test]
    fn test_missing_graduate_skips_toggle() {
        let mut t = timeline(vec![milestone("m0", &[false])]);
        t.set_graduate(None);
        assert_eq!(t.toggle_task(0, 0), Err(TimelineError::NotAuthenticated));
        assert!(!t.milestones()[0].tasks[0].completed);
        assert!(!t.is_syncing());
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let mut t = timeline(vec![milestone("m0", &[false]), milestone("empty", &[])]);
        assert_eq!(t.toggle_task(5, 0), Err(TimelineError::NoSuchMilestone(5)));
        assert_eq!(
            t.toggle_task(1, 0),
            Err(TimelineError::NoSuchTask { milestone: 1, task: 0 })
        );
    }

    #[test]
    fn test_overlapping_toggles_are_serialized() {
        let mut t = timeline(vec![milestone("m0", &[false, false, false])]);
        let first = started(t.toggle_task(0, 0).unwrap());
        assert_eq!(t.toggle_task(0, 1).unwrap(), ToggleOutcome::Queued);
        assert_eq!(t.queued_len(), 1);
        // The queued toggle is not visible yet.
        assert!(!t.milestones()[0].tasks[1].completed);

        // The first save fails: only its own edit is undone.
        let settled = t.settle(Err(ApiError::Unauthorized));
        assert_eq!(settled.outcome, SyncOutcome::RolledBack(ApiError::Unauthorized));
        assert!(!t.milestones()[0].tasks[0].completed);
        let second = settled.next.expect("queued toggle should start");
        assert_ne!(second.request.task_id, first.request.task_id);
        assert!(t.milestones()[0].tasks[1].completed);

        let settled = t.settle(Ok(()));
        assert_eq!(settled.outcome, SyncOutcome::Confirmed);
        assert!(settled.next.is_none());
        assert_eq!(t.milestones()[0].completed_count(), 1);
    }

    #[test]
    fn test_queued_untick_survives_failed_tick() {
        let mut t = timeline(vec![milestone("m0", &[false, false])]);
        let tick = started(t.toggle_task(0, 0).unwrap());
        assert!(tick.request.completed);
        // The student changes their mind while the tick is still saving.
        assert_eq!(t.toggle_task(0, 0).unwrap(), ToggleOutcome::Queued);

        let settled = t.settle(Err(ApiError::Transport("offline".to_string())));
        assert!(matches!(settled.outcome, SyncOutcome::RolledBack(_)));
        // The rollback already left the task unticked, as last asked.
        assert!(settled.next.is_none());
        assert!(!t.milestones()[0].tasks[0].completed);
        assert!(!t.is_syncing());
        assert_eq!(t.queued_len(), 0);
    }

    #[test]
    fn test_queued_untick_after_confirmed_tick() {
        let mut t = timeline(vec![milestone("m0", &[false, false])]);
        started(t.toggle_task(0, 0).unwrap());
        assert_eq!(t.toggle_task(0, 0).unwrap(), ToggleOutcome::Queued);
        assert_eq!(t.toggle_task(0, 0).unwrap(), ToggleOutcome::Queued);
        assert_eq!(t.toggle_task(0, 0).unwrap(), ToggleOutcome::Queued);

        let settled = t.settle(Ok(()));
        let untick = settled.next.expect("untick should start");
        assert!(!untick.request.completed);
        assert!(!t.milestones()[0].tasks[0].completed);

        let settled = t.settle(Ok(()));
        let retick = settled.next.expect("second tick should start");
        assert!(retick.request.completed);

        // The re-tick fails; the last click was an untick, which already holds.
        let settled = t.settle(Err(ApiError::Unauthorized));
        assert!(settled.next.is_none());
        assert!(!t.milestones()[0].tasks[0].completed);
    }

    #[test]
    fn test_settle_with_nothing_in_flight() {
        let mut t = timeline(vec![milestone("m0", &[false])]);
        let settled = t.settle(Ok(()));
        assert_eq!(settled.outcome, SyncOutcome::Idle);
        assert!(settled.next.is_none());
    }

    #[test]
    fn test_replace_rederives_and_refuses_while_syncing() {
        let mut stale = milestone("m0", &[true, true]);
        stale.status = MilestoneStatus::Upcoming;
        let mut t = timeline(vec![stale]);
        assert_eq!(t.milestones()[0].status, MilestoneStatus::Completed);

        started(t.toggle_task(0, 0).unwrap());
        assert_eq!(t.replace(Vec::new()), Err(TimelineError::SyncInFlight));
        t.settle(Ok(()));
        assert!(t.replace(Vec::new()).is_ok());
        assert!(t.milestones().is_empty());
    }
}
