//! A signed-in view of the timeline.
//!
//! [`Session`] ties a backend to a [`Timeline`]: on mount it resolves the
//! current graduate and loads their milestones, and [`Session::toggle`]
//! drives a toggle through the backend to settlement in one call.

use tracing::{debug, info, warn};

use crate::api::{ApiError, CurrentUser, TimelineBackend};
use crate::timeline::{
    Effect, Settlement, StartedToggle, SyncOutcome, SyncRequest, Timeline, TimelineError,
    ToggleOutcome,
};

/// Result of a synchronous toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleReport {
    pub effects: Vec<Effect>,
    /// `None` when the backend confirmed the change.
    pub error: Option<ApiError>,
}

pub struct Session<B: TimelineBackend> {
    backend: B,
    timeline: Timeline,
    user: Option<CurrentUser>,
    load_error: Option<ApiError>,
}

impl<B: TimelineBackend> Session<B> {
    /// Resolve the signed-in graduate and load their timeline.
    ///
    /// Without a token the session is simply empty. Any backend failure
    /// leaves an empty list and is kept in [`Session::load_error`].
    pub fn mount(backend: B, timeline: Timeline) -> Self {
        let mut session = Session {
            backend,
            timeline,
            user: None,
            load_error: None,
        };
        session.reload();
        session
    }

    /// Fetch the current user and milestone list again.
    pub fn reload(&mut self) {
        if self.timeline.is_syncing() {
            debug!("reload skipped while a sync is in flight");
            return;
        }
        self.load_error = None;

        if !self.backend.is_authenticated() {
            debug!("no token, timeline left empty");
            self.clear();
            return;
        }

        let loaded = self.backend.current_user().and_then(|user| {
            let milestones = self.backend.milestones(&user.id)?;
            Ok((user, milestones))
        });

        match loaded {
            Ok((user, milestones)) => {
                info!(graduate = %user.id, milestones = milestones.len(), "timeline loaded");
                self.timeline.set_graduate(Some(user.id.clone()));
                // Not syncing, checked above.
                let _ = self.timeline.replace(milestones);
                self.user = Some(user);
            }
            Err(e) => {
                warn!(error = %e, "could not load timeline");
                self.clear();
                self.load_error = Some(e);
            }
        }
    }

    fn clear(&mut self) {
        self.user = None;
        self.timeline.set_graduate(None);
        let _ = self.timeline.replace(Vec::new());
    }

    /// Toggle a task and wait for the backend to confirm or reject it.
    pub fn toggle(
        &mut self,
        milestone_index: usize,
        task_index: usize,
    ) -> Result<ToggleReport, TimelineError> {
        let started = match self.timeline.toggle_task(milestone_index, task_index)? {
            ToggleOutcome::Started(started) => started,
            // Only reachable if a caller mixes this with asynchronous dispatch.
            ToggleOutcome::Queued => {
                return Ok(ToggleReport {
                    effects: Vec::new(),
                    error: None,
                })
            }
        };

        let StartedToggle { request, effects } = started;
        let mut settlement = self.send(&request);
        let error = match settlement.outcome {
            SyncOutcome::RolledBack(e) => Some(e),
            SyncOutcome::Confirmed | SyncOutcome::Idle => None,
        };

        // Drain anything queued behind it.
        while let Some(next) = settlement.next.take() {
            settlement = self.send(&next.request);
        }

        Ok(ToggleReport { effects, error })
    }

    fn send(&mut self, request: &SyncRequest) -> Settlement {
        let result = self
            .backend
            .set_task_completed(&request.graduate_id, &request.task_id, request.completed);
        self.timeline.settle(result)
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    pub fn load_error(&self) -> Option<&ApiError> {
        self.load_error.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::fake::FakeBackend;
    use crate::fields::MilestoneStatus;
    use crate::milestone::tests::milestone;

    fn mount(backend: FakeBackend) -> Session<FakeBackend> {
        Session::mount(backend, Timeline::new(Duration::from_millis(300)))
    }

    #[test]
    fn test_mount_without_token_is_empty() {
        let session = mount(FakeBackend::default());
        assert!(session.timeline().milestones().is_empty());
        assert!(session.load_error().is_none());
        assert!(session.user().is_none());
    }

    #[test]
    fn test_mount_loads_for_current_graduate() {
        let session = mount(FakeBackend::signed_in(vec![
            milestone("m0", &[true, false]),
            milestone("m1", &[]),
        ]));
        assert_eq!(session.timeline().milestones().len(), 2);
        assert_eq!(session.timeline().graduate().map(|g| g.0.as_str()), Some("grad-1"));
        assert_eq!(session.user().map(|u| u.display_name()), Some("Jane".to_string()));
    }

    #[test]
    fn test_mount_failure_leaves_empty_list_and_error() {
        let backend = FakeBackend {
            milestones: Err(ApiError::Transport("connection refused".to_string())),
            ..FakeBackend::signed_in(Vec::new())
        };
        let session = mount(backend);
        assert!(session.timeline().milestones().is_empty());
        assert_eq!(
            session.load_error(),
            Some(&ApiError::Transport("connection refused".to_string()))
        );
    }

    #[test]
    fn test_unknown_user_is_a_load_error() {
        let backend = FakeBackend {
            authenticated: true,
            ..FakeBackend::default()
        };
        let mut session = mount(backend);
        assert_eq!(session.load_error(), Some(&ApiError::Unauthorized));
        assert_eq!(session.toggle(0, 0), Err(TimelineError::NotAuthenticated));
        assert!(session.backend().calls().is_empty());
    }

    #[test]
    fn test_toggle_syncs_and_reports_effects() {
        let mut session = mount(FakeBackend::signed_in(vec![
            milestone("m0", &[true, false]),
            milestone("m1", &[false]),
        ]));
        let report = session.toggle(0, 1).unwrap();
        assert!(report.error.is_none());
        assert_eq!(report.effects.len(), 2);
        assert_eq!(session.backend().calls(), vec![("m0-t1".to_string(), true)]);
        assert_eq!(session.timeline().milestones()[1].status, MilestoneStatus::InProgress);
    }

    #[test]
    fn test_toggle_failure_rolls_back() {
        let mut session = mount(FakeBackend::signed_in(vec![milestone("m0", &[false])]));
        session.backend().fail_next_sync(ApiError::Forbidden);
        let report = session.toggle(0, 0).unwrap();
        assert_eq!(report.error, Some(ApiError::Forbidden));
        assert!(!session.timeline().milestones()[0].tasks[0].completed);
        assert!(!session.timeline().is_syncing());
    }

    #[test]
    fn test_admin_locked_toggle_makes_no_call() {
        let mut locked = milestone("m0", &[false]);
        locked.admin_status = Some(crate::fields::AdminStatus::Completed);
        let mut session = mount(FakeBackend::signed_in(vec![locked]));
        assert_eq!(session.toggle(0, 0), Err(TimelineError::AdminLocked));
        assert!(session.backend().calls().is_empty());
    }
}
