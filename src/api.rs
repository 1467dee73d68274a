//! Timeline backend access.
//!
//! The [`TimelineBackend`] trait is the seam between the timeline controller
//! and the REST service. [`HttpBackend`] implements it with blocking `ureq`
//! calls:
//! - `GET /auth/me`: the signed-in graduate
//! - `GET /timeline/{graduate_id}/milestones-tasks`: the ordered milestone list
//! - `POST /timeline/tasks/complete` and `/uncomplete`: task progress
//! - `POST /auth/update`: profile changes

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::milestone::{GraduateId, Milestone, TaskId};

/// User-Agent sent with every request.
const USER_AGENT: &str = concat!("gradpath/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while talking to the timeline backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Token is missing, invalid or expired (401)
    #[error("not authorised: the backend returned 401 Unauthorized")]
    Unauthorized,

    /// Token is valid but lacks permission (403)
    #[error("forbidden: the backend returned 403 Forbidden")]
    Forbidden,

    /// Any other non-success response
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// Connection, DNS, TLS or timeout failure
    #[error("request failed: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Profile fields shared by `/auth/me` responses and `/auth/update` requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_link: Option<String>,
}

/// The signed-in account, as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrentUser {
    #[serde(deserialize_with = "string_or_number")]
    pub id: GraduateId,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

impl CurrentUser {
    /// Best-effort display name.
    pub fn display_name(&self) -> String {
        match (&self.profile.first_name, &self.profile.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            _ => self
                .profile
                .email
                .clone()
                .unwrap_or_else(|| self.id.to_string()),
        }
    }
}

/// Graduate ids are UUID strings, but accept bare numbers too.
fn string_or_number<'de, D>(deserializer: D) -> Result<GraduateId, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(GraduateId(s)),
        serde_json::Value::Number(n) => Ok(GraduateId(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Profile update request body.
///
/// Built fresh from the current profile and the requested changes at submit
/// time; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    id: GraduateId,
    #[serde(flatten)]
    fields: ProfileFields,
}

impl ProfileUpdate {
    /// Merge `changes` over the user's current profile.
    pub fn new(user: &CurrentUser, changes: ProfileFields) -> Self {
        let current = &user.profile;
        let fields = ProfileFields {
            email: changes.email.or_else(|| current.email.clone()),
            first_name: changes.first_name.or_else(|| current.first_name.clone()),
            last_name: changes.last_name.or_else(|| current.last_name.clone()),
            phone: changes.phone.or_else(|| current.phone.clone()),
            department: changes.department.or_else(|| current.department.clone()),
            branch: changes.branch.or_else(|| current.branch.clone()),
            start_date: changes.start_date.or_else(|| current.start_date.clone()),
            bio: changes.bio.or_else(|| current.bio.clone()),
            interests: changes.interests.or_else(|| current.interests.clone()),
            linkedin_link: changes.linkedin_link.or_else(|| current.linkedin_link.clone()),
            github_link: changes.github_link.or_else(|| current.github_link.clone()),
        };
        ProfileUpdate {
            id: user.id.clone(),
            fields,
        }
    }

    pub fn fields(&self) -> &ProfileFields {
        &self.fields
    }
}

/// Body of the complete/uncomplete calls.
#[derive(Debug, Serialize)]
struct TaskProgressBody<'a> {
    graduate_id: &'a GraduateId,
    task_id: &'a TaskId,
}

/// Operations the timeline needs from the backend.
pub trait TimelineBackend {
    /// Whether a bearer token is available at all.
    fn is_authenticated(&self) -> bool;

    /// Resolve the signed-in account.
    fn current_user(&self) -> Result<CurrentUser, ApiError>;

    /// Fetch the ordered milestone list for a graduate.
    fn milestones(&self, graduate_id: &GraduateId) -> Result<Vec<Milestone>, ApiError>;

    /// Record a task as completed (`true`) or not completed (`false`).
    fn set_task_completed(
        &self,
        graduate_id: &GraduateId,
        task_id: &TaskId,
        completed: bool,
    ) -> Result<(), ApiError>;

    /// Submit a profile update.
    fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError>;
}

impl<T: TimelineBackend + ?Sized> TimelineBackend for Arc<T> {
    fn is_authenticated(&self) -> bool {
        (**self).is_authenticated()
    }

    fn current_user(&self) -> Result<CurrentUser, ApiError> {
        (**self).current_user()
    }

    fn milestones(&self, graduate_id: &GraduateId) -> Result<Vec<Milestone>, ApiError> {
        (**self).milestones(graduate_id)
    }

    fn set_task_completed(
        &self,
        graduate_id: &GraduateId,
        task_id: &TaskId,
        completed: bool,
    ) -> Result<(), ApiError> {
        (**self).set_task_completed(graduate_id, task_id, completed)
    }

    fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError> {
        (**self).update_profile(update)
    }
}

/// Blocking HTTP implementation of [`TimelineBackend`].
#[derive(Clone)]
pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    /// Create a client for `base_url` with the given per-request timeout.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(USER_AGENT)
            .build();
        HttpBackend {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorised(&self, request: ureq::Request) -> Result<ureq::Request, ApiError> {
        match &self.token {
            Some(token) => Ok(request.set("Authorization", &format!("Bearer {}", token))),
            None => Err(ApiError::Unauthorized),
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.authorised(self.agent.get(&self.url(path)))?;
        let response = request.call().map_err(map_error)?;
        response
            .into_json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let request = self.authorised(self.agent.post(&self.url(path)))?;
        request.send_json(body).map_err(map_error)?;
        Ok(())
    }
}

/// Translate a `ureq` failure into an [`ApiError`].
fn map_error(error: ureq::Error) -> ApiError {
    match error {
        ureq::Error::Status(401, _) => ApiError::Unauthorized,
        ureq::Error::Status(403, _) => ApiError::Forbidden,
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            ApiError::Status { code, body: detail_message(&body) }
        }
        ureq::Error::Transport(t) => ApiError::Transport(t.to_string()),
    }
}

/// Pull the `detail` field out of an error body when there is one.
fn detail_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

impl TimelineBackend for HttpBackend {
    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn current_user(&self) -> Result<CurrentUser, ApiError> {
        self.get_json("/auth/me")
    }

    fn milestones(&self, graduate_id: &GraduateId) -> Result<Vec<Milestone>, ApiError> {
        self.get_json(&format!("/timeline/{}/milestones-tasks", graduate_id))
    }

    fn set_task_completed(
        &self,
        graduate_id: &GraduateId,
        task_id: &TaskId,
        completed: bool,
    ) -> Result<(), ApiError> {
        let path = if completed {
            "/timeline/tasks/complete"
        } else {
            "/timeline/tasks/uncomplete"
        };
        self.post_json(path, &TaskProgressBody { graduate_id, task_id })
    }

    fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError> {
        self.post_json("/auth/update", update)
    }
}

/// Scripted in-memory backend for tests.
#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    pub(crate) struct FakeBackend {
        pub authenticated: bool,
        pub user: Option<CurrentUser>,
        pub milestones: Result<Vec<Milestone>, ApiError>,
        /// Results handed out to sync calls in order; `Ok(())` once exhausted.
        pub sync_results: Mutex<VecDeque<Result<(), ApiError>>>,
        /// Every sync call received, as (task id, completed).
        pub sync_calls: Mutex<Vec<(String, bool)>>,
        pub profile_updates: Mutex<Vec<ProfileUpdate>>,
    }

    impl Default for FakeBackend {
        fn default() -> Self {
            FakeBackend {
                authenticated: false,
                user: None,
                milestones: Ok(Vec::new()),
                sync_results: Mutex::new(VecDeque::new()),
                sync_calls: Mutex::new(Vec::new()),
                profile_updates: Mutex::new(Vec::new()),
            }
        }
    }

    impl FakeBackend {
        pub(crate) fn signed_in(milestones: Vec<Milestone>) -> Self {
            FakeBackend {
                authenticated: true,
                user: Some(CurrentUser {
                    id: GraduateId("grad-1".to_string()),
                    role: Some("Graduate".to_string()),
                    profile: ProfileFields {
                        email: Some("jane@example.com".to_string()),
                        first_name: Some("Jane".to_string()),
                        ..ProfileFields::default()
                    },
                }),
                milestones: Ok(milestones),
                ..FakeBackend::default()
            }
        }

        pub(crate) fn fail_next_sync(&self, error: ApiError) {
            self.sync_results.lock().unwrap().push_back(Err(error));
        }

        pub(crate) fn calls(&self) -> Vec<(String, bool)> {
            self.sync_calls.lock().unwrap().clone()
        }
    }

    impl TimelineBackend for FakeBackend {
        fn is_authenticated(&self) -> bool {
            self.authenticated
        }

        fn current_user(&self) -> Result<CurrentUser, ApiError> {
            self.user.clone().ok_or(ApiError::Unauthorized)
        }

        fn milestones(&self, _graduate_id: &GraduateId) -> Result<Vec<Milestone>, ApiError> {
            self.milestones.clone()
        }

        fn set_task_completed(
            &self,
            _graduate_id: &GraduateId,
            task_id: &TaskId,
            completed: bool,
        ) -> Result<(), ApiError> {
            self.sync_calls
                .lock()
                .unwrap()
                .push((task_id.0.clone(), completed));
            self.sync_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError> {
            self.profile_updates.lock().unwrap().push(update.clone());
            Ok(())
        }
    }
}
