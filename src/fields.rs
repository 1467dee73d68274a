//! Enumerations and field types for the graduate timeline.
//!
//! This module defines the structured values attached to milestones and
//! accounts: the derived milestone status, the administrative override flag,
//! and the account role carried in bearer tokens.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Progress state of a milestone, derived from its tasks.
///
/// The backend spells these `Upcoming`, `In-Progress` and `Completed`; older
/// payloads use lowercase kebab-case, so both are accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
pub enum MilestoneStatus {
    #[serde(rename = "Upcoming", alias = "upcoming")]
    Upcoming,
    #[serde(
        rename = "In-Progress",
        alias = "in-progress",
        alias = "InProgress",
        alias = "in_progress"
    )]
    InProgress,
    #[serde(rename = "Completed", alias = "completed")]
    Completed,
}

impl MilestoneStatus {
    /// Whether the student has started this milestone in any way.
    pub fn is_active(self) -> bool {
        matches!(self, MilestoneStatus::InProgress | MilestoneStatus::Completed)
    }
}

/// Status flag set on a milestone by the administration console.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdminStatus {
    #[serde(alias = "Active")]
    Active,
    #[serde(alias = "Completed")]
    Completed,
    /// Any value this client does not know about. Never overrides anything.
    #[serde(other)]
    Other,
}

/// Account role as carried in a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Graduate,
    Admin,
    Other(String),
}

impl Role {
    /// Parse a role claim case-insensitively.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "graduate" => Role::Graduate,
            "admin" => Role::Admin,
            _ => Role::Other(s.trim().to_string()),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Graduate => write!(f, "Graduate"),
            Role::Admin => write!(f, "Admin"),
            Role::Other(s) => write!(f, "{}", s),
        }
    }
}
