use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated GitHub user, memoized once per token by the session.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Identity {
    pub login: String,
    pub avatar_url: Option<String>,
}

/// One closed issue collected from a repository, later annotated with hours
/// from a project board.
///
/// `id` is only meaningful within one org's identifier space; cross-source
/// matching always goes through `key()`.
#[derive(Debug, Clone, Serialize)]
pub struct IssueRecord {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub repo: String,
    pub org: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub hours: Option<f64>,
}

/// Identifying key used to join issues against board items.
pub type IssueKey = (String, String, u64);

impl IssueRecord {
    pub fn key(&self) -> IssueKey {
        (self.org.clone(), self.repo.clone(), self.number)
    }

    /// Best date for display: closed, falling back to updated, then created.
    pub fn display_date(&self) -> Option<DateTime<Utc>> {
        self.closed_at.or(self.updated_at).or(self.created_at)
    }
}

/// A non-fatal per-org or per-repo failure absorbed during collection or
/// reconciliation. Aggregated so callers can report how much of the result
/// set is missing.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub scope: String,
    pub message: String,
}

impl Warning {
    pub fn new(scope: impl Into<String>, err: impl Display) -> Self {
        Self {
            scope: scope.into(),
            message: err.to_string(),
        }
    }
}
