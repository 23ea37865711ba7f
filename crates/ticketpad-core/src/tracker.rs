//! The remote tracker as seen by the sessions.
//!
//! Implementations do blocking I/O; a session calls them from its own
//! thread and waits for the answer.

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::reconcile::UpdateDocument;
use crate::record::Record;

/// One remote comment on a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub created: String,
    pub body: String,
}

/// Everything shown in a record buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Human key, e.g. `WEB-12`.
    pub key: String,
    /// Tracker-internal id.
    pub id: String,
    pub record: Record,
    pub reporter: String,
    pub created: String,
    pub description: String,
    pub comments: Vec<Comment>,
}

/// One row of a listing or search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub key: String,
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueType {
    pub name: String,
    pub id: String,
}

/// A saved search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub jql: String,
}

/// A validated creation request. Project and type are resolved to ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub project_id: String,
    pub type_id: String,
    pub summary: String,
    pub assignee: String,
    pub description: String,
    pub components: Vec<String>,
    pub labels: Vec<String>,
}

/// The remote issue tracker.
pub trait Tracker: Send + Sync {
    fn get_issue(&self, key: &str) -> Result<Issue, TrackerError>;

    fn search(&self, query: &str) -> Result<Vec<IssueSummary>, TrackerError>;

    /// Create a ticket, returning its key.
    fn create_issue(&self, issue: &NewIssue) -> Result<String, TrackerError>;

    fn apply_update(&self, key: &str, update: &UpdateDocument) -> Result<(), TrackerError>;

    fn apply_transition(
        &self,
        key: &str,
        transition_id: &str,
        update: Option<&UpdateDocument>,
    ) -> Result<(), TrackerError>;

    fn list_transitions(&self, key: &str) -> Result<Vec<Transition>, TrackerError>;

    fn list_projects(&self) -> Result<Vec<Project>, TrackerError>;

    fn list_issue_types(&self) -> Result<Vec<IssueType>, TrackerError>;

    fn list_filters(&self) -> Result<Vec<Filter>, TrackerError>;
}
