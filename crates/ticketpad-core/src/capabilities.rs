//! Projects and issue types known to the tracker.
//!
//! Fetched once at startup and consulted when recognising issue keys and
//! when validating a new-issue buffer.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::debug;

use crate::error::{TrackerError, ValidationError};
use crate::record::Record;
use crate::tracker::{IssueType, NewIssue, Project, Tracker};

#[derive(Debug, Default)]
pub struct Capabilities {
    projects: Mutex<Vec<Project>>,
    types: Mutex<BTreeMap<String, IssueType>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Capabilities {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch projects and issue types concurrently and replace both lists.
    ///
    /// Nothing is replaced unless both fetches succeed.
    ///
    /// # Errors
    ///
    /// Returns the first tracker error, projects before types.
    pub fn refresh(&self, tracker: &dyn Tracker) -> Result<(), TrackerError> {
        let (projects, types) = thread::scope(|s| {
            let projects = s.spawn(|| tracker.list_projects());
            let types = s.spawn(|| tracker.list_issue_types());
            (join(projects), join(types))
        });
        let projects = projects?;
        let types = types?;
        debug!(
            projects = projects.len(),
            types = types.len(),
            "capabilities refreshed"
        );

        *lock(&self.projects) = projects;
        *lock(&self.types) = types.into_iter().map(|t| (t.name.clone(), t)).collect();
        Ok(())
    }

    /// Project keys in tracker order.
    #[must_use]
    pub fn project_keys(&self) -> Vec<String> {
        lock(&self.projects).iter().map(|p| p.key.clone()).collect()
    }

    /// Issue type names, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        lock(&self.types).keys().cloned().collect()
    }

    /// Whether `text` looks like `KEY-123` for a known project key. With no
    /// projects loaded any upper-case key is accepted.
    #[must_use]
    pub fn is_issue_key(&self, text: &str) -> bool {
        let Some((prefix, number)) = text.rsplit_once('-') else {
            return false;
        };
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let projects = lock(&self.projects);
        if projects.is_empty() {
            return prefix.starts_with(|c: char| c.is_ascii_uppercase())
                && prefix
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        }
        projects.iter().any(|p| p.key == prefix)
    }

    /// Validate a new-issue header and description, resolving project and
    /// type to their ids.
    ///
    /// # Errors
    ///
    /// Returns the first failed check, in this order: blank summary, blank
    /// project, blank type, blank assignee, unknown type, unknown project,
    /// empty description.
    pub fn resolve(&self, header: &Record, description: &str) -> Result<NewIssue, ValidationError> {
        if header.summary.is_empty() {
            return Err(ValidationError::BlankSummary);
        }
        if header.project.is_empty() {
            return Err(ValidationError::BlankProject);
        }
        if header.kind.is_empty() {
            return Err(ValidationError::BlankType);
        }
        if header.assignee.is_empty() {
            return Err(ValidationError::BlankAssignee);
        }

        let type_id = lock(&self.types)
            .get(&header.kind)
            .map(|t| t.id.clone())
            .ok_or_else(|| ValidationError::UnknownType(header.kind.clone()))?;

        let project_id = lock(&self.projects)
            .iter()
            .find(|p| p.key == header.project || p.name == header.project)
            .map(|p| p.id.clone())
            .ok_or_else(|| ValidationError::UnknownProject(header.project.clone()))?;

        let description = description.trim();
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }

        Ok(NewIssue {
            project_id,
            type_id,
            summary: header.summary.clone(),
            assignee: header.assignee.clone(),
            description: description.to_string(),
            components: header.components.iter().cloned().collect(),
            labels: header.labels.iter().cloned().collect(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with(projects: Vec<Project>, types: Vec<IssueType>) -> Self {
        Self {
            projects: Mutex::new(projects),
            types: Mutex::new(types.into_iter().map(|t| (t.name.clone(), t)).collect()),
        }
    }
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> Capabilities {
        Capabilities::with(
            vec![
                Project {
                    key: "WEB".to_string(),
                    name: "Website".to_string(),
                    id: "100".to_string(),
                },
                Project {
                    key: "OPS".to_string(),
                    name: "Operations".to_string(),
                    id: "200".to_string(),
                },
            ],
            vec![
                IssueType {
                    name: "Bug".to_string(),
                    id: "1".to_string(),
                },
                IssueType {
                    name: "Task".to_string(),
                    id: "3".to_string(),
                },
            ],
        )
    }

    fn header() -> Record {
        Record {
            summary: "Broken footer".to_string(),
            project: "WEB".to_string(),
            kind: "Bug".to_string(),
            assignee: "alice".to_string(),
            ..Record::default()
        }
    }

    #[test]
    fn keys_of_known_projects_only() {
        let caps = caps();
        assert!(caps.is_issue_key("WEB-12"));
        assert!(caps.is_issue_key("OPS-1"));
        assert!(!caps.is_issue_key("DOC-3"));
        assert!(!caps.is_issue_key("WEB-"));
        assert!(!caps.is_issue_key("WEB-1a"));
        assert!(!caps.is_issue_key("my-issues"));
    }

    #[test]
    fn any_uppercase_key_without_projects() {
        let caps = Capabilities::new();
        assert!(caps.is_issue_key("DOC-3"));
        assert!(caps.is_issue_key("A2B-3"));
        assert!(!caps.is_issue_key("doc-3"));
        assert!(!caps.is_issue_key("search"));
    }

    #[test]
    fn valid_header_resolves_ids() {
        let mut header = header();
        header.labels.insert("ui".to_string());
        let issue = caps().resolve(&header, "\n  The footer overlaps.\n").expect("valid");
        assert_eq!(issue.project_id, "100");
        assert_eq!(issue.type_id, "1");
        assert_eq!(issue.description, "The footer overlaps.");
        assert_eq!(issue.labels, vec!["ui".to_string()]);
    }

    #[test]
    fn project_matches_by_name_too() {
        let mut header = header();
        header.project = "Operations".to_string();
        let issue = caps().resolve(&header, "text").expect("valid");
        assert_eq!(issue.project_id, "200");
    }

    #[test]
    fn checks_run_in_order() {
        let caps = caps();

        let blank = Record::default();
        assert_eq!(caps.resolve(&blank, ""), Err(ValidationError::BlankSummary));

        let mut h = header();
        h.project.clear();
        h.kind.clear();
        assert_eq!(caps.resolve(&h, "d"), Err(ValidationError::BlankProject));

        let mut h = header();
        h.kind.clear();
        h.assignee.clear();
        assert_eq!(caps.resolve(&h, "d"), Err(ValidationError::BlankType));

        let mut h = header();
        h.assignee.clear();
        assert_eq!(caps.resolve(&h, "d"), Err(ValidationError::BlankAssignee));

        let mut h = header();
        h.kind = "Epic".to_string();
        h.project = "NOPE".to_string();
        assert_eq!(
            caps.resolve(&h, ""),
            Err(ValidationError::UnknownType("Epic".to_string()))
        );

        let mut h = header();
        h.project = "NOPE".to_string();
        assert_eq!(
            caps.resolve(&h, ""),
            Err(ValidationError::UnknownProject("NOPE".to_string()))
        );

        assert_eq!(
            caps.resolve(&header(), " \n\t"),
            Err(ValidationError::EmptyDescription)
        );
    }

    #[test]
    fn listings_for_the_template() {
        let caps = caps();
        assert_eq!(caps.project_keys(), vec!["WEB".to_string(), "OPS".to_string()]);
        assert_eq!(caps.type_names(), vec!["Bug".to_string(), "Task".to_string()]);
    }
}
