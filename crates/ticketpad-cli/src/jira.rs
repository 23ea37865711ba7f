//! Blocking Jira REST v2 client.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use ticketpad_core::error::TrackerError;
use ticketpad_core::reconcile::{IssueUpdateRequest, TransitionRequest, UpdateDocument};
use ticketpad_core::record::Record;
use ticketpad_core::tracker::{
    Comment, Filter, Issue, IssueSummary, IssueType, NewIssue, Project, Tracker, Transition,
};

const API: &str = "/rest/api/2";
const ISSUE_FIELDS: &str =
    "summary,issuetype,status,assignee,reporter,project,components,labels,created,description,comment";
const SEARCH_FIELDS: &str = "summary,issuetype,status";
const SEARCH_LIMIT: &str = "100";

pub struct JiraClient {
    base: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl JiraClient {
    /// Client for the server at `base`, e.g. `https://jira.example.com`.
    #[must_use]
    pub fn new(base: &str, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("ticketpad/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            base: base.trim_end_matches('/').to_string(),
            token,
            agent,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API}{path}", self.base)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let mut request = self
            .agent
            .request(method, url)
            .set("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, TrackerError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let mut request = self.request("GET", &url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call().map_err(|e| request_error(&url, e))?;
        decode(&url, response)
    }

    fn send_json(&self, method: &str, path: &str, body: &impl serde::Serialize) -> Result<ureq::Response, TrackerError> {
        let url = self.url(path);
        debug!(%url, method, "send");
        self.request(method, &url)
            .send_json(body)
            .map_err(|e| request_error(&url, e))
    }
}

fn decode<T: DeserializeOwned>(url: &str, response: ureq::Response) -> Result<T, TrackerError> {
    response.into_json::<T>().map_err(|e| TrackerError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn request_error(url: &str, err: ureq::Error) -> TrackerError {
    match err {
        ureq::Error::Status(status, response) => TrackerError::Status {
            url: url.to_string(),
            status,
            body: error_summary(&response.into_string().unwrap_or_default()),
        },
        ureq::Error::Transport(transport) => TrackerError::Transport {
            url: url.to_string(),
            reason: transport.to_string(),
        },
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ErrorBody {
    error_messages: Vec<String>,
    errors: serde_json::Map<String, Value>,
}

/// Jira's `{"errorMessages": [...], "errors": {...}}` flattened to one line,
/// or the raw body if it is something else.
fn error_summary(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return body.trim().to_string();
    };
    let mut parts = parsed.error_messages;
    parts.extend(parsed.errors.iter().map(|(field, message)| match message {
        Value::String(s) => format!("{field}: {s}"),
        other => format!("{field}: {other}"),
    }));
    if parts.is_empty() {
        body.trim().to_string()
    } else {
        parts.join("; ")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Named {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct User {
    name: String,
    display_name: String,
}

impl User {
    fn label(user: Option<Self>) -> String {
        user.map(|u| if u.name.is_empty() { u.display_name } else { u.name })
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectRef {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawComment {
    author: Option<User>,
    created: String,
    body: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommentPage {
    comments: Vec<RawComment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Fields {
    summary: String,
    issuetype: Option<Named>,
    status: Option<Named>,
    assignee: Option<User>,
    reporter: Option<User>,
    project: Option<ProjectRef>,
    components: Vec<Named>,
    labels: Vec<String>,
    created: String,
    description: Option<String>,
    comment: Option<CommentPage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIssue {
    id: String,
    key: String,
    fields: Fields,
}

fn name_of(named: Option<Named>) -> String {
    named.map(|n| n.name).unwrap_or_default()
}

impl RawIssue {
    fn into_issue(self, base: &str) -> Issue {
        let fields = self.fields;
        let record = Record {
            summary: fields.summary,
            kind: name_of(fields.issuetype),
            status: name_of(fields.status),
            assignee: User::label(fields.assignee),
            project: fields.project.map(|p| p.key).unwrap_or_default(),
            url: format!("{base}/browse/{}", self.key),
            components: fields.components.into_iter().map(|c| c.name).collect(),
            labels: fields.labels.into_iter().collect(),
        };
        let comments = fields
            .comment
            .map(|page| page.comments)
            .unwrap_or_default()
            .into_iter()
            .map(|c| Comment {
                author: User::label(c.author),
                created: c.created,
                body: c.body,
            })
            .collect();
        Issue {
            key: self.key,
            id: self.id,
            record,
            reporter: User::label(fields.reporter),
            created: fields.created,
            description: fields.description.unwrap_or_default(),
            comments,
        }
    }

    fn into_summary(self) -> IssueSummary {
        IssueSummary {
            key: self.key,
            kind: name_of(self.fields.issuetype),
            status: name_of(self.fields.status),
            summary: self.fields.summary,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchPage {
    issues: Vec<RawIssue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TransitionPage {
    transitions: Vec<Transition>,
}

#[derive(Debug, Deserialize)]
struct Created {
    key: String,
}

fn create_body(issue: &NewIssue) -> Value {
    let components: Vec<Value> = issue
        .components
        .iter()
        .map(|name| json!({ "name": name }))
        .collect();
    json!({
        "fields": {
            "project": { "id": issue.project_id },
            "issuetype": { "id": issue.type_id },
            "summary": issue.summary,
            "assignee": { "name": issue.assignee },
            "description": format!("{}\n", issue.description),
            "labels": issue.labels,
            "components": components,
        }
    })
}

impl Tracker for JiraClient {
    fn get_issue(&self, key: &str) -> Result<Issue, TrackerError> {
        let raw: RawIssue = self.get_json(&format!("/issue/{key}"), &[("fields", ISSUE_FIELDS)])?;
        Ok(raw.into_issue(&self.base))
    }

    fn search(&self, query: &str) -> Result<Vec<IssueSummary>, TrackerError> {
        let page: SearchPage = self.get_json(
            "/search",
            &[
                ("jql", query),
                ("fields", SEARCH_FIELDS),
                ("maxResults", SEARCH_LIMIT),
            ],
        )?;
        Ok(page.issues.into_iter().map(RawIssue::into_summary).collect())
    }

    fn create_issue(&self, issue: &NewIssue) -> Result<String, TrackerError> {
        let url = self.url("/issue");
        let response = self.send_json("POST", "/issue", &create_body(issue))?;
        let created: Created = decode(&url, response)?;
        Ok(created.key)
    }

    fn apply_update(&self, key: &str, update: &UpdateDocument) -> Result<(), TrackerError> {
        let body = IssueUpdateRequest {
            update: Some(update),
        };
        self.send_json("PUT", &format!("/issue/{key}"), &body)?;
        Ok(())
    }

    fn apply_transition(
        &self,
        key: &str,
        transition_id: &str,
        update: Option<&UpdateDocument>,
    ) -> Result<(), TrackerError> {
        let body = TransitionRequest::new(transition_id, update);
        self.send_json("POST", &format!("/issue/{key}/transitions"), &body)?;
        Ok(())
    }

    fn list_transitions(&self, key: &str) -> Result<Vec<Transition>, TrackerError> {
        let page: TransitionPage = self.get_json(&format!("/issue/{key}/transitions"), &[])?;
        Ok(page.transitions)
    }

    fn list_projects(&self) -> Result<Vec<Project>, TrackerError> {
        self.get_json("/project", &[])
    }

    fn list_issue_types(&self) -> Result<Vec<IssueType>, TrackerError> {
        self.get_json("/issuetype", &[])
    }

    fn list_filters(&self) -> Result<Vec<Filter>, TrackerError> {
        self.get_json("/filter/favourite", &[])
    }
}
