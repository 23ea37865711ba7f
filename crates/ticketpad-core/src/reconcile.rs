//! Turn an edited header block into the smallest update the tracker needs.
//!
//! The output mirrors the tracker's update protocol: a map from field name to
//! an ordered list of `{"set"|"add"|"remove": value}` operations.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::record::{Field, Record};
use crate::text::diff_sets;

/// One verb applied to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Set(Value),
    Add(Value),
    Remove(Value),
}

/// Field-scoped operations for one update request. Empty lists are left
/// off the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateDocument {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub summary: Vec<Operation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comment: Vec<Operation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignee: Vec<Operation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Operation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Operation>,
}

impl UpdateDocument {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operation_count() == 0
    }

    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.summary.len()
            + self.comment.len()
            + self.assignee.len()
            + self.components.len()
            + self.labels.len()
    }

    /// Attach a new comment to `update`, creating a document if needed.
    ///
    /// A blank `body` leaves `update` as it was, so an absent update stays
    /// absent.
    #[must_use]
    pub fn with_comment(update: Option<Self>, body: Option<&str>) -> Option<Self> {
        let Some(body) = body.map(str::trim).filter(|b| !b.is_empty()) else {
            return update;
        };
        let mut update = update.unwrap_or_default();
        update
            .comment
            .push(Operation::Add(json!({ "body": body })));
        Some(update)
    }
}

/// Diff the header parsed from a buffer against the last synchronized one.
///
/// Only fields marked editable are compared. Returns `None` when nothing
/// changed; callers must not send an empty update.
#[must_use]
pub fn reconcile(parsed: &Record, snapshot: &Record) -> Option<UpdateDocument> {
    let mut update = UpdateDocument::default();

    for field in Field::ALL.into_iter().filter(|f| f.is_editable()) {
        match field {
            Field::Summary => {
                if parsed.summary != snapshot.summary {
                    debug!(summary = %parsed.summary, "summary set");
                    update
                        .summary
                        .push(Operation::Set(Value::String(parsed.summary.clone())));
                }
            }
            Field::Assignee => {
                if parsed.assignee != snapshot.assignee {
                    debug!(assignee = %parsed.assignee, "assignee set");
                    update
                        .assignee
                        .push(Operation::Set(json!({ "name": parsed.assignee })));
                }
            }
            Field::Components | Field::Labels => {
                let new: Vec<&String> = parsed.set(field).iter().collect();
                let old: Vec<&String> = snapshot.set(field).iter().collect();
                let (added, removed) = diff_sets(&new, &old);
                debug!(%field, ?added, ?removed, "set add/remove");

                let ops = if field == Field::Components {
                    &mut update.components
                } else {
                    &mut update.labels
                };
                ops.extend(
                    added
                        .into_iter()
                        .map(|x| Operation::Add(Value::String(x.clone()))),
                );
                ops.extend(
                    removed
                        .into_iter()
                        .map(|x| Operation::Remove(Value::String(x.clone()))),
                );
            }
            Field::Project | Field::Type | Field::Status | Field::Url => {}
        }
    }

    (!update.is_empty()).then_some(update)
}

/// Body of an edit request for one ticket.
#[derive(Debug, Clone, Serialize)]
pub struct IssueUpdateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<&'a UpdateDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionRef<'a> {
    pub id: &'a str,
}

/// Body of a workflow transition request, optionally carrying field edits.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<&'a UpdateDocument>,
    pub transition: TransitionRef<'a>,
}

impl<'a> TransitionRequest<'a> {
    #[must_use]
    pub const fn new(id: &'a str, update: Option<&'a UpdateDocument>) -> Self {
        Self {
            update,
            transition: TransitionRef { id },
        }
    }
}
