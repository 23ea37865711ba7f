//! The structured header view of a ticket and its text form.
//!
//! A record buffer starts with a block of `Label: value` lines:
//!
//! ```text
//! Summary: Login times out after 30s
//! Project: WEB
//! Type: Bug
//! Status: In Progress
//! Assignee: alice
//! Components: auth "session store"
//! Labels: regression
//! URL: https://jira.example.com/browse/WEB-12
//! ```
//!
//! [`Record::parse`] reads that block back tolerantly: each label is looked
//! up on its own and a missing or mangled line only leaves that one field
//! empty. Which fields may be pushed upstream is decided per field by
//! [`Field::is_editable`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::text::{quote, tokenize};

/// One header field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Summary,
    Project,
    Type,
    Status,
    Assignee,
    Components,
    Labels,
    Url,
}

impl Field {
    /// Header order in a rendered buffer.
    pub const ALL: [Self; 8] = [
        Self::Summary,
        Self::Project,
        Self::Type,
        Self::Status,
        Self::Assignee,
        Self::Components,
        Self::Labels,
        Self::Url,
    ];

    /// Line label, without the trailing colon.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Summary => "Summary",
            Self::Project => "Project",
            Self::Type => "Type",
            Self::Status => "Status",
            Self::Assignee => "Assignee",
            Self::Components => "Components",
            Self::Labels => "Labels",
            Self::Url => "URL",
        }
    }

    /// Whether edits to this field are reconciled back to the tracker.
    ///
    /// Status only changes through transitions, the URL is derived, and
    /// project and type are fixed once the ticket exists.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        match self {
            Self::Summary | Self::Assignee | Self::Components | Self::Labels => true,
            Self::Project | Self::Type | Self::Status | Self::Url => false,
        }
    }

    /// Whether the value is a whitespace-separated, quotable list.
    #[must_use]
    pub const fn is_set(self) -> bool {
        matches!(self, Self::Components | Self::Labels)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Header fields of one ticket. An empty string means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub summary: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub assignee: String,
    pub project: String,
    pub url: String,
    pub components: BTreeSet<String>,
    pub labels: BTreeSet<String>,
}

impl Record {
    /// Read the header block at the top of `buffer`.
    #[must_use]
    pub fn parse(buffer: &str) -> Self {
        let (header, _) = split_header(buffer);
        let mut record = Self::default();

        for field in Field::ALL {
            if let Some(value) = header_value(header, field.label()) {
                record.assign(field, value);
            }
        }

        record
    }

    /// Canonical header block, one line per field, ending in a newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for field in Field::ALL {
            let value = if field.is_set() {
                render_set(self.set(field))
            } else {
                self.scalar(field).to_string()
            };
            push_header_line(&mut out, field.label(), &value);
        }
        out
    }

    /// Value of a scalar field. Set fields read as empty.
    #[must_use]
    pub fn scalar(&self, field: Field) -> &str {
        match field {
            Field::Summary => &self.summary,
            Field::Project => &self.project,
            Field::Type => &self.kind,
            Field::Status => &self.status,
            Field::Assignee => &self.assignee,
            Field::Url => &self.url,
            Field::Components | Field::Labels => "",
        }
    }

    /// Value of a set field. Scalar fields read as the empty set.
    #[must_use]
    pub fn set(&self, field: Field) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        match field {
            Field::Components => &self.components,
            Field::Labels => &self.labels,
            _ => &EMPTY,
        }
    }

    fn assign(&mut self, field: Field, value: &str) {
        match field {
            Field::Summary => self.summary = value.to_string(),
            Field::Project => self.project = value.to_string(),
            Field::Type => self.kind = value.to_string(),
            Field::Status => self.status = value.to_string(),
            Field::Assignee => self.assignee = value.to_string(),
            Field::Url => self.url = value.to_string(),
            Field::Components => self.components = parse_set(value),
            Field::Labels => self.labels = parse_set(value),
        }
    }
}

/// Split a buffer into its header block and the text after the blank line
/// that ends it. Leading blank lines are skipped.
#[must_use]
pub fn split_header(buffer: &str) -> (&str, &str) {
    let mut offset = 0;
    let mut start = None;

    for line in buffer.split_inclusive('\n') {
        let blank = line.trim().is_empty();
        match start {
            None if blank => {}
            None => start = Some(offset),
            Some(begin) if blank => {
                return (&buffer[begin..offset], &buffer[offset + line.len()..]);
            }
            Some(_) => {}
        }
        offset += line.len();
    }

    (start.map_or("", |begin| &buffer[begin..]), "")
}

/// Header lines that carry none of the known labels. [`Record::parse`]
/// ignores them, which is where a comment typed without a blank line
/// above it ends up.
#[must_use]
pub fn stray_lines(buffer: &str) -> Vec<&str> {
    let (header, _) = split_header(buffer);
    header
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| {
            !Field::ALL.iter().any(|field| {
                line.strip_prefix(field.label())
                    .is_some_and(|rest| rest.starts_with(':'))
            })
        })
        .collect()
}

/// Append `Label: value`, or a bare `Label:` when the value is empty.
pub(crate) fn push_header_line(out: &mut String, label: &str, value: &str) {
    out.push_str(label);
    out.push(':');
    if !value.is_empty() {
        out.push(' ');
        out.push_str(value);
    }
    out.push('\n');
}

fn header_value<'a>(header: &'a str, label: &str) -> Option<&'a str> {
    header.lines().find_map(|line| {
        line.strip_prefix(label)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::trim)
    })
}

fn parse_set(value: &str) -> BTreeSet<String> {
    tokenize(value)
        .into_iter()
        .filter(|token| !token.is_empty())
        .collect()
}

fn render_set(values: &BTreeSet<String>) -> String {
    values
        .iter()
        .map(|value| quote(value))
        .collect::<Vec<_>>()
        .join(" ")
}
