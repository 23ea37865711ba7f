//! Text layouts of every buffer kind, and the readers for the free-text
//! regions of a record buffer.
//!
//! A record buffer looks like this:
//!
//! ```text
//! Summary: ...            <- header block, see crate::record
//! URL: ...
//!
//! (comment being written) <- comment-entry region, empty after a reload
//!
//! Reported by alice (Tue, 5 Mar 2024 10:00:00 +0100)
//!
//! 	description, reflowed and tab-indented
//!
//! Comment by bob (...):
//! 	comment body
//! ```

use chrono::{DateTime, Local};

use crate::record::{Field, push_header_line, split_header};
use crate::text::{quote, wrap};
use crate::tracker::{Filter, Issue, IssueSummary};

/// First words of the line that ends the comment-entry region.
pub const REPORTED_BY: &str = "Reported by ";

/// Label of the query line at the top of a search buffer.
pub const SEARCH_LABEL: &str = "Search";

const JIRA_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Render a tracker timestamp in local time, or verbatim if it won't parse.
#[must_use]
pub fn display_time(raw: &str) -> String {
    DateTime::parse_from_str(raw, JIRA_TIME_FORMAT).map_or_else(
        |_| raw.to_string(),
        |t| t.with_timezone(&Local).to_rfc2822(),
    )
}

/// Full record buffer for `issue`.
#[must_use]
pub fn render_issue(issue: &Issue, wrap_width: usize) -> String {
    let mut out = issue.record.render();
    out.push_str("\n\n");
    out.push_str(REPORTED_BY);
    out.push_str(&format!(
        "{} ({})\n\n",
        issue.reporter,
        display_time(&issue.created)
    ));
    out.push_str(&wrap(&issue.description, "\t", wrap_width));

    for comment in &issue.comments {
        out.push_str(&format!(
            "\nComment by {} ({}):\n",
            comment.author,
            display_time(&comment.created)
        ));
        out.push_str(&wrap(&comment.body, "\t", wrap_width));
    }

    out
}

/// The user's pending comment: the text between the header block and the
/// `Reported by` line, trimmed. `None` when blank.
#[must_use]
pub fn comment_region(buffer: &str) -> Option<String> {
    let (_, rest) = split_header(buffer);
    let text = rest
        .lines()
        .take_while(|line| !line.starts_with(REPORTED_BY))
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Everything after the header block, trimmed. Used for new tickets.
#[must_use]
pub fn description(buffer: &str) -> String {
    split_header(buffer).1.trim().to_string()
}

/// Blank creation form listing the valid project keys and type names.
#[must_use]
pub fn creation_template(projects: &[String], types: &[String]) -> String {
    let mut out = String::new();
    for field in [
        Field::Summary,
        Field::Project,
        Field::Type,
        Field::Assignee,
        Field::Components,
        Field::Labels,
    ] {
        push_header_line(&mut out, field.label(), "");
    }
    push_header_line(&mut out, "Projects", &projects.join(" "));
    let types: Vec<String> = types.iter().map(|t| quote(t)).collect();
    push_header_line(&mut out, "Types", &types.join(" "));
    out.push('\n');
    out
}

/// One row per issue: key, `type/status`, summary, in padded columns.
#[must_use]
pub fn render_table(rows: &[IssueSummary]) -> String {
    let states: Vec<String> = rows
        .iter()
        .map(|row| format!("{}/{}", row.kind, row.status))
        .collect();
    let key_width = rows.iter().map(|r| r.key.chars().count()).max().unwrap_or(0);
    let state_width = states.iter().map(|s| s.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    for (row, state) in rows.iter().zip(&states) {
        let line = format!(
            "{:<key_width$}  {:<state_width$}  {}",
            row.key, state, row.summary
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Search buffer: the query line, a blank line, then the result table.
#[must_use]
pub fn render_search(query: &str, rows: &[IssueSummary]) -> String {
    let mut out = String::new();
    push_header_line(&mut out, SEARCH_LABEL, query);
    out.push('\n');
    out.push_str(&render_table(rows));
    out
}

/// Query typed on the first line of a search buffer.
#[must_use]
pub fn search_query(buffer: &str) -> String {
    let first = buffer.lines().next().unwrap_or_default();
    let rest = first.strip_prefix(SEARCH_LABEL).unwrap_or(first);
    rest.strip_prefix(':').unwrap_or(rest).trim().to_string()
}

/// Saved filters: padded name, then the query.
#[must_use]
pub fn render_filters(filters: &[Filter]) -> String {
    let width = filters
        .iter()
        .map(|f| f.name.chars().count())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for filter in filters {
        out.push_str(&format!("{:<width$}  {}\n", filter.name, filter.jql));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::tracker::Comment;

    fn issue() -> Issue {
        Issue {
            key: "WEB-12".to_string(),
            id: "10012".to_string(),
            record: Record {
                summary: "Login times out".to_string(),
                kind: "Bug".to_string(),
                status: "Open".to_string(),
                assignee: "alice".to_string(),
                project: "WEB".to_string(),
                url: "https://jira.example.com/browse/WEB-12".to_string(),
                ..Record::default()
            },
            reporter: "carol".to_string(),
            created: "not a timestamp".to_string(),
            description: "Steps to reproduce are below.".to_string(),
            comments: vec![Comment {
                author: "bob".to_string(),
                created: "yesterday".to_string(),
                body: "Seen it too.".to_string(),
            }],
        }
    }

    #[test]
    fn issue_layout() {
        let text = render_issue(&issue(), 80);
        let expected = "Summary: Login times out\n\
                        Project: WEB\n\
                        Type: Bug\n\
                        Status: Open\n\
                        Assignee: alice\n\
                        Components:\n\
                        Labels:\n\
                        URL: https://jira.example.com/browse/WEB-12\n\
                        \n\
                        \n\
                        Reported by carol (not a timestamp)\n\
                        \n\
                        \tSteps to reproduce are below.\n\
                        \n\
                        Comment by bob (yesterday):\n\
                        \tSeen it too.\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn rendered_issue_parses_back_to_its_record() {
        let issue = issue();
        assert_eq!(Record::parse(&render_issue(&issue, 80)), issue.record);
    }

    #[test]
    fn fresh_issue_has_no_comment() {
        assert_eq!(comment_region(&render_issue(&issue(), 80)), None);
    }

    #[test]
    fn typed_comment_is_extracted() {
        let text = render_issue(&issue(), 80).replacen(
            "\n\n\nReported by",
            "\n\nFixed in build 42.\n\nPlease verify.\n\nReported by",
            1,
        );
        assert_eq!(
            comment_region(&text).as_deref(),
            Some("Fixed in build 42.\n\nPlease verify.")
        );
    }

    #[test]
    fn comment_without_reported_by_runs_to_end() {
        assert_eq!(
            comment_region("Summary: x\n\nall of this\n").as_deref(),
            Some("all of this")
        );
    }

    #[test]
    fn jira_timestamps_are_reformatted() {
        let shown = display_time("2024-03-05T10:00:00.000+0100");
        let parsed = DateTime::parse_from_rfc2822(&shown).expect("rfc2822 output");
        let original =
            DateTime::parse_from_str("2024-03-05T10:00:00.000+0100", JIRA_TIME_FORMAT)
                .expect("jira input");
        assert_eq!(parsed, original);
    }

    #[test]
    fn creation_template_lists_choices() {
        let text = creation_template(
            &["WEB".to_string(), "OPS".to_string()],
            &["Bug".to_string(), "Sub task".to_string()],
        );
        assert_eq!(
            text,
            "Summary:\nProject:\nType:\nAssignee:\nComponents:\nLabels:\n\
             Projects: WEB OPS\nTypes: Bug \"Sub task\"\n\n"
        );
        assert_eq!(Record::parse(&text), Record::default());
        assert_eq!(description(&text), "");
    }

    #[test]
    fn description_follows_header() {
        let text = "Summary: x\nProject: WEB\n\n  The body\n\nsecond para \n";
        assert_eq!(description(text), "The body\n\nsecond para");
    }

    #[test]
    fn table_columns_are_aligned() {
        let rows = vec![
            IssueSummary {
                key: "WEB-1".to_string(),
                kind: "Bug".to_string(),
                status: "Open".to_string(),
                summary: "First".to_string(),
            },
            IssueSummary {
                key: "WEB-100".to_string(),
                kind: "Story".to_string(),
                status: "In Progress".to_string(),
                summary: "Second".to_string(),
            },
        ];
        assert_eq!(
            render_table(&rows),
            "WEB-1    Bug/Open           First\n\
             WEB-100  Story/In Progress  Second\n"
        );
    }

    #[test]
    fn search_buffer_round_trips_query() {
        let text = render_search("project = WEB", &[]);
        assert_eq!(text, "Search: project = WEB\n\n");
        assert_eq!(search_query(&text), "project = WEB");
        assert_eq!(search_query("Search status = Open\n"), "status = Open");
        assert_eq!(search_query(""), "");
    }

    #[test]
    fn filters_are_listed() {
        let filters = vec![
            Filter {
                name: "mine".to_string(),
                jql: "assignee = currentUser()".to_string(),
            },
            Filter {
                name: "blockers".to_string(),
                jql: "priority = Blocker".to_string(),
            },
        ];
        assert_eq!(
            render_filters(&filters),
            "mine      assignee = currentUser()\nblockers  priority = Blocker\n"
        );
    }
}
