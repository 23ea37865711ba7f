//! One window's state machine.
//!
//! Every window is driven by a [`Session`] on its own thread. The session
//! owns the last tracker-synchronised [`Record`] (the snapshot) and turns
//! editor events into reloads, submits, transitions and navigation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use tracing::{debug, debug_span, warn};

use crate::app::App;
use crate::capabilities::Capabilities;
use crate::error::{Error, Result};
use crate::layout;
use crate::reconcile::{UpdateDocument, reconcile};
use crate::record::{self, Record};
use crate::surface::{Event, Window};

/// Title of the assigned-to-me listing.
pub const MY_ISSUES: &str = "my-issues";
/// Title of the search window.
pub const SEARCH: &str = "search";
/// Title of the saved-filters window.
pub const FILTERS: &str = "filters";
/// Title of the unsaved creation window.
pub const NEW_ISSUE: &str = "new-issue";
/// Title of the error log window.
pub const ERRORS: &str = "+Errors";

/// An executed action word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get,
    Put,
    New,
    /// `Search` followed by an optional query.
    Search(String),
    /// Any other word, e.g. a transition label.
    Named(String),
}

impl Command {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text {
            "Get" => return Self::Get,
            "Put" => return Self::Put,
            "New" => return Self::New,
            _ => {}
        }
        if let Some(rest) = text.strip_prefix("Search")
            && (rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            return Self::Search(rest.trim().to_string());
        }
        Self::Named(text.to_string())
    }
}

/// Where a look event points, after the window prefix is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    MyIssues,
    Search,
    Filters,
    Issue(String),
}

impl Target {
    #[must_use]
    pub fn parse(title: &str, capabilities: &Capabilities) -> Option<Self> {
        match title {
            "my-issues" | "mine" | "Mine" => Some(Self::MyIssues),
            "search" | "Search" => Some(Self::Search),
            "filters" | "Filters" => Some(Self::Filters),
            key if capabilities.is_issue_key(key) => Some(Self::Issue(key.to_string())),
            _ => None,
        }
    }
}

/// Action word for a workflow transition: each word capitalised, spaces
/// dropped. `"In Progress"` becomes `InProgress`.
#[must_use]
pub fn transition_label(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect()
}

/// Per-ticket state of a record window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordState {
    pub key: String,
    /// Transition label → transition id.
    pub transitions: BTreeMap<String, String>,
    /// Remote status seen at the last transition refresh.
    pub last_status: Option<String>,
}

impl RecordState {
    #[must_use]
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Listing,
    Record(RecordState),
    NewRecord,
    Search,
    FilterList,
    Errors,
}

impl Role {
    #[must_use]
    pub fn record(key: &str) -> Self {
        Self::Record(RecordState::new(key))
    }

    /// Action words shown for the window: base words, then transition
    /// labels in sorted order.
    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        let base: &[&str] = match self {
            Self::Listing | Self::Search => &["New", "Get", "Search"],
            Self::Record(_) => &["New", "Get", "Put", "Search"],
            Self::NewRecord => &["Put"],
            Self::FilterList => &["Get"],
            Self::Errors => &[],
        };
        let mut actions: Vec<String> = base.iter().map(|a| (*a).to_string()).collect();
        if let Self::Record(state) = self {
            actions.extend(state.transitions.keys().cloned());
        }
        actions
    }
}

/// Whether the event loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Session {
    title: String,
    role: Role,
    snapshot: Option<Record>,
    window: Arc<dyn Window>,
}

impl Session {
    #[must_use]
    pub fn new(title: &str, role: Role, window: Arc<dyn Window>) -> Self {
        Self {
            title: title.to_string(),
            role,
            snapshot: None,
            window,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn role(&self) -> &Role {
        &self.role
    }

    #[must_use]
    pub const fn snapshot(&self) -> Option<&Record> {
        self.snapshot.as_ref()
    }

    /// Load the window, then handle events until it closes. Deregisters on
    /// the way out.
    pub fn run(mut self, app: &Arc<App>, events: &Receiver<Event>) {
        let span = debug_span!("session", title = %self.title);
        let _guard = span.enter();

        if let Err(e) = self.window.set_actions(&self.role.actions()) {
            debug!(error = %e, "window gone before first load");
        }

        let mut flow = self.reload_or_report(app);
        while flow == Flow::Continue {
            let Ok(event) = events.recv() else {
                break;
            };
            flow = self.handle(app, event);
        }

        app.registry().deregister(&self.title);
        debug!("session ended");
    }

    /// Handle one event. Errors are reported, never returned.
    pub fn handle(&mut self, app: &Arc<App>, event: Event) -> Flow {
        debug!(?event, "event");
        match event {
            Event::Closed => Flow::Exit,
            Event::Look(text) => {
                if !app.look(&text) {
                    self.forward(&Event::Look(text));
                }
                Flow::Continue
            }
            Event::Execute(text) => self.execute(app, &text),
        }
    }

    fn execute(&mut self, app: &Arc<App>, text: &str) -> Flow {
        match Command::parse(text) {
            Command::Get => self.reload_or_report(app),
            Command::Put => match self.submit(app) {
                Ok(()) => self.reload_or_report(app),
                Err(e) => {
                    app.report(&e);
                    Flow::Continue
                }
            },
            Command::New => {
                app.new_issue();
                Flow::Continue
            }
            Command::Search(query) => {
                if self.role == Role::Search {
                    if !query.is_empty()
                        && let Err(e) = self.window.write_body(&layout::render_search(&query, &[]))
                    {
                        app.report(&e.into());
                        return Flow::Continue;
                    }
                    self.reload_or_report(app)
                } else {
                    app.search(&query);
                    Flow::Continue
                }
            }
            Command::Named(label) => {
                let transition = match &self.role {
                    Role::Record(state) => state.transitions.get(&label).cloned(),
                    _ => None,
                };
                match transition {
                    Some(id) => match self.transition(app, &id) {
                        Ok(()) => self.reload_or_report(app),
                        Err(e) => {
                            app.report(&e);
                            Flow::Continue
                        }
                    },
                    None => {
                        self.forward(&Event::Execute(text.to_string()));
                        Flow::Continue
                    }
                }
            }
        }
    }

    fn forward(&self, event: &Event) {
        if let Err(e) = self.window.forward(event) {
            debug!(error = %e, "forward failed");
        }
    }

    /// Reload, reporting failures. A record window that never loaded is
    /// closed on failure.
    fn reload_or_report(&mut self, app: &Arc<App>) -> Flow {
        let Err(e) = self.reload(app) else {
            return Flow::Continue;
        };
        app.report(&e);
        if matches!(self.role, Role::Record(_)) && self.snapshot.is_none() {
            warn!(error = %e, "first load failed, closing window");
            if let Err(e) = self.window.close() {
                debug!(error = %e, "close failed");
            }
            return Flow::Exit;
        }
        Flow::Continue
    }

    /// Replace the buffer with the tracker's current view.
    ///
    /// # Errors
    ///
    /// Returns the tracker or window error. The buffer and snapshot are left
    /// as they were.
    pub fn reload(&mut self, app: &App) -> Result<()> {
        let tracker = app.tracker();
        match &mut self.role {
            Role::Listing => {
                let rows = tracker.search(&app.config().my_issues_query)?;
                self.replace_body(&layout::render_table(&rows))?;
            }
            Role::Record(state) => {
                let issue = tracker.get_issue(&state.key)?;
                let status = &issue.record.status;
                if state.last_status.as_ref() != Some(status) {
                    let transitions = tracker.list_transitions(&state.key)?;
                    state.transitions = transitions
                        .into_iter()
                        .map(|t| (transition_label(&t.name), t.id))
                        .collect();
                    state.last_status = Some(status.clone());
                    debug!(%status, transitions = state.transitions.len(), "transitions refreshed");
                    self.window.set_actions(&self.role.actions())?;
                }
                self.replace_body(&layout::render_issue(&issue, app.config().wrap_width))?;
                self.snapshot = Some(issue.record);
            }
            Role::Search => {
                let query = layout::search_query(&self.window.read_body()?);
                if query.is_empty() {
                    debug!("empty query, nothing to search");
                    return Ok(());
                }
                let rows = tracker.search(&query)?;
                self.replace_body(&layout::render_search(&query, &rows))?;
            }
            Role::FilterList => {
                let filters = tracker.list_filters()?;
                self.replace_body(&layout::render_filters(&filters))?;
            }
            Role::NewRecord | Role::Errors => {}
        }
        Ok(())
    }

    fn replace_body(&self, text: &str) -> Result<()> {
        self.window.write_body(text)?;
        self.window.mark_clean()?;
        Ok(())
    }

    /// Push the buffer's edits to the tracker.
    ///
    /// A record window sends the header diff against the snapshot plus any
    /// typed comment; nothing is sent when both are empty. A new-record
    /// window is validated, created, and becomes a record window.
    ///
    /// # Errors
    ///
    /// Returns the validation, tracker or window error.
    pub fn submit(&mut self, app: &App) -> Result<()> {
        match &self.role {
            Role::Record(state) => {
                let body = self.window.read_body()?;
                let Some(update) = self.pending_update(&body) else {
                    debug!("nothing to put");
                    return Ok(());
                };
                debug!(ops = update.operation_count(), "put update");
                app.tracker().apply_update(&state.key, &update)?;
            }
            Role::NewRecord => {
                let body = self.window.read_body()?;
                let header = Record::parse(&body);
                let issue = app
                    .capabilities()
                    .resolve(&header, &layout::description(&body))?;
                let key = app.tracker().create_issue(&issue)?;
                debug!(%key, "issue created");
                self.become_record(app, &key)?;
            }
            Role::Listing | Role::Search | Role::FilterList | Role::Errors => {}
        }
        Ok(())
    }

    /// Diff against the snapshot as the buffer shows it, so values the
    /// header format cannot hold verbatim never produce operations.
    fn pending_update(&self, body: &str) -> Option<UpdateDocument> {
        for line in record::stray_lines(body) {
            warn!(line, "ignoring unrecognized header line; separate a comment with a blank line");
        }
        let diff = self.snapshot.as_ref().and_then(|snapshot| {
            reconcile(&Record::parse(body), &Record::parse(&snapshot.render()))
        });
        UpdateDocument::with_comment(diff, layout::comment_region(body).as_deref())
    }

    fn become_record(&mut self, app: &App, key: &str) -> Result<(), Error> {
        if app.registry().rename(&self.title, key) {
            self.title = key.to_string();
            self.window.rename(&app.config().window_name(key))?;
        } else {
            warn!(%key, title = %self.title, "window for key already open, keeping title");
        }
        self.role = Role::record(key);
        self.window.set_actions(&self.role.actions())?;
        Ok(())
    }

    /// Run a workflow transition, carrying any pending edits and comment.
    ///
    /// # Errors
    ///
    /// Returns the tracker or window error.
    pub fn transition(&self, app: &App, id: &str) -> Result<()> {
        let Role::Record(state) = &self.role else {
            return Ok(());
        };
        let body = self.window.read_body()?;
        let update = self.pending_update(&body);
        debug!(transition = id, with_update = update.is_some(), "transition");
        app.tracker()
            .apply_transition(&state.key, id, update.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Project;

    #[test]
    fn commands_parse() {
        assert_eq!(Command::parse("Get"), Command::Get);
        assert_eq!(Command::parse(" Put\n"), Command::Put);
        assert_eq!(Command::parse("New"), Command::New);
        assert_eq!(Command::parse("Search"), Command::Search(String::new()));
        assert_eq!(
            Command::parse("Search  project = WEB "),
            Command::Search("project = WEB".to_string())
        );
        assert_eq!(
            Command::parse("Searchable"),
            Command::Named("Searchable".to_string())
        );
        assert_eq!(
            Command::parse("InProgress"),
            Command::Named("InProgress".to_string())
        );
    }

    #[test]
    fn targets_parse() {
        let caps = Capabilities::with(
            vec![Project {
                key: "WEB".to_string(),
                name: "Website".to_string(),
                id: "1".to_string(),
            }],
            Vec::new(),
        );
        assert_eq!(Target::parse("mine", &caps), Some(Target::MyIssues));
        assert_eq!(Target::parse("Mine", &caps), Some(Target::MyIssues));
        assert_eq!(Target::parse("my-issues", &caps), Some(Target::MyIssues));
        assert_eq!(Target::parse("search", &caps), Some(Target::Search));
        assert_eq!(Target::parse("filters", &caps), Some(Target::Filters));
        assert_eq!(
            Target::parse("WEB-4", &caps),
            Some(Target::Issue("WEB-4".to_string()))
        );
        assert_eq!(Target::parse("OPS-4", &caps), None);
        assert_eq!(Target::parse("hello", &caps), None);
    }

    #[test]
    fn transition_labels() {
        assert_eq!(transition_label("In Progress"), "InProgress");
        assert_eq!(transition_label("start progress"), "StartProgress");
        assert_eq!(transition_label("Done"), "Done");
        assert_eq!(transition_label("  "), "");
    }

    #[test]
    fn record_actions_end_with_sorted_transitions() {
        let mut state = RecordState::new("WEB-1");
        state.transitions.insert("Resolve".to_string(), "5".to_string());
        state.transitions.insert("InProgress".to_string(), "4".to_string());
        assert_eq!(
            Role::Record(state).actions(),
            vec!["New", "Get", "Put", "Search", "InProgress", "Resolve"]
        );
        assert_eq!(Role::NewRecord.actions(), vec!["Put"]);
        assert!(Role::Errors.actions().is_empty());
    }
}
