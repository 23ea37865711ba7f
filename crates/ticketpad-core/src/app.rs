//! The shared service object behind every session.
//!
//! [`App`] owns the tracker client, the editor surface, the session
//! [`Registry`] and the tracker [`Capabilities`]. Sessions hold an
//! `Arc<App>` and call back into it to navigate and to report errors.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::capabilities::Capabilities;
use crate::config::Config;
use crate::error::{Error, Result, SurfaceError};
use crate::layout;
use crate::registry::{Lookup, Registry, SessionHandle};
use crate::session::{ERRORS, FILTERS, MY_ISSUES, NEW_ISSUE, Role, SEARCH, Session, Target};
use crate::surface::{Event, Surface};
use crate::tracker::Tracker;

/// Outcome of [`App::open`].
pub enum Opened {
    /// A window with that title was already open and has been shown.
    Existing(SessionHandle),
    /// A new window and session were started.
    Created(SessionHandle),
}

impl Opened {
    #[must_use]
    pub const fn handle(&self) -> &SessionHandle {
        match self {
            Self::Existing(h) | Self::Created(h) => h,
        }
    }
}

pub struct App {
    tracker: Arc<dyn Tracker>,
    surface: Arc<dyn Surface>,
    registry: Registry,
    capabilities: Capabilities,
    config: Config,
}

impl App {
    #[must_use]
    pub fn new(tracker: Arc<dyn Tracker>, surface: Arc<dyn Surface>, config: Config) -> Arc<Self> {
        Arc::new(Self {
            tracker,
            surface,
            registry: Registry::new(),
            capabilities: Capabilities::new(),
            config,
        })
    }

    #[must_use]
    pub fn tracker(&self) -> &dyn Tracker {
        self.tracker.as_ref()
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Load projects and issue types, then open the named window (or the
    /// configured default).
    pub fn start(self: &Arc<Self>, window: Option<&str>) {
        if let Err(e) = self.capabilities.refresh(self.tracker()) {
            warn!(error = %e, "capability refresh failed, accepting any issue key");
            self.report(&e.into());
        }

        let target = window
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .unwrap_or(&self.config.default_window);
        info!(target, "starting");
        if !self.look(target) {
            warn!(target, "nothing to open");
        }
    }

    /// Block until every window has closed.
    pub fn wait(&self) {
        self.registry.wait_until_empty();
    }

    /// Show or create the window `text` names. False if it names nothing.
    pub fn look(self: &Arc<Self>, text: &str) -> bool {
        let title = self.config.strip_prefix(text);
        debug!(title, "look");

        let Some(target) = Target::parse(title, &self.capabilities) else {
            return self.registry.get(title).is_some_and(|handle| {
                if let Err(e) = handle.window.show() {
                    debug!(error = %e, "show failed");
                }
                true
            });
        };

        let opened = match target {
            Target::MyIssues => self.open(MY_ISSUES, Role::Listing, None),
            Target::Search => self.open(SEARCH, Role::Search, Some(layout::render_search("", &[]))),
            Target::Filters => self.open(FILTERS, Role::FilterList, None),
            Target::Issue(key) => self.open(&key, Role::record(&key), None),
        };
        if let Err(e) = opened {
            self.report(&e);
        }
        true
    }

    /// Run `query` in the search window, creating it if needed.
    pub fn search(self: &Arc<Self>, query: &str) {
        let body = layout::render_search(query, &[]);
        match self.open(SEARCH, Role::Search, Some(body)) {
            Ok(Opened::Existing(handle)) => {
                if !query.is_empty() {
                    handle.post(Event::Execute(format!("Search {query}")));
                }
            }
            Ok(Opened::Created(_)) => {}
            Err(e) => self.report(&e),
        }
    }

    /// Show the creation form, creating it if needed.
    pub fn new_issue(self: &Arc<Self>) {
        let body = layout::creation_template(
            &self.capabilities.project_keys(),
            &self.capabilities.type_names(),
        );
        if let Err(e) = self.open(NEW_ISSUE, Role::NewRecord, Some(body)) {
            self.report(&e);
        }
    }

    /// Append an error line to the `+Errors` window and bring it up.
    pub fn report(self: &Arc<Self>, err: &Error) {
        let line = err.report();
        debug!(code = %err.code(), "{line}");
        if let Err(e) = self.append_error(&line) {
            error!(error = %e, "{line}");
        }
    }

    fn append_error(self: &Arc<Self>, line: &str) -> Result<()> {
        let opened = self.open(ERRORS, Role::Errors, None)?;
        let window = &opened.handle().window;
        window.append_body(&format!("{line}\n"))?;
        window.show()?;
        Ok(())
    }

    /// Show the window registered as `title`, or open one in `role` and
    /// start its session thread. A new window starts with `body`, if given,
    /// and is then loaded by its session.
    ///
    /// # Errors
    ///
    /// Returns the surface error if the window cannot be opened.
    pub fn open(self: &Arc<Self>, title: &str, role: Role, body: Option<String>) -> Result<Opened> {
        let lookup = self.registry.show_or_create(title, || {
            let (tx, rx) = mpsc::channel();
            let window = self.surface.open(&self.config.window_name(title), tx.clone())?;
            if let Some(body) = &body {
                window.write_body(body)?;
                window.mark_clean()?;
            }
            Ok((SessionHandle { window, events: tx }, rx))
        })?;

        let (handle, events) = match lookup {
            Lookup::Existing(handle) => return Ok(Opened::Existing(handle)),
            Lookup::Created(handle, events) => (handle, events),
        };

        let session = Session::new(title, role, Arc::clone(&handle.window));
        let app = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("session:{title}"))
            .spawn(move || session.run(&app, &events));
        if let Err(e) = spawned {
            self.registry.deregister(title);
            let _ = handle.window.close();
            return Err(SurfaceError::from(e).into());
        }
        Ok(Opened::Created(handle))
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("sessions", &self.registry.titles())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
