//! Title → session map shared by every session thread.
//!
//! Lookup and insertion happen under one lock, so two navigations to the
//! same title never open two windows.

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::SurfaceError;
use crate::surface::{Event, Window};

/// What other threads need to reach a live session.
#[derive(Clone)]
pub struct SessionHandle {
    pub window: Arc<dyn Window>,
    pub events: Sender<Event>,
}

impl SessionHandle {
    /// Post an event to the session's queue. False if the session is gone.
    pub fn post(&self, event: Event) -> bool {
        self.events.send(event).is_ok()
    }
}

/// Result of [`Registry::show_or_create`].
pub enum Lookup<T> {
    /// The title was registered; its window has been shown.
    Existing(SessionHandle),
    /// A new session was registered. `T` is whatever the creator returned
    /// besides the handle.
    Created(SessionHandle, T),
}

#[derive(Default)]
pub struct Registry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    emptied: Condvar,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show the session registered as `title`, or register the one `create`
    /// builds.
    ///
    /// The lock is held across `create`, so it must not call back into the
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns the surface error from showing or creating the window.
    pub fn show_or_create<T, F>(&self, title: &str, create: F) -> Result<Lookup<T>, SurfaceError>
    where
        F: FnOnce() -> Result<(SessionHandle, T), SurfaceError>,
    {
        let mut sessions = self.lock();
        if let Some(handle) = sessions.get(title) {
            handle.window.show()?;
            return Ok(Lookup::Existing(handle.clone()));
        }
        let (handle, extra) = create()?;
        sessions.insert(title.to_string(), handle.clone());
        debug!(title, "session registered");
        Ok(Lookup::Created(handle, extra))
    }

    #[must_use]
    pub fn get(&self, title: &str) -> Option<SessionHandle> {
        self.lock().get(title).cloned()
    }

    /// Move a session to a new title. False if `from` is not registered or
    /// `to` already is.
    pub fn rename(&self, from: &str, to: &str) -> bool {
        let mut sessions = self.lock();
        if sessions.contains_key(to) {
            return false;
        }
        let Some(handle) = sessions.remove(from) else {
            return false;
        };
        sessions.insert(to.to_string(), handle);
        debug!(from, to, "session renamed");
        true
    }

    /// Drop a session. Wakes waiters once the registry is empty.
    pub fn deregister(&self, title: &str) {
        let mut sessions = self.lock();
        if sessions.remove(title).is_some() {
            debug!(title, remaining = sessions.len(), "session deregistered");
        }
        if sessions.is_empty() {
            self.emptied.notify_all();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Registered titles, sorted.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.lock().keys().cloned().collect();
        titles.sort();
        titles
    }

    /// Block until no session is registered.
    pub fn wait_until_empty(&self) {
        let sessions = self.lock();
        let _sessions = self
            .emptied
            .wait_while(sessions, |s| !s.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Like [`Self::wait_until_empty`], giving up after `timeout`. Returns
    /// whether the registry emptied.
    pub fn wait_until_empty_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut sessions = self.lock();
        while !sessions.is_empty() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return false;
            }
            sessions = self
                .emptied
                .wait_timeout(sessions, left)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}
