//! In-process editor surface.
//!
//! Windows are plain strings behind a mutex. The host side (a terminal
//! driver, or a test) edits bodies and injects events by window name.

use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{Event, Surface, Window};
use crate::error::SurfaceError;

#[derive(Debug)]
struct Buffer {
    name: String,
    body: String,
    actions: Vec<String>,
    dirty: bool,
    shown: usize,
    forwarded: Vec<Event>,
    events: Sender<Event>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    buffers: BTreeMap<u64, Buffer>,
}

impl State {
    fn by_name(&self, name: &str) -> Option<(u64, &Buffer)> {
        self.buffers
            .iter()
            .find(|(_, b)| b.name == name)
            .map(|(id, b)| (*id, b))
    }

    fn by_name_mut(&mut self, name: &str) -> Option<&mut Buffer> {
        self.buffers.values_mut().find(|b| b.name == name)
    }
}

/// Shared, cloneable in-memory surface.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    state: Arc<Mutex<State>>,
}

impl MemorySurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Names of all open windows, in opening order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.lock().buffers.values().map(|b| b.name.clone()).collect()
    }

    #[must_use]
    pub fn body(&self, name: &str) -> Option<String> {
        self.lock().by_name(name).map(|(_, b)| b.body.clone())
    }

    /// Replace a body as the user would, leaving the window dirty.
    pub fn edit(&self, name: &str, text: &str) -> bool {
        self.lock().by_name_mut(name).is_some_and(|b| {
            b.body = text.to_string();
            b.dirty = true;
            true
        })
    }

    #[must_use]
    pub fn actions(&self, name: &str) -> Option<Vec<String>> {
        self.lock().by_name(name).map(|(_, b)| b.actions.clone())
    }

    #[must_use]
    pub fn is_dirty(&self, name: &str) -> Option<bool> {
        self.lock().by_name(name).map(|(_, b)| b.dirty)
    }

    /// How many times the window was brought to the front.
    #[must_use]
    pub fn shown(&self, name: &str) -> usize {
        self.lock().by_name(name).map_or(0, |(_, b)| b.shown)
    }

    /// Events the sessions handed back unhandled.
    #[must_use]
    pub fn forwarded(&self, name: &str) -> Vec<Event> {
        self.lock()
            .by_name(name)
            .map(|(_, b)| b.forwarded.clone())
            .unwrap_or_default()
    }

    /// Deliver an event to the window's session.
    pub fn send(&self, name: &str, event: Event) -> bool {
        let state = self.lock();
        let Some((_, buffer)) = state.by_name(name) else {
            return false;
        };
        buffer.events.send(event).is_ok()
    }

    pub fn execute(&self, name: &str, command: &str) -> bool {
        self.send(name, Event::Execute(command.to_string()))
    }

    pub fn look(&self, name: &str, target: &str) -> bool {
        self.send(name, Event::Look(target.to_string()))
    }

    /// Close a window as its owner would.
    pub fn close(&self, name: &str) -> bool {
        let mut state = self.lock();
        let Some((id, _)) = state.by_name(name) else {
            return false;
        };
        if let Some(buffer) = state.buffers.remove(&id) {
            let _ = buffer.events.send(Event::Closed);
        }
        true
    }
}

impl Surface for MemorySurface {
    fn open(&self, name: &str, events: Sender<Event>) -> Result<Arc<dyn Window>, SurfaceError> {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.buffers.insert(
            id,
            Buffer {
                name: name.to_string(),
                body: String::new(),
                actions: Vec::new(),
                dirty: false,
                shown: 0,
                forwarded: Vec::new(),
                events,
            },
        );
        debug!(name, id, "opened window");
        Ok(Arc::new(MemoryWindow {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemoryWindow {
    id: u64,
    state: Arc<Mutex<State>>,
}

impl MemoryWindow {
    fn with<T>(&self, f: impl FnOnce(&mut Buffer) -> T) -> Result<T, SurfaceError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .buffers
            .get_mut(&self.id)
            .map(f)
            .ok_or_else(|| SurfaceError::Closed(format!("#{}", self.id)))
    }
}

impl Window for MemoryWindow {
    fn read_body(&self) -> Result<String, SurfaceError> {
        self.with(|b| b.body.clone())
    }

    fn write_body(&self, text: &str) -> Result<(), SurfaceError> {
        self.with(|b| {
            b.body = text.to_string();
            b.dirty = true;
        })
    }

    fn append_body(&self, text: &str) -> Result<(), SurfaceError> {
        self.with(|b| b.body.push_str(text))
    }

    fn rename(&self, name: &str) -> Result<(), SurfaceError> {
        self.with(|b| b.name = name.to_string())
    }

    fn set_actions(&self, actions: &[String]) -> Result<(), SurfaceError> {
        self.with(|b| b.actions = actions.to_vec())
    }

    fn show(&self) -> Result<(), SurfaceError> {
        self.with(|b| b.shown += 1)
    }

    fn mark_clean(&self) -> Result<(), SurfaceError> {
        self.with(|b| b.dirty = false)
    }

    fn close(&self) -> Result<(), SurfaceError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let buffer = state
            .buffers
            .remove(&self.id)
            .ok_or_else(|| SurfaceError::Closed(format!("#{}", self.id)))?;
        let _ = buffer.events.send(Event::Closed);
        Ok(())
    }

    fn forward(&self, event: &Event) -> Result<(), SurfaceError> {
        self.with(|b| b.forwarded.push(event.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn window_round_trips_body() {
        let surface = MemorySurface::new();
        let (tx, _rx) = mpsc::channel();
        let window = surface.open("/jira/WEB-1", tx).expect("open");

        window.write_body("Summary: x\n").expect("write");
        window.append_body("more\n").expect("append");
        assert_eq!(window.read_body().expect("read"), "Summary: x\nmore\n");
        assert_eq!(surface.is_dirty("/jira/WEB-1"), Some(true));

        window.mark_clean().expect("clean");
        assert_eq!(surface.is_dirty("/jira/WEB-1"), Some(false));
    }

    #[test]
    fn host_events_reach_the_channel() {
        let surface = MemorySurface::new();
        let (tx, rx) = mpsc::channel();
        let _window = surface.open("w", tx).expect("open");

        assert!(surface.execute("w", "Get"));
        assert!(surface.look("w", "WEB-2"));
        assert!(surface.close("w"));
        assert!(!surface.execute("w", "Get"));

        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                Event::Execute("Get".to_string()),
                Event::Look("WEB-2".to_string()),
                Event::Closed,
            ]
        );
    }

    #[test]
    fn closed_window_rejects_writes() {
        let surface = MemorySurface::new();
        let (tx, rx) = mpsc::channel();
        let window = surface.open("w", tx).expect("open");

        window.close().expect("close");
        assert!(matches!(
            window.write_body("late result"),
            Err(SurfaceError::Closed(_))
        ));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Event::Closed]);
        assert!(surface.names().is_empty());
    }

    #[test]
    fn rename_changes_lookup_name() {
        let surface = MemorySurface::new();
        let (tx, _rx) = mpsc::channel();
        let window = surface.open("new-issue", tx).expect("open");
        window.rename("WEB-9").expect("rename");
        assert_eq!(surface.names(), vec!["WEB-9".to_string()]);
        assert!(surface.body("new-issue").is_none());
    }
}
