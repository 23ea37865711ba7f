//! The host editor, reduced to named text windows and an event stream.
//!
//! A [`Surface`] opens windows; each window delivers the user's actions as
//! [`Event`]s on the channel handed to [`Surface::open`]. The same channel
//! is used by the app to post events to a session from other threads.

use std::sync::Arc;
use std::sync::mpsc::Sender;

use crate::error::SurfaceError;

pub mod memory;

pub use memory::MemorySurface;

/// A user action on a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Run the command text (a clicked or typed action word).
    Execute(String),
    /// Navigate to the target text (an issue key or a window name).
    Look(String),
    /// The window was closed by its owner. Always the last event.
    Closed,
}

/// One open window. Calls on a closed window fail with
/// [`SurfaceError::Closed`].
pub trait Window: Send + Sync {
    fn read_body(&self) -> Result<String, SurfaceError>;

    /// Replace the whole body.
    fn write_body(&self, text: &str) -> Result<(), SurfaceError>;

    fn append_body(&self, text: &str) -> Result<(), SurfaceError>;

    fn rename(&self, name: &str) -> Result<(), SurfaceError>;

    /// Replace the clickable action words shown for this window.
    fn set_actions(&self, actions: &[String]) -> Result<(), SurfaceError>;

    /// Bring the window to the front.
    fn show(&self) -> Result<(), SurfaceError>;

    /// Mark the body as matching the tracker.
    fn mark_clean(&self) -> Result<(), SurfaceError>;

    fn close(&self) -> Result<(), SurfaceError>;

    /// Hand an event back to the editor's own handling.
    fn forward(&self, event: &Event) -> Result<(), SurfaceError>;
}

/// Factory for windows.
pub trait Surface: Send + Sync {
    /// Open a window called `name`; its events are sent to `events`.
    fn open(&self, name: &str, events: Sender<Event>) -> Result<Arc<dyn Window>, SurfaceError>;
}
