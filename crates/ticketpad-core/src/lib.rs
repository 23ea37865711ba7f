//! ticketpad-core library.
//!
//! Keeps an editable text rendering of a remote ticket in step with the
//! tracker and turns edits back into minimal update operations.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums with stable [`error::ErrorCode`]s in the
//!   library; `anyhow::Result` only for config loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`).

pub mod app;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod layout;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod session;
pub mod surface;
pub mod text;
pub mod tracker;

pub use app::App;
pub use error::{Error, ErrorCode, Result};
pub use record::{Field, Record};
pub use reconcile::{Operation, UpdateDocument, reconcile};
