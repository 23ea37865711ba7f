//! Plain-text helpers shared by the record model and the buffer layouts.
//!
//! - [`tokenize`] splits a shell-quoted value list into tokens.
//! - [`diff_sets`] computes added/removed elements between two small sets.
//! - [`wrap`] reflows prose to a column width, leaving code blocks alone.

mod reflow;
mod setdiff;
mod tokenize;

pub use reflow::wrap;
pub use setdiff::diff_sets;
pub use tokenize::{quote, tokenize, tokenize_reader};
