//! Editor snippet files, edited one snippet at a time through annotated
//! scratch text.
//!
//! [`codec`] turns a snippet into comment-annotated source text and back,
//! [`store`] owns the parsed snippet files, and [`scope_tree`] /
//! [`global_tree`] project them into trees driven through a [`host::Host`].
//! [`orchestrator::Orchestrator`] routes editor events and commands to them.

pub mod codec;
pub mod error;
pub mod global_tree;
pub mod host;
pub mod models;
pub mod orchestrator;
pub mod scope_tree;
pub mod scratch;
pub mod settings;
pub mod store;
pub mod syntax;
pub mod tree;

#[cfg(test)]
mod testing;

pub use error::{Result, SnippetError};
