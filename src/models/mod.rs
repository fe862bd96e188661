pub mod collection;
mod jsonc;
pub mod snippet;

pub use collection::{Collection, strip_comments};
pub use snippet::{Body, Snippet, SnippetPatch, SnippetRecord, validate};
