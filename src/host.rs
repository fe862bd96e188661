//! Editor-side capabilities the snippet trees depend on.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Which tree a notification or reveal targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Scope,
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickItem {
    pub label: String,
    pub description: Option<String>,
}

impl PickItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Snapshot of the focused editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveEditor {
    pub path: PathBuf,
    pub language_id: String,
    pub text: String,
    /// Currently selected text, empty when nothing is selected.
    pub selection: String,
}

/// Tree node handle: a group alone, or one snippet key inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub group: PathBuf,
    pub key: Option<String>,
}

impl NodeRef {
    pub fn group(path: impl Into<PathBuf>) -> Self {
        Self {
            group: path.into(),
            key: None,
        }
    }

    pub fn leaf(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            group: path.into(),
            key: Some(key.into()),
        }
    }
}

/// Prompts return `None` when the user dismisses them.
#[async_trait(?Send)]
pub trait Host {
    async fn pick(&self, items: &[PickItem], placeholder: &str) -> Option<usize>;

    async fn input(&self, placeholder: &str) -> Option<String>;

    /// Informational message with a single action button; `true` if clicked.
    async fn offer(&self, message: &str, action: &str) -> bool;

    /// Opens `path` for editing and returns the text currently in its buffer.
    async fn open_document(&self, path: &Path, language_id: Option<&str>)
    -> anyhow::Result<String>;

    /// Replaces the whole buffer of an open document.
    async fn replace_document(&self, path: &Path, text: &str) -> anyhow::Result<()>;

    async fn languages(&self) -> Vec<String>;

    fn active_editor(&self) -> Option<ActiveEditor>;

    fn workspace_folders(&self) -> Vec<PathBuf>;

    fn show_info(&self, message: &str);

    fn show_warning(&self, message: &str);

    fn show_error(&self, message: &str);

    fn reveal(&self, view: View, node: &NodeRef);

    fn tree_changed(&self, view: View);
}

/// Asks a No/Yes question; anything but an explicit "Yes" is a no.
pub async fn confirm(host: &dyn Host, placeholder: &str) -> bool {
    let items = [PickItem::new("No"), PickItem::new("Yes")];
    host.pick(&items, placeholder).await == Some(1)
}
