//! Scripted [`Host`] for unit tests.

use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use crate::host::{ActiveEditor, Host, NodeRef, PickItem, View};

/// Scripted answer to the next prompt.
#[derive(Debug, Clone)]
pub enum Reply {
    Pick(usize),
    Text(String),
    Accept,
    Decline,
    /// Dismisses whatever prompt comes next.
    Cancel,
}

#[derive(Default)]
pub struct FakeHost {
    replies: RefCell<VecDeque<Reply>>,
    editor: Option<ActiveEditor>,
    folders: Vec<PathBuf>,
    languages: Vec<String>,
    documents: RefCell<HashMap<PathBuf, String>>,
    picks: RefCell<Vec<(Vec<PickItem>, String)>>,
    offers: RefCell<Vec<String>>,
    opened: RefCell<Vec<(PathBuf, String)>>,
    replaced: RefCell<Vec<(PathBuf, String)>>,
    infos: RefCell<Vec<String>>,
    warnings: RefCell<Vec<String>>,
    errors: RefCell<Vec<String>>,
    reveals: RefCell<Vec<(View, NodeRef)>>,
    changes: RefCell<Vec<View>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workspace(mut self, folder: &Path) -> Self {
        self.folders.push(folder.to_path_buf());
        self
    }

    pub fn with_editor(mut self, editor: ActiveEditor) -> Self {
        self.editor = Some(editor);
        self
    }

    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.languages = languages.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn push(&self, reply: Reply) {
        self.replies.borrow_mut().push_back(reply);
    }

    /// Puts `text` in the open buffer for `path`, as if the user typed it.
    pub fn set_document(&self, path: &Path, text: &str) {
        self.documents
            .borrow_mut()
            .insert(path.to_path_buf(), text.to_string());
    }

    pub fn picks(&self) -> Vec<(Vec<PickItem>, String)> {
        self.picks.borrow().clone()
    }

    pub fn offers(&self) -> Vec<String> {
        self.offers.borrow().clone()
    }

    pub fn opened(&self) -> Vec<(PathBuf, String)> {
        self.opened.borrow().clone()
    }

    pub fn replaced(&self) -> Vec<(PathBuf, String)> {
        self.replaced.borrow().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }

    pub fn reveals(&self) -> Vec<(View, NodeRef)> {
        self.reveals.borrow().clone()
    }

    pub fn tree_changes(&self, view: View) -> usize {
        self.changes.borrow().iter().filter(|v| **v == view).count()
    }

    fn next_reply(&self) -> Option<Reply> {
        self.replies.borrow_mut().pop_front()
    }
}

#[async_trait(?Send)]
impl Host for FakeHost {
    async fn pick(&self, items: &[PickItem], placeholder: &str) -> Option<usize> {
        self.picks
            .borrow_mut()
            .push((items.to_vec(), placeholder.to_string()));
        match self.next_reply()? {
            Reply::Pick(index) if index < items.len() => Some(index),
            Reply::Cancel => None,
            other => panic!("unexpected reply {other:?} for pick \"{placeholder}\""),
        }
    }

    async fn input(&self, placeholder: &str) -> Option<String> {
        match self.next_reply()? {
            Reply::Text(text) => Some(text),
            Reply::Cancel => None,
            other => panic!("unexpected reply {other:?} for input \"{placeholder}\""),
        }
    }

    async fn offer(&self, message: &str, _action: &str) -> bool {
        self.offers.borrow_mut().push(message.to_string());
        matches!(self.next_reply(), Some(Reply::Accept))
    }

    async fn open_document(
        &self,
        path: &Path,
        _language_id: Option<&str>,
    ) -> anyhow::Result<String> {
        let buffered = self.documents.borrow().get(path).cloned();
        let text = match buffered {
            Some(text) => text,
            None => fs::read_to_string(path).unwrap_or_default(),
        };
        self.opened
            .borrow_mut()
            .push((path.to_path_buf(), text.clone()));
        Ok(text)
    }

    async fn replace_document(&self, path: &Path, text: &str) -> anyhow::Result<()> {
        self.set_document(path, text);
        self.replaced
            .borrow_mut()
            .push((path.to_path_buf(), text.to_string()));
        Ok(())
    }

    async fn languages(&self) -> Vec<String> {
        self.languages.clone()
    }

    fn active_editor(&self) -> Option<ActiveEditor> {
        self.editor.clone()
    }

    fn workspace_folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }

    fn show_info(&self, message: &str) {
        self.infos.borrow_mut().push(message.to_string());
    }

    fn show_warning(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }

    fn show_error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_string());
    }

    fn reveal(&self, view: View, node: &NodeRef) {
        self.reveals.borrow_mut().push((view, node.clone()));
    }

    fn tree_changed(&self, view: View) {
        self.changes.borrow_mut().push(view);
    }
}
