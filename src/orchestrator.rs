//! Routes editor events and user commands to the two snippet trees.

use log::debug;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::Result;
use crate::global_tree::GlobalTree;
use crate::host::{Host, PickItem};
use crate::scope_tree::{ScopeTree, SnippetDraft};
use crate::scratch::{self, ScratchKind};
use crate::settings::Settings;
use crate::syntax::CommentSyntax;
use crate::tree::{SnippetTree, TreeCommand, report, selection_body};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    DocumentSaved { path: PathBuf, text: String },
    ActiveEditorChanged { path: PathBuf, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scope(TreeCommand),
    Global(TreeCommand),
    ConvertSelection,
}

/// What a saved document is, judged by its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedKind {
    GlobalCollection,
    ScopeCollection,
    GlobalScratch { key: String, language_id: String },
    ScopeScratch { language_id: String },
    Other,
}

pub struct Orchestrator {
    scope: ScopeTree,
    global: GlobalTree,
    syntax: Rc<dyn CommentSyntax>,
}

impl Orchestrator {
    pub fn new(settings: &Settings, syntax: Rc<dyn CommentSyntax>) -> Self {
        Self {
            scope: ScopeTree::new(settings, syntax.clone()),
            global: GlobalTree::new(settings, syntax.clone()),
            syntax,
        }
    }

    pub fn scope(&self) -> &ScopeTree {
        &self.scope
    }

    pub fn global(&self) -> &GlobalTree {
        &self.global
    }

    /// Builds both trees.
    pub async fn activate(&mut self, host: &dyn Host) -> Result<()> {
        self.scope.run(host, &TreeCommand::Refresh).await?;
        self.global.run(host, &TreeCommand::Refresh).await
    }

    /// Drops every cache; the next activation starts from disk.
    pub fn deactivate(&mut self) {
        self.syntax.clear();
        self.scope.clear();
        self.global.clear();
    }

    pub fn classify(&self, path: &Path) -> SavedKind {
        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && under(path, self.global.snippets_dir()) {
            return SavedKind::GlobalCollection;
        }
        if self.scope.is_collection(path) {
            return SavedKind::ScopeCollection;
        }
        match scratch::classify(path) {
            Some(ScratchKind::Global { key, language_id }) => {
                SavedKind::GlobalScratch { key, language_id }
            }
            Some(ScratchKind::Scope { language_id }) => SavedKind::ScopeScratch { language_id },
            None => SavedKind::Other,
        }
    }

    pub async fn handle(&mut self, host: &dyn Host, event: EditorEvent) -> Result<()> {
        match event {
            EditorEvent::ActiveEditorChanged { path, text } => {
                report(host, self.scope.open_file(host, &path, Some(&text)))
            }
            EditorEvent::DocumentSaved { path, text } => {
                let kind = self.classify(&path);
                debug!("saved {} ({kind:?})", path.display());
                match kind {
                    SavedKind::GlobalCollection => report(host, self.global.refresh(host)),
                    SavedKind::ScopeCollection => {
                        report(host, self.scope.open_file(host, &path, Some(&text)))
                    }
                    SavedKind::GlobalScratch { key, language_id } => report(
                        host,
                        self.global.save_snippet(host, &language_id, &key, &text),
                    ),
                    SavedKind::ScopeScratch { language_id } => {
                        report(host, self.scope.save_snippet(host, &text, &language_id))
                    }
                    SavedKind::Other => Ok(()),
                }
            }
        }
    }

    pub async fn execute(&mut self, host: &dyn Host, command: &Command) -> Result<()> {
        match command {
            Command::Scope(command) => self.scope.run(host, command).await,
            Command::Global(command) => self.global.run(host, command).await,
            Command::ConvertSelection => {
                let result = self.convert_selection(host).await;
                report(host, result)
            }
        }
    }

    /// Turns the active selection into a new snippet, in a scope file or in
    /// the active language's snippet file.
    async fn convert_selection(&mut self, host: &dyn Host) -> Result<()> {
        let (Some(editor), Some(body)) = (host.active_editor(), selection_body(host)) else {
            host.show_warning("can't convert to snippet by select nothing");
            return Ok(());
        };

        if !self.scope.forest().is_empty() {
            let items: Vec<PickItem> = std::iter::once(PickItem::new("vscode snippet"))
                .chain(self.scope.forest().groups().map(|group| {
                    PickItem::new(&group.label).with_description(group.path.display().to_string())
                }))
                .collect();
            let Some(index) = host.pick(&items, "select snippet scope").await else {
                return Ok(());
            };
            if index > 0 {
                let Some(path) = self.scope.forest().group_at(index - 1).map(|g| g.path.clone())
                else {
                    return Ok(());
                };
                let draft = SnippetDraft {
                    path: Some(path),
                    body: Some(body),
                    ..Default::default()
                };
                return self.scope.add_snippet(host, draft).await;
            }
        }

        self.global
            .add_snippet(host, Some(editor.language_id), Some(body))
            .await
    }
}

/// Case-insensitive prefix test on the path text.
fn under(path: &Path, dir: &Path) -> bool {
    let path = path.to_string_lossy().to_lowercase();
    let dir = dir.to_string_lossy().to_lowercase();
    !dir.is_empty() && path.starts_with(&dir)
}
