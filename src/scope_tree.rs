//! Tree of workspace snippet files (`*.code-snippets`).
//!
//! Each file is a group; each key inside it is a leaf. Snippets are edited
//! through scratch files encoded by [`crate::codec`] and written back by
//! [`ScopeTree::save_snippet`] when the scratch file is saved.

use async_trait::async_trait;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::codec;
use crate::error::{Result, SnippetError};
use crate::host::{Host, NodeRef, PickItem, View, confirm};
use crate::models::{Body, Snippet, SnippetPatch};
use crate::scratch;
use crate::settings::Settings;
use crate::store::SnippetStore;
use crate::syntax::CommentSyntax;
use crate::tree::{
    Forest, SnippetTree, TreeCommand, open_scratch, report, selection_body, widen_scope,
};

/// Language assumed for snippets without a scope.
const DEFAULT_LANGUAGE: &str = "javascript";

/// Input to [`ScopeTree::add_snippet`]; missing parts are prompted for.
#[derive(Debug, Clone, Default)]
pub struct SnippetDraft {
    pub path: Option<PathBuf>,
    pub key: Option<String>,
    pub body: Option<String>,
}

pub struct ScopeTree {
    store: SnippetStore,
    forest: Forest,
    syntax: Rc<dyn CommentSyntax>,
    scratch_dir: PathBuf,
    workspace_dir: String,
    extension: String,
}

impl ScopeTree {
    pub fn new(settings: &Settings, syntax: Rc<dyn CommentSyntax>) -> Self {
        Self {
            store: SnippetStore::new(),
            forest: Forest::new(),
            syntax,
            scratch_dir: settings.scratch_dir.clone(),
            workspace_dir: settings.workspace_snippet_dir.clone(),
            extension: settings.scope_extension.clone(),
        }
    }

    pub fn store(&self) -> &SnippetStore {
        &self.store
    }

    pub fn is_collection(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&self.extension))
    }

    fn label(&self, path: &Path) -> String {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.strip_suffix(&self.extension)
            .map(str::to_owned)
            .unwrap_or(name)
    }

    /// Rebuilds the group for `path` from the store.
    fn sync_group(&mut self, path: &Path) {
        let label = self.label(path);
        if let Some(data) = self.store.get(path) {
            self.forest
                .upsert(path, &label, Some(path.display().to_string()), data);
        }
    }

    /// Loads (or refreshes from `text`) a snippet file into the tree.
    /// Paths that are not snippet files are ignored.
    pub fn open_file(&mut self, host: &dyn Host, path: &Path, text: Option<&str>) -> Result<()> {
        if !self.is_collection(path) {
            return Ok(());
        }
        debug!("open file {}", path.display());

        let changed = self.store.open(path, text)?;
        if changed || !self.forest.contains(path) {
            self.sync_group(path);
            host.tree_changed(View::Scope);
        }
        Ok(())
    }

    fn load(&mut self, host: &dyn Host, path: &Path) -> Result<()> {
        if !self.forest.contains(path) {
            self.open_file(host, path, None)?;
        }
        if self.forest.contains(path) {
            Ok(())
        } else {
            Err(SnippetError::FileNotFound(path.to_path_buf()))
        }
    }

    /// Rescans the active editor and every workspace snippet directory.
    pub fn refresh(&mut self, host: &dyn Host) -> Result<()> {
        self.forest.clear();
        host.tree_changed(View::Scope);

        if let Some(editor) = host.active_editor() {
            let _ = report(host, self.open_file(host, &editor.path, Some(&editor.text)));
        }

        for folder in host.workspace_folders() {
            info!("scan folder: {}", folder.display());
            let dir = folder.join(&self.workspace_dir);
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    debug!("skipping {}: {err}", dir.display());
                    continue;
                }
            };

            let mut files: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
                .map(|entry| entry.path())
                .collect();
            files.sort();

            for file in files {
                let _ = report(host, self.open_file(host, &file, None));
            }
        }
        Ok(())
    }

    fn group_items(&self) -> Vec<PickItem> {
        self.forest
            .groups()
            .map(|group| PickItem::new(&group.label).with_description(group.path.display().to_string()))
            .collect()
    }

    async fn pick_group(&self, host: &dyn Host) -> Option<PathBuf> {
        let index = host.pick(&self.group_items(), "select snippet file").await?;
        self.forest.group_at(index).map(|group| group.path.clone())
    }

    /// Picks a file, then a snippet in it, and opens that snippet for editing.
    pub async fn search(&mut self, host: &dyn Host) -> Result<()> {
        if self.forest.is_empty() {
            let create = host
                .offer(
                    "no snippet file found, please create a snippet file first",
                    "Create Snippet File",
                )
                .await;
            if create {
                self.add_group(host).await?;
            }
            return Ok(());
        }

        let Some(path) = self.pick_group(host).await else {
            return Ok(());
        };
        let children = self.forest.children(&path).to_vec();
        let key = if children.is_empty() {
            host.show_info("no snippet in this file, please add snippet first");
            host.input("snippet key").await
        } else {
            let items: Vec<PickItem> = children
                .iter()
                .map(|leaf| match &leaf.description {
                    Some(description) => PickItem::new(&leaf.key).with_description(description),
                    None => PickItem::new(&leaf.key),
                })
                .collect();
            host.pick(&items, "select snippet")
                .await
                .and_then(|index| children.get(index))
                .map(|leaf| leaf.key.clone())
        };
        let Some(key) = key.filter(|key| !key.is_empty()) else {
            return Ok(());
        };

        host.reveal(View::Scope, &NodeRef::leaf(&path, &key));
        self.edit_snippet(host, &path, &key, SnippetPatch::default())
            .await
            .map(|_| ())
    }

    /// Prompts for a file name in the first workspace folder and starts a
    /// snippet in it. The file is written on the first scratch save.
    pub async fn add_group(&mut self, host: &dyn Host) -> Result<()> {
        let Some(name) = host
            .input("snippet file name")
            .await
            .filter(|name| !name.trim().is_empty())
        else {
            return Ok(());
        };
        let Some(root) = host.workspace_folders().into_iter().next() else {
            return Err(SnippetError::validation(
                "open a workspace folder before creating a snippet file",
            ));
        };

        let dir = root.join(&self.workspace_dir);
        fs::create_dir_all(&dir)
            .map_err(|err| SnippetError::io(format!("create {}", dir.display()), err))?;
        let path = dir.join(format!("{}{}", name.trim(), self.extension));

        self.add_snippet(
            host,
            SnippetDraft {
                path: Some(path),
                ..Default::default()
            },
        )
        .await
    }

    /// Starts a new snippet. The scope comes from the active editor's
    /// language and the body from its selection unless `draft` has one.
    pub async fn add_snippet(&mut self, host: &dyn Host, draft: SnippetDraft) -> Result<()> {
        let path = match draft.path {
            Some(path) => path,
            None => match self.pick_group(host).await {
                Some(path) => path,
                None => return Ok(()),
            },
        };

        let body = draft.body.or_else(|| selection_body(host));
        let scope = host
            .active_editor()
            .map(|editor| widen_scope(&editor.language_id))
            .filter(|scope| !scope.is_empty());

        let key = match draft.key {
            Some(key) => Some(key),
            None => host.input("snippet key").await,
        };
        let Some(key) = key.filter(|key| !key.trim().is_empty()) else {
            return Ok(());
        };

        let overrides = SnippetPatch {
            scope,
            body: body.as_deref().map(Body::from_text),
            ..Default::default()
        };
        self.edit_snippet(host, &path, &key, overrides)
            .await
            .map(|_| ())
    }

    pub async fn edit_group(&mut self, host: &dyn Host, path: &Path) -> Result<()> {
        host.open_document(path, None).await?;
        Ok(())
    }

    pub async fn delete_group(&mut self, host: &dyn Host, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(SnippetError::FileNotFound(path.to_path_buf()));
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !confirm(host, &format!("Are you sure? delete snippet \"{name}\"")).await {
            return Ok(());
        }

        self.store.remove_collection(path)?;
        self.forest.remove(path);
        host.tree_changed(View::Scope);
        Ok(())
    }

    pub async fn delete_snippet(&mut self, host: &dyn Host, path: &Path, key: &str) -> Result<()> {
        self.store.check_key(path, key)?;
        if !confirm(host, &format!("Are you sure? delete snippet \"{key}\"")).await {
            return Ok(());
        }

        self.store.delete(path, key)?;
        self.sync_group(path);
        host.tree_changed(View::Scope);
        Ok(())
    }

    /// Opens the scratch file for `key` in `path`, with `overrides` layered
    /// over the stored record. Returns the scratch file path.
    pub async fn edit_snippet(
        &mut self,
        host: &dyn Host,
        path: &Path,
        key: &str,
        overrides: SnippetPatch,
    ) -> Result<PathBuf> {
        self.load(host, path)?;
        let mut record = self
            .store
            .get(path)
            .and_then(|data| data.get(key))
            .cloned()
            .unwrap_or_default();
        overrides.apply(&mut record);

        let mut snippet = Snippet::from_record(key, &record);
        snippet.filepath = Some(path.display().to_string());
        if snippet.prefix.as_deref().is_none_or(str::is_empty) {
            snippet.prefix = Some(key.to_string());
        }
        let language_id = snippet
            .primary_language()
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string();

        let text = codec::encode(&snippet, Some(&language_id), self.syntax.as_ref());
        let scratch = scratch::scope_path(&self.scratch_dir, path, key, &language_id);
        open_scratch(host, &scratch, &text, &language_id).await?;
        Ok(scratch)
    }

    /// Like [`ScopeTree::edit_snippet`] without overrides, but `key` must
    /// already exist in `path`.
    pub async fn edit_existing(&mut self, host: &dyn Host, path: &Path, key: &str) -> Result<PathBuf> {
        self.store.check_key(path, key)?;
        self.edit_snippet(host, path, key, SnippetPatch::default()).await
    }

    /// Applies a saved scratch file back to its snippet file.
    pub fn save_snippet(&mut self, host: &dyn Host, text: &str, language_id: &str) -> Result<()> {
        let snippet = codec::decode(text, language_id, self.syntax.as_ref());
        let Some(filepath) = snippet.filepath.as_deref().filter(|p| !p.trim().is_empty()) else {
            return Err(SnippetError::validation("@filepath is required"));
        };
        let Some(key) = snippet.key.as_deref().filter(|k| !k.trim().is_empty()) else {
            return Err(SnippetError::validation("@key is required"));
        };
        let path = PathBuf::from(filepath.trim());
        if !self.is_collection(&path) {
            return Err(SnippetError::validation(format!(
                "@filepath must name a {} file",
                self.extension
            )));
        }

        self.store.save(&path, key, snippet.patch())?;
        self.sync_group(&path);
        host.show_info(&format!("scope snippet \"{key}\" save success"));
        host.tree_changed(View::Scope);
        host.reveal(View::Scope, &NodeRef::leaf(&path, key));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.forest.clear();
    }
}

#[async_trait(?Send)]
impl SnippetTree for ScopeTree {
    fn view(&self) -> View {
        View::Scope
    }

    fn forest(&self) -> &Forest {
        &self.forest
    }

    async fn run(&mut self, host: &dyn Host, command: &TreeCommand) -> Result<()> {
        let result = match command {
            TreeCommand::Refresh => self.refresh(host),
            TreeCommand::Search => self.search(host).await,
            TreeCommand::AddGroup => self.add_group(host).await,
            TreeCommand::AddSnippet { group } => {
                let draft = SnippetDraft {
                    path: group.as_deref().map(PathBuf::from),
                    ..Default::default()
                };
                self.add_snippet(host, draft).await
            }
            TreeCommand::EditGroup { group } => self.edit_group(host, Path::new(group)).await,
            TreeCommand::DeleteGroup { group } => self.delete_group(host, Path::new(group)).await,
            TreeCommand::DeleteSnippet { group, key } => {
                self.delete_snippet(host, Path::new(group), key).await
            }
            TreeCommand::EditSnippet { group, key } => self
                .edit_existing(host, Path::new(group), key)
                .await
                .map(|_| ()),
        };
        report(host, result)
    }
}
