//! Tree of per-language user snippet files (`<languageId>.json`).

use async_trait::async_trait;
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
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
use crate::tree::{Forest, SnippetTree, TreeCommand, open_scratch, report, selection_body};

const EXTENSION: &str = "json";

pub struct GlobalTree {
    store: SnippetStore,
    forest: Forest,
    syntax: Rc<dyn CommentSyntax>,
    snippets_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl GlobalTree {
    pub fn new(settings: &Settings, syntax: Rc<dyn CommentSyntax>) -> Self {
        Self {
            store: SnippetStore::new(),
            forest: Forest::new(),
            syntax,
            snippets_dir: settings.global_snippets_dir.clone(),
            scratch_dir: settings.scratch_dir.clone(),
        }
    }

    pub fn store(&self) -> &SnippetStore {
        &self.store
    }

    pub fn snippets_dir(&self) -> &Path {
        &self.snippets_dir
    }

    /// Collection file holding the snippets for `language_id`.
    pub fn path_for(&self, language_id: &str) -> PathBuf {
        self.snippets_dir.join(format!("{language_id}.{EXTENSION}"))
    }

    fn sync_group(&mut self, language_id: &str) {
        let path = self.path_for(language_id);
        if let Some(data) = self.store.get(&path) {
            self.forest
                .upsert(&path, language_id, Some(format!("{language_id}.{EXTENSION}")), data);
        }
    }

    fn load(&mut self, host: &dyn Host, language_id: &str) -> Result<PathBuf> {
        let path = self.path_for(language_id);
        if !self.forest.contains(&path) {
            self.store.open(&path, None)?;
            self.sync_group(language_id);
            host.tree_changed(View::Global);
        }
        Ok(path)
    }

    /// Rescans the user snippets directory.
    pub fn refresh(&mut self, host: &dyn Host) -> Result<()> {
        self.forest.clear();
        info!("scan folder: {}", self.snippets_dir.display());

        let entries = match fs::read_dir(&self.snippets_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet", self.snippets_dir.display());
                host.tree_changed(View::Global);
                return Ok(());
            }
            Err(err) => {
                host.tree_changed(View::Global);
                return Err(SnippetError::io(
                    format!("read {}", self.snippets_dir.display()),
                    err,
                ));
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .collect();
        files.sort();

        for path in files {
            let Some(language_id) = path.file_stem().map(|s| s.to_string_lossy().into_owned())
            else {
                continue;
            };
            match self.store.open(&path, None) {
                Ok(_) => self.sync_group(&language_id),
                Err(err) => host.show_error(&err.to_string()),
            }
        }
        host.tree_changed(View::Global);
        Ok(())
    }

    fn group_items(&self) -> Vec<PickItem> {
        self.forest
            .groups()
            .map(|group| PickItem::new(&group.label))
            .collect()
    }

    async fn pick_language(&self, host: &dyn Host) -> Option<String> {
        let index = host.pick(&self.group_items(), "select snippet language").await?;
        self.forest.group_at(index).map(|group| group.label.clone())
    }

    /// Picks a language, then a snippet for it, and opens it for editing.
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

        let Some(language_id) = self.pick_language(host).await else {
            return Ok(());
        };
        let path = self.path_for(&language_id);
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

        host.reveal(View::Global, &NodeRef::leaf(&path, &key));
        self.edit_snippet(host, &language_id, &key, SnippetPatch::default())
            .await
            .map(|_| ())
    }

    /// Creates the snippet file for a picked language. The active editor's
    /// language is offered first.
    pub async fn add_group(&mut self, host: &dyn Host) -> Result<()> {
        let current = host.active_editor().map(|editor| editor.language_id);
        let mut languages = host.languages().await;
        languages.sort();
        languages.dedup();
        if let Some(current) = current.as_deref().filter(|id| !id.is_empty()) {
            languages.retain(|id| id != current);
            languages.insert(0, current.to_string());
        }

        let items: Vec<PickItem> = languages
            .iter()
            .map(|id| {
                if current.as_deref() == Some(id.as_str()) {
                    PickItem::new(id).with_description("current language")
                } else {
                    PickItem::new(id)
                }
            })
            .collect();
        let Some(language_id) = host
            .pick(&items, "select language")
            .await
            .and_then(|index| languages.get(index))
            .cloned()
        else {
            return Ok(());
        };

        let path = self.path_for(&language_id);
        self.store.create(&path)?;
        self.sync_group(&language_id);
        host.tree_changed(View::Global);
        host.reveal(View::Global, &NodeRef::group(path));
        Ok(())
    }

    /// Starts a new snippet for `language_id` (picked when absent), with
    /// `body` or the active selection as its body.
    pub async fn add_snippet(
        &mut self,
        host: &dyn Host,
        language_id: Option<String>,
        body: Option<String>,
    ) -> Result<()> {
        let language_id = match language_id {
            Some(id) => id,
            None => match self.pick_language(host).await {
                Some(id) => id,
                None => return Ok(()),
            },
        };
        let body = body.or_else(|| selection_body(host));

        let Some(key) = host
            .input("snippet key")
            .await
            .filter(|key| !key.trim().is_empty())
        else {
            return Ok(());
        };

        let overrides = SnippetPatch {
            body: body.as_deref().map(Body::from_text),
            ..Default::default()
        };
        self.edit_snippet(host, &language_id, &key, overrides)
            .await
            .map(|_| ())
    }

    pub async fn edit_group(&mut self, host: &dyn Host, language_id: &str) -> Result<()> {
        host.open_document(&self.path_for(language_id), None).await?;
        Ok(())
    }

    pub async fn delete_group(&mut self, host: &dyn Host, language_id: &str) -> Result<()> {
        let path = self.path_for(language_id);
        if !path.is_file() {
            return Err(SnippetError::FileNotFound(path));
        }
        let question = format!("Are you sure? delete snippet \"{language_id}.{EXTENSION}\"");
        if !confirm(host, &question).await {
            return Ok(());
        }

        self.store.remove_collection(&path)?;
        self.forest.remove(&path);
        host.tree_changed(View::Global);
        Ok(())
    }

    pub async fn delete_snippet(&mut self, host: &dyn Host, language_id: &str, key: &str) -> Result<()> {
        let path = self.path_for(language_id);
        self.store.check_key(&path, key)?;
        let question = format!("Are you sure? delete snippet \"{key}\" ({language_id})");
        if !confirm(host, &question).await {
            return Ok(());
        }

        self.store.delete(&path, key)?;
        self.sync_group(language_id);
        host.tree_changed(View::Global);
        Ok(())
    }

    /// Opens the scratch file for `key` in the `language_id` snippets, with
    /// `overrides` layered over the stored record.
    pub async fn edit_snippet(
        &mut self,
        host: &dyn Host,
        language_id: &str,
        key: &str,
        overrides: SnippetPatch,
    ) -> Result<PathBuf> {
        let path = self.load(host, language_id)?;
        let mut record = self
            .store
            .get(&path)
            .and_then(|data| data.get(key))
            .cloned()
            .unwrap_or_default();
        overrides.apply(&mut record);

        // The key travels in the scratch file name, not in its metadata.
        let mut snippet = Snippet::from_record(key, &record);
        snippet.key = None;
        if snippet.prefix.as_deref().is_none_or(str::is_empty) {
            snippet.prefix = Some(key.to_string());
        }

        let text = codec::encode(&snippet, Some(language_id), self.syntax.as_ref());
        let scratch = scratch::global_path(&self.scratch_dir, key, language_id);
        open_scratch(host, &scratch, &text, language_id).await?;
        Ok(scratch)
    }

    /// Like [`GlobalTree::edit_snippet`] without overrides, but `key` must
    /// already exist in the `language_id` snippets.
    pub async fn edit_existing(&mut self, host: &dyn Host, language_id: &str, key: &str) -> Result<PathBuf> {
        let path = self.path_for(language_id);
        self.store.check_key(&path, key)?;
        self.edit_snippet(host, language_id, key, SnippetPatch::default()).await
    }

    /// Applies a saved scratch file back to the `language_id` snippets.
    pub fn save_snippet(
        &mut self,
        host: &dyn Host,
        language_id: &str,
        key: &str,
        text: &str,
    ) -> Result<()> {
        let snippet = codec::decode(text, language_id, self.syntax.as_ref());
        let path = self.path_for(language_id);

        self.store.save(&path, key, snippet.patch())?;
        self.sync_group(language_id);
        host.show_info(&format!("snippet \"{key}\" save success"));
        host.tree_changed(View::Global);
        host.reveal(View::Global, &NodeRef::leaf(&path, key));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.forest.clear();
    }
}

#[async_trait(?Send)]
impl SnippetTree for GlobalTree {
    fn view(&self) -> View {
        View::Global
    }

    fn forest(&self) -> &Forest {
        &self.forest
    }

    async fn run(&mut self, host: &dyn Host, command: &TreeCommand) -> Result<()> {
        let result = match command {
            TreeCommand::Refresh => self.refresh(host),
            TreeCommand::Search => self.search(host).await,
            TreeCommand::AddGroup => self.add_group(host).await,
            TreeCommand::AddSnippet { group } => self.add_snippet(host, group.clone(), None).await,
            TreeCommand::EditGroup { group } => self.edit_group(host, group).await,
            TreeCommand::DeleteGroup { group } => self.delete_group(host, group).await,
            TreeCommand::DeleteSnippet { group, key } => {
                self.delete_snippet(host, group, key).await
            }
            TreeCommand::EditSnippet { group, key } => self
                .edit_existing(host, group, key)
                .await
                .map(|_| ()),
        };
        report(host, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ActiveEditor;
    use crate::models::Collection;
    use crate::syntax::FixedComment;
    use crate::testing::{FakeHost, Reply};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        tree: GlobalTree,
    }

    impl Fixture {
        fn snippets(&self) -> PathBuf {
            self.dir.path().join("snippets")
        }

        fn scratch(&self) -> PathBuf {
            self.dir.path().join("scratch")
        }
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let snippets = dir.path().join("snippets");
        fs::create_dir_all(&snippets).unwrap();
        fs::write(
            snippets.join("rust.json"),
            r#"{
  // user snippets
  "main": { "prefix": "main", "body": ["fn main() {", "    $0", "}"], "description": "entry" },
}"#,
        )
        .unwrap();
        fs::write(snippets.join("notes.txt"), "ignored").unwrap();

        let settings = Settings {
            scratch_dir: dir.path().join("scratch"),
            global_snippets_dir: snippets,
            ..Settings::default()
        };
        let tree = GlobalTree::new(&settings, Rc::new(FixedComment("//".to_string())));
        Fixture { dir, tree }
    }

    #[test]
    fn refresh_lists_json_files_by_language() {
        let mut fx = fixture();
        let host = FakeHost::new();

        fx.tree.refresh(&host).unwrap();

        let labels: Vec<_> = fx.tree.forest().groups().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["rust"]);
        assert_eq!(fx.tree.forest().children(&fx.tree.path_for("rust"))[0].key, "main");
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            global_snippets_dir: dir.path().join("absent"),
            ..Settings::default()
        };
        let mut tree = GlobalTree::new(&settings, Rc::new(FixedComment("//".to_string())));
        let host = FakeHost::new();

        tree.refresh(&host).unwrap();
        assert!(tree.forest().is_empty());
        assert!(host.errors().is_empty());
    }

    #[tokio::test]
    async fn scratch_name_carries_key_and_language() {
        let mut fx = fixture();
        let host = FakeHost::new();

        let scratch = fx
            .tree
            .edit_snippet(&host, "rust", "main", SnippetPatch::default())
            .await
            .unwrap();

        assert_eq!(scratch, fx.scratch().join("bWFpbg==.rust.snippet"));
        assert_eq!(
            fs::read_to_string(&scratch).unwrap(),
            "// @prefix main\n// @description entry\n\nfn main() {\n    $0\n}"
        );
    }

    #[tokio::test]
    async fn save_rewrites_only_the_edited_snippet() {
        let mut fx = fixture();
        let host = FakeHost::new();
        fx.tree.refresh(&host).unwrap();

        host.push(Reply::Text("test".into()));
        fx.tree
            .add_snippet(&host, Some("rust".into()), Some("#[test]\nfn $1() {}".into()))
            .await
            .unwrap();
        let scratch = scratch::global_path(&fx.scratch(), "test", "rust");
        let text = fs::read_to_string(&scratch).unwrap();

        fx.tree.save_snippet(&host, "rust", "test", &text).unwrap();

        let written = fs::read_to_string(fx.snippets().join("rust.json")).unwrap();
        assert!(written.starts_with("{\n  // user snippets\n  \"main\": { \"prefix\": \"main\","));
        let saved = Collection::parse(&written).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved.get("test").unwrap().prefix.as_deref(), Some("test"));
        assert_eq!(
            saved.get("test").unwrap().body.as_ref().unwrap().joined(),
            "#[test]\nfn $1() {}"
        );
        assert_eq!(saved.get("main").unwrap().description.as_deref(), Some("entry"));
        assert_eq!(host.infos(), vec!["snippet \"test\" save success".to_string()]);
        assert_eq!(fx.tree.forest().children(&fx.tree.path_for("rust")).len(), 2);
    }

    #[tokio::test]
    async fn add_group_offers_current_language_first() {
        let mut fx = fixture();
        let host = FakeHost::new()
            .with_languages(&["go", "python", "rust"])
            .with_editor(ActiveEditor {
                language_id: "python".to_string(),
                ..Default::default()
            });
        host.push(Reply::Pick(0));

        fx.tree.add_group(&host).await.unwrap();

        let (items, _) = host.picks().pop().unwrap();
        let labels: Vec<_> = items.iter().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, ["python", "go", "rust"]);
        assert_eq!(items[0].description.as_deref(), Some("current language"));

        let created = fx.snippets().join("python.json");
        assert_eq!(fs::read_to_string(&created).unwrap(), "{}");
        assert!(fx.tree.forest().contains(&created));
    }

    #[tokio::test]
    async fn delete_snippet_keeps_others() {
        let mut fx = fixture();
        let host = FakeHost::new();
        let path = fx.tree.path_for("rust");
        fx.tree
            .save_snippet(&host, "rust", "extra", "// @prefix ex\n\nbody")
            .unwrap();

        host.push(Reply::Pick(1));
        fx.tree.delete_snippet(&host, "rust", "extra").await.unwrap();

        let after = Collection::parse(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(after.len(), 1);
        assert!(after.contains("main"));
    }

    #[tokio::test]
    async fn dismissed_delete_group_keeps_file() {
        let mut fx = fixture();
        let host = FakeHost::new();
        fx.tree.refresh(&host).unwrap();

        host.push(Reply::Cancel);
        fx.tree.delete_group(&host, "rust").await.unwrap();

        assert!(fx.snippets().join("rust.json").exists());
        assert_eq!(fx.tree.forest().len(), 1);
    }

    #[tokio::test]
    async fn missing_language_file_is_reported_before_confirming() {
        let mut fx = fixture();
        let host = FakeHost::new();
        fx.tree.refresh(&host).unwrap();

        let command = TreeCommand::DeleteGroup { group: "go".into() };
        let result = fx.tree.run(&host, &command).await;

        assert!(matches!(result, Err(SnippetError::FileNotFound(_))));
        assert!(host.picks().is_empty());
        assert_eq!(host.errors().len(), 1);
        assert!(fx.snippets().join("rust.json").exists());
    }

    #[tokio::test]
    async fn editing_unknown_snippet_opens_nothing() {
        let mut fx = fixture();
        let host = FakeHost::new();
        fx.tree.refresh(&host).unwrap();

        let command = TreeCommand::EditSnippet {
            group: "rust".into(),
            key: "nope".into(),
        };
        let result = fx.tree.run(&host, &command).await;

        assert!(matches!(result, Err(SnippetError::KeyNotFound { .. })));
        let expected = format!(
            "snippet \"nope\" not found in {}",
            fx.tree.path_for("rust").display()
        );
        assert_eq!(host.errors(), vec![expected]);
        assert!(host.opened().is_empty());
        assert!(!fx.scratch().exists());

        let command = TreeCommand::EditSnippet {
            group: "go".into(),
            key: "main".into(),
        };
        let result = fx.tree.run(&host, &command).await;
        assert!(matches!(result, Err(SnippetError::FileNotFound(_))));
        assert!(host.opened().is_empty());
    }
}
