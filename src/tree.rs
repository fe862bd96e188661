//! Tree projection shared by the scope and global snippet views.
//!
//! Groups live in a flat arena keyed by collection path; a leaf names its
//! group by that key instead of pointing at it.

use async_trait::async_trait;
use indexmap::IndexMap;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SnippetError};
use crate::host::{Host, NodeRef, View};
use crate::models::Collection;

const JS_FAMILY: [&str; 4] = [
    "javascript",
    "typescript",
    "javascriptreact",
    "typescriptreact",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub label: String,
    pub path: PathBuf,
    pub description: Option<String>,
    /// Sorted by key.
    pub children: Vec<Leaf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub group: PathBuf,
    pub key: String,
    pub description: Option<String>,
}

impl Leaf {
    pub fn node(&self) -> NodeRef {
        NodeRef::leaf(self.group.clone(), self.key.clone())
    }
}

#[derive(Debug, Default)]
pub struct Forest {
    groups: IndexMap<PathBuf, Group>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the group for `path` or rebuilds its children from `collection`.
    pub fn upsert(
        &mut self,
        path: &Path,
        label: &str,
        description: Option<String>,
        collection: &Collection,
    ) {
        let mut children: Vec<Leaf> = collection
            .iter()
            .map(|(key, record)| Leaf {
                group: path.to_path_buf(),
                key: key.clone(),
                description: record.description.clone(),
            })
            .collect();
        children.sort_by(|a, b| a.key.cmp(&b.key));

        self.groups.insert(
            path.to_path_buf(),
            Group {
                label: label.to_string(),
                path: path.to_path_buf(),
                description,
                children,
            },
        );
    }

    pub fn remove(&mut self, path: &Path) -> Option<Group> {
        self.groups.shift_remove(path)
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.groups.contains_key(path)
    }

    pub fn group(&self, path: &Path) -> Option<&Group> {
        self.groups.get(path)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn group_at(&self, index: usize) -> Option<&Group> {
        self.groups.get_index(index).map(|(_, group)| group)
    }

    pub fn children(&self, path: &Path) -> &[Leaf] {
        self.groups
            .get(path)
            .map(|group| group.children.as_slice())
            .unwrap_or_default()
    }

    pub fn parent(&self, leaf: &Leaf) -> Option<&Group> {
        self.groups.get(&leaf.group)
    }

    pub fn leaf(&self, node: &NodeRef) -> Option<&Leaf> {
        let key = node.key.as_deref()?;
        self.children(&node.group)
            .iter()
            .find(|leaf| leaf.key == key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Commands a snippet tree answers to. `group` is the collection path for
/// the scope tree and the language id for the global tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeCommand {
    Refresh,
    Search,
    AddGroup,
    AddSnippet { group: Option<String> },
    EditGroup { group: String },
    DeleteGroup { group: String },
    DeleteSnippet { group: String, key: String },
    EditSnippet { group: String, key: String },
}

#[async_trait(?Send)]
pub trait SnippetTree {
    fn view(&self) -> View;

    fn forest(&self) -> &Forest;

    /// Runs `command`, reporting any failure through the host.
    async fn run(&mut self, host: &dyn Host, command: &TreeCommand) -> Result<()>;
}

/// Shows `result`'s error to the user, then hands it back.
pub(crate) fn report<T>(host: &dyn Host, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        host.show_error(&err.to_string());
    }
    result
}

/// Scope string stored for a snippet created while `language_id` is active.
pub fn widen_scope(language_id: &str) -> String {
    if JS_FAMILY.contains(&language_id) {
        JS_FAMILY.join(",")
    } else if language_id == "vue" {
        "vue,vue-html".to_string()
    } else {
        language_id.to_string()
    }
}

/// Strips the indentation common to all non-blank lines.
pub fn dedent(text: &str) -> String {
    let indent = text
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    text.split('\n')
        .map(|line| match line.char_indices().nth(indent) {
            Some((at, _)) => &line[at..],
            None if line.trim().is_empty() => "",
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Selected text of the active editor, ready to be used as a snippet body.
pub fn selection_body(host: &dyn Host) -> Option<String> {
    host.active_editor()
        .map(|editor| editor.selection)
        .filter(|selection| !selection.trim().is_empty())
        .map(|selection| dedent(&selection).replace('$', "\\$"))
}

/// Opens the scratch file at `path`, seeding it with `text` on first use and
/// replacing the buffer only when it differs from `text`.
pub(crate) async fn open_scratch(
    host: &dyn Host,
    path: &Path,
    text: &str,
    language_id: &str,
) -> Result<()> {
    if !path.exists() {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|err| SnippetError::io(format!("create {}", dir.display()), err))?;
        }
        fs::write(path, text)
            .map_err(|err| SnippetError::io(format!("write {}", path.display()), err))?;
        debug!("seeded scratch file {}", path.display());
    }

    let current = host.open_document(path, Some(language_id)).await?;
    if current != text {
        debug!("refreshing scratch buffer {}", path.display());
        host.replace_document(path, text).await?;
    }
    Ok(())
}
