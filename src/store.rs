//! In-memory cache of snippet collection files.
//!
//! Every read and write of a collection file goes through [`SnippetStore`].
//! Each tracked path keeps the last text seen for it so identical text is
//! never parsed twice.

use indexmap::IndexMap;
use log::{debug, info};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, SnippetError};
use crate::models::{Collection, SnippetPatch, SnippetRecord, validate};

#[derive(Debug)]
struct Entry {
    text: String,
    data: Collection,
}

#[derive(Debug, Default)]
pub struct SnippetStore {
    entries: IndexMap<PathBuf, Entry>,
}

impl SnippetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads or refreshes `path`. Without `text` the file is read from disk;
    /// a missing file counts as an empty collection.
    ///
    /// Returns `true` when the collection was (re)parsed.
    pub fn open(&mut self, path: &Path, text: Option<&str>) -> Result<bool> {
        let text = match text.filter(|text| !text.is_empty()) {
            Some(text) => text.to_string(),
            None => fs::read_to_string(path).unwrap_or_else(|err| {
                debug!("{} unreadable ({err}), treating as empty", path.display());
                "{}".to_string()
            }),
        };

        if self
            .entries
            .get(path)
            .is_some_and(|entry| entry.text == text)
        {
            return Ok(false);
        }

        debug!("parsing {}", path.display());
        let data = Collection::parse(&text).map_err(|source| SnippetError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        self.entries.insert(path.to_path_buf(), Entry { text, data });
        Ok(true)
    }

    /// Cached collection for `path`, loading it first if it is not tracked.
    pub fn find_or_load(&mut self, path: &Path) -> Result<&Collection> {
        if !self.entries.contains_key(path) {
            self.open(path, None)?;
        }
        self.get(path)
            .ok_or_else(|| SnippetError::FileNotFound(path.to_path_buf()))
    }

    pub fn get(&self, path: &Path) -> Option<&Collection> {
        self.entries.get(path).map(|entry| &entry.data)
    }

    /// Last text seen for `path`.
    pub fn text(&self, path: &Path) -> Option<&str> {
        self.entries.get(path).map(|entry| entry.text.as_str())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    /// Merges `patch` into the record at `key` (creating it if needed) and
    /// rewrites the file. Nothing is written if the merged record is invalid.
    pub fn save(&mut self, path: &Path, key: &str, patch: SnippetPatch) -> Result<&SnippetRecord> {
        if key.trim().is_empty() {
            return Err(SnippetError::validation("@key is required"));
        }
        let mut data = self.find_or_load(path)?.clone();

        let mut record = data.get(key).cloned().unwrap_or_default();
        patch.apply(&mut record);
        validate(key, &record).map_err(SnippetError::Validation)?;

        data.insert(key.to_string(), record);
        self.persist(path, data)?;
        info!("saved snippet \"{key}\" to {}", path.display());

        self.get(path)
            .and_then(|data| data.get(key))
            .ok_or_else(|| SnippetError::KeyNotFound {
                key: key.to_string(),
                path: path.to_path_buf(),
            })
    }

    /// Fails unless `key` exists in the collection stored at `path`.
    pub fn check_key(&mut self, path: &Path, key: &str) -> Result<()> {
        if !self.contains(path) && !path.is_file() {
            return Err(SnippetError::FileNotFound(path.to_path_buf()));
        }
        if self.find_or_load(path)?.contains(key) {
            Ok(())
        } else {
            Err(SnippetError::KeyNotFound {
                key: key.to_string(),
                path: path.to_path_buf(),
            })
        }
    }

    /// Removes `key` and rewrites the file. Callers confirm with the user
    /// before calling this.
    pub fn delete(&mut self, path: &Path, key: &str) -> Result<SnippetRecord> {
        self.check_key(path, key)?;
        let mut data = self.find_or_load(path)?.clone();
        let removed = data.remove(key).ok_or_else(|| SnippetError::KeyNotFound {
            key: key.to_string(),
            path: path.to_path_buf(),
        })?;

        self.persist(path, data)?;
        info!("deleted snippet \"{key}\" from {}", path.display());
        Ok(removed)
    }

    /// Creates an empty collection file unless one exists, then tracks it.
    pub fn create(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            write_atomic(path, "{}")?;
            info!("created {}", path.display());
        }
        self.open(path, None)?;
        Ok(())
    }

    /// Deletes the backing file and forgets the collection. A file that is
    /// already gone is forgotten and reported as [`SnippetError::FileNotFound`].
    pub fn remove_collection(&mut self, path: &Path) -> Result<()> {
        let removed = fs::remove_file(path);
        self.entries.shift_remove(path);
        match removed {
            Ok(()) => {
                info!("deleted {}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} already gone", path.display());
                Err(SnippetError::FileNotFound(path.to_path_buf()))
            }
            Err(err) => Err(SnippetError::io(format!("delete {}", path.display()), err)),
        }
    }

    pub fn forget(&mut self, path: &Path) {
        self.entries.shift_remove(path);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Writes `data` over the last text seen for `path`, keeping its
    /// comments, and records the written text so reopening the same content
    /// is a no-op.
    fn persist(&mut self, path: &Path, data: Collection) -> Result<()> {
        let original = self.entries.get(path).map_or("", |entry| entry.text.as_str());
        let text = data.rewrite(original).map_err(|source| SnippetError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, &text)?;
        self.entries.insert(path.to_path_buf(), Entry { text, data });
        Ok(())
    }
}

/// Writes through a sibling temp file and renames it over `path`.
fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|err| SnippetError::io(format!("create {}", dir.display()), err))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{file_name}.tmp"));

    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp)
        .map_err(|err| SnippetError::io(format!("open {}", tmp.display()), err))?;
    file.write_all(text.as_bytes())
        .map_err(|err| SnippetError::io(format!("write {}", tmp.display()), err))?;
    let _ = file.sync_all();
    drop(file);

    fs::rename(&tmp, path).map_err(|err| {
        SnippetError::io(
            format!("rename {} -> {}", tmp.display(), path.display()),
            err,
        )
    })
}
