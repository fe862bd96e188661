//! Line-comment lookup for scratch-text metadata.
//!
//! Language configuration files (`language-configuration.json` and friends)
//! are located through a [`LanguageConfigSource`] and parsed at most once per
//! modification time.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::models::strip_comments;

pub const DEFAULT_LINE_COMMENT: &str = "//";

/// Resolves the line-comment token for a language id.
pub trait CommentSyntax {
    fn line_comment(&self, language_id: &str) -> String;

    /// Drops any cached configuration.
    fn clear(&self) {}
}

/// Finds the configuration file contributed for a language, if any.
pub trait LanguageConfigSource {
    fn configuration_path(&self, language_id: &str) -> Option<PathBuf>;
}

/// Looks for `<dir>/<id>.json` or `<dir>/<id>/language-configuration.json`.
#[derive(Debug, Clone, Default)]
pub struct DirectoryConfigSource {
    dirs: Vec<PathBuf>,
}

impl DirectoryConfigSource {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }
}

impl LanguageConfigSource for DirectoryConfigSource {
    fn configuration_path(&self, language_id: &str) -> Option<PathBuf> {
        if language_id.is_empty() {
            return None;
        }
        self.dirs.iter().find_map(|dir| {
            [
                dir.join(format!("{language_id}.json")),
                dir.join(language_id).join("language-configuration.json"),
            ]
            .into_iter()
            .find(|candidate| candidate.is_file())
        })
    }
}

struct CacheEntry {
    data: Value,
    mtime_millis: u128,
}

/// Parsed JSON files keyed by path, refreshed when the file gets newer.
#[derive(Default)]
pub struct JsonCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl JsonCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&mut self, path: &Path) -> Result<&Value> {
        let mtime_millis = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .with_context(|| format!("stat {}", path.display()))?
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();

        let stale = self
            .entries
            .get(path)
            .is_none_or(|entry| entry.mtime_millis < mtime_millis);
        if stale {
            debug!("parsing {}", path.display());
            let text =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            let data = serde_json::from_str(&strip_comments(&text))
                .with_context(|| format!("parse {}", path.display()))?;
            self.entries
                .insert(path.to_path_buf(), CacheEntry { data, mtime_millis });
        }

        Ok(&self.entries[path].data)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// [`CommentSyntax`] backed by language configuration files.
pub struct CommentResolver<S> {
    source: S,
    default: String,
    cache: RefCell<JsonCache>,
}

impl<S: LanguageConfigSource> CommentResolver<S> {
    pub fn new(source: S) -> Self {
        Self::with_default(source, DEFAULT_LINE_COMMENT)
    }

    pub fn with_default(source: S, default: &str) -> Self {
        Self {
            source,
            default: default.to_string(),
            cache: RefCell::new(JsonCache::new()),
        }
    }

    fn lookup(&self, language_id: &str) -> Option<String> {
        let path = self.source.configuration_path(language_id)?;
        let mut cache = self.cache.borrow_mut();
        let config = match cache.read(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!("ignoring language configuration for {language_id}: {err:#}");
                return None;
            }
        };
        config
            .pointer("/comments/lineComment")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
    }
}

impl<S: LanguageConfigSource> CommentSyntax for CommentResolver<S> {
    fn line_comment(&self, language_id: &str) -> String {
        self.lookup(language_id)
            .unwrap_or_else(|| self.default.clone())
    }

    fn clear(&self) {
        self.cache.borrow_mut().clear();
    }
}

/// Same token for every language.
#[derive(Debug, Clone)]
pub struct FixedComment(pub String);

impl CommentSyntax for FixedComment {
    fn line_comment(&self, _language_id: &str) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, language_id: &str, body: &str) -> PathBuf {
        let path = dir.join(format!("{language_id}.json"));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn reads_line_comment_from_configuration() {
        let dir = TempDir::new().unwrap();
        write_config(
            dir.path(),
            "python",
            r##"{
  // comments section
  "comments": { "lineComment": "#", "blockComment": ["\"\"\"", "\"\"\""] },
}"##,
        );
        let resolver = CommentResolver::new(DirectoryConfigSource::new(vec![dir.path().into()]));

        assert_eq!(resolver.line_comment("python"), "#");
    }

    #[test]
    fn falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        write_config(dir.path(), "html", r#"{"comments":{"blockComment":["<!--","-->"]}}"#);
        let resolver = CommentResolver::new(DirectoryConfigSource::new(vec![dir.path().into()]));

        assert_eq!(resolver.line_comment("html"), "//");
        assert_eq!(resolver.line_comment("unknown"), "//");
        assert_eq!(resolver.line_comment(""), "//");
    }

    #[test]
    fn nested_configuration_layout_is_found() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("lua")).unwrap();
        fs::write(
            dir.path().join("lua").join("language-configuration.json"),
            r#"{"comments":{"lineComment":"--"}}"#,
        )
        .unwrap();
        let resolver = CommentResolver::new(DirectoryConfigSource::new(vec![dir.path().into()]));

        assert_eq!(resolver.line_comment("lua"), "--");
    }

    #[test]
    fn cache_is_reused_until_file_changes() {
        let dir = TempDir::new().unwrap();
        let path = write_config(dir.path(), "sql", r#"{"comments":{"lineComment":"--"}}"#);
        let mut cache = JsonCache::new();

        assert_eq!(cache.read(&path).unwrap()["comments"]["lineComment"], "--");
        assert_eq!(cache.len(), 1);

        // Same mtime: the cached value wins even though the content changed.
        let mtime = fs::metadata(&path).unwrap().modified().unwrap();
        fs::write(&path, r#"{"comments":{"lineComment":"%"}}"#).unwrap();
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        assert_eq!(cache.read(&path).unwrap()["comments"]["lineComment"], "--");

        let newer = mtime + std::time::Duration::from_secs(5);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(newer)
            .unwrap();
        assert_eq!(cache.read(&path).unwrap()["comments"]["lineComment"], "%");

        cache.clear();
        assert!(cache.is_empty());
    }
}
