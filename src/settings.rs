use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "snipscope";
const CONFIG_FILE: &str = "config.toml";

/// Known file extensions and the language id the CLI assumes for them.
const EXTENSION_LANGUAGES: [(&str, &str); 24] = [
    ("c", "c"),
    ("cpp", "cpp"),
    ("cs", "csharp"),
    ("css", "css"),
    ("go", "go"),
    ("h", "c"),
    ("html", "html"),
    ("java", "java"),
    ("js", "javascript"),
    ("json", "json"),
    ("jsx", "javascriptreact"),
    ("kt", "kotlin"),
    ("lua", "lua"),
    ("md", "markdown"),
    ("php", "php"),
    ("py", "python"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("sh", "shellscript"),
    ("sql", "sql"),
    ("toml", "toml"),
    ("ts", "typescript"),
    ("tsx", "typescriptreact"),
    ("vue", "vue"),
];

/// Runtime configuration, read from `<config dir>/snipscope/config.toml`.
/// Every field may be omitted from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scratch_dir: PathBuf,
    /// Subdirectory of each workspace root that holds scope snippet files.
    pub workspace_snippet_dir: String,
    pub scope_extension: String,
    /// Directory of per-language `<languageId>.json` snippet files.
    pub global_snippets_dir: PathBuf,
    /// Searched for `<languageId>.json` language configuration files.
    pub language_config_dirs: Vec<PathBuf>,
    pub extension_languages: BTreeMap<String, String>,
    /// Offered when creating a per-language snippet file.
    pub languages: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let extension_languages: BTreeMap<String, String> = EXTENSION_LANGUAGES
            .iter()
            .map(|(ext, id)| (ext.to_string(), id.to_string()))
            .collect();
        let mut languages: Vec<String> = extension_languages.values().cloned().collect();
        languages.push("vue-html".to_string());
        languages.sort();
        languages.dedup();

        Self {
            scratch_dir: env::temp_dir().join(APP_DIR),
            workspace_snippet_dir: ".vscode".to_string(),
            scope_extension: ".code-snippets".to_string(),
            global_snippets_dir: default_global_snippets_dir(),
            language_config_dirs: Vec::new(),
            extension_languages,
            languages,
        }
    }
}

impl Settings {
    /// Loads the user's config file, falling back to defaults when it does
    /// not exist.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Language id for a file on disk, from its extension.
    pub fn language_for(&self, path: &Path) -> Option<&str> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.extension_languages.get(&ext).map(String::as_str)
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

fn default_global_snippets_dir() -> PathBuf {
    if let Some(portable) = env::var_os("VSCODE_PORTABLE").filter(|v| !v.is_empty()) {
        return PathBuf::from(portable).join("user-data").join("User").join("snippets");
    }
    dirs::config_dir()
        .unwrap_or_else(env::temp_dir)
        .join("Code")
        .join("User")
        .join("snippets")
}
