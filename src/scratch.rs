//! Scratch file names.
//!
//! Scope snippets: `<hash8>.<languageId>.scopesnippet`, where `hash8` is
//! derived from the collection path and key. Global snippets:
//! `<encoded key>.<languageId>.snippet`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const SCOPE_SUFFIX: &str = ".scopesnippet";
pub const GLOBAL_SUFFIX: &str = ".snippet";

/// What a saved scratch file belongs to, recovered from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScratchKind {
    Scope { language_id: String },
    Global { key: String, language_id: String },
}

pub fn scope_file_name(filepath: &Path, key: &str, language_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filepath.to_string_lossy().as_bytes());
    hasher.update(key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}.{language_id}{SCOPE_SUFFIX}", &digest[..8])
}

pub fn scope_path(dir: &Path, filepath: &Path, key: &str, language_id: &str) -> PathBuf {
    dir.join(scope_file_name(filepath, key, language_id))
}

pub fn global_file_name(key: &str, language_id: &str) -> String {
    format!("{}.{language_id}{GLOBAL_SUFFIX}", encode_key(key))
}

pub fn global_path(dir: &Path, key: &str, language_id: &str) -> PathBuf {
    dir.join(global_file_name(key, language_id))
}

/// Standard base64 with `/` swapped for `-`. Standard base64 never emits
/// `-`, so [`decode_key`] inverts this exactly.
pub fn encode_key(key: &str) -> String {
    STANDARD.encode(key).replace('/', "-")
}

pub fn decode_key(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded.replace('-', "/")).ok()?;
    String::from_utf8(bytes).ok()
}

pub fn classify(path: &Path) -> Option<ScratchKind> {
    let name = path.file_name()?.to_str()?;

    if let Some(stem) = name.strip_suffix(SCOPE_SUFFIX) {
        let language_id = stem.rsplit('.').next().filter(|id| !id.is_empty())?;
        return Some(ScratchKind::Scope {
            language_id: language_id.to_string(),
        });
    }

    let stem = name.strip_suffix(GLOBAL_SUFFIX)?;
    let mut parts = stem.split('.');
    let (encoded, language_id) = match (parts.next(), parts.next(), parts.next()) {
        (Some(encoded), Some(language_id), None) if !language_id.is_empty() => {
            (encoded, language_id)
        }
        _ => return None,
    };
    Some(ScratchKind::Global {
        key: decode_key(encoded)?,
        language_id: language_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_names_are_stable_and_distinct() {
        let path = Path::new("/work/.vscode/app.code-snippets");
        let first = scope_file_name(path, "k1", "rust");

        assert_eq!(first, scope_file_name(path, "k1", "rust"));
        assert_ne!(first, scope_file_name(path, "k2", "rust"));
        assert!(first.ends_with(".rust.scopesnippet"));
        assert_eq!(first.split('.').next().unwrap().len(), 8);
    }

    #[test]
    fn key_encoding_is_lossless() {
        // "??>" encodes to "Pz8+" and "???" to "Pz8/", exercising both
        // characters that are special in file names.
        for key in ["??>", "???", "for-loop", "a/b", "ünïcode key", ""] {
            assert_eq!(decode_key(&encode_key(key)).as_deref(), Some(key));
        }
        assert_eq!(encode_key("???"), "Pz8-");
    }

    #[test]
    fn classifies_scratch_names() {
        let scope = scope_path(Path::new("/tmp"), Path::new("/w/a.code-snippets"), "k", "go");
        assert_eq!(
            classify(&scope),
            Some(ScratchKind::Scope {
                language_id: "go".to_string()
            })
        );

        let global = global_path(Path::new("/tmp"), "???", "python");
        assert_eq!(
            classify(&global),
            Some(ScratchKind::Global {
                key: "???".to_string(),
                language_id: "python".to_string()
            })
        );

        assert_eq!(classify(Path::new("/tmp/loose.snippet")), None);
        assert_eq!(classify(Path::new("/tmp/a.b.c.snippet")), None);
        assert_eq!(classify(Path::new("/tmp/notes.txt")), None);
    }
}
