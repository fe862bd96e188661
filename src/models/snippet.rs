use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Snippet body as persisted: either one string or one entry per line.
///
/// The shape read from disk is kept when the entry is written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Body {
    Text(String),
    Lines(Vec<String>),
}

impl Body {
    pub fn from_text(text: &str) -> Self {
        Body::Lines(text.split('\n').map(str::to_owned).collect())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Text(text) => text.is_empty(),
            Body::Lines(lines) => lines.is_empty(),
        }
    }

    pub fn joined(&self) -> String {
        match self {
            Body::Text(text) => text.clone(),
            Body::Lines(lines) => lines.join("\n"),
        }
    }
}

/// One entry of a collection file, keyed by the snippet key.
///
/// Fields this crate does not manage (e.g. `isFileTemplate`) are carried in
/// `extra` so rewriting a file never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnippetRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Snippet as exchanged with the scratch-text codec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snippet {
    pub key: Option<String>,
    pub filepath: Option<String>,
    pub prefix: Option<String>,
    pub description: Option<String>,
    pub scope: Option<String>,
    pub body: Option<Body>,
}

impl Snippet {
    pub fn from_record(key: &str, record: &SnippetRecord) -> Self {
        Self {
            key: Some(key.to_owned()),
            filepath: None,
            prefix: record.prefix.clone(),
            description: record.description.clone(),
            scope: record.scope.clone(),
            body: record.body.clone(),
        }
    }

    /// First language listed in `scope`, if any.
    pub fn primary_language(&self) -> Option<&str> {
        self.scope
            .as_deref()
            .and_then(|scope| scope.split(',').next())
            .map(str::trim)
            .filter(|language| !language.is_empty())
    }

    /// Record fields carried by this snippet, ready to merge into a collection.
    pub fn patch(&self) -> SnippetPatch {
        SnippetPatch {
            prefix: self.prefix.clone(),
            body: self.body.clone(),
            description: self.description.clone(),
            scope: self.scope.clone(),
        }
    }
}

/// Partial update for a [`SnippetRecord`].
///
/// `None` leaves the stored field untouched. For `description` and `scope`
/// an empty string clears the stored field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetPatch {
    pub prefix: Option<String>,
    pub body: Option<Body>,
    pub description: Option<String>,
    pub scope: Option<String>,
}

impl SnippetPatch {
    pub fn apply(self, record: &mut SnippetRecord) {
        if let Some(prefix) = self.prefix {
            record.prefix = Some(prefix);
        }
        if let Some(body) = self.body {
            record.body = Some(body);
        }
        if let Some(description) = self.description {
            record.description = non_empty(description);
        }
        if let Some(scope) = self.scope {
            record.scope = non_empty(scope);
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Checks the fields every persisted snippet must carry.
pub fn validate(key: &str, record: &SnippetRecord) -> Result<(), String> {
    if key.trim().is_empty() {
        return Err("@key is required".to_string());
    }
    if record.prefix.as_deref().is_none_or(str::is_empty) {
        return Err("@prefix is required".to_string());
    }
    if record.body.as_ref().is_none_or(Body::is_empty) {
        return Err("snippet body can't be empty".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(prefix: &str, body: &[&str], description: &str) -> SnippetRecord {
        SnippetRecord {
            prefix: Some(prefix.to_string()),
            body: Some(Body::Lines(body.iter().map(|s| s.to_string()).collect())),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn patch_only_overrides_present_fields() {
        let mut existing = record("p", &["b"], "d1");
        SnippetPatch {
            description: Some("d2".to_string()),
            ..Default::default()
        }
        .apply(&mut existing);

        assert_eq!(existing, record("p", &["b"], "d2"));
    }

    #[test]
    fn empty_description_clears_field() {
        let mut existing = record("p", &["b"], "d1");
        SnippetPatch {
            description: Some(String::new()),
            scope: Some(String::new()),
            ..Default::default()
        }
        .apply(&mut existing);

        assert_eq!(existing.description, None);
        assert_eq!(existing.scope, None);
    }

    #[test]
    fn body_keeps_persisted_shape() {
        let text: SnippetRecord =
            serde_json::from_str(r#"{"prefix":"p","body":"one line"}"#).unwrap();
        assert_eq!(text.body, Some(Body::Text("one line".to_string())));

        let lines: SnippetRecord =
            serde_json::from_str(r#"{"prefix":"p","body":["a","b"]}"#).unwrap();
        assert_eq!(lines.body.unwrap().joined(), "a\nb");
    }

    #[test]
    fn unknown_fields_survive_rewrite() {
        let parsed: SnippetRecord =
            serde_json::from_str(r#"{"prefix":"p","body":["a"],"isFileTemplate":true}"#).unwrap();
        let written = serde_json::to_string(&parsed).unwrap();
        assert!(written.contains(r#""isFileTemplate":true"#));
    }

    #[test]
    fn validation_names_missing_field() {
        assert_eq!(
            validate("k", &SnippetRecord::default()),
            Err("@prefix is required".to_string())
        );

        let no_body = SnippetRecord {
            prefix: Some("p".to_string()),
            body: Some(Body::Lines(Vec::new())),
            ..Default::default()
        };
        assert_eq!(
            validate("k", &no_body),
            Err("snippet body can't be empty".to_string())
        );
        assert_eq!(
            validate(" ", &record("p", &["b"], "")),
            Err("@key is required".to_string())
        );
        assert!(validate("k", &record("p", &["b"], "")).is_ok());
    }

    #[test]
    fn primary_language_is_first_scope_entry() {
        let snippet = Snippet {
            scope: Some("typescript, javascript".to_string()),
            ..Default::default()
        };
        assert_eq!(snippet.primary_language(), Some("typescript"));
        assert_eq!(Snippet::default().primary_language(), None);
    }
}
