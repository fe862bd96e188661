//! Scratch-text encoding of a single snippet.
//!
//! Metadata is written as comment lines at the top of the file:
//!
//! ```text
//! // @filepath /work/.vscode/app.code-snippets
//! // @key log
//! // @scope javascript
//! // @prefix log
//! // @description first line
//! // @            second line
//!
//! console.log($1)
//! ```

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;
use unicode_width::UnicodeWidthStr;

use crate::models::{Body, Snippet};
use crate::syntax::CommentSyntax;

/// Written after the metadata of javascript scratch files so linters leave
/// them alone. Also ends metadata when decoding.
pub const ESLINT_DISABLE: &str = "/* eslint-disable */";

const FALLBACK_LANGUAGE: &str = "";

static FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*@(\w+)\s*").expect("field pattern is valid"));

/// Encodes `snippet`, resolving the comment token for `language_id` or, when
/// absent, for the first language of the snippet's scope.
pub fn encode(snippet: &Snippet, language_id: Option<&str>, syntax: &dyn CommentSyntax) -> String {
    let language_id = language_id
        .or_else(|| snippet.primary_language())
        .unwrap_or(FALLBACK_LANGUAGE);
    render(snippet, language_id, &syntax.line_comment(language_id))
}

/// Decodes scratch text written for `language_id`.
pub fn decode(text: &str, language_id: &str, syntax: &dyn CommentSyntax) -> Snippet {
    parse(text, &syntax.line_comment(language_id))
}

pub fn render(snippet: &Snippet, language_id: &str, comment: &str) -> String {
    let mut fields: Vec<(&str, &str)> = Vec::new();
    for (name, value) in [("filepath", &snippet.filepath), ("key", &snippet.key)] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            fields.push((name, value));
        }
    }
    if !fields.is_empty() {
        fields.push(("scope", snippet.scope.as_deref().unwrap_or_default()));
    }
    fields.push(("prefix", snippet.prefix.as_deref().unwrap_or_default()));
    fields.push((
        "description",
        snippet.description.as_deref().unwrap_or_default(),
    ));

    let mut text = String::new();
    for (name, value) in fields {
        let padding = " ".repeat(name.width());
        for (i, line) in value.split('\n').enumerate() {
            let label = if i == 0 { name } else { padding.as_str() };
            let _ = writeln!(text, "{comment} @{label} {line}");
        }
    }
    if language_id == "javascript" {
        text.push_str(ESLINT_DISABLE);
        text.push('\n');
    }
    text.push('\n');
    if let Some(body) = &snippet.body {
        text.push_str(&body.joined());
    }
    text
}

pub fn parse(text: &str, comment: &str) -> Snippet {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let (metadata, rest) = match lines
        .iter()
        .position(|line| *line == ESLINT_DISABLE || !line.starts_with(comment))
    {
        Some(i) if lines[i] == ESLINT_DISABLE => (&lines[..i], &lines[i + 1..]),
        Some(i) => (&lines[..i], &lines[i..]),
        None => (&lines[..], &[][..]),
    };
    let body_start = rest
        .iter()
        .position(|line| !line.is_empty())
        .unwrap_or(rest.len());

    let mut fields: Vec<(String, String)> = Vec::new();
    // Field that receives continuation lines.
    let mut current: Option<usize> = None;
    for line in metadata {
        let line = &line[comment.len()..];
        if let Some(found) = FIELD.captures(line) {
            let value = &line[found[0].len()..];
            let index = match fields.iter().position(|(name, _)| *name == found[1]) {
                Some(index) => index,
                None => {
                    fields.push((found[1].to_string(), String::new()));
                    fields.len() - 1
                }
            };
            fields[index].1.push_str(value);
            current = Some(index);
        } else if let Some(index) = current {
            fields[index].1.push('\n');
            fields[index].1.push_str(continuation(line));
        }
    }

    let mut snippet = Snippet {
        body: Some(Body::Lines(
            rest[body_start..].iter().map(|line| line.to_string()).collect(),
        )),
        ..Default::default()
    };
    for (name, value) in fields {
        let slot = match name.as_str() {
            "filepath" => &mut snippet.filepath,
            "key" => &mut snippet.key,
            "scope" => &mut snippet.scope,
            "prefix" => &mut snippet.prefix,
            "description" => &mut snippet.description,
            other => {
                warn!("ignoring unknown snippet field @{other}");
                continue;
            }
        };
        *slot = Some(value);
    }
    snippet
}

/// Value of a continuation line: the `@` marker and its padding are dropped.
fn continuation(line: &str) -> &str {
    let line = line.trim_start();
    line.strip_prefix('@').map(str::trim_start).unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{CommentResolver, DirectoryConfigSource, FixedComment};

    fn slashes() -> FixedComment {
        FixedComment("//".to_string())
    }

    fn lines(body: &[&str]) -> Option<Body> {
        Some(Body::Lines(body.iter().map(|s| s.to_string()).collect()))
    }

    fn full_snippet() -> Snippet {
        Snippet {
            key: Some("log".to_string()),
            filepath: Some("/work/.vscode/app.code-snippets".to_string()),
            prefix: Some("log".to_string()),
            description: Some("quick log\nwith a second line".to_string()),
            scope: Some("javascript,typescript".to_string()),
            body: lines(&["console.log($1)", "  $0"]),
        }
    }

    #[test]
    fn encodes_quick_log_for_javascript() {
        let snippet = Snippet {
            prefix: Some("log".to_string()),
            description: Some("quick log".to_string()),
            body: lines(&["console.log($1)"]),
            ..Default::default()
        };
        let text = encode(&snippet, Some("javascript"), &slashes());

        assert_eq!(
            text,
            "// @prefix log\n// @description quick log\n/* eslint-disable */\n\nconsole.log($1)"
        );

        let decoded = decode(&text, "javascript", &slashes());
        assert_eq!(decoded, snippet);
    }

    #[test]
    fn unscoped_snippet_without_language_uses_default_comment() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(".json"), r##"{"comments":{"lineComment":"#"}}"##).unwrap();
        std::fs::write(dir.path().join("python.json"), r##"{"comments":{"lineComment":"#"}}"##).unwrap();
        let resolver = CommentResolver::new(DirectoryConfigSource::new(vec![dir.path().into()]));
        let mut snippet = Snippet {
            prefix: Some("hi".to_string()),
            description: Some("greet".to_string()),
            body: lines(&["echo hi"]),
            ..Default::default()
        };

        let text = encode(&snippet, None, &resolver);
        assert_eq!(text, "// @prefix hi\n// @description greet\n\necho hi");
        assert!(!text.contains(ESLINT_DISABLE));
        assert_eq!(decode(&text, FALLBACK_LANGUAGE, &resolver), snippet);

        snippet.scope = Some("python,shellscript".to_string());
        assert!(encode(&snippet, None, &resolver).starts_with("# @prefix hi\n"));
    }

    #[test]
    fn identity_fields_force_scope() {
        let snippet = Snippet {
            key: Some("k".to_string()),
            prefix: Some("p".to_string()),
            body: lines(&["b"]),
            ..Default::default()
        };
        let text = render(&snippet, "rust", "//");

        assert_eq!(
            text,
            "// @key k\n// @scope \n// @prefix p\n// @description \n\nb"
        );
    }

    #[test]
    fn multi_line_values_use_padded_continuations() {
        let text = render(&full_snippet(), "typescript", "//");

        assert!(text.contains("// @description quick log\n// @            with a second line\n"));
        assert!(!text.contains(ESLINT_DISABLE));
    }

    #[test]
    fn round_trips_every_field() {
        for language in ["javascript", "typescript"] {
            let snippet = full_snippet();
            let text = encode(&snippet, Some(language), &slashes());
            let decoded = decode(&text, language, &slashes());

            assert_eq!(decoded, snippet);
            assert_eq!(encode(&decoded, Some(language), &slashes()), text);
        }
    }

    #[test]
    fn round_trips_with_other_comment_token() {
        let snippet = Snippet {
            prefix: Some("main".to_string()),
            description: Some("entry\npoint".to_string()),
            body: lines(&["if __name__ == \"__main__\":", "    main()"]),
            ..Default::default()
        };
        let text = render(&snippet, "python", "#");

        assert!(text.starts_with("# @prefix main\n"));
        assert_eq!(parse(&text, "#"), snippet);
    }

    #[test]
    fn language_is_inferred_from_scope() {
        let snippet = Snippet {
            scope: Some("javascript,typescript".to_string()),
            prefix: Some("p".to_string()),
            body: lines(&["b"]),
            ..Default::default()
        };
        assert!(encode(&snippet, None, &slashes()).contains(ESLINT_DISABLE));
    }

    #[test]
    fn text_without_metadata_is_all_body() {
        let decoded = parse("let x = 1;\nlet y = 2;", "//");

        assert_eq!(decoded.prefix, None);
        assert_eq!(decoded.description, None);
        assert_eq!(decoded.body, lines(&["let x = 1;", "let y = 2;"]));
    }

    #[test]
    fn leading_blank_lines_are_trimmed_from_body() {
        let decoded = parse("// @prefix p\n\n\n\nbody\n\nend", "//");
        assert_eq!(decoded.body, lines(&["body", "", "end"]));
    }

    #[test]
    fn eslint_marker_ends_metadata() {
        let text = "// @prefix p\n/* eslint-disable */\n\n// a commented body line\ncode";
        let decoded = parse(text, "//");

        assert_eq!(decoded.prefix.as_deref(), Some("p"));
        assert_eq!(decoded.body, lines(&["// a commented body line", "code"]));
    }

    #[test]
    fn unmarked_comment_lines_continue_previous_field() {
        let decoded = parse("// @description one\n//    two\n// @prefix p\n\nb", "//");

        assert_eq!(decoded.description.as_deref(), Some("one\ntwo"));
        assert_eq!(decoded.prefix.as_deref(), Some("p"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let decoded = parse("// @prefix p\n// @author me\n\nb", "//");

        assert_eq!(decoded.prefix.as_deref(), Some("p"));
        assert_eq!(decoded.key, None);
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let decoded = parse("// @prefix p\r\n// @description d\r\n\r\nbody\r\n", "//");

        assert_eq!(decoded.prefix.as_deref(), Some("p"));
        assert_eq!(decoded.description.as_deref(), Some("d"));
        assert_eq!(decoded.body, lines(&["body", ""]));
    }
}
