use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use std::collections::HashSet;

use crate::models::jsonc::{Layout, Member};
use crate::models::snippet::SnippetRecord;

/// Snippets of one collection file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    entries: IndexMap<String, SnippetRecord>,
}

impl Collection {
    /// Parses collection text. Comments and trailing commas are accepted;
    /// blank text is an empty collection.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let stripped = strip_comments(text);
        if stripped.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&stripped)
    }

    /// Serialized form written to disk (2-space indentation).
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serialized form laid over `original`, the text this collection was
    /// read from. Comments and unchanged entries keep their original text,
    /// changed entries are rendered in place and new ones are appended.
    /// Falls back to [`Collection::to_text`] when `original` is not an object.
    pub fn rewrite(&self, original: &str) -> Result<String, serde_json::Error> {
        let Some(layout) = Layout::scan(original) else {
            return self.to_text();
        };
        let indent = layout.indent();
        let mut out = String::from(layout.head);
        let mut carried = String::new();
        let mut emitted = 0;

        for member in &layout.members {
            let Some(record) = self.get(&member.key) else {
                // comments above a removed entry stay in the file
                if member.leading.contains('/') {
                    carried.push_str(member.leading.trim_end());
                }
                continue;
            };
            if emitted > 0 {
                out.push(',');
            }
            flush(&mut out, &mut carried, &member.leading);
            out.push_str(&member.leading);
            if holds(member, record) {
                out.push_str(member.text);
            } else {
                let indent = member.indent().unwrap_or(indent);
                out.push_str(&render_member(&member.key, record, indent)?);
            }
            emitted += 1;
        }

        let known: HashSet<&str> = layout.members.iter().map(|m| m.key.as_str()).collect();
        for (key, record) in self.iter().filter(|(key, _)| !known.contains(key.as_str())) {
            if emitted > 0 {
                out.push(',');
            }
            let leading = format!("\n{indent}");
            flush(&mut out, &mut carried, &leading);
            out.push_str(&leading);
            out.push_str(&render_member(key, record, indent)?);
            emitted += 1;
        }

        let tail = if emitted > 0 && !layout.tail.contains('\n') {
            format!("\n{}", layout.tail)
        } else {
            layout.tail
        };
        flush(&mut out, &mut carried, &tail);
        out.push_str(&tail);
        out.push_str(layout.rest);
        Ok(out)
    }

    pub fn get(&self, key: &str) -> Option<&SnippetRecord> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or replaces `key`, keeping the position of an existing entry.
    pub fn insert(&mut self, key: String, record: SnippetRecord) {
        self.entries.insert(key, record);
    }

    /// Removes `key` without disturbing the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<SnippetRecord> {
        self.entries.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SnippetRecord)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn holds(member: &Member<'_>, record: &SnippetRecord) -> bool {
    serde_json::from_str::<SnippetRecord>(&strip_comments(member.value))
        .is_ok_and(|written| &written == record)
}

/// Appends comments carried over from removed entries, ending the line
/// unless `next` starts a new one.
fn flush(out: &mut String, carried: &mut String, next: &str) {
    if carried.is_empty() {
        return;
    }
    out.push_str(carried);
    carried.clear();
    if !next.trim_start_matches([' ', '\t']).starts_with(['\n', '\r']) {
        out.push('\n');
    }
}

/// `"key": value` pretty-printed with `indent` per level, continuation
/// lines shifted one level in.
fn render_member(key: &str, record: &SnippetRecord, indent: &str) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
    record.serialize(&mut serializer)?;
    let value = String::from_utf8_lossy(&buf).replace('\n', &format!("\n{indent}"));
    Ok(format!("{}: {value}", serde_json::to_string(key)?))
}

/// Removes `//` and `/* */` comments plus trailing commas from JSON text.
/// String literals are copied untouched.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                out.push(' ');
            }
            '}' | ']' => {
                let kept = out.trim_end().len();
                if out[..kept].ends_with(',') {
                    out.remove(kept - 1);
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}
