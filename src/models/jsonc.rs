//! Member-level layout of a commented JSON object.
//!
//! A snippet file is rewritten over its previous text so the comments between
//! entries, and the entries that did not change, stay exactly as the user
//! wrote them.

/// One `"key": value` member of the top-level object.
#[derive(Debug)]
pub(crate) struct Member<'a> {
    pub key: String,
    /// Whitespace and comments before the key, without the separating comma.
    pub leading: String,
    /// The member from its key to the end of its value, as written.
    pub text: &'a str,
    pub value: &'a str,
}

impl Member<'_> {
    /// Indentation of the line the key starts on, if the key opens a line.
    pub fn indent(&self) -> Option<&str> {
        let (_, line) = self.leading.rsplit_once('\n')?;
        let indent = line.trim_end_matches('\r');
        (!indent.is_empty() && indent.chars().all(|c| c == ' ' || c == '\t')).then_some(indent)
    }
}

#[derive(Debug)]
pub(crate) struct Layout<'a> {
    /// Everything up to and including the opening brace.
    pub head: &'a str,
    pub members: Vec<Member<'a>>,
    /// Whitespace and comments after the last member, trailing comma dropped.
    pub tail: String,
    /// The closing brace and anything after it.
    pub rest: &'a str,
}

impl<'a> Layout<'a> {
    /// Splits `text` into its top-level members. `None` unless the text is a
    /// single object.
    pub fn scan(text: &'a str) -> Option<Self> {
        let bytes = text.as_bytes();
        let open = skip_trivia(bytes, 0);
        if bytes.get(open) != Some(&b'{') {
            return None;
        }

        let mut members = Vec::new();
        let mut pending = String::new();
        let mut cursor = open + 1;
        let close = loop {
            let start = skip_trivia(bytes, cursor);
            pending.push_str(&text[cursor..start]);
            match bytes.get(start)? {
                b'}' => break start,
                b'"' => {}
                _ => return None,
            }

            let key_end = skip_string(bytes, start)?;
            let key: String = serde_json::from_str(&text[start..key_end]).ok()?;
            let colon = skip_trivia(bytes, key_end);
            if bytes.get(colon) != Some(&b':') {
                return None;
            }
            let value_start = skip_trivia(bytes, colon + 1);
            let value_end = skip_value(bytes, value_start)?;
            members.push(Member {
                key,
                leading: std::mem::take(&mut pending),
                text: &text[start..value_end],
                value: &text[value_start..value_end],
            });

            let next = skip_trivia(bytes, value_end);
            pending.push_str(&text[value_end..next]);
            match bytes.get(next)? {
                b',' => cursor = next + 1,
                b'}' => break next,
                _ => return None,
            }
        };

        Some(Self {
            head: &text[..=open],
            members,
            tail: pending,
            rest: &text[close..],
        })
    }

    /// Indentation used by the first member, two spaces when there is none.
    pub fn indent(&self) -> &str {
        self.members
            .first()
            .and_then(Member::indent)
            .unwrap_or("  ")
    }
}

fn skip_trivia(bytes: &[u8], mut i: usize) -> usize {
    loop {
        match (bytes.get(i), bytes.get(i + 1)) {
            (Some(b), _) if b.is_ascii_whitespace() => i += 1,
            (Some(b'/'), Some(b'/')) => {
                i += 2;
                while bytes.get(i).is_some_and(|&b| b != b'\n') {
                    i += 1;
                }
            }
            (Some(b'/'), Some(b'*')) => {
                i = bytes[i + 2..]
                    .windows(2)
                    .position(|pair| pair == b"*/")
                    .map_or(bytes.len(), |end| i + 2 + end + 2);
            }
            _ => return i,
        }
    }
}

/// `i` is at an opening quote; returns the index after the closing one.
fn skip_string(bytes: &[u8], i: usize) -> Option<usize> {
    let mut j = i + 1;
    loop {
        match bytes.get(j)? {
            b'\\' => j += 2,
            b'"' => return Some(j + 1),
            _ => j += 1,
        }
    }
}

fn skip_value(bytes: &[u8], i: usize) -> Option<usize> {
    match bytes.get(i)? {
        b'"' => skip_string(bytes, i),
        b'{' | b'[' => {
            let mut depth = 0usize;
            let mut j = i;
            loop {
                match (bytes.get(j)?, bytes.get(j + 1)) {
                    (b'"', _) => {
                        j = skip_string(bytes, j)?;
                        continue;
                    }
                    (b'/', Some(b'/' | b'*')) => {
                        j = skip_trivia(bytes, j);
                        continue;
                    }
                    (b'{' | b'[', _) => depth += 1,
                    (b'}' | b']', _) => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(j + 1);
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
        }
        _ => {
            let end = bytes[i..]
                .iter()
                .position(|&b| matches!(b, b',' | b'}' | b']' | b'/') || b.is_ascii_whitespace())
                .map_or(bytes.len(), |n| i + n);
            (end > i).then_some(end)
        }
    }
}
