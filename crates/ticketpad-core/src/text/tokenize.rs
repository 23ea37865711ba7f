use std::io::{self, Read};

use tracing::warn;

/// Split a value list into tokens using the header quoting rules.
///
/// Scanning is one character at a time:
///
/// - `\` escapes the next character. Before `"` the backslash is dropped,
///   before anything else both characters are kept.
/// - `"` toggles the quoted state without starting a new token.
/// - `'` consumes the next character. `''` yields a literal apostrophe and
///   leaves the quoted state alone; any other character is kept and the
///   quoted state toggles.
/// - Whitespace outside a quoted span ends the current token.
///
/// Unbalanced quotes never fail; the split is best effort. An empty input
/// yields a single empty token.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let Some(next) = chars.next() else { break };
                if next != '"' {
                    current.push('\\');
                }
                current.push(next);
            }
            '"' => quoted = !quoted,
            '\'' => {
                let Some(next) = chars.next() else { break };
                if next == '\'' {
                    current.push('\'');
                } else {
                    current.push(next);
                    quoted = !quoted;
                }
            }
            c if c.is_whitespace() => {
                if quoted {
                    current.push(c);
                } else {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    tokens.push(current);
    tokens
}

/// Tokenize everything readable from `reader`.
///
/// A read failure is logged and ends input; whatever was read up to that
/// point is still tokenized. Invalid UTF-8 is replaced lossily.
pub fn tokenize_reader<R: Read>(mut reader: R) -> Vec<String> {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                warn!(error = %err, read = buf.len(), "tokenizer input failed, using partial data");
                break;
            }
        }
    }

    tokenize(&String::from_utf8_lossy(&buf))
}

/// Render one value so that [`tokenize`] reads it back as a single token.
///
/// Apostrophes are doubled and double quotes escaped; the value is wrapped
/// in double quotes only when it contains whitespace. A backslash pair is
/// written as is since the tokenizer keeps both characters. A backslash
/// before `"` or at the end of the value goes through `'`, whose quote
/// toggle is undone by the `"` that follows it.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('"') => escaped.push_str("'\\\"\\\""),
                Some(next) => {
                    escaped.push('\\');
                    escaped.push(next);
                }
                None => escaped.push_str("'\\\""),
            },
            '\'' => escaped.push_str("''"),
            '"' => escaped.push_str("\\\""),
            c => escaped.push(c),
        }
    }

    if value.chars().any(char::is_whitespace) {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}
