/// Opening prefix and closing suffix of the verbatim block markers.
const RAW_MARKERS: [(&str, &str); 2] = [("{code", "{code}"), ("{noformat", "{noformat}")];

fn is_raw_marker(line: &str) -> bool {
    RAW_MARKERS
        .iter()
        .any(|(open, close)| line.starts_with(open) || line.ends_with(close))
}

/// Byte offset of the whitespace to break `line` at, if it needs breaking.
///
/// Prefers the last whitespace within the first `max_width` characters
/// (a space sitting exactly at the limit counts). Falls back to the first
/// whitespace anywhere so a long unbroken run still gets split after it.
fn break_point(line: &str, max_width: usize) -> Option<usize> {
    let (limit, at_limit) = line.char_indices().nth(max_width)?;
    let window = &line[..limit + at_limit.len_utf8()];
    window
        .rfind(char::is_whitespace)
        .or_else(|| line.find(char::is_whitespace))
}

/// Reflow `text` to `max_width` columns, prefixing every output line.
///
/// The input is trimmed first. Lines between `{code...}` / `{noformat...}`
/// markers are copied verbatim; everything else is trimmed and greedily
/// re-wrapped. A run with no whitespace at all is emitted whole. Every
/// emitted line ends in a newline.
#[must_use]
pub fn wrap(text: &str, prefix: &str, max_width: usize) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut raw = false;

    for line in text.trim().lines() {
        if is_raw_marker(line) {
            raw = !raw;
        }
        if raw {
            out.push_str(prefix);
            out.push_str(line);
            out.push('\n');
            continue;
        }

        let mut rest = line.trim();
        while let Some(cut) = break_point(rest, max_width) {
            out.push_str(prefix);
            out.push_str(&rest[..cut]);
            out.push('\n');
            let space = rest[cut..].chars().next().map_or(0, char::len_utf8);
            rest = rest[cut + space..].trim_start();
        }
        out.push_str(prefix);
        out.push_str(rest);
        out.push('\n');
    }

    out
}
