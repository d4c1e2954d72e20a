//! Line-level parsing of `.dst` distribution resources.
//!
//! A record is `VALUES:WEIGHTS`. Both halves are comma separated. A colon or
//! comma preceded by a backslash is literal; backslashes are stripped only
//! after splitting, so `Did not fit\, too small` stays one value.

/// Decode ISO-8859-1 bytes. Every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Iterate over the data lines of a resource as `(line_number, line)`.
///
/// Blank lines and `--` comments are skipped. Line numbers are 1-based so
/// they can go straight into error messages.
pub fn records(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with("--"))
}

/// Split a record into its top-level colon-separated parts, trimmed.
pub fn split_parts(line: &str) -> Vec<&str> {
    split_unescaped(line, ':')
}

/// Split one half of a record into its comma-separated sub-values.
///
/// Each sub-value is trimmed, then every backslash is removed.
pub fn split_values(part: &str) -> Vec<String> {
    split_unescaped(part, ',')
        .into_iter()
        .map(|value| value.replace('\\', ""))
        .collect()
}

fn split_unescaped(s: &str, delimiter: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut previous: Option<char> = None;
    for (idx, c) in s.char_indices() {
        if c == delimiter && previous != Some('\\') {
            pieces.push(s[start..idx].trim());
            start = idx + c.len_utf8();
        }
        previous = Some(c);
    }
    pieces.push(s[start..].trim());
    pieces
}
