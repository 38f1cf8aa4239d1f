//! Discovery of table parameters in function metadata text.
//!
//! Gateways describe a function as free text. Table parameters are declared
//! with the following grammar; everything that does not match it is skipped:
//!
//! ```text
//! declaration := "TABLES" blank+ name ":"
//! blank       := " " | "\t"
//! name        := word-char+
//! word-char   := alphanumeric | "_"
//! ```
//!
//! `TABLES` must not be preceded by a word character. Names are reported in
//! order of appearance, each name once. If a backend describes its tables in
//! any other format nothing is found.

const KEYWORD: &str = "TABLES";

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Parse what follows the keyword; returns the declared name.
fn declaration(input: &str) -> Option<&str> {
    let name_start = input.trim_start_matches(is_blank);
    if name_start.len() == input.len() {
        return None;
    }
    let end = name_start
        .find(|c: char| !is_word_char(c))
        .unwrap_or(name_start.len());
    if end == 0 {
        return None;
    }
    let (name, tail) = name_start.split_at(end);
    if tail.starts_with(':') {
        Some(name)
    } else {
        None
    }
}

/// Names of all table parameters declared in `metadata`.
pub fn table_names(metadata: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut offset = 0;
    while let Some(found) = metadata[offset..].find(KEYWORD) {
        let start = offset + found;
        let after = start + KEYWORD.len();
        let bounded = !metadata[..start]
            .chars()
            .next_back()
            .map_or(false, is_word_char);
        if bounded {
            if let Some(name) = declaration(&metadata[after..]) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        offset = after;
    }
    names
}
