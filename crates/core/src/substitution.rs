//! Entity-name substitution.
//!
//! Rewrites cached friendly names into canonical identifiers before a
//! message reaches the automation service. A name is only replaced when a
//! surrounding-phrase pattern marks it as an entity reference, which keeps
//! incidental substrings intact. Lookup is longest-match-wins: when one
//! cached name contains another, the longer name is tried first and each
//! name substitutes at most once per pass, so a pass over already-rewritten
//! text is a no-op.

use crate::domain::entity::EntityMapping;

/// Words that mark the token *before* the name as an entity reference
/// ("use template X", "from template X", Hebrew equivalents).
const LEADING_TRIGGERS: &[&str] = &["template", "תבנית", "מתבנית", "בתבנית"];

/// Words that mark the token *after* the name ("X template", "X תבנית").
const TRAILING_TRIGGERS: &[&str] = &["template", "תבנית"];

/// Replace cached friendly names with their canonical identifiers.
/// Idempotent: identifiers already present are never re-substituted.
pub fn substitute(message: &str, mapping: &EntityMapping) -> String {
    let mut output = message.to_string();

    let mut names: Vec<(&str, &str)> = mapping.iter().collect();
    names.sort_by(|a, b| {
        b.0.chars().count().cmp(&a.0.chars().count()).then_with(|| a.0.cmp(b.0))
    });

    for (name, id) in names {
        if name.is_empty() || output.contains(id) {
            continue;
        }
        // A cached "name" that is itself a canonical identifier is never a
        // friendly reference; replacing it would chain ids through passes.
        if crate::domain::entity::is_canonical_id(name) {
            continue;
        }
        if let Some((begin, end)) = find_name(&output, name) {
            if has_trigger_context(&output, begin, end) {
                output.replace_range(begin..end, id);
            }
        }
    }

    output
}

/// Case-insensitive search for `needle` returning its byte range in
/// `haystack`. Comparison is per-character so multi-byte text never splits
/// a code point.
fn find_name(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let haystack_chars: Vec<(usize, char)> = haystack.char_indices().collect();
    let needle_chars: Vec<char> = needle.chars().collect();
    if needle_chars.is_empty() || haystack_chars.len() < needle_chars.len() {
        return None;
    }

    for start in 0..=(haystack_chars.len() - needle_chars.len()) {
        let matches = needle_chars
            .iter()
            .enumerate()
            .all(|(offset, expected)| chars_match(haystack_chars[start + offset].1, *expected));
        if matches {
            let begin = haystack_chars[start].0;
            let end = haystack_chars
                .get(start + needle_chars.len())
                .map_or(haystack.len(), |(index, _)| *index);
            return Some((begin, end));
        }
    }

    None
}

fn chars_match(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// The name must sit next to a trigger word to count as an entity
/// reference; "I filed the Employment Contract yesterday" stays untouched.
fn has_trigger_context(message: &str, begin: usize, end: usize) -> bool {
    if let Some(word) = last_word(&message[..begin]) {
        if LEADING_TRIGGERS.iter().any(|trigger| word.eq_ignore_ascii_case(trigger)) {
            return true;
        }
    }
    if let Some(word) = first_word(&message[end..]) {
        if TRAILING_TRIGGERS.iter().any(|trigger| word.eq_ignore_ascii_case(trigger)) {
            return true;
        }
    }
    false
}

fn last_word(text: &str) -> Option<String> {
    text.split_whitespace().last().map(strip_punctuation)
}

fn first_word(text: &str) -> Option<String> {
    text.split_whitespace().next().map(strip_punctuation)
}

fn strip_punctuation(word: &str) -> String {
    word.trim_matches(|ch: char| ch.is_ascii_punctuation() || ch == '“' || ch == '”')
        .to_lowercase()
}
