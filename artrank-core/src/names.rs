//! Name normalization
//!
//! Turns a raw display name into a comparable key. Two names sharing a key are
//! only *candidates* for identity; proof needs the matcher or disambiguation.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Bibliographic disambiguation suffix, e.g. "Haibo Chen 0001"
static DISAMBIGUATION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[0-9]{4}$").unwrap());

/// Generational / academic suffixes dropped before comparing search results
static NAME_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[\s,]+(?:jr|sr|ph\.?d|ii|iii|iv)\b\.?").unwrap());

static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());

/// Canonicalize a display name into its normalized key.
///
/// Accents are decomposed and dropped, case and punctuation are ignored,
/// a trailing four-digit disambiguation suffix is removed, single-letter
/// middle initials are removed and whitespace is collapsed.
pub fn normalize(name: &str) -> String {
    let decomposed: String = name.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    let trimmed = decomposed.trim().trim_start_matches('_');
    let without_suffix = DISAMBIGUATION_SUFFIX.replace(trimmed, "");

    let raw: Vec<&str> = without_suffix.split_whitespace().collect();
    let last = raw.len().saturating_sub(1);

    let mut tokens: Vec<String> = raw
        .iter()
        .enumerate()
        .filter(|(i, token)| !(*i > 0 && *i < last && is_initial(token)))
        .map(|(_, token)| fold_token(token))
        .filter(|token| !token.is_empty())
        .collect();

    // Punctuation removal can expose suffixes like "12-34"; drop them all so a
    // key never changes when normalized twice.
    while tokens.len() > 1 && tokens.last().is_some_and(|t| is_suffix_digits(t)) {
        tokens.pop();
    }

    tokens.join(" ")
}

/// Whitespace tokens of the normalized key
pub fn name_tokens(name: &str) -> Vec<String> {
    normalize(name)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Last token of the normalized key, if the name has at least two tokens
pub fn surname_key(name: &str) -> Option<String> {
    let tokens = name_tokens(name);
    if tokens.len() >= 2 {
        tokens.last().cloned()
    } else {
        None
    }
}

/// Remove the bibliographic disambiguation suffix, keeping the display form
pub fn strip_disambiguation_suffix(name: &str) -> String {
    DISAMBIGUATION_SUFFIX
        .replace(name.trim(), "")
        .trim()
        .to_string()
}

/// Looser key used to compare names returned by a remote search engine:
/// parenthetical content and generational suffixes are dropped first.
pub fn search_key(name: &str) -> String {
    let without_parens = PARENTHETICAL.replace_all(name, " ");
    let without_suffixes = NAME_SUFFIX.replace_all(&without_parens, "");
    normalize(&without_suffixes)
}

/// A lone uppercase letter, optionally followed by a period
fn is_initial(token: &str) -> bool {
    let bare = token.strip_suffix('.').unwrap_or(token);
    let mut chars = bare.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase())
}

fn fold_token(token: &str) -> String {
    token
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn is_suffix_digits(token: &str) -> bool {
    token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit())
}
