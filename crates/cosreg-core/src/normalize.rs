//! # Text Normalization
//!
//! Source lists disagree on case, spacing, full-width characters and
//! accents, and often decorate names with provenance notes such as
//! "(plant-derived)". Identity matching compares names only after they have
//! been through [`normalize_name`].
//!
//! ## Pipeline
//!
//! 1. NFKC: folds full-width Latin and digits (`ＰＥＧ－４０` → `PEG-40`).
//! 2. NFD + strip combining marks: removes accents (`Bétaïne` → `Betaine`).
//! 3. Drop parenthetical provenance notes containing "derived" or "origin".
//! 4. Lower-case, collapse whitespace, trim trailing `.,;`.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

fn provenance_note() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s*\([^)]*(?:derived|origin)[^)]*\)")
            .expect("provenance note pattern is a valid regex")
    })
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Width-fold and strip accents without changing case.
pub fn fold_text(s: &str) -> String {
    let nfkc: String = s.nfkc().collect();
    nfkc.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Clean a display name: width/accent folding is *not* applied, only
/// whitespace collapse, provenance-note removal and trailing punctuation.
pub fn clean_display_name(s: &str) -> String {
    let without_notes = provenance_note().replace_all(s, "");
    collapse_whitespace(&without_notes)
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';') || c.is_whitespace())
        .to_string()
}

/// Normalize an ingredient name for identity comparison.
///
/// Case-insensitive, whitespace-collapsed, width- and accent-folded.
pub fn normalize_name(s: &str) -> String {
    let folded = fold_text(s);
    clean_display_name(&folded).to_lowercase()
}

/// Split a normalized name into comparison tokens.
///
/// Splits on whitespace and on punctuation other than `-` and `,`, so `1,2-hexanediol` stays one token while
/// `peg-40 (hydrogenated)` becomes `peg-40`, `hydrogenated`.
pub fn tokens(normalized: &str) -> Vec<String> {
    normalized
        .split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '-' && c != ','))
        .map(|t| t.trim_matches(['-', ',']))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokens sorted and re-joined, for order-insensitive comparison.
pub fn token_sorted(normalized: &str) -> String {
    let mut toks = tokens(normalized);
    toks.sort();
    toks.join(" ")
}
