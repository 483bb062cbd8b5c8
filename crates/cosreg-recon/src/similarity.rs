//! Token-order-insensitive name similarity.
//!
//! Both names are expected in normalized form. Tokens are sorted before
//! comparison so "Acid Salicylic" and "Salicylic Acid" score 1.0; the
//! sorted strings are compared by normalized Levenshtein distance.

use cosreg_core::normalize::token_sorted;

/// Similarity in `[0, 1]` of two normalized names.
pub fn token_sort_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (token_sorted(a), token_sorted(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}
