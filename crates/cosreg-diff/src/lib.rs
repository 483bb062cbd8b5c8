//! # cosreg-diff — Regulation Version Diffs
//!
//! Regulations change by amendment. This crate captures each published
//! version of a jurisdiction's rules as an immutable, content-addressed
//! [`Snapshot`] and compares two versions clause by clause.
//!
//! ## Model
//!
//! ```text
//! diff(old, new) = { added:    new \ old,
//!                    removed:  old \ new,
//!                    modified: { id ∈ old ∩ new | watched(old[id]) ≠ watched(new[id]) } }
//! ```
//!
//! Partitions are sorted by clause id, affected ingredients are a sorted
//! set, and the diff embeds nothing about when it was computed. Swapping
//! the arguments swaps `added` and `removed` and keeps the modified ids.

pub mod changelog;
pub mod diff;
pub mod error;
pub mod snapshot;

pub use diff::{compare_clauses, diff, DiffSummary, FieldChange, ModifiedClause, Severity, SnapshotDiff, WatchedField};
pub use error::{DiffError, DiffResult};
pub use snapshot::{RuleClause, Snapshot};

#[cfg(test)]
mod proptests {
    use super::*;
    use cosreg_core::{Category, Concentration, IngredientId, JurisdictionCode};
    use proptest::prelude::*;

    fn clauses() -> impl Strategy<Value = Vec<RuleClause>> {
        prop::collection::btree_map(
            0u8..12,
            (0usize..Category::COUNT, prop::option::of(0u64..=100_000_000)),
            0..10,
        )
        .prop_map(|m| {
            m.into_iter()
                .map(|(id, (cat, limit))| RuleClause {
                    clause_id: format!("C{id:02}"),
                    ingredient: IngredientId::from_name(&format!("ingredient {id}")),
                    ingredient_name: format!("Ingredient {id}"),
                    category: Category::all()[cat],
                    max_concentration: limit.map(|m| Concentration::from_micros(m).unwrap()),
                    conditions: None,
                    citation: None,
                })
                .collect()
        })
    }

    fn snapshot(version: &str, clauses: Vec<RuleClause>) -> Snapshot {
        Snapshot::new(JurisdictionCode::new("EU").unwrap(), version, None, clauses).unwrap()
    }

    proptest! {
        #[test]
        fn diff_is_symmetric(a in clauses(), b in clauses()) {
            let (a, b) = (snapshot("a", a), snapshot("b", b));
            let forward = diff(&a, &b).unwrap();
            let backward = diff(&b, &a).unwrap();
            prop_assert_eq!(&forward.added, &backward.removed);
            prop_assert_eq!(&forward.removed, &backward.added);
            let ids = |d: &SnapshotDiff| d.modified.iter().map(|m| m.clause_id.clone()).collect::<Vec<_>>();
            prop_assert_eq!(ids(&forward), ids(&backward));
            prop_assert_eq!(forward.affected_ingredients, backward.affected_ingredients);
        }

        #[test]
        fn diff_against_self_is_empty(a in clauses()) {
            let s = snapshot("a", a);
            prop_assert!(diff(&s, &s).unwrap().is_empty());
        }
    }
}
