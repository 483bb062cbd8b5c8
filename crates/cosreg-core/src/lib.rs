#![deny(missing_docs)]

//! # cosreg-core — Canonical Record Model
//!
//! Foundational types every other crate in the workspace depends on. No
//! internal crate dependencies.
//!
//! ## Design Principles
//!
//! 1. **Newtypes for identifiers.** [`JurisdictionCode`], [`IngredientId`] and
//!    [`RegistryNumber`] validate at construction and cannot be confused for
//!    one another.
//!
//! 2. **One closed [`Category`] enum.** Jurisdictions are configuration data;
//!    categories are not. Exhaustive `match` everywhere.
//!
//! 3. **Total status order.** [`Status`] implements `Ord` by priority rank,
//!    published as [`STATUS_PRIORITY`].
//!
//! 4. **No floats.** [`Concentration`] is an exact count of millionths of a
//!    percent, so records hash, compare and canonicalize deterministically.
//!
//! 5. **Validation collects, never panics.** [`ValidatedRecord::from_input`]
//!    returns a [`ValidationError`] for records that must be excluded and
//!    [`ConsistencyWarning`]s for records that are merely suspicious.

pub mod canonical;
pub mod category;
pub mod concentration;
pub mod digest;
pub mod error;
pub mod identity;
pub mod jurisdiction;
pub mod normalize;
pub mod product;
pub mod record;
pub mod registry;
pub mod status;

pub use canonical::CanonicalBytes;
pub use category::{Category, Scope};
pub use concentration::{Concentration, ConcentrationCell, ConcentrationUnit};
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, CoreError, ValidationError};
pub use identity::IngredientId;
pub use jurisdiction::JurisdictionCode;
pub use normalize::normalize_name;
pub use product::ProductType;
pub use record::{
    ConsistencyWarning, Provenance, RecordContext, RecordInput, RegulatoryRecord,
    ValidatedRecord, WarningCode,
};
pub use registry::RegistryNumber;
pub use status::{Status, STATUS_PRIORITY};

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalize_name_is_idempotent(s in "[A-Za-z0-9 ,()-]{0,40}") {
            let once = normalize_name(&s);
            prop_assert_eq!(normalize_name(&once), once);
        }

        #[test]
        fn concentration_display_round_trips(micros in 0u64..=100_000_000) {
            let c = Concentration::from_micros(micros).unwrap();
            prop_assert_eq!(c.to_string().parse::<Concentration>().unwrap(), c);
        }

        #[test]
        fn registry_key_survives_reparse(head in 10u32..9_999_999, mid in 0u32..100, check in 0u32..10) {
            let raw = format!("{head}-{mid:02}-{check}");
            let rn = RegistryNumber::new(&raw).unwrap();
            let id = IngredientId::from_registry(&rn);
            prop_assert_eq!(id.as_str().parse::<IngredientId>().unwrap(), id);
        }

        #[test]
        fn strictest_status_has_minimum_rank(a in 0usize..6, b in 0usize..6) {
            let (sa, sb) = (STATUS_PRIORITY[a], STATUS_PRIORITY[b]);
            prop_assert_eq!(sa.strictest(sb).rank(), sa.rank().min(sb.rank()));
        }
    }
}
