// crates/pactum-core/src/core/identifiers.rs
// ============================================================================
// Module: Pactum Identifiers
// Description: Surrogate identifiers for users, catalog entries, and contracts.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every durable record in Pactum is keyed by a surrogate integer assigned by
//! the store. Identifiers serialize as plain numbers and enforce the non-zero,
//! 1-based invariant at construction boundaries so a zero row id can never
//! leak into a lookup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares a non-zero numeric identifier newtype.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        ///
        /// # Invariants
        /// - Always >= 1 (non-zero, 1-based).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            #[doc = concat!("Creates a new ", $label, " identifier from a non-zero value.")]
            #[must_use]
            pub const fn new(id: NonZeroU64) -> Self {
                Self(id)
            }

            #[doc = concat!("Creates a ", $label, " identifier from a raw value (returns `None` if zero).")]
            #[must_use]
            pub fn from_raw(raw: u64) -> Option<Self> {
                NonZeroU64::new(raw).map(Self)
            }

            /// Returns the raw identifier value (always >= 1).
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.get().fmt(f)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

numeric_id!(
    /// Identifier of a user who owns contracts or signs them.
    UserId,
    "user"
);

numeric_id!(
    /// Identifier of a contract type in the catalog.
    ContractTypeId,
    "contract type"
);

numeric_id!(
    /// Identifier of a versioned contract template.
    TemplateId,
    "template"
);

numeric_id!(
    /// Identifier of a contract.
    ContractId,
    "contract"
);

numeric_id!(
    /// Identifier of a party attached to a contract.
    PartyId,
    "party"
);

numeric_id!(
    /// Identifier of a digital signature record.
    SignatureId,
    "signature"
);
