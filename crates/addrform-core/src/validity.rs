#![forbid(unsafe_code)]

//! The submit-readiness predicate.

use crate::snapshot::{Field, FormSnapshot, POSTAL_CODE_LEN};

/// Fields that must be filled for a snapshot to be submittable.
pub const REQUIRED_FIELDS: [Field; 4] = [Field::PostalCode, Field::Prefecture, Field::City, Field::Town];

/// Pure validity rules over a [`FormSnapshot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Validity;

impl Validity {
    /// `true` iff the postal code is complete and prefecture, city and town
    /// are non-empty. `building` never participates.
    #[must_use]
    pub fn evaluate(snapshot: &FormSnapshot) -> bool {
        REQUIRED_FIELDS.iter().all(|&f| Self::is_satisfied(snapshot, f))
    }

    /// Required fields that currently block submission, in display order.
    #[must_use]
    pub fn missing(snapshot: &FormSnapshot) -> Vec<Field> {
        REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|&f| !Self::is_satisfied(snapshot, f))
            .collect()
    }

    fn is_satisfied(snapshot: &FormSnapshot, field: Field) -> bool {
        match field {
            Field::PostalCode => snapshot.postal_code().chars().count() >= POSTAL_CODE_LEN,
            Field::Building => true,
            other => !snapshot.get(other).is_empty(),
        }
    }
}
