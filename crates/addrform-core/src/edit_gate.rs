#![forbid(unsafe_code)]

//! Per-field input filtering applied before any state mutation.
//!
//! The gate is a pure predicate over `(field, value)`. It never truncates or
//! repairs input: a proposed postal code containing one bad character is
//! refused in its entirety.

use thiserror::Error;

use crate::snapshot::{Field, FormSnapshot, POSTAL_CODE_LEN};

/// Why a proposed value was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("postal code has {len} characters, at most {max} allowed", max = POSTAL_CODE_LEN)]
    TooLong { len: usize },

    #[error("postal code character {ch:?} at position {index} is not an ASCII digit")]
    NonDigit { ch: char, index: usize },
}

/// Outcome of [`EditGate::filter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The value may replace the field.
    Accept(String),
    /// The value must not reach the snapshot.
    Reject(RejectReason),
}

impl GateDecision {
    #[must_use]
    pub fn is_accept(&self) -> bool {
        matches!(self, GateDecision::Accept(_))
    }
}

/// Stateless input filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditGate;

impl EditGate {
    /// Decide whether `proposed` may replace `field` in `current`.
    ///
    /// No rule currently reads `current`.
    #[must_use]
    pub fn filter(field: Field, proposed: &str, _current: &FormSnapshot) -> GateDecision {
        match Self::check(field, proposed.to_owned()) {
            Ok(value) => GateDecision::Accept(value),
            Err(reason) => GateDecision::Reject(reason),
        }
    }

    /// Validate `value` for `field`, handing it back unchanged on success.
    pub fn check(field: Field, value: String) -> Result<String, RejectReason> {
        match field {
            Field::PostalCode => {
                check_postal_code(&value)?;
                Ok(value)
            }
            Field::Prefecture | Field::City | Field::Town | Field::Building => Ok(value),
        }
    }
}

/// Accept the empty string or 1 to 7 ASCII digits.
fn check_postal_code(value: &str) -> Result<(), RejectReason> {
    let len = value.chars().count();
    if len > POSTAL_CODE_LEN {
        return Err(RejectReason::TooLong { len });
    }
    if let Some((index, ch)) = value.chars().enumerate().find(|(_, c)| !c.is_ascii_digit()) {
        return Err(RejectReason::NonDigit { ch, index });
    }
    Ok(())
}
