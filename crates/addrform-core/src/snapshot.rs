#![forbid(unsafe_code)]

//! Immutable address snapshots.
//!
//! A [`FormSnapshot`] is the single source of truth for what the form
//! currently displays. Every accepted edit produces a new snapshot with one
//! field replaced; nothing is ever mutated in place.
//!
//! # Invariants
//!
//! 1. `postal_code` matches `^\d{0,7}$`. The only way to replace a field is
//!    [`FormSnapshot::with_field`], which runs the [`EditGate`] first.
//! 2. Equality is structural over all five fields, including `building`.

use std::fmt;

use crate::edit_gate::{EditGate, RejectReason};

/// Number of digits in a complete postal code.
pub const POSTAL_CODE_LEN: usize = 7;

/// Identifies one of the five address fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Field {
    /// Seven-digit postal code.
    PostalCode,
    /// Prefecture name.
    Prefecture,
    /// City, ward, town or village.
    City,
    /// Street-level locality.
    Town,
    /// Building name and room number. Never affects validity.
    Building,
}

impl Field {
    /// All fields in display order.
    pub const ALL: [Field; 5] = [
        Field::PostalCode,
        Field::Prefecture,
        Field::City,
        Field::Town,
        Field::Building,
    ];

    /// Stable identifier used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Field::PostalCode => "postal_code",
            Field::Prefecture => "prefecture",
            Field::City => "city",
            Field::Town => "town",
            Field::Building => "building",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable copy of the form state at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FormSnapshot {
    postal_code: String,
    prefecture: String,
    city: String,
    town: String,
    building: String,
}

impl FormSnapshot {
    /// The empty snapshot every form starts from.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from all five fields at once.
    ///
    /// The postal code goes through the same gate as an interactive edit.
    pub fn new(
        postal_code: impl Into<String>,
        prefecture: impl Into<String>,
        city: impl Into<String>,
        town: impl Into<String>,
        building: impl Into<String>,
    ) -> Result<Self, RejectReason> {
        let postal_code = EditGate::check(Field::PostalCode, postal_code.into())?;
        Ok(Self {
            postal_code,
            prefecture: prefecture.into(),
            city: city.into(),
            town: town.into(),
            building: building.into(),
        })
    }

    /// Return a new snapshot with `field` replaced by `value`.
    ///
    /// `self` is left untouched; a rejected value yields the gate's reason.
    pub fn with_field(&self, field: Field, value: impl Into<String>) -> Result<Self, RejectReason> {
        let value = EditGate::check(field, value.into())?;
        let mut next = self.clone();
        *next.slot_mut(field) = value;
        Ok(next)
    }

    /// Read a field by identifier.
    #[must_use]
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::PostalCode => &self.postal_code,
            Field::Prefecture => &self.prefecture,
            Field::City => &self.city,
            Field::Town => &self.town,
            Field::Building => &self.building,
        }
    }

    #[must_use]
    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    #[must_use]
    pub fn prefecture(&self) -> &str {
        &self.prefecture
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    #[must_use]
    pub fn town(&self) -> &str {
        &self.town
    }

    #[must_use]
    pub fn building(&self) -> &str {
        &self.building
    }

    /// Whether every field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|&f| self.get(f).is_empty())
    }

    fn slot_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::PostalCode => &mut self.postal_code,
            Field::Prefecture => &mut self.prefecture,
            Field::City => &mut self.city,
            Field::Town => &mut self.town,
            Field::Building => &mut self.building,
        }
    }
}

// Deserialization re-runs the gate so a hand-written document cannot smuggle
// in a malformed postal code.
#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for FormSnapshot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        struct Raw {
            #[serde(default)]
            postal_code: String,
            #[serde(default)]
            prefecture: String,
            #[serde(default)]
            city: String,
            #[serde(default)]
            town: String,
            #[serde(default)]
            building: String,
        }

        let raw = Raw::deserialize(deserializer)?;
        FormSnapshot::new(raw.postal_code, raw.prefecture, raw.city, raw.town, raw.building)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shinjuku() -> FormSnapshot {
        FormSnapshot::new("1600023", "東京都", "新宿区", "西新宿", "").unwrap()
    }

    #[test]
    fn empty_snapshot_has_no_content() {
        let s = FormSnapshot::empty();
        assert!(s.is_empty());
        for field in Field::ALL {
            assert_eq!(s.get(field), "");
        }
    }

    #[test]
    fn with_field_replaces_one_field_only() {
        let before = shinjuku();
        let after = before.with_field(Field::Building, "都庁 45F").unwrap();

        assert_eq!(after.building(), "都庁 45F");
        assert_eq!(after.postal_code(), before.postal_code());
        assert_eq!(after.town(), before.town());
        // Original untouched.
        assert_eq!(before.building(), "");
    }

    #[test]
    fn with_field_rejects_bad_postal_code() {
        let before = shinjuku();
        let err = before.with_field(Field::PostalCode, "12a45").unwrap_err();
        assert!(matches!(err, RejectReason::NonDigit { ch: 'a', index: 2 }));
    }

    #[test]
    fn new_rejects_overlong_postal_code() {
        let err = FormSnapshot::new("12345678", "", "", "", "").unwrap_err();
        assert_eq!(err, RejectReason::TooLong { len: 8 });
    }

    #[test]
    fn equality_includes_building() {
        let a = shinjuku();
        let b = a.with_field(Field::Building, "A棟").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, shinjuku());
    }

    #[test]
    fn field_display_matches_as_str() {
        assert_eq!(Field::PostalCode.to_string(), "postal_code");
        assert_eq!(Field::Town.to_string(), "town");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_runs_gate() {
        let ok: FormSnapshot =
            serde_json::from_str(r#"{"postal_code":"1600023","prefecture":"東京都"}"#).unwrap();
        assert_eq!(ok.prefecture(), "東京都");
        assert_eq!(ok.city(), "");

        let bad = serde_json::from_str::<FormSnapshot>(r#"{"postal_code":"16-0023"}"#);
        assert!(bad.is_err());
    }
}
