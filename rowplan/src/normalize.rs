//! Result normalization.
//!
//! Converts an arbitrary stage-output value into its JSON-safe
//! projection: mappings and sequences are recursed, numeric buffers
//! flatten to sequences of plain numbers, geometry handles expand to
//! their GeoJSON mappings, and integer scalars unwrap to plain
//! numbers. Export must never be the reason a successful analysis is
//! lost, so anything the rules do not cover passes through unchanged
//! in an explicit fallback branch instead of raising.

use crate::value::StageValue;

/// Normalizes a stage-output value into JSON-safe form.
///
/// Total over the [`StageValue`] domain and idempotent: normalizing an
/// already-normalized value returns it unchanged. Key sets and element
/// order are preserved at every level.
#[must_use]
pub fn normalize(value: &StageValue) -> StageValue {
    match value {
        StageValue::Mapping(entries) => StageValue::Mapping(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect(),
        ),
        StageValue::Sequence(items) => {
            StageValue::Sequence(items.iter().map(normalize).collect())
        }
        StageValue::NumericArray(xs) => {
            StageValue::Sequence(xs.iter().copied().map(StageValue::Number).collect())
        }
        StageValue::Geometry(geojson) if geojson.is_object() => {
            normalize(&StageValue::from_json(geojson.clone()))
        }
        // Fallback: scalars are already JSON-safe; malformed geometry
        // payloads and non-finite numbers pass through unchanged.
        other => other.clone(),
    }
}
