//! Weight extraction, normalization, and inversion (`spec.md` §4.5).

use crate::error::{Error, Result};
use crate::model::Edge;

/// How to invert a weight for algorithms that want "higher is better" to
/// mean "shorter" (or vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvertMode {
    /// `1 / w`, with `w <= 0` mapped to the maximum observed weight.
    Reciprocal,
    /// `max - w`.
    Subtract,
}

/// Extracts an edge's weight, in the order `spec.md` §4.5 specifies:
/// the explicit `weight` field if set (treated as "set" when non-zero,
/// since the field has no `Option` sentinel — a caller who never assigns a
/// weight leaves it at its `Edge::new` default of `0.0`), then
/// `data[weight_property]` if numeric, then `default_weight`.
pub fn extract(edge: &Edge, weight_property: &str, default_weight: f64) -> Result<f64> {
    let candidate = if edge.weight != 0.0 {
        edge.weight
    } else if let Some(v) = edge.data.get(weight_property).and_then(|v| v.as_f64()) {
        v
    } else {
        default_weight
    };
    if candidate < 0.0 || !candidate.is_finite() {
        return Err(Error::InvalidWeight);
    }
    Ok(candidate)
}

/// Min-max normalizes `values` into `[0, 1]`. A degenerate all-equal input
/// maps to all-zero.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Inverts a single weight given the maximum observed weight in its set.
pub fn invert(weight: f64, max: f64, mode: InvertMode) -> f64 {
    match mode {
        InvertMode::Reciprocal => {
            if weight <= 0.0 {
                max
            } else {
                1.0 / weight
            }
        }
        InvertMode::Subtract => max - weight,
    }
}
