//! Elementary, vectorised alert predicates.
//!
//! Every function here is pure: it reads one or more aligned columns and
//! returns a [`Mask`] of the same length. Row `i` of the output depends only
//! on row `i` of the inputs.
//!
//! Missing data never selects an alert. Arrow nulls and float `NaN`s are both
//! treated as missing and an explicit presence mask is applied after every
//! comparison, because Arrow orders `NaN` above every other float and would
//! otherwise let `NaN >= 0.9` through.

mod category;

use std::fmt;

use arrow::{
    array::{Array, AsArray, BooleanArray, Datum, Float64Array, Int64Array},
    buffer::BooleanBuffer,
    compute::{
        cast,
        kernels::{
            cmp::{eq, gt, gt_eq, lt, lt_eq, neq},
            numeric::sub,
        },
    },
    datatypes::{DataType, Float64Type},
    error::ArrowError,
};

pub use category::{category_membership, labels_matching, CategorySet};

use crate::{batch::columns, mask::Mask};

/// Comparison operator used by threshold predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// Equals (`=`).
    Equal,
    /// Not equals (`!=`).
    NotEqual,
    /// Less than (`<`).
    LessThan,
    /// Less than or equal to (`<=`).
    LessThanOrEqual,
    /// Greater than (`>`).
    GreaterThan,
    /// Greater than or equal to (`>=`).
    GreaterThanOrEqual,
}

impl ComparisonOp {
    /// Returns a textual representation of the operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanOrEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanOrEqual => ">=",
        }
    }

    fn apply(self, lhs: &dyn Datum, rhs: &dyn Datum) -> Result<BooleanArray, ArrowError> {
        match self {
            ComparisonOp::Equal => eq(lhs, rhs),
            ComparisonOp::NotEqual => neq(lhs, rhs),
            ComparisonOp::LessThan => lt(lhs, rhs),
            ComparisonOp::LessThanOrEqual => lt_eq(lhs, rhs),
            ComparisonOp::GreaterThan => gt(lhs, rhs),
            ComparisonOp::GreaterThanOrEqual => gt_eq(lhs, rhs),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows holding a usable float: not null and not `NaN`.
#[must_use]
pub fn present(values: &Float64Array) -> Mask {
    let not_nan = BooleanBuffer::collect_bool(values.len(), |i| !values.value(i).is_nan());
    match values.nulls() {
        Some(nulls) => Mask::from_buffer(&not_nan & nulls.inner()),
        None => Mask::from_buffer(not_nan),
    }
}

/// Presence for a column of any type. Floating columns also reject `NaN`.
pub fn present_any(array: &dyn Array) -> Result<Mask, ArrowError> {
    if array.data_type().is_floating() {
        let values = cast(array, &DataType::Float64)?;
        return Ok(present(values.as_primitive::<Float64Type>()));
    }
    Ok(match array.logical_nulls() {
        Some(nulls) => Mask::from_buffer(nulls.inner().clone()),
        None => Mask::splat(array.len(), true),
    })
}

/// `values <op> rhs`, false wherever `values` is missing.
pub fn threshold(values: &Float64Array, op: ComparisonOp, rhs: f64) -> Result<Mask, ArrowError> {
    let raw = op.apply(values, &Float64Array::new_scalar(rhs))?;
    Ok(Mask::from_nullable(&raw).and(&present(values)))
}

/// Solar-system object candidates: `roid == 3`.
///
/// `roid` is an integer tag; callers truncate float encodings before comparing.
pub fn sso_candidate(roid: &Int64Array) -> Result<Mask, ArrowError> {
    let raw = eq(roid, &Int64Array::new_scalar(columns::ROID_SSO_CANDIDATE))?;
    Ok(Mask::from_nullable(&raw))
}

/// Catalog match present: `spicy_id != -1` (so `0` counts as a match).
///
/// Compared on the float view with no rounding, so `-1.5` and ids beyond the
/// `i64` range are matches. Only an exact `-1` is rejected.
pub fn catalog_match(spicy_id: &Float64Array) -> Result<Mask, ArrowError> {
    threshold(spicy_id, ComparisonOp::NotEqual, columns::SPICY_NO_MATCH)
}

/// Genuine detections: `rb >= min_rb`.
pub fn non_bogus(rb: &Float64Array, min_rb: f64) -> Result<Mask, ArrowError> {
    threshold(rb, ComparisonOp::GreaterThanOrEqual, min_rb)
}

/// Bright alerts: `magpsf <= max_magnitude`.
pub fn brightness(magpsf: &Float64Array, max_magnitude: f64) -> Result<Mask, ArrowError> {
    threshold(magpsf, ComparisonOp::LessThanOrEqual, max_magnitude)
}

/// Young transients: `jd - jdstarthist <= window_days`.
pub fn recency(
    jd: &Float64Array,
    jdstarthist: &Float64Array,
    window_days: f64,
) -> Result<Mask, ArrowError> {
    let age = sub(jd, jdstarthist)?;
    threshold(
        age.as_primitive::<Float64Type>(),
        ComparisonOp::LessThanOrEqual,
        window_days,
    )
}

/// `|latitude| > half_width_deg`, i.e. outside a band centred on a plane.
pub fn outside_band(latitude: &Float64Array, half_width_deg: f64) -> Result<Mask, ArrowError> {
    let north = threshold(latitude, ComparisonOp::GreaterThan, half_width_deg)?;
    let south = threshold(latitude, ComparisonOp::LessThan, -half_width_deg)?;
    Ok(north.or(&south))
}

/// Away from the Milky Way plane: `|b| > exclusion_deg`.
pub fn galactic_exclusion(b: &Float64Array, exclusion_deg: f64) -> Result<Mask, ArrowError> {
    outside_band(b, exclusion_deg)
}

/// Away from the ecliptic plane: `|lat| > exclusion_deg`.
pub fn ecliptic_exclusion(lat: &Float64Array, exclusion_deg: f64) -> Result<Mask, ArrowError> {
    outside_band(lat, exclusion_deg)
}
