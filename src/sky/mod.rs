//! Equatorial to galactic / ecliptic latitude transforms.
//!
//! Both transforms are fixed rotations of the unit vector pointing at
//! `(ra, dec)`; only the latitude (the third component after rotation) is
//! needed by the filters.

use arrow::array::{Array, Float64Array, Float64Builder};

use crate::{
    batch::{columns, BatchId},
    error::{SchemaError, ValidationError},
    logging::{filter_log, LogContext},
};

const SKY_LOG_CTX: LogContext<'static> = LogContext::component("sky");

/// ICRS to galactic rotation matrix (Hipparcos, ESA 1997, vol. 1 §1.5.3).
pub const ICRS_TO_GALACTIC: [[f64; 3]; 3] = [
    [-0.054_875_560_416_215_4, -0.873_437_090_234_885, -0.483_835_015_548_713_2],
    [0.494_109_427_875_583_7, -0.444_829_629_960_011_2, 0.746_982_244_497_218_9],
    [-0.867_666_149_019_004_7, -0.198_076_373_431_201_5, 0.455_983_776_175_066_9],
];

/// Mean obliquity of the ecliptic at J2000 (IAU 2006), degrees.
pub const J2000_OBLIQUITY_DEG: f64 = 84_381.406 / 3_600.0;

const RA_DOMAIN: &str = "[0, 360)";
const DEC_DOMAIN: &str = "[-90, 90]";

fn unit_vector(ra_deg: f64, dec_deg: f64) -> [f64; 3] {
    let (sin_ra, cos_ra) = ra_deg.to_radians().sin_cos();
    let (sin_dec, cos_dec) = dec_deg.to_radians().sin_cos();
    [cos_dec * cos_ra, cos_dec * sin_ra, sin_dec]
}

fn latitude_from_z(z: f64) -> f64 {
    z.clamp(-1.0, 1.0).asin().to_degrees()
}

/// Galactic latitude `b` in degrees for an ICRS position.
#[must_use]
pub fn galactic_latitude(ra_deg: f64, dec_deg: f64) -> f64 {
    let v = unit_vector(ra_deg, dec_deg);
    let row = ICRS_TO_GALACTIC[2];
    latitude_from_z(row[0] * v[0] + row[1] * v[1] + row[2] * v[2])
}

/// Geocentric mean ecliptic latitude (J2000) in degrees.
#[must_use]
pub fn ecliptic_latitude(ra_deg: f64, dec_deg: f64) -> f64 {
    let v = unit_vector(ra_deg, dec_deg);
    let (sin_eps, cos_eps) = J2000_OBLIQUITY_DEG.to_radians().sin_cos();
    latitude_from_z(cos_eps * v[2] - sin_eps * v[1])
}

/// Checks that a position lies in `ra ∈ [0, 360)`, `dec ∈ [-90, 90]`.
pub fn validate_equatorial(
    batch: &BatchId,
    row: usize,
    ra_deg: f64,
    dec_deg: f64,
) -> Result<(), ValidationError> {
    if !(0.0..360.0).contains(&ra_deg) {
        return Err(ValidationError {
            batch: batch.clone(),
            row,
            column: columns::RA,
            value: ra_deg,
            domain: RA_DOMAIN,
        });
    }
    if !(-90.0..=90.0).contains(&dec_deg) {
        return Err(ValidationError {
            batch: batch.clone(),
            row,
            column: columns::DEC,
            value: dec_deg,
            domain: DEC_DOMAIN,
        });
    }
    Ok(())
}

/// Latitudes derived for a whole batch.
#[derive(Clone, Debug)]
pub struct SkyLatitudes {
    /// Galactic latitude per row; null where the input was missing or invalid.
    pub galactic: Float64Array,
    /// Ecliptic latitude per row; null where the input was missing or invalid.
    pub ecliptic: Float64Array,
    /// Rows rejected by [`validate_equatorial`].
    pub rejected: usize,
    /// First rejected row, if any.
    pub first_rejection: Option<ValidationError>,
}

/// Derives galactic and ecliptic latitude for every row.
///
/// Missing inputs (null or `NaN`) yield null latitudes. Out-of-domain inputs
/// are rejected the same way and counted; when the rejected share exceeds
/// `max_invalid_fraction` the batch fails with
/// [`SchemaError::TooManyInvalidRows`].
pub fn derive_latitudes(
    batch: &BatchId,
    ra: &Float64Array,
    dec: &Float64Array,
    max_invalid_fraction: f64,
) -> Result<SkyLatitudes, SchemaError> {
    if ra.len() != dec.len() {
        return Err(SchemaError::LengthMismatch {
            batch: batch.clone(),
            column: columns::DEC.to_string(),
            expected: ra.len(),
            actual: dec.len(),
        });
    }

    let total = ra.len();
    let mut galactic = Float64Builder::with_capacity(total);
    let mut ecliptic = Float64Builder::with_capacity(total);
    let mut rejected = 0usize;
    let mut first_rejection = None;

    for row in 0..total {
        if ra.is_null(row) || dec.is_null(row) {
            galactic.append_null();
            ecliptic.append_null();
            continue;
        }
        let (ra_deg, dec_deg) = (ra.value(row), dec.value(row));
        if ra_deg.is_nan() || dec_deg.is_nan() {
            galactic.append_null();
            ecliptic.append_null();
            continue;
        }
        if let Err(err) = validate_equatorial(batch, row, ra_deg, dec_deg) {
            rejected += 1;
            first_rejection.get_or_insert(err);
            galactic.append_null();
            ecliptic.append_null();
            continue;
        }
        galactic.append_value(galactic_latitude(ra_deg, dec_deg));
        ecliptic.append_value(ecliptic_latitude(ra_deg, dec_deg));
    }

    if let Some(first) = &first_rejection {
        let fraction = rejected as f64 / total as f64;
        if fraction > max_invalid_fraction {
            filter_log!(
                log::Level::Warn,
                ctx: SKY_LOG_CTX.batch(batch),
                "invalid_rows_escalated",
                "invalid={} total={} max_fraction={}",
                rejected,
                total,
                max_invalid_fraction,
            );
            return Err(SchemaError::TooManyInvalidRows {
                batch: batch.clone(),
                invalid: rejected,
                total,
                max_fraction: max_invalid_fraction,
                first: first.clone(),
            });
        }
        filter_log!(
            log::Level::Debug,
            ctx: SKY_LOG_CTX.batch(batch),
            "invalid_rows_rejected",
            "invalid={} total={} first_row={}",
            rejected,
            total,
            first.row,
        );
    }

    Ok(SkyLatitudes {
        galactic: galactic.finish(),
        ecliptic: ecliptic.finish(),
        rejected,
        first_rejection,
    })
}
