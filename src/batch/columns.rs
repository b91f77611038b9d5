//! Names of the alert attributes the filters read or derive.

/// Stable per-source identifier.
pub const OBJECT_ID: &str = "objectId";
/// Apparent PSF magnitude; lower is brighter.
pub const MAGPSF: &str = "magpsf";
/// Real-bogus score in `[0, 1]`.
pub const RB: &str = "rb";
/// Deep-learning real-bogus score in `[0, 1]`.
pub const DRB: &str = "drb";
/// Star/galaxy score in `[0, 1]`.
pub const CLASSTAR: &str = "classtar";
/// Right ascension, degrees.
pub const RA: &str = "ra";
/// Declination, degrees.
pub const DEC: &str = "dec";
/// Julian date of the detection.
pub const JD: &str = "jd";
/// Julian date of the first detection in the history.
pub const JDSTARTHIST: &str = "jdstarthist";
/// Number of prior detections.
pub const NDETHIST: &str = "ndethist";
/// Solar-system object tag.
pub const ROID: &str = "roid";
/// Microlensing score.
pub const MULENS: &str = "mulens";
/// SuperNNova Ia vs non-Ia score.
pub const SNN_SNIA_VS_NONIA: &str = "snn_snia_vs_nonia";
/// SuperNNova SN vs all score.
pub const SNN_SN_VS_ALL: &str = "snn_sn_vs_all";
/// Random-forest early Ia score.
pub const RF_SNIA_VS_NONIA: &str = "rf_snia_vs_nonia";
/// Random-forest kilonova score.
pub const RF_KN_VS_NONKN: &str = "rf_kn_vs_nonkn";
/// CDS cross-match tag.
pub const CDSXMATCH: &str = "cdsxmatch";
/// Satellite tracklet tag.
pub const TRACKLET: &str = "tracklet";
/// SPICY catalog row id, `-1` when unmatched.
pub const SPICY_ID: &str = "spicy_id";

/// Derived galactic latitude, degrees.
pub const GALACTIC_LATITUDE: &str = "b";
/// Derived ecliptic latitude, degrees.
pub const ECLIPTIC_LATITUDE: &str = "lat";
/// Derived classification label.
pub const CLASSIFICATION: &str = "classification";

/// `roid` value ZTF assigns to confirmed solar-system candidates.
pub const ROID_SSO_CANDIDATE: i64 = 3;
/// `spicy_id` value meaning "no catalog match".
pub const SPICY_NO_MATCH: f64 = -1.0;
