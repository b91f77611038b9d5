//! Label vocabulary produced by the classification resolver.
//!
//! Catalog cross-match tags (e.g. SIMBAD object types) are passed through by
//! the resolver as labels too; they are not enumerated here.

/// Supernova candidate.
pub const SN_CANDIDATE: &str = "SN candidate";
/// Kilonova candidate.
pub const KN_CANDIDATE: &str = "KN candidate";
/// Early type Ia supernova candidate.
pub const EARLY_SN_IA_CANDIDATE: &str = "Early SN Ia candidate";
/// Several classifiers disagree.
pub const AMBIGUOUS: &str = "Ambiguous";
/// Microlensing event candidate.
pub const MICROLENSING_CANDIDATE: &str = "Microlensing candidate";
/// Solar system object candidate.
pub const SOLAR_SYSTEM_CANDIDATE: &str = "Solar System candidate";
/// Satellite glint or tracklet.
pub const TRACKLET: &str = "Tracklet";
/// Catch-all for alerts no classifier claims.
pub const UNKNOWN: &str = "Unknown";

/// Classifier labels that count as extragalactic for the fast-transient filter.
pub const FINK_EXTRAGALACTIC: [&str; 4] = [
    KN_CANDIDATE,
    SN_CANDIDATE,
    EARLY_SN_IA_CANDIDATE,
    AMBIGUOUS,
];
