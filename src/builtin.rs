//! Science filters shipped with the engine.

use crate::{
    error::RegistryError,
    filter::{CompositeFilter, FilterBuilder, FilterRegistry},
};

/// Solar-system object candidates flagged by ZTF.
pub const SSO_ZTF_CANDIDATES: &str = "sso_ztf_candidates";
/// Alerts matching a young stellar object of the SPICY catalog.
pub const YSO_SPICY_CANDIDATES: &str = "yso_spicy_candidates";
/// Bright, young, extragalactic transients away from the galactic and ecliptic planes.
pub const GVOM_FAST_TRANSIENTS: &str = "gvom_fast_transients";

/// Definitions of every built-in filter, with default configuration.
#[must_use]
pub fn builtin_filters() -> Vec<CompositeFilter> {
    vec![
        CompositeFilter::new(
            SSO_ZTF_CANDIDATES,
            FilterBuilder::leaf().sso_candidate().build(),
        ),
        CompositeFilter::new(
            YSO_SPICY_CANDIDATES,
            FilterBuilder::leaf().catalog_match().build(),
        ),
        CompositeFilter::new(
            GVOM_FAST_TRANSIENTS,
            FilterBuilder::and()
                .non_bogus()
                .extragalactic_category()
                .recency()
                .brightness()
                .galactic_exclusion()
                .ecliptic_exclusion()
                .build(),
        ),
    ]
}

/// Registers every built-in filter into `registry`.
pub fn register_builtins(registry: &mut FilterRegistry) -> Result<(), RegistryError> {
    for filter in builtin_filters() {
        registry.register(filter)?;
    }
    Ok(())
}

impl FilterRegistry {
    /// Registry pre-loaded with the built-in science filters.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        register_builtins(&mut registry)?;
        Ok(registry)
    }
}
