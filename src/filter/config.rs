use once_cell::sync::Lazy;

use crate::{classification::labels, predicate::CategorySet};

static DEFAULT_EXTRAGALACTIC: Lazy<CategorySet> =
    Lazy::new(|| labels::FINK_EXTRAGALACTIC.into_iter().collect());

/// Thresholds read by the leaves of one composite filter.
///
/// Setters consume and return the configuration so overrides chain from
/// [`FilterConfig::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub(crate) brightness_threshold: f64,
    pub(crate) recency_window_days: f64,
    pub(crate) extragalactic_categories: CategorySet,
    pub(crate) sky_exclusion_deg: f64,
    pub(crate) min_real_bogus: f64,
    pub(crate) max_invalid_fraction: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            brightness_threshold: 17.0,
            recency_window_days: 5.0,
            extragalactic_categories: DEFAULT_EXTRAGALACTIC.clone(),
            sky_exclusion_deg: 15.0,
            min_real_bogus: 0.9,
            max_invalid_fraction: 0.5,
        }
    }
}

impl FilterConfig {
    /// Faintest accepted PSF magnitude (inclusive).
    #[must_use]
    pub fn with_brightness_threshold(self, brightness_threshold: f64) -> Self {
        FilterConfig {
            brightness_threshold,
            ..self
        }
    }

    /// Largest accepted `jd - jdstarthist`, in days (inclusive).
    #[must_use]
    pub fn with_recency_window_days(self, recency_window_days: f64) -> Self {
        FilterConfig {
            recency_window_days,
            ..self
        }
    }

    /// Replaces the fixed extragalactic label set.
    #[must_use]
    pub fn with_extragalactic_categories<I, S>(self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterConfig {
            extragalactic_categories: categories.into_iter().collect(),
            ..self
        }
    }

    /// Adds catalog host tags (e.g. `"Galaxy"`, `"Seyfert_1"`) to the
    /// extragalactic label set.
    #[must_use]
    pub fn with_catalog_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extragalactic_categories.extend(hosts);
        self
    }

    /// Half width, in degrees, of the galactic and ecliptic exclusion bands.
    #[must_use]
    pub fn with_sky_exclusion_deg(self, sky_exclusion_deg: f64) -> Self {
        FilterConfig {
            sky_exclusion_deg,
            ..self
        }
    }

    /// Smallest accepted real/bogus score (inclusive).
    #[must_use]
    pub fn with_min_real_bogus(self, min_real_bogus: f64) -> Self {
        FilterConfig {
            min_real_bogus,
            ..self
        }
    }

    /// Share of rows allowed to fail coordinate validation before the batch fails.
    #[must_use]
    pub fn with_max_invalid_fraction(self, max_invalid_fraction: f64) -> Self {
        FilterConfig {
            max_invalid_fraction,
            ..self
        }
    }
}

impl FilterConfig {
    /// See [`FilterConfig::with_brightness_threshold`].
    #[must_use]
    pub fn brightness_threshold(&self) -> f64 {
        self.brightness_threshold
    }

    /// See [`FilterConfig::with_recency_window_days`].
    #[must_use]
    pub fn recency_window_days(&self) -> f64 {
        self.recency_window_days
    }

    /// See [`FilterConfig::with_extragalactic_categories`].
    #[must_use]
    pub fn extragalactic_categories(&self) -> &CategorySet {
        &self.extragalactic_categories
    }

    /// See [`FilterConfig::with_sky_exclusion_deg`].
    #[must_use]
    pub fn sky_exclusion_deg(&self) -> f64 {
        self.sky_exclusion_deg
    }

    /// See [`FilterConfig::with_min_real_bogus`].
    #[must_use]
    pub fn min_real_bogus(&self) -> f64 {
        self.min_real_bogus
    }

    /// See [`FilterConfig::with_max_invalid_fraction`].
    #[must_use]
    pub fn max_invalid_fraction(&self) -> f64 {
        self.max_invalid_fraction
    }
}

/// Knobs that change how a batch is evaluated but never what it evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    pub(crate) short_circuit: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            short_circuit: true,
        }
    }
}

impl EvalOptions {
    /// Stop folding an `AND` once no row survives, or an `OR` once every row does.
    #[must_use]
    pub fn short_circuit(self, short_circuit: bool) -> Self {
        EvalOptions { short_circuit }
    }

    /// Whether short-circuiting is enabled.
    #[must_use]
    pub fn is_short_circuit(&self) -> bool {
        self.short_circuit
    }
}
