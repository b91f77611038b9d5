//! Contract with the external classification resolver.
//!
//! The resolver turns the per-alert classifier scores into one label per
//! alert. Its precedence rules live outside this crate; filters only test the
//! returned labels against accepted category sets.

pub mod labels;

use std::{fmt, sync::Arc};

use arrow::array::{Array, ArrayRef, StringArray};

use crate::{
    batch::{columns, BatchId, ColumnBatch},
    error::{FilterError, SchemaError},
    logging::{filter_log, LogContext},
};

const RESOLVER_LOG_CTX: LogContext<'static> = LogContext::component("resolver");

/// Error reported by a resolver implementation. Propagated unchanged.
pub type ResolverError = Box<dyn std::error::Error + Send + Sync>;

/// Score columns handed to the resolver, in this order.
pub const SCORE_COLUMNS: [&str; 13] = [
    columns::CDSXMATCH,
    columns::ROID,
    columns::MULENS,
    columns::SNN_SNIA_VS_NONIA,
    columns::SNN_SN_VS_ALL,
    columns::RF_SNIA_VS_NONIA,
    columns::NDETHIST,
    columns::DRB,
    columns::CLASSTAR,
    columns::JD,
    columns::JDSTARTHIST,
    columns::RF_KN_VS_NONKN,
    columns::TRACKLET,
];

/// Borrowed view over the score columns of one batch.
#[derive(Clone, Debug)]
pub struct ScoreColumns<'a> {
    batch: &'a BatchId,
    num_rows: usize,
    columns: Vec<(&'static str, &'a ArrayRef)>,
}

impl<'a> ScoreColumns<'a> {
    /// Collects every entry of [`SCORE_COLUMNS`] from `batch`.
    pub fn from_batch(batch: &'a ColumnBatch) -> Result<Self, SchemaError> {
        let mut columns = Vec::with_capacity(SCORE_COLUMNS.len());
        for name in SCORE_COLUMNS {
            columns.push((name, batch.column(name)?));
        }
        Ok(Self {
            batch: batch.id(),
            num_rows: batch.num_rows(),
            columns,
        })
    }

    /// Identifier of the batch being classified.
    #[must_use]
    pub fn batch_id(&self) -> &BatchId {
        self.batch
    }

    /// Number of alerts to classify.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Looks up a score column by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a ArrayRef> {
        self.columns
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, array)| *array)
    }

    /// Iterates over `(name, column)` pairs in [`SCORE_COLUMNS`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'a ArrayRef)> + '_ {
        self.columns.iter().copied()
    }
}

/// Produces one classification label per alert.
///
/// Implementations must be deterministic, total (every row gets a label,
/// falling back to a catch-all such as [`labels::UNKNOWN`]) and free of side
/// effects. A null label is treated as missing and never matches a category.
pub trait ClassificationResolver: Send + Sync {
    /// Classifies every alert described by `scores`.
    fn resolve(&self, scores: &ScoreColumns<'_>) -> Result<StringArray, ResolverError>;
}

impl<R> ClassificationResolver for Arc<R>
where
    R: ClassificationResolver + ?Sized,
{
    fn resolve(&self, scores: &ScoreColumns<'_>) -> Result<StringArray, ResolverError> {
        self.as_ref().resolve(scores)
    }
}

/// Resolver backed by a closure; handy for host glue and test stubs.
pub struct FnResolver<F>(F);

impl<F> FnResolver<F>
where
    F: Fn(&ScoreColumns<'_>) -> Result<StringArray, ResolverError> + Send + Sync,
{
    /// Wraps `resolve` as a [`ClassificationResolver`].
    pub fn new(resolve: F) -> Self {
        Self(resolve)
    }
}

impl<F> ClassificationResolver for FnResolver<F>
where
    F: Fn(&ScoreColumns<'_>) -> Result<StringArray, ResolverError> + Send + Sync,
{
    fn resolve(&self, scores: &ScoreColumns<'_>) -> Result<StringArray, ResolverError> {
        (self.0)(scores)
    }
}

impl<F> fmt::Debug for FnResolver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver").finish_non_exhaustive()
    }
}

/// Runs `resolver` over `batch` and checks the shape of its answer.
pub fn resolve_labels(
    resolver: &dyn ClassificationResolver,
    batch: &ColumnBatch,
) -> Result<StringArray, FilterError> {
    let scores = ScoreColumns::from_batch(batch)?;
    let labels = resolver
        .resolve(&scores)
        .map_err(|source| FilterError::Resolver {
            batch: batch.id().clone(),
            source,
        })?;
    if labels.len() != batch.num_rows() {
        return Err(SchemaError::ResolverOutputLength {
            batch: batch.id().clone(),
            expected: batch.num_rows(),
            actual: labels.len(),
        }
        .into());
    }
    filter_log!(
        log::Level::Trace,
        ctx: RESOLVER_LOG_CTX.batch(batch.id()),
        "labels_resolved",
        "rows={} null_labels={}",
        labels.len(),
        labels.null_count(),
    );
    Ok(labels)
}
