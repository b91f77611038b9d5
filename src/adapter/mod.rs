//! Boundary between the filter engine and the host runtime.
//!
//! The host hands over Arrow [`RecordBatch`]es and receives either a
//! [`BooleanArray`] selection mask or the already filtered batch. The adapter
//! owns everything evaluation needs across batches (registry, resolver,
//! catalog hosts) behind `Arc`s, so clones are cheap and can be moved to
//! worker threads.

#[cfg(feature = "datafusion")]
pub mod datafusion;

use std::{fmt, sync::Arc};

use arrow::{array::BooleanArray, compute::filter_record_batch, record_batch::RecordBatch};

use crate::{
    batch::{BatchId, ColumnBatch},
    classification::ClassificationResolver,
    error::FilterError,
    filter::{EvalContext, EvalOptions, FilterRegistry},
    logging::{filter_log, LogContext},
    mask::Mask,
    predicate::CategorySet,
};

const ADAPTER_LOG_CTX: LogContext<'static> = LogContext::component("adapter");

/// Evaluates registered filters over host batches.
#[derive(Clone)]
pub struct BatchAdapter {
    registry: Arc<FilterRegistry>,
    resolver: Option<Arc<dyn ClassificationResolver>>,
    catalog_hosts: CategorySet,
    options: EvalOptions,
}

impl fmt::Debug for BatchAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchAdapter")
            .field("filters", &self.registry.names().collect::<Vec<_>>())
            .field("resolver", &self.resolver.is_some())
            .field("catalog_hosts", &self.catalog_hosts.len())
            .field("options", &self.options)
            .finish()
    }
}

impl BatchAdapter {
    /// Adapter over `registry` with no resolver and no catalog hosts.
    #[must_use]
    pub fn new(registry: Arc<FilterRegistry>) -> Self {
        Self {
            registry,
            resolver: None,
            catalog_hosts: CategorySet::new(),
            options: EvalOptions::default(),
        }
    }

    /// Sets the classification resolver.
    #[must_use]
    pub fn with_resolver(self, resolver: Arc<dyn ClassificationResolver>) -> Self {
        Self {
            resolver: Some(resolver),
            ..self
        }
    }

    /// Sets the externally supplied catalog-host list.
    #[must_use]
    pub fn with_catalog_hosts<I, S>(self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catalog_hosts: hosts.into_iter().collect(),
            ..self
        }
    }

    /// Sets the evaluation options.
    #[must_use]
    pub fn with_options(self, options: EvalOptions) -> Self {
        Self { options, ..self }
    }

    /// Registry the adapter evaluates against.
    #[must_use]
    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.registry
    }

    /// Borrowing evaluation context for one or more batches.
    #[must_use]
    pub fn context(&self) -> EvalContext<'_> {
        let ctx = EvalContext::new(&self.registry)
            .catalog_hosts(self.catalog_hosts.iter())
            .options(self.options);
        match self.resolver.as_deref() {
            Some(resolver) => ctx.resolver(resolver),
            None => ctx,
        }
    }

    /// Evaluates `filter` over an already wrapped batch.
    pub fn evaluate_columns(&self, filter: &str, batch: &ColumnBatch) -> Result<Mask, FilterError> {
        self.context().evaluate(filter, batch)
    }

    /// Evaluates `filter` over `batch`, returning one entry per row.
    pub fn evaluate(
        &self,
        filter: &str,
        batch: &RecordBatch,
        id: impl Into<BatchId>,
    ) -> Result<BooleanArray, FilterError> {
        let columns = ColumnBatch::from_record_batch(id, batch)?;
        Ok(self.evaluate_columns(filter, &columns)?.into())
    }

    /// Evaluates `filter` over `batch` and keeps the selected rows.
    pub fn select(
        &self,
        filter: &str,
        batch: &RecordBatch,
        id: impl Into<BatchId>,
    ) -> Result<RecordBatch, FilterError> {
        let id = id.into();
        let mask = self.evaluate(filter, batch, id.clone())?;
        let selected = filter_record_batch(batch, &mask).map_err(|source| FilterError::Arrow {
            batch: id.clone(),
            source,
        })?;
        filter_log!(
            log::Level::Trace,
            ctx: ADAPTER_LOG_CTX.batch(&id),
            "batch_selected",
            "filter={} rows={} kept={}",
            filter,
            batch.num_rows(),
            selected.num_rows(),
        );
        Ok(selected)
    }
}
