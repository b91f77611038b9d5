#![deny(missing_docs)]
//! Columnar, Arrow-native science filters for astronomical alert streams.
//!
//! Alerts arrive in batches of aligned Arrow columns ([`ColumnBatch`]).
//! Elementary predicates turn columns into selection [`Mask`]s, the
//! composition engine folds them into named filters held by a
//! [`FilterRegistry`], and the [`BatchAdapter`] exposes those filters to a host
//! runtime over plain `RecordBatch`es.
//!
//! ```
//! use std::sync::Arc;
//!
//! use arrow::array::{ArrayRef, Float64Array};
//! use fink_filters::{
//!     filter::{CompositeFilter, FilterBuilder},
//!     ColumnBatch, FilterRegistry,
//! };
//!
//! let mut registry = FilterRegistry::new();
//! registry
//!     .register(CompositeFilter::new(
//!         "bright_and_real",
//!         FilterBuilder::and().non_bogus().brightness().build(),
//!     ))
//!     .unwrap();
//!
//! let batch = ColumnBatch::try_new(
//!     "batch-0",
//!     [
//!         ("rb", Arc::new(Float64Array::from(vec![0.95, 0.5])) as ArrayRef),
//!         ("magpsf", Arc::new(Float64Array::from(vec![16.0, 16.0])) as ArrayRef),
//!     ],
//! )
//! .unwrap();
//!
//! let mask = registry.evaluate("bright_and_real", &batch).unwrap();
//! assert_eq!(mask.to_vec(), vec![true, false]);
//! ```

mod logging;
mod mask;

pub mod adapter;
pub mod batch;
pub mod builtin;
pub mod classification;
/// Error types.
pub mod error;
pub mod filter;
pub mod predicate;
pub mod sky;

pub use crate::{
    adapter::BatchAdapter,
    batch::{BatchId, ColumnBatch},
    classification::{ClassificationResolver, FnResolver, ScoreColumns},
    error::{
        CompositionCycleError, FilterError, RegistryError, SchemaError, ValidationError,
    },
    filter::{CompositeFilter, EvalContext, FilterConfig, FilterExpr, FilterRegistry},
    mask::Mask,
};
