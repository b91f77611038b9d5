//! Registered filters as DataFusion scalar functions.
//!
//! The function takes the filter's input columns as positional arguments,
//! in [`FilterRegistry::required_columns`] order, and returns a non-null
//! Boolean column, so a filter can be used directly in a `WHERE` clause.

use std::{
    any::Any,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use arrow::datatypes::DataType;
use ::datafusion::{
    common::ScalarValue,
    error::{DataFusionError, Result},
    logical_expr::{ColumnarValue, ScalarUDF, ScalarUDFImpl, Signature, Volatility},
};

use super::BatchAdapter;
use crate::{batch::ColumnBatch, filter::FilterRegistry};

/// DataFusion implementation of one registered filter.
#[derive(Debug)]
pub struct FilterUdf {
    name: String,
    filter: String,
    columns: Vec<Arc<str>>,
    signature: Signature,
    adapter: BatchAdapter,
    invocations: AtomicU64,
}

impl FilterUdf {
    /// Wraps `filter` from the adapter's registry.
    ///
    /// Fails with [`DataFusionError::Plan`] when the filter is not registered.
    pub fn try_new(adapter: BatchAdapter, filter: &str) -> Result<Self> {
        let columns = adapter
            .registry()
            .required_columns(filter)
            .ok_or_else(|| DataFusionError::Plan(format!("unknown filter `{filter}`")))?;
        Ok(Self {
            name: filter.to_string(),
            filter: filter.to_string(),
            signature: Signature::any(columns.len(), Volatility::Immutable),
            columns,
            adapter,
            invocations: AtomicU64::new(0),
        })
    }

    /// Registers the function under `name` instead of the filter name.
    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Columns expected as positional arguments.
    #[must_use]
    pub fn columns(&self) -> &[Arc<str>] {
        &self.columns
    }

    /// Wraps the function as a [`ScalarUDF`].
    #[must_use]
    pub fn into_udf(self) -> ScalarUDF {
        ScalarUDF::new_from_impl(self)
    }
}

impl ScalarUDFImpl for FilterUdf {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn return_type(&self, _arg_types: &[DataType]) -> Result<DataType> {
        Ok(DataType::Boolean)
    }

    fn invoke(&self, args: &[ColumnarValue]) -> Result<ColumnarValue> {
        if args.len() != self.columns.len() {
            return Err(DataFusionError::Execution(format!(
                "{} expects {} arguments, got {}",
                self.name,
                self.columns.len(),
                args.len()
            )));
        }
        // All-scalar arguments arrive as one-row arrays and answer with a scalar.
        let scalar = args
            .iter()
            .all(|arg| matches!(arg, ColumnarValue::Scalar(_)));
        let arrays = ColumnarValue::values_to_arrays(args)?;
        let sequence = self.invocations.fetch_add(1, Ordering::Relaxed);
        let batch = ColumnBatch::try_new(
            format!("{}#{sequence}", self.name),
            self.columns.iter().cloned().zip(arrays),
        )
        .map_err(|err| DataFusionError::External(Box::new(err)))?;
        let mask = self
            .adapter
            .evaluate_columns(&self.filter, &batch)
            .map_err(|err| DataFusionError::External(Box::new(err)))?;
        if scalar {
            return Ok(ColumnarValue::Scalar(ScalarValue::Boolean(Some(
                mask.true_count() > 0,
            ))));
        }
        Ok(ColumnarValue::Array(Arc::new(arrow::array::BooleanArray::from(
            mask,
        ))))
    }
}

/// One [`ScalarUDF`] per registered filter, named after the filter.
pub fn filter_udfs(adapter: &BatchAdapter) -> Result<Vec<ScalarUDF>> {
    let registry: &FilterRegistry = adapter.registry();
    registry
        .names()
        .map(|name| FilterUdf::try_new(adapter.clone(), name).map(FilterUdf::into_udf))
        .collect()
}
