//! Column batches: the unit of data every filter operates on.
//!
//! A [`ColumnBatch`] is an ordered set of named Arrow arrays that share one
//! row count. Row `i` of every column describes the same alert. Batches are
//! immutable: derived columns are attached with [`ColumnBatch::with_column`],
//! which returns a new batch and refuses to shadow an existing column.

pub mod columns;

use std::{fmt, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, AsArray, Float64Array, Int64Array, StringArray},
    compute::cast,
    datatypes::{DataType, Float64Type, Int64Type},
    record_batch::RecordBatch,
};

use crate::error::SchemaError;

/// Identifier attached to a batch and to every error raised while evaluating it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(Arc<str>);

impl BatchId {
    /// Creates an identifier from any string-like value.
    #[must_use]
    pub fn new<S>(id: S) -> Self
    where
        S: Into<Arc<str>>,
    {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BatchId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BatchId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<u64> for BatchId {
    fn from(value: u64) -> Self {
        Self::new(value.to_string())
    }
}

/// Physical family a predicate expects from a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnKind {
    /// Any Arrow integer or floating point type.
    Numeric,
    /// `Utf8`, `LargeUtf8` or a dictionary of either.
    Utf8,
    /// Any type; only validity is inspected.
    Any,
}

impl ColumnKind {
    fn describe(self) -> &'static str {
        match self {
            ColumnKind::Numeric => "an integer or float type",
            ColumnKind::Utf8 => "a utf8 string type",
            ColumnKind::Any => "any type",
        }
    }

    /// Returns true when `data_type` can be read as this kind.
    #[must_use]
    pub fn accepts(self, data_type: &DataType) -> bool {
        match self {
            ColumnKind::Numeric => data_type.is_integer() || data_type.is_floating(),
            ColumnKind::Utf8 => match data_type {
                DataType::Utf8 | DataType::LargeUtf8 => true,
                DataType::Dictionary(_, value) => {
                    matches!(value.as_ref(), DataType::Utf8 | DataType::LargeUtf8)
                }
                _ => false,
            },
            ColumnKind::Any => true,
        }
    }
}

/// Batch of alerts in column-oriented form.
#[derive(Clone, Debug)]
pub struct ColumnBatch {
    id: BatchId,
    num_rows: usize,
    columns: Vec<(Arc<str>, ArrayRef)>,
}

impl ColumnBatch {
    /// Builds a batch from named columns.
    ///
    /// The row count is taken from the first column; an empty column list
    /// yields an empty batch.
    pub fn try_new<I, N>(id: impl Into<BatchId>, columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (N, ArrayRef)>,
        N: Into<Arc<str>>,
    {
        Self::build(id.into(), None, columns)
    }

    /// Builds a batch with an explicit row count, which every column must match.
    pub fn try_with_rows<I, N>(
        id: impl Into<BatchId>,
        num_rows: usize,
        columns: I,
    ) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (N, ArrayRef)>,
        N: Into<Arc<str>>,
    {
        Self::build(id.into(), Some(num_rows), columns)
    }

    /// Wraps an Arrow record batch, using its field names as column names.
    pub fn from_record_batch(
        id: impl Into<BatchId>,
        batch: &RecordBatch,
    ) -> Result<Self, SchemaError> {
        let schema = batch.schema();
        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| (field.name().as_str(), Arc::clone(array)));
        Self::build(id.into(), Some(batch.num_rows()), columns)
    }

    fn build<I, N>(id: BatchId, num_rows: Option<usize>, columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (N, ArrayRef)>,
        N: Into<Arc<str>>,
    {
        let mut out: Vec<(Arc<str>, ArrayRef)> = Vec::new();
        let mut expected = num_rows;
        for (name, array) in columns {
            let name = name.into();
            if out.iter().any(|(existing, _)| *existing == name) {
                return Err(SchemaError::DuplicateColumn {
                    batch: id,
                    column: name.to_string(),
                });
            }
            match expected {
                Some(rows) if rows != array.len() => {
                    return Err(SchemaError::LengthMismatch {
                        batch: id,
                        column: name.to_string(),
                        expected: rows,
                        actual: array.len(),
                    });
                }
                Some(_) => {}
                None => expected = Some(array.len()),
            }
            out.push((name, array));
        }
        Ok(Self {
            id,
            num_rows: expected.unwrap_or(0),
            columns: out,
        })
    }

    /// Identifier of this batch.
    #[must_use]
    pub fn id(&self) -> &BatchId {
        &self.id
    }

    /// Number of alerts in the batch.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Returns true when the batch holds no alerts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_ref())
    }

    /// Returns true when the batch carries a column with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(column, _)| column.as_ref() == name)
    }

    /// Returns a new batch with `array` attached as column `name`.
    ///
    /// Existing columns are shared, never copied or overwritten.
    pub fn with_column(
        &self,
        name: impl Into<Arc<str>>,
        array: ArrayRef,
    ) -> Result<ColumnBatch, SchemaError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(SchemaError::DuplicateColumn {
                batch: self.id.clone(),
                column: name.to_string(),
            });
        }
        if array.len() != self.num_rows {
            return Err(SchemaError::LengthMismatch {
                batch: self.id.clone(),
                column: name.to_string(),
                expected: self.num_rows,
                actual: array.len(),
            });
        }
        let mut columns = self.columns.clone();
        columns.push((name, array));
        Ok(Self {
            id: self.id.clone(),
            num_rows: self.num_rows,
            columns,
        })
    }

    /// Raw access to a column.
    pub fn column(&self, name: &str) -> Result<&ArrayRef, SchemaError> {
        self.columns
            .iter()
            .find(|(column, _)| column.as_ref() == name)
            .map(|(_, array)| array)
            .ok_or_else(|| SchemaError::MissingColumn {
                batch: self.id.clone(),
                column: name.to_string(),
            })
    }

    /// Checks that `name` exists and can be read as `kind`.
    pub fn check_column(&self, name: &str, kind: ColumnKind) -> Result<(), SchemaError> {
        let array = self.column(name)?;
        if kind.accepts(array.data_type()) {
            Ok(())
        } else {
            Err(self.unsupported(name, kind, array.data_type()))
        }
    }

    /// Reads a numeric column as `f64`. Integer columns are widened.
    pub fn float64(&self, name: &str) -> Result<Float64Array, SchemaError> {
        let array = self.typed(name, ColumnKind::Numeric, &DataType::Float64)?;
        Ok(array.as_primitive::<Float64Type>().clone())
    }

    /// Reads a numeric column as `i64`.
    ///
    /// Floats are truncated toward zero; `NaN` and out-of-range values become null.
    pub fn int64(&self, name: &str) -> Result<Int64Array, SchemaError> {
        let array = self.typed(name, ColumnKind::Numeric, &DataType::Int64)?;
        Ok(array.as_primitive::<Int64Type>().clone())
    }

    /// Reads a string column as `Utf8`.
    pub fn utf8(&self, name: &str) -> Result<StringArray, SchemaError> {
        let array = self.typed(name, ColumnKind::Utf8, &DataType::Utf8)?;
        Ok(array.as_string::<i32>().clone())
    }

    fn typed(
        &self,
        name: &str,
        kind: ColumnKind,
        target: &DataType,
    ) -> Result<ArrayRef, SchemaError> {
        let array = self.column(name)?;
        if !kind.accepts(array.data_type()) {
            return Err(self.unsupported(name, kind, array.data_type()));
        }
        if array.data_type() == target {
            return Ok(Arc::clone(array));
        }
        cast(array, target).map_err(|_| self.unsupported(name, kind, array.data_type()))
    }

    fn unsupported(&self, name: &str, kind: ColumnKind, actual: &DataType) -> SchemaError {
        SchemaError::UnsupportedType {
            batch: self.id.clone(),
            column: name.to_string(),
            expected: kind.describe(),
            actual: actual.clone(),
        }
    }
}
