use arrow::{datatypes::DataType, error::ArrowError};

use crate::{batch::BatchId, classification::ResolverError};

/// Structural problems with a batch. Evaluation of the whole batch aborts.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Two columns of one batch disagree on their row count.
    #[error("batch {batch}: column `{column}` has {actual} rows, expected {expected}")]
    LengthMismatch {
        /// Batch the column belongs to.
        batch: BatchId,
        /// Offending column.
        column: String,
        /// Row count of the batch.
        expected: usize,
        /// Row count of the offending column.
        actual: usize,
    },
    /// A predicate referenced a column the batch does not carry.
    #[error("batch {batch}: missing column `{column}`")]
    MissingColumn {
        /// Batch that was evaluated.
        batch: BatchId,
        /// Name of the absent column.
        column: String,
    },
    /// A column name appears twice, or a derived column would shadow an input column.
    #[error("batch {batch}: duplicate column `{column}`")]
    DuplicateColumn {
        /// Batch that was built.
        batch: BatchId,
        /// Name that was already taken.
        column: String,
    },
    /// A column has an Arrow type the predicate cannot read.
    #[error("batch {batch}: column `{column}` has type {actual:?}, expected {expected}")]
    UnsupportedType {
        /// Batch that was evaluated.
        batch: BatchId,
        /// Offending column.
        column: String,
        /// Human readable description of the accepted types.
        expected: &'static str,
        /// Arrow type found in the batch.
        actual: DataType,
    },
    /// The classification resolver returned a label column of the wrong length.
    #[error("batch {batch}: resolver returned {actual} labels for {expected} rows")]
    ResolverOutputLength {
        /// Batch that was classified.
        batch: BatchId,
        /// Row count of the batch.
        expected: usize,
        /// Number of labels returned.
        actual: usize,
    },
    /// Too many rows failed domain validation for the batch to be trusted.
    #[error(
        "batch {batch}: {invalid} of {total} rows failed validation (max fraction {max_fraction}); first: {first}"
    )]
    TooManyInvalidRows {
        /// Batch that was validated.
        batch: BatchId,
        /// Number of rejected rows.
        invalid: usize,
        /// Row count of the batch.
        total: usize,
        /// Configured tolerance.
        max_fraction: f64,
        /// First rejected row, for diagnostics.
        first: ValidationError,
    },
}

impl SchemaError {
    /// Identifier of the batch the error was raised for.
    #[must_use]
    pub fn batch(&self) -> &BatchId {
        match self {
            SchemaError::LengthMismatch { batch, .. }
            | SchemaError::MissingColumn { batch, .. }
            | SchemaError::DuplicateColumn { batch, .. }
            | SchemaError::UnsupportedType { batch, .. }
            | SchemaError::ResolverOutputLength { batch, .. }
            | SchemaError::TooManyInvalidRows { batch, .. } => batch,
        }
    }
}

/// A single value outside its documented domain.
///
/// Rows raising this error are rejected (their mask entry is `false`); the
/// batch only fails when too many rows are rejected, see
/// [`SchemaError::TooManyInvalidRows`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("batch {batch}: row {row}: {column}={value} outside {domain}")]
pub struct ValidationError {
    /// Batch the row belongs to.
    pub batch: BatchId,
    /// Row index inside the batch.
    pub row: usize,
    /// Column holding the value.
    pub column: &'static str,
    /// Rejected value.
    pub value: f64,
    /// Accepted interval, in interval notation.
    pub domain: &'static str,
}

/// Composite filters referencing each other in a loop.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("composition cycle: {}", path.join(" -> "))]
pub struct CompositionCycleError {
    /// Filter names along the cycle, first and last entries are equal.
    pub path: Vec<String>,
}

/// Failure to register a composite filter.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Registration would introduce a cycle.
    #[error(transparent)]
    Cycle(#[from] CompositionCycleError),
    /// A filter references a name that is not registered.
    #[error("filter `{filter}` references unknown filter `{reference}`")]
    UnknownReference {
        /// Filter being registered.
        filter: String,
        /// Missing dependency.
        reference: String,
    },
    /// Filters must be named.
    #[error("filter names must not be empty")]
    EmptyName,
}

/// Error returned by filter evaluation.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// Batch structure error.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Registration error.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Evaluation requested for a filter nobody registered.
    #[error("batch {batch}: unknown filter `{name}`")]
    UnknownFilter {
        /// Batch that was evaluated.
        batch: BatchId,
        /// Requested filter.
        name: String,
    },
    /// A filter needs classification labels but the batch has none and no resolver is set.
    #[error("batch {batch}: classification labels required but no resolver is configured")]
    ResolverUnavailable {
        /// Batch that was evaluated.
        batch: BatchId,
    },
    /// The external classification resolver failed.
    #[error("batch {batch}: classification resolver failed: {source}")]
    Resolver {
        /// Batch that was classified.
        batch: BatchId,
        /// Error reported by the resolver, untouched.
        #[source]
        source: ResolverError,
    },
    /// An Arrow kernel rejected its input.
    #[error("batch {batch}: arrow error: {source}")]
    Arrow {
        /// Batch that was evaluated.
        batch: BatchId,
        /// Underlying kernel error.
        #[source]
        source: ArrowError,
    },
}

impl FilterError {
    /// Identifier of the batch the error was raised for, when there is one.
    #[must_use]
    pub fn batch(&self) -> Option<&BatchId> {
        match self {
            FilterError::Schema(err) => Some(err.batch()),
            FilterError::Registry(_) => None,
            FilterError::UnknownFilter { batch, .. }
            | FilterError::ResolverUnavailable { batch }
            | FilterError::Resolver { batch, .. }
            | FilterError::Arrow { batch, .. } => Some(batch),
        }
    }
}
