use arrow::{
    array::{Array, BooleanArray},
    buffer::BooleanBuffer,
};

/// Selection mask: one definite `true`/`false` per alert, in batch order.
///
/// A mask never contains nulls. Unknown results collapse to `false` when the
/// mask is built, so an alert with unknown data is never selected.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask(BooleanArray);

impl Mask {
    /// Builds a mask from a kernel result, mapping null entries to `false`.
    #[must_use]
    pub fn from_nullable(array: &BooleanArray) -> Self {
        let values = match array.nulls() {
            Some(nulls) => array.values() & nulls.inner(),
            None => array.values().clone(),
        };
        Self::from_buffer(values)
    }

    /// Builds a mask from a bit buffer.
    #[must_use]
    pub fn from_buffer(values: BooleanBuffer) -> Self {
        Self(BooleanArray::new(values, None))
    }

    /// Mask of `len` entries, all equal to `value`.
    #[must_use]
    pub fn splat(len: usize, value: bool) -> Self {
        if value {
            Self::from_buffer(BooleanBuffer::new_set(len))
        } else {
            Self::from_buffer(BooleanBuffer::new_unset(len))
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for a mask over an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of selected alerts.
    #[must_use]
    pub fn true_count(&self) -> usize {
        self.0.true_count()
    }

    /// Returns true when no alert is selected.
    #[must_use]
    pub fn none_selected(&self) -> bool {
        self.true_count() == 0
    }

    /// Returns true when every alert is selected.
    #[must_use]
    pub fn all_selected(&self) -> bool {
        self.true_count() == self.len()
    }

    /// Entry for row `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of bounds.
    #[must_use]
    pub fn value(&self, index: usize) -> bool {
        self.0.value(index)
    }

    /// Iterates over the entries in row order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.values().iter()
    }

    /// Collects the entries into a vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<bool> {
        self.iter().collect()
    }

    /// Underlying bit buffer.
    #[must_use]
    pub fn buffer(&self) -> &BooleanBuffer {
        self.0.values()
    }

    /// Borrowed view as an Arrow array.
    #[must_use]
    pub fn as_array(&self) -> &BooleanArray {
        &self.0
    }

    /// Elementwise conjunction.
    ///
    /// # Panics
    ///
    /// Panics when the masks differ in length.
    #[must_use]
    pub fn and(&self, other: &Mask) -> Mask {
        Self::from_buffer(self.buffer() & other.buffer())
    }

    /// Elementwise disjunction.
    ///
    /// # Panics
    ///
    /// Panics when the masks differ in length.
    #[must_use]
    pub fn or(&self, other: &Mask) -> Mask {
        Self::from_buffer(self.buffer() | other.buffer())
    }

    /// Elementwise complement.
    #[must_use]
    pub fn negate(&self) -> Mask {
        Self::from_buffer(!self.buffer())
    }
}

impl From<Vec<bool>> for Mask {
    fn from(values: Vec<bool>) -> Self {
        Self::from_buffer(BooleanBuffer::from(values))
    }
}

impl From<Mask> for BooleanArray {
    fn from(mask: Mask) -> Self {
        mask.0
    }
}
