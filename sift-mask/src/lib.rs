//! A mask selects a subset of the rows of some parent, one boolean per parent row.
#![deny(missing_docs)]
mod arrow;
mod eq;
mod intersect_by_rank;

use std::sync::{Arc, OnceLock};

use arrow_buffer::{BooleanBuffer, BooleanBufferBuilder};

/// Either every row, no row, or some explicit subset of them.
#[derive(Debug, PartialEq, Eq)]
pub enum AllOr<T> {
    /// Every row is selected.
    All,
    /// No row is selected.
    None,
    /// Only the given rows are selected.
    Some(T),
}

/// A selection over the rows of a parent, where `true` means the row survives.
///
/// Uniform selections stay symbolic and never allocate. Mixed selections keep their buffer behind
/// an [`Arc`], so clones share it.
#[derive(Clone, Debug)]
pub enum Mask {
    /// Every row is selected.
    AllTrue(usize),
    /// No row is selected.
    AllFalse(usize),
    /// Some, but not all, rows are selected.
    Values(Arc<MaskValues>),
}

/// The rows picked by a mixed [`Mask`].
#[derive(Debug)]
pub struct MaskValues {
    buffer: BooleanBuffer,
    true_count: usize,
    // Composing nested selections by rank reads the positions repeatedly.
    indices: OnceLock<Vec<usize>>,
}

impl MaskValues {
    fn indices(&self) -> &[usize] {
        self.indices
            .get_or_init(|| self.buffer.set_indices().collect())
    }
}

impl Mask {
    /// Select all `len` rows.
    pub fn new_true(len: usize) -> Self {
        Self::AllTrue(len)
    }

    /// Select none of `len` rows.
    pub fn new_false(len: usize) -> Self {
        Self::AllFalse(len)
    }

    /// Select the rows whose bit is set.
    pub fn from_buffer(buffer: BooleanBuffer) -> Self {
        let len = buffer.len();
        match buffer.count_set_bits() {
            0 => Self::AllFalse(len),
            true_count if true_count == len => Self::AllTrue(len),
            true_count => Self::Values(Arc::new(MaskValues {
                buffer,
                true_count,
                indices: OnceLock::new(),
            })),
        }
    }

    /// Select the given positions out of `len` rows.
    ///
    /// `indices` must be strictly ascending and smaller than `len`.
    pub fn from_indices(len: usize, indices: Vec<usize>) -> Self {
        assert!(
            indices.windows(2).all(|w| w[0] < w[1]),
            "selected positions must be strictly ascending"
        );
        assert!(
            indices.last().is_none_or(|&idx| idx < len),
            "selected positions must be below {len}"
        );

        match indices.len() {
            0 => Self::AllFalse(len),
            true_count if true_count == len => Self::AllTrue(len),
            true_count => {
                let mut builder = BooleanBufferBuilder::new(len);
                builder.append_n(len, false);
                indices.iter().for_each(|&idx| builder.set_bit(idx, true));
                Self::Values(Arc::new(MaskValues {
                    buffer: builder.finish(),
                    true_count,
                    indices: OnceLock::from(indices),
                }))
            }
        }
    }

    /// The number of rows of the parent, selected or not.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        match self {
            Self::AllTrue(len) | Self::AllFalse(len) => *len,
            Self::Values(values) => values.buffer.len(),
        }
    }

    /// The number of selected rows.
    pub fn true_count(&self) -> usize {
        match self {
            Self::AllTrue(len) => *len,
            Self::AllFalse(_) => 0,
            Self::Values(values) => values.true_count,
        }
    }

    /// The positions of the selected rows, in ascending order.
    pub fn indices(&self) -> AllOr<&[usize]> {
        match self {
            Self::AllTrue(_) => AllOr::All,
            Self::AllFalse(_) => AllOr::None,
            Self::Values(values) => AllOr::Some(values.indices()),
        }
    }
}

impl FromIterator<bool> for Mask {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        Self::from_buffer(BooleanBuffer::from_iter(iter))
    }
}
