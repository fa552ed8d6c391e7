use sift_error::SiftResult;
use sift_mask::Mask;

use crate::View;
use crate::view::ViewSource;

impl View {
    /// The number of rows surviving every filter on the chain.
    pub fn len(&self) -> SiftResult<usize> {
        match self.source() {
            ViewSource::Root(dataset) => Ok(dataset.row_count()),
            ViewSource::Filtered { .. } => Ok(self.selection()?.true_count()),
        }
    }

    pub fn is_empty(&self) -> SiftResult<bool> {
        Ok(self.len()? == 0)
    }

    /// The number of rows of the immediate parent, or [`View::len`] for an unfiltered view.
    pub fn length_unfiltered(&self) -> SiftResult<usize> {
        match self.parent() {
            None => self.len(),
            Some(parent) => parent.len(),
        }
    }

    /// The number of physical rows in the root dataset.
    pub fn length_original(&self) -> usize {
        self.root_dataset().row_count()
    }

    /// Whether any filter is applied on the chain.
    pub fn is_filtered(&self) -> bool {
        matches!(self.source(), ViewSource::Filtered { .. })
    }

    /// The rows of the root dataset selected by this view.
    ///
    /// The mask has [`View::length_original`] entries, of which [`View::len`] are set.
    pub fn row_selection(&self) -> SiftResult<Mask> {
        match self.parent() {
            None => self.selection(),
            Some(parent) => Ok(parent.row_selection()?.intersect_by_rank(&self.selection()?)),
        }
    }
}
