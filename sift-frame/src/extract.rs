use std::sync::Arc;
use std::time::Instant;

use itertools::Itertools;
use rayon::prelude::*;
use sift_error::{SiftResult, sift_bail};

use crate::view::ViewSource;
use crate::{Dataset, DerivedColumn, View, ViewRef};

impl View {
    /// Materialize the rows of this view into a new, unfiltered root.
    ///
    /// Every physical column is trimmed to the selected rows, in order. Derived columns are
    /// carried over unevaluated and keep computing over the trimmed columns. The new root shares
    /// this view's [`crate::MaskCache`].
    ///
    /// Extracting a filtered view fails with an `UnsafeColumn` error, and materializes nothing,
    /// when a reachable derived column depends on row position or was declared on an already
    /// filtered view. Drop those columns first.
    pub fn extract(&self) -> SiftResult<ViewRef> {
        let start = Instant::now();
        let selection = self.row_selection()?;
        let derived = self.derived_columns();

        if self.is_filtered() {
            let unsafe_columns = derived
                .iter()
                .filter(|c| !c.survives_extraction())
                .map(|c| c.name())
                .unique()
                .collect::<Vec<_>>();
            if !unsafe_columns.is_empty() {
                sift_bail!(
                    UnsafeColumn: "Cannot extract a view with derived columns that depend on pre-filter state: {}",
                    unsafe_columns.iter().join(", ")
                );
            }
        }

        let columns = self
            .root_dataset()
            .columns()
            .par_iter()
            .map(|(name, array)| Ok((name.clone(), selection.filter_array(array)?)))
            .collect::<SiftResult<Vec<_>>>()?;
        let dataset = Dataset::try_new_with_row_count(selection.true_count(), columns)?;

        let extracted = View::new(
            ViewSource::Root(Arc::new(dataset)),
            derived.into_iter().map(DerivedColumn::rebased).collect(),
            self.cache().clone(),
        );
        log::debug!(
            "Extracted {} rows of {} from {} into {} in {}us",
            selection.true_count(),
            selection.len(),
            self.id(),
            extracted.id(),
            start.elapsed().as_micros()
        );

        Ok(Arc::new(extracted))
    }
}
