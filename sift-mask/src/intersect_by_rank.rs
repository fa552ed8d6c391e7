use sift_error::sift_panic;

use crate::{AllOr, Mask};

impl Mask {
    /// Take the intersection of the `mask` with the set of true values in `self`.
    ///
    /// `mask` is expressed over the selected rows of `self`: its `i`th value decides whether the
    /// `i`th selected row of `self` stays selected. The result has the length of `self`. This is
    /// how the selection of a nested view is lifted onto the rows of its grandparent.
    ///
    /// # Examples
    ///
    /// Keep the third and fifth set values from mask `m1`:
    /// ```
    /// use sift_mask::Mask;
    ///
    /// let m1 = Mask::from_iter([true, false, false, true, true, true, false, true]);
    /// let m2 = Mask::from_iter([false, false, true, false, true]);
    /// assert_eq!(
    ///     m1.intersect_by_rank(&m2),
    ///     Mask::from_iter([false, false, false, false, true, false, false, true])
    /// );
    /// ```
    pub fn intersect_by_rank(&self, mask: &Mask) -> Mask {
        if self.true_count() != mask.len() {
            sift_panic!(
                "mask of length {} cannot refine a mask with {} selected rows",
                mask.len(),
                self.true_count()
            );
        }

        match (self.indices(), mask.indices()) {
            (AllOr::All, _) => mask.clone(),
            (_, AllOr::All) => self.clone(),
            (AllOr::None, _) | (_, AllOr::None) => Self::new_false(self.len()),
            (AllOr::Some(self_indices), AllOr::Some(mask_indices)) => Self::from_indices(
                self.len(),
                mask_indices.iter().map(|idx| self_indices[*idx]).collect(),
            ),
        }
    }
}
