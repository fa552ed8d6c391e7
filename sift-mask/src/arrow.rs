use std::ops::BitAnd;

use arrow_array::{Array, ArrayRef, BooleanArray, new_empty_array};
use arrow_schema::DataType;
use sift_error::{SiftResult, sift_bail};

use crate::Mask;

impl Mask {
    /// Converts the result of a predicate into a mask. Null values are treated as false.
    pub fn from_predicate(array: &dyn Array) -> SiftResult<Self> {
        if array.data_type() == &DataType::Null {
            return Ok(Self::new_false(array.len()));
        }

        let Some(bools) = array.as_any().downcast_ref::<BooleanArray>() else {
            sift_bail!(
                MismatchedTypes: "Boolean",
                array.data_type()
            );
        };

        let buffer = match bools.nulls() {
            None => bools.values().clone(),
            Some(nulls) => nulls.inner().bitand(bools.values()),
        };

        Ok(Self::from_buffer(buffer))
    }

    /// Return a new array holding only the rows of `array` selected by this mask, in order.
    pub fn filter_array(&self, array: &ArrayRef) -> SiftResult<ArrayRef> {
        if self.len() != array.len() {
            sift_bail!(
                "mask.len() is {}, does not equal array.len() of {}",
                self.len(),
                array.len()
            );
        }

        match self {
            // Arrow arrays are immutable, sharing the buffers is indistinguishable from a copy.
            Mask::AllTrue(_) => Ok(array.clone()),
            Mask::AllFalse(_) => Ok(new_empty_array(array.data_type())),
            Mask::Values(values) => {
                let predicate = BooleanArray::new(values.buffer.clone(), None);
                let filtered = arrow_select::filter::filter(array.as_ref(), &predicate)?;
                debug_assert_eq!(filtered.len(), values.true_count);
                Ok(filtered)
            }
        }
    }
}
