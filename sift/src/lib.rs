//! Filter a columnar dataset without copying it, then materialize the result.
//!
//! ```
//! use std::sync::Arc;
//!
//! use arrow_array::{ArrayRef, Int64Array};
//! use sift::expr::{col, gt_eq, lit, lt};
//! use sift::{Dataset, View};
//!
//! let x: ArrayRef = Arc::new(Int64Array::from_iter_values(0..10));
//! let root = View::new_root(Arc::new(Dataset::try_new([("x", x)]).unwrap()));
//!
//! let small = root.filter(lt(col("x"), lit(5)));
//! assert_eq!(small.len().unwrap(), 5);
//! assert_eq!(small.length_original(), 10);
//!
//! let extracted = small.extract().unwrap();
//! assert!(!extracted.is_filtered());
//!
//! let tail = extracted.filter(gt_eq(col("x"), lit(3))).extract().unwrap();
//! assert_eq!(tail.len().unwrap(), 2);
//! assert_eq!(tail.length_original(), 2);
//! assert_eq!(tail.length_unfiltered().unwrap(), 2);
//! ```

pub use sift_frame::*;
pub use {sift_error as error, sift_expr as expr, sift_mask as mask};
