//! Filtered views over immutable columnar datasets.
//!
//! A [`View`] is either a [`Dataset`] or a parent view plus a filter expression. Filtering never
//! copies data: the selection of a view is a [`sift_mask::Mask`] over its parent's rows, computed
//! on first use and shared through a [`MaskCache`] by every view with the same parent and filter.
//! [`View::extract`] materializes a filtered view into a new, physically trimmed root.

mod cache;
mod column;
mod dataset;
mod extract;
mod length;
mod view;

pub use cache::*;
pub use column::*;
pub use dataset::*;
pub use view::*;
