use std::sync::Arc;

use crate::{Expr, ExprRef};

/// The name of a column.
pub type FieldName = Arc<str>;

/// Create a new column reference.
///
/// ## Example usage
///
/// ```
/// use sift_expr::{col, Expr};
///
/// let x = col("x");
/// assert_eq!(x.as_ref(), &Expr::Column("x".into()));
/// ```
pub fn col(name: impl Into<FieldName>) -> ExprRef {
    Arc::new(Expr::Column(name.into()))
}

/// The absolute position of each row in the physical rows of the root dataset.
///
/// Positions change meaning once a filtered view is materialized, so derived columns built on
/// this expression prevent extraction of filtered views.
pub fn row_index() -> ExprRef {
    Arc::new(Expr::RowIndex)
}
