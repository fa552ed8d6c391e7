use std::sync::Arc;

use crate::{Expr, ExprRef};

/// Create a new boolean negation.
///
/// ## Example usage
///
/// ```
/// use sift_expr::{col, not};
///
/// assert_eq!(not(col("flag")).to_string(), "!$flag");
/// ```
pub fn not(child: ExprRef) -> ExprRef {
    Arc::new(Expr::Not(child))
}

/// True for the rows where `child` is null.
pub fn is_null(child: ExprRef) -> ExprRef {
    Arc::new(Expr::IsNull(child))
}
