//! Expressions over the columns of a view.
//!
//! An [`Expr`] is a small tagged tree. Filters and derived columns are both expressions; the
//! tree shape lets callers inspect them statically (which columns they read, whether they depend
//! on row position) before anything is evaluated.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use itertools::Itertools;

mod binary;
mod column;
mod eval;
mod function;
mod literal;
mod operators;
pub mod traversal;
mod unary;

pub use binary::*;
pub use column::*;
pub use eval::*;
pub use function::*;
pub use literal::*;
pub use operators::*;
pub use unary::*;

pub type ExprRef = Arc<Expr>;

/// A row-wise expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A reference to a column visible from the evaluation scope.
    Column(FieldName),
    /// A constant, broadcast to the length of the scope.
    Literal(Scalar),
    /// A comparison, boolean connective or arithmetic operation.
    Binary {
        lhs: ExprRef,
        op: Operator,
        rhs: ExprRef,
    },
    /// Boolean negation.
    Not(ExprRef),
    /// True where the child is null.
    IsNull(ExprRef),
    /// A call to one of the built-in scalar functions.
    Call {
        function: Function,
        args: Vec<ExprRef>,
    },
    /// The absolute position of each row in the physical rows of the root dataset.
    RowIndex,
}

impl Expr {
    pub fn children(&self) -> Vec<&ExprRef> {
        match self {
            Expr::Column(_) | Expr::Literal(_) | Expr::RowIndex => vec![],
            Expr::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Expr::Not(child) | Expr::IsNull(child) => vec![child],
            Expr::Call { args, .. } => args.iter().collect(),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "${name}"),
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Binary { lhs, op, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expr::Not(child) => write!(f, "!{child}"),
            Expr::IsNull(child) => write!(f, "is_null({child})"),
            Expr::Call { function, args } => write!(f, "{function}({})", args.iter().format(", ")),
            Expr::RowIndex => write!(f, "row_index()"),
        }
    }
}

/// Combines predicates with `and`, left to right. Returns `None` when there are none.
pub fn conjunction(exprs: impl IntoIterator<Item = ExprRef>) -> Option<ExprRef> {
    exprs.into_iter().reduce(and)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conjunction_folds_left_to_right() {
        let parts = vec![lt(col("x"), lit(5)), gt_eq(col("x"), lit(3)), not(col("b"))];
        let combined = conjunction(parts.clone()).unwrap();
        assert_eq!(
            combined,
            and(and(parts[0].clone(), parts[1].clone()), parts[2].clone())
        );
        assert_eq!(conjunction(vec![parts[0].clone()]), Some(parts[0].clone()));
        assert!(conjunction(vec![]).is_none());
    }

    #[test]
    fn structural_equality_and_hash() {
        use std::collections::HashSet;

        let a = lt(col("x"), lit(5));
        let b = lt(col("x"), lit(5));
        assert_eq!(a, b);
        assert_ne!(a, lt(col("x"), lit(6)));

        let set: HashSet<ExprRef> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn expr_display() {
        assert_eq!(col("a").to_string(), "$a");
        assert_eq!(row_index().to_string(), "row_index()");

        let col1 = col("col1");
        let col2 = col("col2");
        assert_eq!(and(col1.clone(), col2.clone()).to_string(), "($col1 and $col2)");
        assert_eq!(or(col1.clone(), col2.clone()).to_string(), "($col1 or $col2)");
        assert_eq!(eq(col1.clone(), col2.clone()).to_string(), "($col1 = $col2)");
        assert_eq!(not_eq(col1.clone(), col2.clone()).to_string(), "($col1 != $col2)");
        assert_eq!(gt(col1.clone(), col2.clone()).to_string(), "($col1 > $col2)");
        assert_eq!(gt_eq(col1.clone(), col2.clone()).to_string(), "($col1 >= $col2)");
        assert_eq!(lt(col1.clone(), col2.clone()).to_string(), "($col1 < $col2)");
        assert_eq!(lt_eq(col1.clone(), col2.clone()).to_string(), "($col1 <= $col2)");
        assert_eq!(add(col1.clone(), lit(1)).to_string(), "($col1 + 1_i64)");
        assert_eq!(not(col1.clone()).to_string(), "!$col1");
        assert_eq!(is_null(col1.clone()).to_string(), "is_null($col1)");
        assert_eq!(
            fill_null(col1.clone(), lit(0.5)).to_string(),
            "fill_null($col1, 0.5_f64)"
        );
        assert_eq!(lit("rufus").to_string(), "\"rufus\"");
        assert_eq!(lit(true).to_string(), "true");
        assert_eq!(lit(Scalar::Null).to_string(), "null");
    }
}
