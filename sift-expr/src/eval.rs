use std::sync::Arc;

use arrow_arith::boolean;
use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, RecordBatch, UInt64Array};
use sift_error::{SiftResult, sift_bail, sift_err};

use crate::binary::evaluate_binary;
use crate::{Expr, FieldName};

/// The rows an expression is evaluated over.
pub trait EvalScope {
    /// The number of rows in scope. Every evaluated expression has this length.
    fn row_count(&self) -> usize;

    /// The values of a named column for the rows in scope.
    fn column(&self, name: &FieldName) -> SiftResult<ArrayRef>;

    /// The absolute position of each row in scope within the physical rows it originates from.
    fn row_positions(&self) -> SiftResult<ArrayRef>;
}

impl EvalScope for RecordBatch {
    fn row_count(&self) -> usize {
        self.num_rows()
    }

    fn column(&self, name: &FieldName) -> SiftResult<ArrayRef> {
        self.column_by_name(name)
            .cloned()
            .ok_or_else(|| sift_err!(ColumnNotFound: "{}", name))
    }

    fn row_positions(&self) -> SiftResult<ArrayRef> {
        Ok(Arc::new(UInt64Array::from_iter_values(
            0..self.num_rows() as u64,
        )))
    }
}

impl Expr {
    /// Compute the value of the expression for every row in `scope`.
    pub fn evaluate(&self, scope: &dyn EvalScope) -> SiftResult<ArrayRef> {
        let result = self.unchecked_evaluate(scope)?;
        if result.len() != scope.row_count() {
            sift_bail!(
                "expression {} produced {} rows, expected {}",
                self,
                result.len(),
                scope.row_count()
            );
        }
        Ok(result)
    }

    fn unchecked_evaluate(&self, scope: &dyn EvalScope) -> SiftResult<ArrayRef> {
        match self {
            Expr::Column(name) => scope.column(name),
            Expr::Literal(value) => Ok(value.to_array(scope.row_count())),
            Expr::Binary { lhs, op, rhs } => {
                evaluate_binary(lhs.evaluate(scope)?, *op, rhs.evaluate(scope)?)
            }
            Expr::Not(child) => {
                let child = child.evaluate(scope)?;
                let Some(bools) = child.as_boolean_opt() else {
                    sift_bail!(MismatchedTypes: "Boolean", child.data_type());
                };
                Ok(Arc::new(boolean::not(bools)?))
            }
            Expr::IsNull(child) => Ok(Arc::new(boolean::is_null(&child.evaluate(scope)?)?)),
            Expr::Call { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| arg.evaluate(scope))
                    .collect::<SiftResult<Vec<_>>>()?;
                function.invoke(args)
            }
            Expr::RowIndex => scope.row_positions(),
        }
    }
}
