use std::fmt::{Display, Formatter};
use std::sync::Arc;

use arrow_arith::boolean::is_not_null;
use arrow_arith::numeric;
use arrow_array::{Array, ArrayRef};
use arrow_schema::DataType;
use sift_error::{SiftResult, sift_bail};

use crate::binary::coerce;
use crate::{Expr, ExprRef};

/// The built-in scalar functions. Every function is row-wise: the value of a row depends only on
/// the values of its arguments in that same row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Function {
    /// Arithmetic negation of a numeric argument.
    Negate,
    /// Convert the argument to the given type. Values that cannot be converted become null.
    Cast(DataType),
    /// The first argument, with nulls replaced by the second argument.
    FillNull,
}

impl Function {
    fn arity(&self) -> usize {
        match self {
            Function::Negate | Function::Cast(_) => 1,
            Function::FillNull => 2,
        }
    }

    pub(crate) fn invoke(&self, mut args: Vec<ArrayRef>) -> SiftResult<ArrayRef> {
        if args.len() != self.arity() {
            sift_bail!(
                "{} expects {} arguments, got {}",
                self,
                self.arity(),
                args.len()
            );
        }

        match self {
            Function::Negate => Ok(numeric::neg(&args[0])?),
            Function::Cast(target) => Ok(arrow_cast::cast(&args[0], target)?),
            Function::FillNull => {
                let fallback = args.remove(1);
                let values = args.remove(0);
                if values.null_count() == 0 {
                    return Ok(values);
                }
                let (values, fallback) = coerce(values, fallback)?;
                let valid = is_not_null(&values)?;
                Ok(arrow_select::zip::zip(&valid, &values, &fallback)?)
            }
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Function::Negate => write!(f, "negate"),
            Function::Cast(target) => write!(f, "cast<{target}>"),
            Function::FillNull => write!(f, "fill_null"),
        }
    }
}

/// Create a new function call expression.
pub fn call(function: Function, args: Vec<ExprRef>) -> ExprRef {
    Arc::new(Expr::Call { function, args })
}

/// Arithmetic negation.
pub fn negate(child: ExprRef) -> ExprRef {
    call(Function::Negate, vec![child])
}

/// Convert the child to `target`.
pub fn cast(child: ExprRef, target: DataType) -> ExprRef {
    call(Function::Cast(target), vec![child])
}

/// Replace the nulls of `child` with the values of `fallback`.
pub fn fill_null(child: ExprRef, fallback: ExprRef) -> ExprRef {
    call(Function::FillNull, vec![child, fallback])
}

#[cfg(test)]
mod tests {
    use arrow_array::cast::AsArray;
    use arrow_array::types::{Float64Type, Int64Type};
    use arrow_array::{Float64Array, Int64Array};

    use super::*;

    #[test]
    fn negate_ints() {
        let values: ArrayRef = Arc::new(Int64Array::from(vec![1, -2]));
        let result = Function::Negate.invoke(vec![values]).unwrap();
        assert_eq!(result.as_primitive::<Int64Type>().values().as_ref(), &[-1, 2]);
    }

    #[test]
    fn cast_to_float() {
        let values: ArrayRef = Arc::new(Int64Array::from(vec![1, 2]));
        let result = Function::Cast(DataType::Float64)
            .invoke(vec![values])
            .unwrap();
        assert_eq!(
            result.as_primitive::<Float64Type>().values().as_ref(),
            &[1.0, 2.0]
        );
    }

    #[test]
    fn fill_null_widens_to_fallback() {
        let values: ArrayRef = Arc::new(Int64Array::from(vec![Some(1), None, Some(3)]));
        let fallback: ArrayRef = Arc::new(Float64Array::from(vec![0.5, 0.5, 0.5]));
        let result = Function::FillNull.invoke(vec![values, fallback]).unwrap();
        assert_eq!(result.null_count(), 0);
        assert_eq!(
            result.as_primitive::<Float64Type>().values().as_ref(),
            &[1.0, 0.5, 3.0]
        );
    }

    #[test]
    fn arity_is_checked() {
        let values: ArrayRef = Arc::new(Int64Array::from(vec![1]));
        let err = Function::FillNull.invoke(vec![values]).unwrap_err();
        assert!(err.to_string().contains("fill_null expects 2 arguments, got 1"));
    }
}
