use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::iter;
use std::sync::Arc;

use arrow_array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, new_null_array,
};
use arrow_schema::DataType;

use crate::{Expr, ExprRef};

/// A constant value.
///
/// Floats compare and hash by their bit pattern so that expressions containing them can be used
/// as cache keys.
#[derive(Debug, Clone)]
pub enum Scalar {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Utf8(Arc<str>),
}

impl Scalar {
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::Null => DataType::Null,
            Scalar::Bool(_) => DataType::Boolean,
            Scalar::I64(_) => DataType::Int64,
            Scalar::F64(_) => DataType::Float64,
            Scalar::Utf8(_) => DataType::Utf8,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Broadcast the value into an array of `len` rows.
    pub fn to_array(&self, len: usize) -> ArrayRef {
        match self {
            Scalar::Null => new_null_array(&DataType::Null, len),
            Scalar::Bool(v) => Arc::new(BooleanArray::from(vec![*v; len])),
            Scalar::I64(v) => Arc::new(Int64Array::from_value(*v, len)),
            Scalar::F64(v) => Arc::new(Float64Array::from_value(*v, len)),
            Scalar::Utf8(v) => Arc::new(StringArray::from_iter_values(iter::repeat_n(
                v.as_ref(),
                len,
            ))),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(l), Scalar::Bool(r)) => l == r,
            (Scalar::I64(l), Scalar::I64(r)) => l == r,
            (Scalar::F64(l), Scalar::F64(r)) => l.to_bits() == r.to_bits(),
            (Scalar::Utf8(l), Scalar::Utf8(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Scalar::Null => {}
            Scalar::Bool(v) => v.hash(state),
            Scalar::I64(v) => v.hash(state),
            Scalar::F64(v) => v.to_bits().hash(state),
            Scalar::Utf8(v) => v.hash(state),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}_i64"),
            Scalar::F64(v) => write!(f, "{v}_f64"),
            Scalar::Utf8(v) => write!(f, "\"{v}\""),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::I64(value.into())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::I64(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::F64(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Utf8(value.into())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Utf8(value.into())
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// Create a new `Literal` expression from a type that coerces to `Scalar`.
///
/// ## Example usage
///
/// ```
/// use sift_expr::{lit, Expr, Scalar};
///
/// let number = lit(34);
/// assert_eq!(number.as_ref(), &Expr::Literal(Scalar::I64(34)));
/// ```
pub fn lit(value: impl Into<Scalar>) -> ExprRef {
    Arc::new(Expr::Literal(value.into()))
}

#[cfg(test)]
mod tests {
    use arrow_array::Array;

    use super::*;

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Scalar::F64(f64::NAN), Scalar::F64(f64::NAN));
        assert_ne!(Scalar::F64(0.0), Scalar::F64(-0.0));
        assert_ne!(Scalar::I64(1), Scalar::F64(1.0));
    }

    #[test]
    fn broadcast() {
        let array = Scalar::from("a").to_array(3);
        assert_eq!(array.len(), 3);
        assert_eq!(array.data_type(), &DataType::Utf8);

        let nulls = Scalar::from(None::<i64>).to_array(2);
        assert_eq!(nulls.logical_null_count(), 2);
    }
}
