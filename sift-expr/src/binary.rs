use std::sync::Arc;

use arrow_arith::boolean::{and_kleene, or_kleene};
use arrow_arith::numeric;
use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef};
use arrow_ord::cmp;
use arrow_cast::CastOptions;
use arrow_schema::{DECIMAL128_MAX_PRECISION, DECIMAL256_MAX_PRECISION, DataType};
use sift_error::{SiftResult, sift_bail};

use crate::{Expr, ExprRef, Operator};

/// Create a new binary expression.
pub fn binary(lhs: ExprRef, operator: Operator, rhs: ExprRef) -> ExprRef {
    Arc::new(Expr::Binary {
        lhs,
        op: operator,
        rhs,
    })
}

/// Create a new `Binary` expression using the `Eq` operator.
///
/// ## Example usage
///
/// ```
/// use std::sync::Arc;
///
/// use arrow_array::{Array, ArrayRef, BooleanArray, Int64Array, RecordBatch};
/// use sift_expr::{col, eq, lit};
///
/// let batch = RecordBatch::try_from_iter([(
///     "x",
///     Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef,
/// )])
/// .unwrap();
/// let result = eq(col("x"), lit(3)).evaluate(&batch).unwrap();
///
/// assert_eq!(
///     result.as_any().downcast_ref::<BooleanArray>().unwrap(),
///     &BooleanArray::from(vec![false, false, true]),
/// );
/// ```
pub fn eq(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::Eq, rhs)
}

/// Create a new `Binary` expression using the `NotEq` operator.
pub fn not_eq(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::NotEq, rhs)
}

/// Create a new `Binary` expression using the `Gte` operator.
pub fn gt_eq(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::Gte, rhs)
}

/// Create a new `Binary` expression using the `Gt` operator.
pub fn gt(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::Gt, rhs)
}

/// Create a new `Binary` expression using the `Lte` operator.
pub fn lt_eq(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::Lte, rhs)
}

/// Create a new `Binary` expression using the `Lt` operator.
///
/// ## Example usage
///
/// ```
/// use std::sync::Arc;
///
/// use arrow_array::{Array, ArrayRef, BooleanArray, Int64Array, RecordBatch};
/// use sift_expr::{col, lit, lt};
///
/// let batch = RecordBatch::try_from_iter([(
///     "x",
///     Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef,
/// )])
/// .unwrap();
/// let result = lt(col("x"), lit(3)).evaluate(&batch).unwrap();
///
/// assert_eq!(
///     result.as_any().downcast_ref::<BooleanArray>().unwrap(),
///     &BooleanArray::from(vec![true, true, false]),
/// );
/// ```
pub fn lt(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::Lt, rhs)
}

/// Create a new `Binary` expression using the `Or` operator, with Kleene semantics for nulls.
pub fn or(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::Or, rhs)
}

/// Create a new `Binary` expression using the `And` operator, with Kleene semantics for nulls.
pub fn and(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::And, rhs)
}

/// Create a new `Binary` expression using the `Add` operator.
pub fn add(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::Add, rhs)
}

/// Create a new `Binary` expression using the `Sub` operator.
pub fn sub(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::Sub, rhs)
}

/// Create a new `Binary` expression using the `Mul` operator.
pub fn mul(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::Mul, rhs)
}

/// Create a new `Binary` expression using the `Div` operator.
pub fn div(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(lhs, Operator::Div, rhs)
}

pub(crate) fn evaluate_binary(lhs: ArrayRef, op: Operator, rhs: ArrayRef) -> SiftResult<ArrayRef> {
    let (lhs, rhs) = coerce(lhs, rhs)?;
    let result: ArrayRef = match op {
        Operator::Eq => Arc::new(cmp::eq(&lhs, &rhs)?),
        Operator::NotEq => Arc::new(cmp::neq(&lhs, &rhs)?),
        Operator::Gt => Arc::new(cmp::gt(&lhs, &rhs)?),
        Operator::Gte => Arc::new(cmp::gt_eq(&lhs, &rhs)?),
        Operator::Lt => Arc::new(cmp::lt(&lhs, &rhs)?),
        Operator::Lte => Arc::new(cmp::lt_eq(&lhs, &rhs)?),
        Operator::And | Operator::Or => boolean_connective(&lhs, op, &rhs)?,
        Operator::Add => numeric::add(&lhs, &rhs)?,
        Operator::Sub => numeric::sub(&lhs, &rhs)?,
        Operator::Mul => numeric::mul(&lhs, &rhs)?,
        Operator::Div => numeric::div(&lhs, &rhs)?,
    };
    Ok(result)
}

fn boolean_connective(lhs: &ArrayRef, op: Operator, rhs: &ArrayRef) -> SiftResult<ArrayRef> {
    let (Some(l), Some(r)) = (lhs.as_boolean_opt(), rhs.as_boolean_opt()) else {
        sift_bail!(
            "operator {} requires boolean operands, got {} and {}",
            op,
            lhs.data_type(),
            rhs.data_type()
        );
    };
    let result = if op == Operator::And {
        and_kleene(l, r)?
    } else {
        or_kleene(l, r)?
    };
    Ok(Arc::new(result))
}

/// Bring two operands to a common type.
///
/// Numeric operands widen to a type that holds every value of both; anything else is cast to the
/// type of the left operand. A value that does not fit the common type is an error.
pub(crate) fn coerce(lhs: ArrayRef, rhs: ArrayRef) -> SiftResult<(ArrayRef, ArrayRef)> {
    if lhs.data_type() == rhs.data_type() {
        return Ok((lhs, rhs));
    }

    let target = match (lhs.data_type(), rhs.data_type()) {
        (l, r) if l.is_numeric() && r.is_numeric() => numeric_supertype(l, r),
        (DataType::Null, r) => r.clone(),
        (l, _) => l.clone(),
    };

    Ok((cast_to(lhs, &target)?, cast_to(rhs, &target)?))
}

fn numeric_supertype(l: &DataType, r: &DataType) -> DataType {
    if l.is_floating() || r.is_floating() {
        return DataType::Float64;
    }
    if l.is_signed_integer() && r.is_signed_integer() {
        return DataType::Int64;
    }
    if l.is_unsigned_integer() && r.is_unsigned_integer() {
        return DataType::UInt64;
    }
    // Mixed signedness fits in Int64 unless one side is UInt64.
    if l.is_integer() && r.is_integer() && l != &DataType::UInt64 && r != &DataType::UInt64 {
        return DataType::Int64;
    }
    decimal_supertype(l, r)
}

/// The narrowest decimal holding both operands, or `Float64` when no decimal is wide enough.
fn decimal_supertype(l: &DataType, r: &DataType) -> DataType {
    let (Some((l_digits, l_scale)), Some((r_digits, r_scale))) = (exact_digits(l), exact_digits(r))
    else {
        return DataType::Float64;
    };
    let scale = l_scale.max(r_scale);
    let precision = l_digits.max(r_digits) + i16::from(scale.max(0));
    let wide = matches!(l, DataType::Decimal256(..)) || matches!(r, DataType::Decimal256(..));

    match u8::try_from(precision) {
        Ok(p) if !wide && (1..=DECIMAL128_MAX_PRECISION).contains(&p) => {
            DataType::Decimal128(p, scale)
        }
        Ok(p) if (1..=DECIMAL256_MAX_PRECISION).contains(&p) => DataType::Decimal256(p, scale),
        _ => DataType::Float64,
    }
}

/// Digits left of the decimal point, and the scale, needed to represent every value exactly.
fn exact_digits(data_type: &DataType) -> Option<(i16, i8)> {
    let (precision, scale) = match data_type {
        DataType::Int8 | DataType::UInt8 => (3, 0),
        DataType::Int16 | DataType::UInt16 => (5, 0),
        DataType::Int32 | DataType::UInt32 => (10, 0),
        DataType::Int64 => (19, 0),
        DataType::UInt64 => (20, 0),
        DataType::Decimal128(p, s) | DataType::Decimal256(p, s) => (*p, *s),
        _ => return None,
    };
    Some((i16::from(precision) - i16::from(scale), scale))
}

fn cast_to(array: ArrayRef, target: &DataType) -> SiftResult<ArrayRef> {
    if array.data_type() == target {
        return Ok(array);
    }
    if !arrow_cast::can_cast_types(array.data_type(), target) {
        sift_bail!(MismatchedTypes: target, array.data_type());
    }
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    Ok(arrow_cast::cast_with_options(&array, target, &options)?)
}

#[cfg(test)]
mod tests {
    use arrow_array::types::Float64Type;
    use arrow_array::{
        BooleanArray, Decimal128Array, Float64Array, Int32Array, Int64Array, Int8Array, StringArray,
        UInt32Array, UInt64Array,
    };
    use rstest::rstest;

    use super::*;

    fn int64(values: Vec<i64>) -> ArrayRef {
        Arc::new(Int64Array::from(values))
    }

    #[rstest]
    #[case(Operator::Eq, vec![false, true, false])]
    #[case(Operator::NotEq, vec![true, false, true])]
    #[case(Operator::Lt, vec![true, false, false])]
    #[case(Operator::Lte, vec![true, true, false])]
    #[case(Operator::Gt, vec![false, false, true])]
    #[case(Operator::Gte, vec![false, true, true])]
    fn comparisons(#[case] op: Operator, #[case] expected: Vec<bool>) {
        let result = evaluate_binary(int64(vec![1, 2, 3]), op, int64(vec![2, 2, 2])).unwrap();
        assert_eq!(result.as_boolean(), &BooleanArray::from(expected));
    }

    #[test]
    fn mixed_integer_widths_compare() {
        let lhs: ArrayRef = Arc::new(Int32Array::from(vec![1, 5]));
        let result = evaluate_binary(lhs, Operator::Lt, int64(vec![3, 3])).unwrap();
        assert_eq!(result.as_boolean(), &BooleanArray::from(vec![true, false]));
    }

    #[test]
    fn int_plus_float_widens() {
        let rhs: ArrayRef = Arc::new(Float64Array::from(vec![0.5, 0.5]));
        let result = evaluate_binary(int64(vec![1, 2]), Operator::Add, rhs).unwrap();
        assert_eq!(result.data_type(), &DataType::Float64);
        assert_eq!(
            result.as_primitive::<Float64Type>().values().as_ref(),
            &[1.5, 2.5]
        );
    }

    #[test]
    fn kleene_and_with_nulls() {
        let lhs: ArrayRef = Arc::new(BooleanArray::from(vec![Some(false), None, Some(true)]));
        let rhs: ArrayRef = Arc::new(BooleanArray::from(vec![None, Some(true), Some(true)]));
        let result = evaluate_binary(lhs, Operator::And, rhs).unwrap();
        assert_eq!(
            result.as_boolean(),
            &BooleanArray::from(vec![Some(false), None, Some(true)])
        );
    }

    #[test]
    fn and_requires_booleans() {
        let err = evaluate_binary(int64(vec![1]), Operator::And, int64(vec![1])).unwrap_err();
        assert!(err.to_string().contains("requires boolean operands"));
    }

    #[test]
    fn strings_compare_against_cast_integers() {
        let lhs: ArrayRef = Arc::new(StringArray::from(vec!["1", "one"]));
        let result = evaluate_binary(lhs, Operator::Eq, int64(vec![1, 1])).unwrap();
        assert_eq!(result.as_boolean(), &BooleanArray::from(vec![true, false]));
    }

    #[rstest]
    #[case::decimal_keeps_fraction(
        Arc::new(Decimal128Array::from(vec![45, 30]).with_precision_and_scale(10, 1).unwrap()),
        int64(vec![4, 4]),
        vec![true, false]
    )]
    #[case::uint64_above_i64_max(
        Arc::new(UInt64Array::from(vec![u64::MAX, 1])),
        int64(vec![0, 0]),
        vec![true, true]
    )]
    #[case::mixed_signedness(
        Arc::new(UInt32Array::from(vec![u32::MAX, 0])),
        Arc::new(Int8Array::from(vec![-1, 1])),
        vec![true, false]
    )]
    fn comparisons_widen_without_loss(
        #[case] lhs: ArrayRef,
        #[case] rhs: ArrayRef,
        #[case] expected: Vec<bool>,
    ) {
        let result = evaluate_binary(lhs, Operator::Gt, rhs).unwrap();
        assert_eq!(result.as_boolean(), &BooleanArray::from(expected));
    }

    #[rstest]
    #[case(DataType::Int8, DataType::UInt32, DataType::Int64)]
    #[case(DataType::UInt8, DataType::UInt64, DataType::UInt64)]
    #[case(DataType::Int64, DataType::UInt64, DataType::Decimal128(20, 0))]
    #[case(DataType::Decimal128(10, 1), DataType::Int64, DataType::Decimal128(20, 1))]
    #[case(DataType::Decimal128(5, 2), DataType::Decimal128(10, 0), DataType::Decimal128(12, 2))]
    #[case(DataType::Decimal128(38, 30), DataType::Int64, DataType::Decimal256(49, 30))]
    #[case(DataType::Decimal128(10, 1), DataType::Float32, DataType::Float64)]
    fn supertypes(#[case] l: DataType, #[case] r: DataType, #[case] expected: DataType) {
        assert_eq!(numeric_supertype(&l, &r), expected);
        assert_eq!(numeric_supertype(&r, &l), expected);
    }

    #[test]
    fn unrepresentable_operand_is_an_error() {
        let rhs: ArrayRef = Arc::new(StringArray::from(vec!["1", "one"]));
        assert!(evaluate_binary(int64(vec![1, 1]), Operator::Eq, rhs).is_err());
    }
}
