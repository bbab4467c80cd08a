//! Value primitives: arithmetic, comparison, and coercion rules.
//!
//! The evaluator never re-implements these; every operator expression funnels
//! through this module. Numeric rules are int/double: two ints stay int, any
//! float operand produces a float. `+` concatenates when either operand is a
//! string. Operand combinations with no defined rule produce NULL rather
//! than an error.

use ahash::AHashSet;

use crate::expressions::ArithmeticOp;
use crate::heap::{Heap, HeapData};
use crate::intern::Interns;
use crate::value::Value;

/// Applies an arithmetic operator. Allocates only for string concatenation.
pub(crate) fn arithmetic(op: ArithmeticOp, left: Value, right: Value, heap: &mut Heap, interns: &Interns) -> Value {
    match op {
        ArithmeticOp::Add => add(left, right, heap, interns),
        ArithmeticOp::Sub => numeric(left, right, |a, b| a.wrapping_sub(b), |a, b| a - b),
        ArithmeticOp::Mul => numeric(left, right, |a, b| a.wrapping_mul(b), |a, b| a * b),
        ArithmeticOp::Div => divide(left, right),
        ArithmeticOp::Mod => modulo(left, right),
    }
}

/// `+`: numeric addition, or concatenation when either operand is a string.
pub(crate) fn add(left: Value, right: Value, heap: &mut Heap, interns: &Interns) -> Value {
    if left.as_str(heap, interns).is_some() || right.as_str(heap, interns).is_some() {
        let mut result = String::new();
        let mut seen = AHashSet::new();
        left.write_display(&mut result, heap, interns, &mut seen)
            .expect("string formatting failed");
        right
            .write_display(&mut result, heap, interns, &mut seen)
            .expect("string formatting failed");
        return Value::Str(heap.allocate(HeapData::Str(result)));
    }
    numeric(left, right, |a, b| a.wrapping_add(b), |a, b| a + b)
}

fn numeric(left: Value, right: Value, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) -> Value {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Value::Int(int_op(a, b)),
        (Value::Int(a), Value::Float(b)) => Value::Float(float_op(a as f64, b)),
        (Value::Float(a), Value::Int(b)) => Value::Float(float_op(a, b as f64)),
        (Value::Float(a), Value::Float(b)) => Value::Float(float_op(a, b)),
        _ => Value::Null,
    }
}

fn divide(left: Value, right: Value) -> Value {
    // Integer division by zero has no defined result, it degrades to NULL
    // like every other unsupported combination.
    if let (Value::Int(_), Value::Int(0)) = (left, right) {
        return Value::Null;
    }
    numeric(left, right, |a, b| a.wrapping_div(b), |a, b| a / b)
}

fn modulo(left: Value, right: Value) -> Value {
    if let (Value::Int(_), Value::Int(0)) = (left, right) {
        return Value::Null;
    }
    numeric(left, right, |a, b| a.wrapping_rem(b), |a, b| a % b)
}

/// Unary minus. Non-numeric operands degrade to NULL.
pub(crate) fn negate(value: Value) -> Value {
    match value {
        Value::Int(v) => Value::Int(v.wrapping_neg()),
        Value::Float(v) => Value::Float(-v),
        _ => Value::Null,
    }
}

/// Value equality: numeric cross-type comparison, string content comparison,
/// and reference identity for arrays, objects, and functions. NULL and
/// UNDEFINED are distinct.
pub(crate) fn equal(left: Value, right: Value, heap: &Heap, interns: &Interns) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Undefined, Value::Undefined) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Float(b)) => (a as f64) == b,
        (Value::Float(a), Value::Int(b)) => a == (b as f64),
        (Value::Array(a), Value::Array(b)) => a == b,
        (Value::Object(a), Value::Object(b)) => a == b,
        (Value::Function(a), Value::Function(b)) => a == b,
        _ => match (left.as_str(heap, interns), right.as_str(heap, interns)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// `>`: numeric comparison, or lexical comparison for two strings.
pub(crate) fn greater(left: Value, right: Value, heap: &Heap, interns: &Interns) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a > b,
        (Value::Float(a), Value::Float(b)) => a > b,
        (Value::Int(a), Value::Float(b)) => (a as f64) > b,
        (Value::Float(a), Value::Int(b)) => a > (b as f64),
        _ => match (left.as_str(heap, interns), right.as_str(heap, interns)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
    }
}

/// `>=`: numeric comparison, or lexical comparison for two strings.
pub(crate) fn greater_or_equal(left: Value, right: Value, heap: &Heap, interns: &Interns) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a >= b,
        (Value::Float(a), Value::Float(b)) => a >= b,
        (Value::Int(a), Value::Float(b)) => (a as f64) >= b,
        (Value::Float(a), Value::Int(b)) => a >= (b as f64),
        _ => match (left.as_str(heap, interns), right.as_str(heap, interns)) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        },
    }
}

/// Truthiness: false, 0, 0.0, the empty string, NULL, and UNDEFINED are
/// falsy; everything else (arrays, objects, functions included) is truthy.
pub(crate) fn is_truthy(value: Value, heap: &Heap, interns: &Interns) -> bool {
    match value {
        Value::Null | Value::Undefined => false,
        Value::Bool(b) => b,
        Value::Int(v) => v != 0,
        Value::Float(v) => v != 0.0,
        Value::StrLiteral(_) | Value::Str(_) => !value.as_str(heap, interns).unwrap_or("").is_empty(),
        Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
    }
}

/// `++`/`--` primitive: adds `delta` to ints and floats, leaves every other
/// value unchanged.
pub(crate) fn increment_or_decrement(value: Value, delta: i64) -> Value {
    match value {
        Value::Int(v) => Value::Int(v.wrapping_add(delta)),
        Value::Float(v) => Value::Float(v + delta as f64),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::InternerBuilder;

    fn empty_interns() -> Interns {
        Interns::new(InternerBuilder::new(), Vec::new())
    }

    #[test]
    fn int_arithmetic_stays_int() {
        let mut heap = Heap::default();
        let interns = empty_interns();
        assert_eq!(
            arithmetic(ArithmeticOp::Add, Value::Int(2), Value::Int(3), &mut heap, &interns),
            Value::Int(5)
        );
        assert_eq!(
            arithmetic(ArithmeticOp::Div, Value::Int(7), Value::Int(2), &mut heap, &interns),
            Value::Int(3)
        );
    }

    #[test]
    fn float_operand_produces_float() {
        let mut heap = Heap::default();
        let interns = empty_interns();
        assert_eq!(
            arithmetic(ArithmeticOp::Mul, Value::Int(2), Value::Float(1.5), &mut heap, &interns),
            Value::Float(3.0)
        );
    }

    #[test]
    fn division_by_zero_degrades_to_null() {
        let mut heap = Heap::default();
        let interns = empty_interns();
        assert_eq!(
            arithmetic(ArithmeticOp::Div, Value::Int(1), Value::Int(0), &mut heap, &interns),
            Value::Null
        );
        assert_eq!(
            arithmetic(ArithmeticOp::Mod, Value::Int(1), Value::Int(0), &mut heap, &interns),
            Value::Null
        );
    }

    #[test]
    fn add_concatenates_strings() {
        let mut heap = Heap::default();
        let mut builder = InternerBuilder::new();
        let ab = builder.intern("ab");
        let interns = Interns::new(builder, Vec::new());

        let result = add(Value::StrLiteral(ab), Value::Int(3), &mut heap, &interns);
        assert_eq!(result.as_str(&heap, &interns), Some("ab3"));
    }

    #[test]
    fn null_and_undefined_are_distinct() {
        let heap = Heap::default();
        let interns = empty_interns();
        assert!(equal(Value::Null, Value::Null, &heap, &interns));
        assert!(equal(Value::Undefined, Value::Undefined, &heap, &interns));
        assert!(!equal(Value::Null, Value::Undefined, &heap, &interns));
    }

    #[test]
    fn string_equality_is_by_content() {
        let mut heap = Heap::default();
        let mut builder = InternerBuilder::new();
        let abc = builder.intern("abc");
        let interns = Interns::new(builder, Vec::new());

        let owned = Value::Str(heap.allocate(HeapData::Str("abc".to_owned())));
        assert!(equal(Value::StrLiteral(abc), owned, &heap, &interns));
    }

    #[test]
    fn truthiness_table() {
        let heap = Heap::default();
        let interns = empty_interns();
        assert!(!is_truthy(Value::Null, &heap, &interns));
        assert!(!is_truthy(Value::Undefined, &heap, &interns));
        assert!(!is_truthy(Value::Bool(false), &heap, &interns));
        assert!(!is_truthy(Value::Int(0), &heap, &interns));
        assert!(!is_truthy(Value::Float(0.0), &heap, &interns));
        assert!(is_truthy(Value::Int(-1), &heap, &interns));
        assert!(is_truthy(Value::Bool(true), &heap, &interns));
    }

    #[test]
    fn increment_leaves_non_numeric_unchanged() {
        assert_eq!(increment_or_decrement(Value::Int(5), 1), Value::Int(6));
        assert_eq!(increment_or_decrement(Value::Float(1.0), -1), Value::Float(0.0));
        assert_eq!(increment_or_decrement(Value::Null, 1), Value::Null);
    }
}
