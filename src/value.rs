//! The dynamic value (`BVal`) and its arithmetic/comparison/equality algebra.
//!
//! `BVal` is a small tagged union of scalars plus a recursive container:
//! `Null | Bool | Int | Float | Str | Array | Object | Func`. Strings,
//! arrays, objects, and host functions are `Arc`-backed rather than
//! `Rc`-backed: a compiled `Program`'s constant pool holds `BVal`s directly,
//! and a compiled program must be evaluable concurrently from separate
//! threads, so every `BVal` must be `Send + Sync`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::RuntimeError;
use crate::host::Callable;

#[derive(Clone)]
pub enum BVal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Array(Arc<Vec<BVal>>),
    Object(Arc<HashMap<String, BVal>>),
    Func(Arc<dyn Callable>),
}

impl BVal {
    pub fn str(s: impl Into<Arc<str>>) -> BVal {
        BVal::Str(s.into())
    }

    pub fn array(v: Vec<BVal>) -> BVal {
        BVal::Array(Arc::new(v))
    }

    pub fn object(m: HashMap<String, BVal>) -> BVal {
        BVal::Object(Arc::new(m))
    }

    /// The stable type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            BVal::Null => "null",
            BVal::Bool(_) => "bool",
            BVal::Int(_) => "int",
            BVal::Float(_) => "float",
            BVal::Str(_) => "string",
            BVal::Array(_) => "array",
            BVal::Object(_) => "object",
            BVal::Func(_) => "function",
        }
    }

    /// Truthiness: `null`, `false`, `0`, `0.0`/`NaN`, and empty strings,
    /// arrays, and objects are falsy; everything else, including any
    /// function value, is truthy.
    pub fn truthy(&self) -> bool {
        match self {
            BVal::Null => false,
            BVal::Bool(b) => *b,
            BVal::Int(i) => *i != 0,
            BVal::Float(f) => *f != 0.0 && !f.is_nan(),
            BVal::Str(s) => !s.is_empty(),
            BVal::Array(a) => !a.is_empty(),
            BVal::Object(o) => !o.is_empty(),
            BVal::Func(_) => true,
        }
    }
}

impl fmt::Debug for BVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BVal::Null => write!(f, "null"),
            BVal::Bool(b) => write!(f, "{}", b),
            BVal::Int(i) => write!(f, "{}", i),
            BVal::Float(x) => write!(f, "{}", x),
            BVal::Str(s) => write!(f, "{:?}", s),
            BVal::Array(a) => f.debug_list().entries(a.iter()).finish(),
            BVal::Object(o) => f.debug_map().entries(o.iter()).finish(),
            BVal::Func(c) => write!(f, "<function {}/{}>", c.name(), c.arity()),
        }
    }
}

impl fmt::Display for BVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BVal::Str(s) => write!(f, "{}", s),
            other => write!(f, "{:?}", other),
        }
    }
}

impl PartialEq for BVal {
    fn eq(&self, other: &BVal) -> bool {
        value_eq(self, other)
    }
}

/// Budget for memory-affecting allocations (`NewArray`, string/array
/// repetition). Every allocation path checks the limit before allocating,
/// rather than after, so a single oversized allocation can never itself
/// exceed the budget.
pub struct Budget {
    pub used: usize,
    pub max: usize,
}

impl Budget {
    pub fn new(max: usize) -> Budget {
        Budget { used: 0, max }
    }

    pub fn reserve(&mut self, n: usize) -> Result<(), RuntimeError> {
        let next = self.used.checked_add(n).ok_or(RuntimeError::OutOfMemory)?;
        if next > self.max {
            return Err(RuntimeError::OutOfMemory);
        }
        self.used = next;
        Ok(())
    }
}

/// Boolean-to-integer coercion applied before every binary arithmetic,
/// comparison, or equality dispatch.
fn coerce(v: BVal) -> BVal {
    match v {
        BVal::Bool(true) => BVal::Int(1),
        BVal::Bool(false) => BVal::Int(0),
        other => other,
    }
}

fn as_f64(v: &BVal) -> f64 {
    match v {
        BVal::Int(i) => *i as f64,
        BVal::Float(f) => *f,
        _ => unreachable!("as_f64 called on non-numeric BVal"),
    }
}

fn is_numeric(v: &BVal) -> bool {
    matches!(v, BVal::Int(_) | BVal::Float(_))
}

fn type_error(op: &str, a: &BVal, b: &BVal) -> RuntimeError {
    RuntimeError::TypeError(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op,
        a.type_name(),
        b.type_name()
    ))
}

pub fn add(a: BVal, b: BVal) -> Result<BVal, RuntimeError> {
    let (a, b) = (coerce(a), coerce(b));
    match (&a, &b) {
        (BVal::Int(x), BVal::Int(y)) => {
            x.checked_add(*y).map(BVal::Int).ok_or(RuntimeError::Overflow)
        }
        (x, y) if is_numeric(x) && is_numeric(y) => Ok(BVal::Float(as_f64(x) + as_f64(y))),
        (BVal::Str(x), BVal::Str(y)) => Ok(BVal::str(format!("{}{}", x, y))),
        (BVal::Array(x), BVal::Array(y)) => {
            let mut v = (**x).clone();
            v.extend(y.iter().cloned());
            Ok(BVal::array(v))
        }
        _ => Err(type_error("+", &a, &b)),
    }
}

pub fn sub(a: BVal, b: BVal) -> Result<BVal, RuntimeError> {
    let (a, b) = (coerce(a), coerce(b));
    match (&a, &b) {
        (BVal::Int(x), BVal::Int(y)) => {
            x.checked_sub(*y).map(BVal::Int).ok_or(RuntimeError::Overflow)
        }
        (x, y) if is_numeric(x) && is_numeric(y) => Ok(BVal::Float(as_f64(x) - as_f64(y))),
        _ => Err(type_error("-", &a, &b)),
    }
}

pub fn mul(a: BVal, b: BVal, budget: &mut Budget) -> Result<BVal, RuntimeError> {
    let (a, b) = (coerce(a), coerce(b));
    match (&a, &b) {
        (BVal::Int(x), BVal::Int(y)) => {
            x.checked_mul(*y).map(BVal::Int).ok_or(RuntimeError::Overflow)
        }
        (x, y) if is_numeric(x) && is_numeric(y) => Ok(BVal::Float(as_f64(x) * as_f64(y))),
        (BVal::Int(n), BVal::Str(s)) | (BVal::Str(s), BVal::Int(n)) => repeat_str(s, *n, budget),
        (BVal::Int(n), BVal::Array(arr)) | (BVal::Array(arr), BVal::Int(n)) => {
            repeat_array(arr, *n, budget)
        }
        _ => Err(type_error("*", &a, &b)),
    }
}

fn repeat_str(s: &Arc<str>, count: i64, budget: &mut Budget) -> Result<BVal, RuntimeError> {
    if count <= 0 || s.is_empty() {
        return Ok(BVal::str(""));
    }
    let total = s.len().checked_mul(count as usize).ok_or(RuntimeError::OutOfMemory)?;
    budget.reserve(total)?;
    Ok(BVal::str(s.repeat(count as usize)))
}

fn repeat_array(arr: &Arc<Vec<BVal>>, count: i64, budget: &mut Budget) -> Result<BVal, RuntimeError> {
    if count <= 0 || arr.is_empty() {
        return Ok(BVal::array(vec![]));
    }
    let total = arr.len().checked_mul(count as usize).ok_or(RuntimeError::OutOfMemory)?;
    budget.reserve(total)?;
    let mut out = Vec::with_capacity(total);
    for _ in 0..count {
        out.extend(arr.iter().cloned());
    }
    Ok(BVal::array(out))
}

pub fn div(a: BVal, b: BVal) -> Result<BVal, RuntimeError> {
    let (a, b) = (coerce(a), coerce(b));
    if !is_numeric(&a) || !is_numeric(&b) {
        return Err(type_error("/", &a, &b));
    }
    if as_f64(&b) == 0.0 {
        return Err(RuntimeError::DivisionByZero);
    }
    Ok(BVal::Float(as_f64(&a) / as_f64(&b)))
}

pub fn floordiv(a: BVal, b: BVal) -> Result<BVal, RuntimeError> {
    let (a, b) = (coerce(a), coerce(b));
    match (&a, &b) {
        (BVal::Int(x), BVal::Int(y)) => {
            if *y == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            x.checked_div(*y).map(BVal::Int).ok_or(RuntimeError::Overflow)
        }
        (x, y) if is_numeric(x) && is_numeric(y) => {
            if as_f64(y) == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(BVal::Float((as_f64(x) / as_f64(y)).trunc()))
        }
        _ => Err(type_error("//", &a, &b)),
    }
}

pub fn modulo(a: BVal, b: BVal) -> Result<BVal, RuntimeError> {
    let (a, b) = (coerce(a), coerce(b));
    match (&a, &b) {
        (BVal::Int(x), BVal::Int(y)) => {
            if *y == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            x.checked_rem(*y).map(BVal::Int).ok_or(RuntimeError::Overflow)
        }
        (x, y) if is_numeric(x) && is_numeric(y) => {
            if as_f64(y) == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(BVal::Float(as_f64(x) % as_f64(y)))
        }
        _ => Err(type_error("%", &a, &b)),
    }
}

pub fn pow(a: BVal, b: BVal) -> Result<BVal, RuntimeError> {
    let (a, b) = (coerce(a), coerce(b));
    match (&a, &b) {
        (BVal::Int(base), BVal::Int(exp)) if *exp >= 0 => {
            checked_ipow(*base, *exp as u32).map(BVal::Int).ok_or(RuntimeError::Overflow)
        }
        (x, y) if is_numeric(x) && is_numeric(y) => Ok(BVal::Float(as_f64(x).powf(as_f64(y)))),
        _ => Err(type_error("**", &a, &b)),
    }
}

/// Exponentiation by squaring with overflow detection. `0**0 == 1`.
fn checked_ipow(mut base: i64, mut exp: u32) -> Option<i64> {
    let mut result: i64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(base)?;
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(base)?;
        }
    }
    Some(result)
}

pub fn negate(a: BVal) -> Result<BVal, RuntimeError> {
    let a = coerce(a);
    match a {
        BVal::Int(i) => i.checked_neg().map(BVal::Int).ok_or(RuntimeError::Overflow),
        BVal::Float(f) => Ok(BVal::Float(-f)),
        other => Err(RuntimeError::TypeError(format!(
            "bad operand type for unary -: {}",
            other.type_name()
        ))),
    }
}

pub fn unary_plus(a: BVal) -> Result<BVal, RuntimeError> {
    let a = coerce(a);
    match a {
        BVal::Int(_) | BVal::Float(_) => Ok(a),
        other => Err(RuntimeError::TypeError(format!(
            "bad operand type for unary +: {}",
            other.type_name()
        ))),
    }
}

pub fn unary_not(a: &BVal) -> BVal {
    BVal::Bool(!a.truthy())
}

/// Ordering for `< > <= >=`. Allowed only for numeric pairs or `(Str, Str)`.
pub fn cmp(a: &BVal, b: &BVal) -> Result<Ordering, RuntimeError> {
    let (a, b) = (coerce(a.clone()), coerce(b.clone()));
    match (&a, &b) {
        (BVal::Int(x), BVal::Int(y)) => Ok(x.cmp(y)),
        (x, y) if is_numeric(x) && is_numeric(y) => {
            use ordered_float::OrderedFloat;
            Ok(OrderedFloat(as_f64(x)).cmp(&OrderedFloat(as_f64(y))))
        }
        (BVal::Str(x), BVal::Str(y)) => Ok(x.cmp(y)),
        _ => Err(type_error("comparison", &a, &b)),
    }
}

pub fn ord_to_bool(op: crate::ast::BinOp, ord: Ordering) -> bool {
    use crate::ast::BinOp::*;
    match op {
        Lt => ord == Ordering::Less,
        Gt => ord == Ordering::Greater,
        Le => ord != Ordering::Greater,
        Ge => ord != Ordering::Less,
        _ => unreachable!("ord_to_bool called with non-ordering op"),
    }
}

/// Structural equality used by both `==`/`!=` and `Array`/`Object` deep
/// comparison. Never errors: unequal types are simply unequal.
pub fn value_eq(a: &BVal, b: &BVal) -> bool {
    let (a, b) = (coerce(a.clone()), coerce(b.clone()));
    match (&a, &b) {
        (BVal::Null, BVal::Null) => true,
        (BVal::Int(x), BVal::Int(y)) => x == y,
        (x, y) if is_numeric(x) && is_numeric(y) => as_f64(x) == as_f64(y),
        (BVal::Str(x), BVal::Str(y)) => x == y,
        (BVal::Array(x), BVal::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| value_eq(p, q))
        }
        (BVal::Object(x), BVal::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).map(|w| value_eq(v, w)).unwrap_or(false))
        }
        (BVal::Func(x), BVal::Func(y)) => x.name() == y.name(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_coercion_arithmetic() {
        let r = add(BVal::Bool(true), BVal::Int(1)).unwrap();
        assert!(value_eq(&r, &BVal::Int(2)));
    }

    #[test]
    fn bool_string_repetition() {
        let mut budget = Budget::new(1 << 20);
        let r = mul(BVal::Bool(true), BVal::str("abc"), &mut budget).unwrap();
        assert!(value_eq(&r, &BVal::str("abc")));
        let mut budget = Budget::new(1 << 20);
        let r = mul(BVal::Bool(false), BVal::str("abc"), &mut budget).unwrap();
        assert!(value_eq(&r, &BVal::str("")));
    }

    #[test]
    fn float_equality_mixed() {
        let r = add(BVal::Float(0.1), BVal::Float(0.2)).unwrap();
        assert!(!value_eq(&r, &BVal::Float(0.3)));
    }

    #[test]
    fn overflow_is_reported() {
        let err = add(BVal::Int(i64::MAX), BVal::Int(1)).unwrap_err();
        assert_eq!(err, RuntimeError::Overflow);
    }

    #[test]
    fn division_by_zero() {
        let err = div(BVal::Int(1), BVal::Int(0)).unwrap_err();
        assert_eq!(err, RuntimeError::DivisionByZero);
    }

    #[test]
    fn pow_zero_to_zero_is_one() {
        let r = pow(BVal::Int(0), BVal::Int(0)).unwrap();
        assert!(value_eq(&r, &BVal::Int(1)));
    }
}
