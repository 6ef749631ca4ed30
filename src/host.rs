//! Host-function marshaling.
//!
//! A reflection-based "inspect the host callable's parameter count" design
//! doesn't translate to Rust; the portable replacement is a trait-object
//! `Callable` plus explicit arity, which is what's implemented here. No
//! per-arity generic helpers are needed the way they might be in a language
//! without slices: every `Callable` receives its arguments as `&[BVal]`.

use std::fmt;
use std::sync::Arc;

use crate::error::RuntimeError;
use crate::value::BVal;

/// A host-supplied function, callable from within an evaluation.
///
/// `Send + Sync` because a `BVal::Func` lives in a compiled `Program`'s
/// constant pool, and a compiled program must be safe to evaluate
/// concurrently from separate threads.
pub trait Callable: Send + Sync {
    fn name(&self) -> &str;
    fn arity(&self) -> usize;
    fn call(&self, args: &[BVal]) -> Result<BVal, RuntimeError>;
}

/// Wraps a closure of shape (a): takes args, returns nothing — the wrapped
/// `Func`'s result is always `Null`.
struct UnitFn<F> {
    name: String,
    arity: usize,
    f: F,
}

impl<F: Fn(&[BVal]) + Send + Sync> Callable for UnitFn<F> {
    fn name(&self) -> &str {
        &self.name
    }
    fn arity(&self) -> usize {
        self.arity
    }
    fn call(&self, args: &[BVal]) -> Result<BVal, RuntimeError> {
        (self.f)(args);
        Ok(BVal::Null)
    }
}

/// Wraps a closure of shape (b): returns one `BVal` and never fails.
struct ValueFn<F> {
    name: String,
    arity: usize,
    f: F,
}

impl<F: Fn(&[BVal]) -> BVal + Send + Sync> Callable for ValueFn<F> {
    fn name(&self) -> &str {
        &self.name
    }
    fn arity(&self) -> usize {
        self.arity
    }
    fn call(&self, args: &[BVal]) -> Result<BVal, RuntimeError> {
        Ok((self.f)(args))
    }
}

/// Wraps a closure of shape (c): returns `Result<BVal, RuntimeError>`.
struct ResultFn<F> {
    name: String,
    arity: usize,
    f: F,
}

impl<F: Fn(&[BVal]) -> Result<BVal, RuntimeError> + Send + Sync> Callable for ResultFn<F> {
    fn name(&self) -> &str {
        &self.name
    }
    fn arity(&self) -> usize {
        self.arity
    }
    fn call(&self, args: &[BVal]) -> Result<BVal, RuntimeError> {
        (self.f)(args)
    }
}

/// Wraps signature (a): `Fn(&[BVal])`.
pub fn from_unit_fn(
    name: impl Into<String>,
    arity: usize,
    f: impl Fn(&[BVal]) + Send + Sync + 'static,
) -> BVal {
    BVal::Func(Arc::new(UnitFn { name: name.into(), arity, f }))
}

/// Wraps signature (b): `Fn(&[BVal]) -> BVal`.
pub fn from_value_fn(
    name: impl Into<String>,
    arity: usize,
    f: impl Fn(&[BVal]) -> BVal + Send + Sync + 'static,
) -> BVal {
    BVal::Func(Arc::new(ValueFn { name: name.into(), arity, f }))
}

/// Wraps signature (c): `Fn(&[BVal]) -> Result<BVal, RuntimeError>`.
pub fn from_result_fn(
    name: impl Into<String>,
    arity: usize,
    f: impl Fn(&[BVal]) -> Result<BVal, RuntimeError> + Send + Sync + 'static,
) -> BVal {
    BVal::Func(Arc::new(ResultFn { name: name.into(), arity, f }))
}

impl fmt::Debug for dyn Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}/{}>", self.name(), self.arity())
    }
}
