//! End-to-end scenarios: arithmetic laws, and concrete evaluations
//! against a standard seed environment.

use std::collections::HashMap;

use exprlang::{eval_string, BVal, Env};

mod common;

fn seed_env() -> Env {
    common::init_tracing();
    let mut env = Env::new();
    env.insert("a", BVal::Int(43));
    env.insert("b", BVal::Int(2));
    env.insert("c", BVal::Int(15));
    env.insert("foo", BVal::Float(10.5));
    env.insert("fizz", BVal::str("fizz"));
    env.insert("buzz", BVal::str("buzz"));
    env.insert("fizzbuzz", BVal::str("fizzbuzz"));

    let mut foo_obj = HashMap::new();
    foo_obj.insert("bar".to_string(), BVal::Int(10));
    foo_obj.insert(
        "baz".to_string(),
        exprlang::host::from_value_fn("baz", 1, |args| match &args[0] {
            BVal::Int(i) => BVal::Float(*i as f64 * 43.4),
            BVal::Float(f) => BVal::Float(f * 43.4),
            _ => BVal::Null,
        }),
    );
    env.insert("fooObj", BVal::object(foo_obj));

    env
}

#[test]
fn scenario_1_simple_add() {
    let env = seed_env();
    assert_eq!(eval_string("1 + 10", &env).unwrap(), BVal::Int(11));
}

#[test]
fn scenario_2_division_promotes_to_float() {
    let env = seed_env();
    assert_eq!(eval_string("100 / 10 * 3", &env).unwrap(), BVal::Float(30.0));
}

#[test]
fn scenario_3_nested_ternary_and_float_mul() {
    let env = seed_env();
    assert_eq!(
        eval_string("((10 * 3.0) ? 3 : 10) * 5.0", &env).unwrap(),
        BVal::Float(15.0)
    );
}

#[test]
fn scenario_4_modulo_selects_fizz() {
    let env = seed_env();
    assert_eq!(eval_string("a % 3 ? fizz : buzz", &env).unwrap(), BVal::str("fizz"));
}

#[test]
fn scenario_5_method_call_on_object() {
    let env = seed_env();
    assert_eq!(eval_string("fooObj.baz(30) * 10", &env).unwrap(), BVal::Float(13020.0));
}

#[test]
fn scenario_6_array_indexing_in_and_out_of_range() {
    let env = seed_env();
    assert_eq!(eval_string("[1, 2, 3][0]", &env).unwrap(), BVal::Int(1));
    let err = eval_string("[1, 2, 3][5]", &env).unwrap_err();
    assert!(matches!(err, exprlang::Error::Runtime(exprlang::error::RuntimeError::IndexError(_))));
}

#[test]
fn scenario_7_short_circuit_or_folds_at_compile_time() {
    let env = seed_env();
    assert_eq!(
        eval_string("10 or unknownvar and otherunknown", &env).unwrap(),
        BVal::Int(10)
    );
}

#[test]
fn arithmetic_overflow_is_reported_not_wrapped() {
    let env = seed_env();
    let err = eval_string("1 + 101000000000000000 * 20000000000000000", &env).unwrap_err();
    assert!(matches!(err, exprlang::Error::Compile(_)));
}

#[test]
fn division_by_zero_is_reported() {
    let env = seed_env();
    let err = eval_string("1 / 0", &env).unwrap_err();
    assert!(matches!(
        err,
        exprlang::Error::Runtime(exprlang::error::RuntimeError::DivisionByZero)
    ));
}

#[test]
fn float_equality_on_mixed_sums_is_false() {
    let env = seed_env();
    assert_eq!(eval_string("0.1 + 0.2 == 0.3", &env).unwrap(), BVal::Bool(false));
}

#[test]
fn bool_coercion_laws() {
    let env = seed_env();
    assert_eq!(eval_string("true + 1 == 2", &env).unwrap(), BVal::Bool(true));
    assert_eq!(eval_string("true * 'abc' == 'abc'", &env).unwrap(), BVal::Bool(true));
    assert_eq!(eval_string("false * 'abc' == ''", &env).unwrap(), BVal::Bool(true));
}
