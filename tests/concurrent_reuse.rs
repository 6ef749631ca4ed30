//! A compiled `Program` is an immutable artifact: many threads may evaluate
//! it concurrently, each with its own VM state and environment.

use std::sync::Arc;
use std::thread;

use exprlang::{compile, eval, BVal, CompileParams, Env};

mod common;

#[test]
fn concurrent_evaluations_match_single_threaded_results() {
    common::init_tracing();
    let (program, _) = compile("i % 3 ? i % 5 ? i : 'buzz' : i % 5 ? 'fizz' : 'fizzbuzz'", CompileParams::default())
        .unwrap();
    let program = Arc::new(program);

    let expected: Vec<BVal> = (0..100i64)
        .map(|i| {
            let mut env = Env::new();
            env.insert("i", BVal::Int(i));
            eval(&program, &env).unwrap()
        })
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let program = Arc::clone(&program);
            let expected = expected.clone();
            thread::spawn(move || {
                for i in (t..100).step_by(8) {
                    let mut env = Env::new();
                    env.insert("i", BVal::Int(i as i64));
                    let got = eval(&program, &env).unwrap();
                    assert_eq!(got, expected[i as usize]);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}
