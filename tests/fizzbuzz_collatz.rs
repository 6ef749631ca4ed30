//! A program compiled once and evaluated many times with different
//! environments must track a reference implementation exactly.

use exprlang::{compile, eval, BVal, CompileParams, Env};

fn fizzbuzz_reference(i: i64) -> String {
    if i % 15 == 0 {
        "fizzbuzz".to_string()
    } else if i % 3 == 0 {
        "fizz".to_string()
    } else if i % 5 == 0 {
        "buzz".to_string()
    } else {
        i.to_string()
    }
}

#[test]
fn fizzbuzz_matches_reference_over_0_to_99() {
    let src = "i % 3 ? i % 5 ? i : 'buzz' : i % 5 ? 'fizz' : 'fizzbuzz'";
    let (program, _) = compile(src, CompileParams::default()).unwrap();

    for i in 0..100i64 {
        let mut env = Env::new();
        env.insert("i", BVal::Int(i));
        let got = eval(&program, &env).unwrap();
        let expected = fizzbuzz_reference(i);
        match got {
            BVal::Int(n) => assert_eq!(expected, n.to_string(), "i={}", i),
            BVal::Str(s) => assert_eq!(expected, s.to_string(), "i={}", i),
            other => panic!("unexpected result {:?} for i={}", other, i),
        }
    }
}

#[test]
fn collatz_matches_reference_from_1000() {
    let src = "i % 2 == 0 ? i // 2 : 3 * i + 1";
    let (program, _) = compile(src, CompileParams::default()).unwrap();

    let mut i: i64 = 1000;
    let mut steps = 0;
    while i != 1 {
        let mut env = Env::new();
        env.insert("i", BVal::Int(i));
        let next = match eval(&program, &env).unwrap() {
            BVal::Int(n) => n,
            other => panic!("unexpected result {:?}", other),
        };
        let reference = if i % 2 == 0 { i / 2 } else { 3 * i + 1 };
        assert_eq!(next, reference, "step {} from i={}", steps, i);
        i = next;
        steps += 1;
        assert!(steps < 10_000, "collatz sequence did not converge");
    }
}
