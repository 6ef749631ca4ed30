//! An embeddable, resource-bounded expression language.
//!
//! A host passes a single expression string plus a name → value environment
//! and gets back one computed [`BVal`]. Evaluation is single-threaded,
//! loop-free, and bounded by an instruction count and a memory budget, so it
//! is safe to run against untrusted, user-supplied formulas.
//!
//! Pipeline: [`lexer`] → [`parser`] → [`semantic`] → [`compiler`] → [`vm`].
//! A compiled [`Program`] is immutable and may be evaluated repeatedly,
//! including concurrently from separate threads, each with its own
//! environment.
//!
//! ```
//! use exprlang::{eval_string, Env};
//!
//! let mut env = Env::new();
//! env.insert("a", exprlang::BVal::Int(43));
//! let result = eval_string("a % 3 ? 'fizz' : 'buzz'", &env).unwrap();
//! assert_eq!(result, exprlang::BVal::str("fizz"));
//! ```

pub mod ast;
pub mod compiler;
pub mod debug;
pub mod env;
pub mod error;
pub mod host;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod stdlib;
pub mod token;
pub mod value;
pub mod vm;

pub use ast::Expr;
pub use compiler::Program;
pub use debug::DebugTrace;
pub use env::{Env, Environment};
pub use error::Error;
pub use token::Position;
pub use value::BVal;
pub use vm::Limits;

/// Options accepted by [`compile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileParams {
    /// When set, `compile` also returns a [`DebugTrace`] of the AST after
    /// each pipeline stage and the final constant pool / disassembly.
    pub debug: bool,
}

/// Parses `source` into an AST. The result still contains `Expr::Value`
/// nodes — the semantic pass (`compile`) eliminates them. Exposed
/// separately from `compile` so a host can inspect the raw parse tree.
pub fn parse(source: &str) -> Result<Expr, Error> {
    parser::parse(source)
}

/// Parses, runs the semantic/optimizer pass, and emits bytecode.
///
/// Best-effort: semantic errors accumulate across all three sub-passes
/// before being returned together as a single `Error::Compile`; a program
/// is never returned alongside errors.
pub fn compile(
    source: &str,
    params: CompileParams,
) -> Result<(Program, Option<DebugTrace>), Error> {
    let mut expr = parser::parse(source)?;
    tracing::debug!(len = source.len(), "parse complete");

    let mut trace = params.debug.then(DebugTrace::default);
    if let Some(t) = trace.as_mut() {
        t.ast_after_parse = DebugTrace::snapshot_ast(&expr);
    }

    let mut errors = Vec::new();

    semantic::parse_value(&mut expr, &mut errors);
    tracing::debug!(errors = errors.len(), "semantic pass: parse_value complete");
    if let Some(t) = trace.as_mut() {
        t.ast_after_parse_value = DebugTrace::snapshot_ast(&expr);
    }

    semantic::const_fold(&mut expr, &mut errors);
    tracing::debug!(errors = errors.len(), "semantic pass: const_fold complete");
    if let Some(t) = trace.as_mut() {
        t.ast_after_const_fold = DebugTrace::snapshot_ast(&expr);
    }

    semantic::const_push_down(&mut expr, &mut errors);
    tracing::debug!(errors = errors.len(), "semantic pass: const_push_down complete");
    if let Some(t) = trace.as_mut() {
        t.ast_after_const_pushdown = DebugTrace::snapshot_ast(&expr);
    }

    if !errors.is_empty() {
        return Err(errors.into());
    }

    let program = compiler::compile(&expr);
    tracing::debug!(instructions = program.insts.len(), "compile complete");
    if let Some(t) = trace.as_mut() {
        let (constants, disassembly) = DebugTrace::snapshot_program(&program);
        t.constants = constants;
        t.disassembly = disassembly;
    }

    Ok((program, trace))
}

/// Evaluates a compiled program against any [`Environment`], with custom
/// resource [`Limits`].
pub fn eval_with_env(
    program: &Program,
    env: &dyn Environment,
    limits: Limits,
) -> Result<BVal, Error> {
    vm::eval(program, env, limits).map_err(Error::Runtime)
}

/// Evaluates a compiled program against an [`Env`] with the default
/// resource limits.
pub fn eval(program: &Program, env: &Env) -> Result<BVal, Error> {
    eval_with_env(program, env, Limits::default())
}

/// Compiles and evaluates `source` in one call, using default limits.
/// Compile errors (there may be several) are concatenated into one `Error`.
pub fn eval_string(source: &str, env: &dyn Environment) -> Result<BVal, Error> {
    let (program, _) = compile(source, CompileParams::default())?;
    eval_with_env(&program, env, Limits::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_fizzbuzz_example() {
        let mut env = Env::new();
        env.insert("a", BVal::Int(43));
        env.insert("fizz", BVal::str("fizz"));
        env.insert("buzz", BVal::str("buzz"));
        let r = eval_string("a % 3 ? fizz : buzz", &env).unwrap();
        assert_eq!(r, BVal::str("fizz"));
    }

    #[test]
    fn compile_errors_abort_before_eval() {
        let err = compile("1 + 101000000000000000 * 20000000000000000", CompileParams::default())
            .unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
    }

    #[test]
    fn debug_trace_is_populated_on_request() {
        let (_program, trace) = compile("1 + 1", CompileParams { debug: true }).unwrap();
        let trace = trace.unwrap();
        assert!(!trace.ast_after_parse.is_empty());
        assert!(!trace.disassembly.is_empty());
    }

    #[test]
    fn program_is_reusable_across_evaluations() {
        let (program, _) = compile("a + 1", CompileParams::default()).unwrap();
        for i in 0..5 {
            let mut env = Env::new();
            env.insert("a", BVal::Int(i));
            assert_eq!(eval(&program, &env).unwrap(), BVal::Int(i + 1));
        }
    }
}
