//! The stack-based virtual machine.
//!
//! VM state is created fresh per `eval` call: no persistent state is shared
//! across evaluations, which is what makes a compiled `Program` safely
//! re-usable across threads.

use crate::compiler::{Op, Program};
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::value::{self, BVal, Budget};

/// Host-tunable resource bounds.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_instructions: usize,
    pub max_memory: usize,
}

impl Default for Limits {
    fn default() -> Limits {
        Limits { max_instructions: 1000, max_memory: 1 << 20 }
    }
}

struct Vm<'a> {
    program: &'a Program,
    env: &'a dyn Environment,
    stack: Vec<BVal>,
    pc: usize,
    executed: usize,
    limits: Limits,
    budget: Budget,
}

pub fn eval(program: &Program, env: &dyn Environment, limits: Limits) -> Result<BVal, RuntimeError> {
    let mut vm = Vm {
        program,
        env,
        stack: Vec::with_capacity(64),
        pc: 0,
        executed: 0,
        limits,
        budget: Budget::new(limits.max_memory),
    };
    vm.run()
}

impl<'a> Vm<'a> {
    fn pop(&mut self) -> BVal {
        self.stack.pop().expect("compiler emits a balanced stack effect per opcode")
    }

    fn run(&mut self) -> Result<BVal, RuntimeError> {
        loop {
            if self.pc >= self.program.insts.len() {
                break;
            }
            if self.executed >= self.limits.max_instructions {
                return Err(RuntimeError::InstructionLimit);
            }
            self.executed += 1;

            let op = self.program.insts[self.pc];
            let operand = self.program.int_data[self.pc];
            tracing::trace!(pc = self.pc, ?op, operand, "vm step");

            let mut jumped = false;
            match op {
                Op::Const => {
                    let v = self.program.constants[operand as usize].clone();
                    self.stack.push(v);
                }
                Op::Load => {
                    let name = match &self.program.constants[operand as usize] {
                        BVal::Str(s) => s.clone(),
                        _ => unreachable!("Load operand always indexes a Str constant"),
                    };
                    let v = self
                        .env
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| RuntimeError::NameError(name.to_string()))?;
                    self.stack.push(v);
                }
                Op::LoadAttr => {
                    let field = self.pop();
                    let base = self.pop();
                    let field_name = match &field {
                        BVal::Str(s) => s.clone(),
                        _ => unreachable!("LoadAttr field operand is always a Str constant"),
                    };
                    match &base {
                        BVal::Object(map) => {
                            let v = map.get(field_name.as_ref()).cloned().ok_or_else(|| {
                                RuntimeError::AttributeError(format!(
                                    "object has no attribute '{}'",
                                    field_name
                                ))
                            })?;
                            self.stack.push(v);
                        }
                        other => {
                            return Err(RuntimeError::AttributeError(format!(
                                "'{}' object has no attribute '{}'",
                                other.type_name(),
                                field_name
                            )))
                        }
                    }
                }
                Op::LoadSubscript => {
                    let index = self.pop();
                    let base = self.pop();
                    match (&base, &index) {
                        (BVal::Array(arr), BVal::Int(i)) => {
                            let i = *i;
                            if i < 0 || i as usize >= arr.len() {
                                return Err(RuntimeError::IndexError(format!(
                                    "index {} out of range for array of length {}",
                                    i,
                                    arr.len()
                                )));
                            }
                            self.stack.push(arr[i as usize].clone());
                        }
                        (BVal::Array(_), _) => {
                            return Err(RuntimeError::TypeError(format!(
                                "array index must be int, not {}",
                                index.type_name()
                            )))
                        }
                        _ => {
                            return Err(RuntimeError::TypeError(format!(
                                "'{}' object is not subscriptable",
                                base.type_name()
                            )))
                        }
                    }
                }
                Op::NewArray => {
                    let n = operand as usize;
                    self.budget.reserve(n)?;
                    let mut elems = Vec::with_capacity(n);
                    for _ in 0..n {
                        elems.push(self.pop());
                    }
                    self.stack.push(BVal::array(elems));
                }
                Op::Add => self.binop(value::add)?,
                Op::Minus => self.binop(value::sub)?,
                Op::Mul => {
                    let b = self.pop();
                    let a = self.pop();
                    self.stack.push(value::mul(a, b, &mut self.budget)?);
                }
                Op::Div => self.binop(value::div)?,
                Op::FloorDiv => self.binop(value::floordiv)?,
                Op::Mod => self.binop(value::modulo)?,
                Op::Pow => self.binop(value::pow)?,
                Op::Lt | Op::Gt | Op::Le | Op::Ge => {
                    let b = self.pop();
                    let a = self.pop();
                    let ord = value::cmp(&a, &b)?;
                    let binop = match op {
                        Op::Lt => crate::ast::BinOp::Lt,
                        Op::Gt => crate::ast::BinOp::Gt,
                        Op::Le => crate::ast::BinOp::Le,
                        Op::Ge => crate::ast::BinOp::Ge,
                        _ => unreachable!(),
                    };
                    self.stack.push(BVal::Bool(value::ord_to_bool(binop, ord)));
                }
                Op::Eq => {
                    let b = self.pop();
                    let a = self.pop();
                    self.stack.push(BVal::Bool(value::value_eq(&a, &b)));
                }
                Op::Ne => {
                    let b = self.pop();
                    let a = self.pop();
                    self.stack.push(BVal::Bool(!value::value_eq(&a, &b)));
                }
                Op::UnaryPlus => {
                    let a = self.pop();
                    self.stack.push(value::unary_plus(a)?);
                }
                Op::UnaryMinus => {
                    let a = self.pop();
                    self.stack.push(value::negate(a)?);
                }
                Op::UnaryNot => {
                    let a = self.pop();
                    self.stack.push(value::unary_not(&a));
                }
                Op::Br => {
                    self.pc = operand as usize;
                    jumped = true;
                }
                Op::BrIf => {
                    let a = self.pop();
                    if a.truthy() {
                        self.pc = operand as usize;
                        jumped = true;
                    }
                }
                Op::BrIfOrPop => {
                    if self.stack.last().expect("non-empty stack").truthy() {
                        self.pc = operand as usize;
                        jumped = true;
                    } else {
                        self.pop();
                    }
                }
                Op::BrIfFalseOrPop => {
                    if !self.stack.last().expect("non-empty stack").truthy() {
                        self.pc = operand as usize;
                        jumped = true;
                    } else {
                        self.pop();
                    }
                }
                Op::Call => {
                    let n = operand as usize;
                    let callee = self.pop();
                    let f = match &callee {
                        BVal::Func(f) => f,
                        other => {
                            return Err(RuntimeError::TypeError(format!(
                                "'{}' object is not callable",
                                other.type_name()
                            )))
                        }
                    };
                    if f.arity() != n {
                        return Err(RuntimeError::Other(format!(
                            "{}() takes {} argument(s) but {} were given",
                            f.name(),
                            f.arity(),
                            n
                        )));
                    }
                    let mut args = Vec::with_capacity(n);
                    for _ in 0..n {
                        args.push(self.pop());
                    }
                    let result = f.call(&args).map_err(|e| {
                        tracing::warn!(function = f.name(), error = %e, "host function aborted evaluation");
                        e
                    })?;
                    self.stack.push(result);
                }
                Op::Return => break,
            }

            if !jumped {
                self.pc += 1;
            }
        }

        Ok(self.stack.pop().unwrap_or(BVal::Null))
    }

    fn binop(
        &mut self,
        f: impl Fn(BVal, BVal) -> Result<BVal, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let b = self.pop();
        let a = self.pop();
        self.stack.push(f(a, b)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;
    use crate::CompileParams;

    fn run(src: &str, env: &Env) -> BVal {
        let (program, _) = crate::compile(src, CompileParams::default()).unwrap();
        eval(&program, env, Limits::default()).unwrap()
    }

    #[test]
    fn simple_arithmetic() {
        let env = Env::new();
        assert_eq!(run("1 + 10", &env), BVal::Int(11));
    }

    #[test]
    fn division_promotes_to_float() {
        let env = Env::new();
        assert_eq!(run("100 / 10 * 3", &env), BVal::Float(30.0));
    }

    #[test]
    fn array_indexing_and_out_of_range() {
        let env = Env::new();
        assert_eq!(run("[1, 2, 3][0]", &env), BVal::Int(1));
        let (program, _) = crate::compile("[1, 2, 3][5]", CompileParams::default()).unwrap();
        let err = eval(&program, &env, Limits::default()).unwrap_err();
        assert!(matches!(err, RuntimeError::IndexError(_)));
    }

    #[test]
    fn short_circuit_or_never_loads_unknown_name() {
        let env = Env::new();
        assert_eq!(run("10 or unknownvar and otherunknown", &env), BVal::Int(10));
    }

    #[test]
    fn name_error_on_missing_identifier() {
        let env = Env::new();
        let (program, _) = crate::compile("missing", CompileParams::default()).unwrap();
        let err = eval(&program, &env, Limits::default()).unwrap_err();
        assert!(matches!(err, RuntimeError::NameError(_)));
    }

    #[test]
    fn instruction_limit_is_enforced() {
        let env = Env::new();
        let (program, _) = crate::compile("1 + 1", CompileParams::default()).unwrap();
        let tiny = Limits { max_instructions: 0, max_memory: 1 << 20 };
        let err = eval(&program, &env, tiny).unwrap_err();
        assert_eq!(err, RuntimeError::InstructionLimit);
    }
}
