//! The bytecode compiler: one post-order pass over the semantic-pass
//! output, emitting a flat `Program` with a deduplicated constant pool and
//! back-patched jumps.
//!
//! Instructions live in a flat, cache-friendly opcode vector; a parallel
//! `int_data` slot carries integer operands instead of per-variant
//! payloads, and jumps are recorded as placeholders by instruction index
//! and back-patched once the target is known.

use std::collections::HashMap;

use crate::ast::{BinOp, Expr, UnOp};
use crate::value::BVal;

/// An opcode. Operands, when present, live in the parallel `int_data` slot
/// at the same instruction index rather than embedded here — this keeps
/// `insts` a flat, cache-friendly `Vec<Op>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Const,
    Load,
    LoadAttr,
    LoadSubscript,
    NewArray,
    Add,
    Minus,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    UnaryPlus,
    UnaryMinus,
    UnaryNot,
    Br,
    BrIf,
    BrIfOrPop,
    BrIfFalseOrPop,
    Call,
    Return,
}

/// A compiled, immutable, reusable program.
#[derive(Debug, Clone)]
pub struct Program {
    pub insts: Vec<Op>,
    pub int_data: Vec<i64>,
    pub constants: Vec<BVal>,
}

impl Program {
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (i, op) in self.insts.iter().enumerate() {
            out.push_str(&format!("{:>4}: {:?} {}\n", i, op, self.int_data[i]));
        }
        out
    }
}

#[derive(PartialEq, Eq, Hash, Clone)]
enum ConstKey {
    Int(i64),
    FloatBits(u64),
    Str(String),
}

struct Compiler {
    insts: Vec<Op>,
    int_data: Vec<i64>,
    constants: Vec<BVal>,
    pool: HashMap<ConstKey, usize>,
}

impl Compiler {
    fn new() -> Compiler {
        // Pre-seed indices 0/1 (Bool) and 2..5 (small Int); these are the
        // most common constants and skip an allocation and a pool lookup.
        let constants = vec![
            BVal::Bool(false),
            BVal::Bool(true),
            BVal::Int(0),
            BVal::Int(1),
            BVal::Int(2),
            BVal::Int(3),
        ];
        let mut pool = HashMap::new();
        for i in 0..4i64 {
            pool.insert(ConstKey::Int(i), (i as usize) + 2);
        }
        Compiler { insts: Vec::new(), int_data: Vec::new(), constants, pool }
    }

    fn emit(&mut self, op: Op, operand: i64) -> usize {
        let idx = self.insts.len();
        self.insts.push(op);
        self.int_data.push(operand);
        idx
    }

    fn patch(&mut self, idx: usize, target: usize) {
        self.int_data[idx] = target as i64;
    }

    fn here(&self) -> usize {
        self.insts.len()
    }

    fn const_idx(&mut self, v: BVal) -> usize {
        let key = match &v {
            BVal::Bool(b) => return if *b { 1 } else { 0 },
            BVal::Int(i) if (0..=3).contains(i) => return (*i as usize) + 2,
            BVal::Int(i) => ConstKey::Int(*i),
            BVal::Float(f) => {
                let bits = if f.is_nan() { f64::NAN.to_bits() } else { f.to_bits() };
                ConstKey::FloatBits(bits)
            }
            BVal::Str(s) => ConstKey::Str(s.to_string()),
            _ => unreachable!("compiler only pools scalar constants"),
        };
        if let Some(&idx) = self.pool.get(&key) {
            return idx;
        }
        let idx = self.constants.len();
        self.constants.push(v);
        self.pool.insert(key, idx);
        idx
    }

    fn compile_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Value(..) => {
                unreachable!("Value nodes must be eliminated by the semantic pass before compiling")
            }
            Expr::Int(i) => {
                let idx = self.const_idx(BVal::Int(*i));
                self.emit(Op::Const, idx as i64);
            }
            Expr::Float(f) => {
                let idx = self.const_idx(BVal::Float(*f));
                self.emit(Op::Const, idx as i64);
            }
            Expr::Str(s) => {
                let idx = self.const_idx(BVal::str(s.as_str()));
                self.emit(Op::Const, idx as i64);
            }
            Expr::Bool(b) => {
                self.emit(Op::Const, if *b { 1 } else { 0 });
            }
            Expr::Ident(name) => {
                let idx = self.const_idx(BVal::str(name.as_str()));
                self.emit(Op::Load, idx as i64);
            }
            Expr::UnOp { op, val, .. } => {
                self.compile_expr(val);
                let op = match op {
                    UnOp::Plus => Op::UnaryPlus,
                    UnOp::Minus => Op::UnaryMinus,
                    UnOp::Not => Op::UnaryNot,
                };
                self.emit(op, 0);
            }
            Expr::BinOp { op: BinOp::And, left, right, .. } => {
                self.compile_expr(left);
                let placeholder = self.emit(Op::BrIfFalseOrPop, 0);
                self.compile_expr(right);
                self.patch(placeholder, self.here());
            }
            Expr::BinOp { op: BinOp::Or, left, right, .. } => {
                self.compile_expr(left);
                let placeholder = self.emit(Op::BrIfOrPop, 0);
                self.compile_expr(right);
                self.patch(placeholder, self.here());
            }
            Expr::BinOp { op, left, right, .. } => {
                self.compile_expr(left);
                self.compile_expr(right);
                self.emit(binop_opcode(*op), 0);
            }
            Expr::Cond { cond, then, els, .. } => {
                // Else branch first so the taken (`then`) path is a forward
                // jump.
                self.compile_expr(cond);
                let p1 = self.emit(Op::BrIf, 0);
                self.compile_expr(els);
                let p2 = self.emit(Op::Br, 0);
                self.patch(p1, self.here());
                self.compile_expr(then);
                self.patch(p2, self.here());
            }
            Expr::Call { base: None, method, args, .. } => {
                for a in args.iter().rev() {
                    self.compile_expr(a);
                }
                let idx = self.const_idx(BVal::str(method.as_str()));
                self.emit(Op::Load, idx as i64);
                self.emit(Op::Call, args.len() as i64);
            }
            Expr::Call { base: Some(base), method, args, .. } => {
                for a in args.iter().rev() {
                    self.compile_expr(a);
                }
                self.compile_expr(base);
                let idx = self.const_idx(BVal::str(method.as_str()));
                self.emit(Op::Const, idx as i64);
                self.emit(Op::LoadAttr, 0);
                self.emit(Op::Call, args.len() as i64);
            }
            Expr::FieldAccess { base, field, .. } => {
                self.compile_expr(base);
                let idx = self.const_idx(BVal::str(field.as_str()));
                self.emit(Op::Const, idx as i64);
                self.emit(Op::LoadAttr, 0);
            }
            Expr::IdxAccess { base, index, .. } => {
                self.compile_expr(base);
                self.compile_expr(index);
                self.emit(Op::LoadSubscript, 0);
            }
            Expr::Array { elems, .. } => {
                for e in elems.iter().rev() {
                    self.compile_expr(e);
                }
                self.emit(Op::NewArray, elems.len() as i64);
            }
        }
    }
}

fn binop_opcode(op: BinOp) -> Op {
    match op {
        BinOp::Add => Op::Add,
        BinOp::Sub => Op::Minus,
        BinOp::Mul => Op::Mul,
        BinOp::Div => Op::Div,
        BinOp::FloorDiv => Op::FloorDiv,
        BinOp::Mod => Op::Mod,
        BinOp::Pow => Op::Pow,
        BinOp::Lt => Op::Lt,
        BinOp::Gt => Op::Gt,
        BinOp::Le => Op::Le,
        BinOp::Ge => Op::Ge,
        BinOp::Eq => Op::Eq,
        BinOp::Ne => Op::Ne,
        BinOp::And | BinOp::Or => unreachable!("And/Or compiled via branch opcodes"),
    }
}

/// Compiles a finalized AST (post semantic pass, no `Value` nodes remaining)
/// into a `Program`.
pub fn compile(expr: &Expr) -> Program {
    let mut c = Compiler::new();
    c.compile_expr(expr);
    c.emit(Op::Return, 0);
    Program { insts: c.insts, int_data: c.int_data, constants: c.constants }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::semantic;

    fn compile_src(src: &str) -> Program {
        let mut e = parse(src).unwrap();
        let errs = semantic::run(&mut e);
        assert!(errs.is_empty(), "{:?}", errs);
        compile(&e)
    }

    #[test]
    fn folded_literal_emits_single_const() {
        let p = compile_src("1 + 10");
        assert_eq!(p.insts, vec![Op::Const, Op::Return]);
    }

    #[test]
    fn identifier_pools_its_name_once() {
        let p = compile_src("a + a");
        let load_count = p.insts.iter().filter(|op| **op == Op::Load).count();
        assert_eq!(load_count, 2);
        // Both Load instructions should reference the same pooled constant.
        let load_indices: Vec<i64> = p
            .insts
            .iter()
            .zip(p.int_data.iter())
            .filter(|(op, _)| **op == Op::Load)
            .map(|(_, idx)| *idx)
            .collect();
        assert_eq!(load_indices[0], load_indices[1]);
    }

    #[test]
    fn and_emits_short_circuit_branch() {
        let p = compile_src("a and b");
        assert!(p.insts.contains(&Op::BrIfFalseOrPop));
    }

    #[test]
    fn cond_emits_else_branch_first() {
        let p = compile_src("a ? b : c");
        assert!(p.insts.contains(&Op::BrIf));
        assert!(p.insts.contains(&Op::Br));
    }

    #[test]
    fn bool_uses_fixed_pool_indices() {
        let p = compile_src("true");
        assert_eq!(p.insts[0], Op::Const);
        assert_eq!(p.int_data[0], 1);
    }

    #[test]
    fn array_literal_emits_new_array() {
        let p = compile_src("[1, 2, 3]");
        assert!(p.insts.contains(&Op::NewArray));
    }
}
