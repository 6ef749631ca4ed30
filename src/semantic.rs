//! The semantic / optimizer pass: `ParseValue`, `ConstFold`, `ConstPushDown`,
//! run in that order over the freshly parsed AST.
//!
//! Built on the generic walker in [`crate::ast`]: each sub-pass here is a
//! [`crate::ast::Visitor`] rather than a bespoke recursive function, so the
//! traversal order and rewrite-in-place behavior are defined once and
//! reused three times.

use crate::ast::{walk_post_order, walk_pre_order, BinOp, Expr, RawLiteral, UnOp, Visitor};
use crate::error::CompileErrorItem;
use crate::token::{IntBase, Position};
use crate::value::{self, BVal, Budget};

/// Runs all three sub-passes in order. Returns every error accumulated
/// across all of them: callers must not compile a program when this
/// returns a non-empty `Vec`.
pub fn run(expr: &mut Expr) -> Vec<CompileErrorItem> {
    let mut errors = Vec::new();
    parse_value(expr, &mut errors);
    const_fold(expr, &mut errors);
    const_push_down(expr, &mut errors);
    errors
}

/// Exposed separately so `compile(.., debug: true)` can snapshot the AST
/// between sub-passes.
pub fn parse_value(expr: &mut Expr, errors: &mut Vec<CompileErrorItem>) {
    walk_post_order(expr, &mut ParseValuePass, errors);
}

/// Folds literal-only subtrees into a single literal, preserving
/// short-circuit semantics for `and`/`or` and skipping the untaken branch
/// of a `Cond` whose condition is constant.
pub fn const_fold(expr: &mut Expr, errors: &mut Vec<CompileErrorItem>) {
    walk_post_order(expr, &mut ConstFoldPass, errors);
}

/// Combines adjacent constants across associative/commutative operator
/// chains that `const_fold` alone can't reach, e.g. `(x + 1) + 2` folds
/// the two literals into `x + 3`.
pub fn const_push_down(expr: &mut Expr, errors: &mut Vec<CompileErrorItem>) {
    walk_pre_order(expr, &mut ConstPushDownPass, errors);
}

fn err(pos: Position, msg: impl Into<String>) -> CompileErrorItem {
    CompileErrorItem { pos: Some(pos), msg: msg.into() }
}

// ParseValue
// --------------------------------------------------

struct ParseValuePass;

impl Visitor for ParseValuePass {
    fn visit(&mut self, expr: &mut Expr, errors: &mut Vec<CompileErrorItem>) {
        let (lit, pos) = match expr {
            Expr::Value(lit, pos) => (lit.clone(), *pos),
            _ => return,
        };
        *expr = match lit {
            RawLiteral::Int(base, digits) => match parse_int(base, &digits) {
                Ok(i) => Expr::Int(i),
                Err(msg) => {
                    errors.push(err(pos, msg));
                    Expr::Int(0)
                }
            },
            RawLiteral::Float(text) => match text.parse::<f64>() {
                Ok(f) => Expr::Float(f),
                Err(_) => {
                    errors.push(err(pos, format!("malformed float literal '{}'", text)));
                    Expr::Float(0.0)
                }
            },
            RawLiteral::Str(s) => Expr::Str(s),
            RawLiteral::Ident(name) => Expr::Ident(name),
            RawLiteral::Bool(b) => Expr::Bool(b),
        };
    }
}

fn parse_int(base: IntBase, digits: &str) -> Result<i64, String> {
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return Err("empty integer literal".to_string());
    }
    let radix = match base {
        IntBase::Dec => 10,
        IntBase::Hex => 16,
        IntBase::Oct => 8,
        IntBase::Bin => 2,
    };
    i64::from_str_radix(&cleaned, radix).map_err(|_| format!("integer literal overflow: '{}'", digits))
}

// ConstFold
// --------------------------------------------------

struct ConstFoldPass;

impl Visitor for ConstFoldPass {
    fn visit(&mut self, expr: &mut Expr, errors: &mut Vec<CompileErrorItem>) {
        let placeholder = Expr::Bool(false);
        let node = std::mem::replace(expr, placeholder);
        *expr = match node {
            Expr::UnOp { op, val, pos } => fold_unop(op, *val, pos, errors),
            Expr::BinOp { op, left, right, pos } => fold_binop(op, *left, *right, pos, errors),
            Expr::Cond { cond, then, els, pos } => fold_cond(*cond, *then, *els, pos),
            other => other,
        };
    }
}

fn expr_truthy(e: &Expr) -> bool {
    literal_to_bval(e).map(|v| v.truthy()).unwrap_or(true)
}

fn literal_to_bval(e: &Expr) -> Option<BVal> {
    match e {
        Expr::Int(i) => Some(BVal::Int(*i)),
        Expr::Float(f) => Some(BVal::Float(*f)),
        Expr::Str(s) => Some(BVal::str(s.clone())),
        Expr::Bool(b) => Some(BVal::Bool(*b)),
        _ => None,
    }
}

fn bval_to_literal(v: BVal) -> Expr {
    match v {
        BVal::Int(i) => Expr::Int(i),
        BVal::Float(f) => Expr::Float(f),
        BVal::Str(s) => Expr::Str(s.to_string()),
        BVal::Bool(b) => Expr::Bool(b),
        _ => unreachable!("const folding never produces a non-scalar literal"),
    }
}

fn fold_unop(op: UnOp, val: Expr, pos: Position, errors: &mut Vec<CompileErrorItem>) -> Expr {
    match op {
        UnOp::Plus => match &val {
            Expr::Int(_) | Expr::Float(_) => val,
            Expr::Bool(b) => Expr::Int(if *b { 1 } else { 0 }),
            Expr::Str(_) => {
                errors.push(err(pos, "TypeError: bad operand type for unary +: string"));
                Expr::Int(0)
            }
            Expr::Array { .. } => {
                errors.push(err(pos, "TypeError: bad operand type for unary +: array"));
                Expr::Int(0)
            }
            _ => Expr::UnOp { op, val: Box::new(val), pos },
        },
        UnOp::Minus => match &val {
            Expr::Int(i) => match i.checked_neg() {
                Some(n) => Expr::Int(n),
                None => {
                    errors.push(err(pos, "ArithmeticError: Overflow"));
                    Expr::Int(0)
                }
            },
            Expr::Float(f) => Expr::Float(-f),
            Expr::Bool(b) => Expr::Int(if *b { -1 } else { 0 }),
            Expr::Array { .. } => {
                errors.push(err(pos, "TypeError: bad operand type for unary -: array"));
                Expr::Int(0)
            }
            _ => Expr::UnOp { op, val: Box::new(val), pos },
        },
        UnOp::Not => match &val {
            Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) => {
                Expr::Bool(!expr_truthy(&val))
            }
            Expr::Array { elems, .. } => Expr::Bool(elems.is_empty()),
            _ => Expr::UnOp { op, val: Box::new(val), pos },
        },
    }
}

fn fold_cond(cond: Expr, then: Expr, els: Expr, pos: Position) -> Expr {
    if cond.is_const_literal() {
        if expr_truthy(&cond) { then } else { els }
    } else {
        Expr::Cond { cond: Box::new(cond), then: Box::new(then), els: Box::new(els), pos }
    }
}

fn fold_binop(
    op: BinOp,
    left: Expr,
    right: Expr,
    pos: Position,
    errors: &mut Vec<CompileErrorItem>,
) -> Expr {
    match op {
        BinOp::Or => {
            if left.is_const_literal() {
                return if expr_truthy(&left) { left } else { right };
            }
        }
        BinOp::And => {
            if left.is_const_literal() && !expr_truthy(&left) {
                return left;
            }
            if right.is_const_literal() && !expr_truthy(&right) {
                return right;
            }
        }
        _ => {}
    }

    if matches!(op, BinOp::And | BinOp::Or) {
        return Expr::BinOp { op, left: Box::new(left), right: Box::new(right), pos };
    }

    if left.is_const_literal() && right.is_const_literal() {
        return match eval_const_binop(op, &left, &right) {
            Ok(v) => v,
            Err(msg) => {
                errors.push(err(pos, msg));
                Expr::Int(0)
            }
        };
    }

    if op.is_commutative() && left.is_const_literal() && !right.is_const_literal() {
        return Expr::BinOp { op, left: Box::new(right), right: Box::new(left), pos };
    }

    Expr::BinOp { op, left: Box::new(left), right: Box::new(right), pos }
}

fn eval_const_binop(op: BinOp, left: &Expr, right: &Expr) -> Result<Expr, String> {
    let a = literal_to_bval(left).expect("caller checked is_const_literal");
    let b = literal_to_bval(right).expect("caller checked is_const_literal");
    // A literal `'a' * 999999999999999` never touches an `Env` or the VM's
    // own budget, so constant folding must enforce its own cap here — the
    // default memory limit is the only bound a pure-literal fold ever sees.
    let mut budget = Budget::new(crate::vm::Limits::default().max_memory);
    let result = match op {
        BinOp::Add => value::add(a, b),
        BinOp::Sub => value::sub(a, b),
        BinOp::Mul => value::mul(a, b, &mut budget),
        BinOp::Div => value::div(a, b),
        BinOp::FloorDiv => value::floordiv(a, b),
        BinOp::Mod => value::modulo(a, b),
        BinOp::Pow => value::pow(a, b),
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
            value::cmp(&a, &b).map(|ord| BVal::Bool(value::ord_to_bool(op, ord)))
        }
        BinOp::Eq => Ok(BVal::Bool(value::value_eq(&a, &b))),
        BinOp::Ne => Ok(BVal::Bool(!value::value_eq(&a, &b))),
        BinOp::And | BinOp::Or => unreachable!("handled before reaching eval_const_binop"),
    };
    result.map(bval_to_literal).map_err(|e| e.to_string())
}

// ConstPushDown
// --------------------------------------------------

struct ConstPushDownPass;

impl Visitor for ConstPushDownPass {
    fn visit(&mut self, expr: &mut Expr, errors: &mut Vec<CompileErrorItem>) {
        let Expr::BinOp { op, left, right, pos } = expr else { return };
        if !op.is_commutative() || !right.is_const_literal() {
            return;
        }
        let Expr::BinOp { op: inner_op, left: inner_left, right: inner_right, .. } = left.as_mut()
        else {
            return;
        };
        if *inner_op != *op || !inner_right.is_const_literal() {
            return;
        }

        match eval_const_binop(*op, inner_right, right) {
            Ok(folded) => {
                let op = *op;
                let pos = *pos;
                let inner_left = std::mem::replace(inner_left.as_mut(), Expr::Bool(false));
                *expr = Expr::BinOp {
                    op,
                    left: Box::new(inner_left),
                    right: Box::new(folded),
                    pos,
                };
            }
            Err(msg) => errors.push(err(*pos, msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run_semantic(src: &str) -> (Expr, Vec<CompileErrorItem>) {
        let mut e = parse(src).unwrap();
        let errs = run(&mut e);
        (e, errs)
    }

    #[test]
    fn folds_simple_arithmetic() {
        let (e, errs) = run_semantic("1 + 10");
        assert!(errs.is_empty());
        assert_eq!(e, Expr::Int(11));
    }

    #[test]
    fn short_circuit_or_keeps_unknown_unevaluated() {
        // `10 or unknownvar` should fold to the constant 10 without
        // requiring `unknownvar` to be anything but an `Ident` node still.
        let (e, _errs) = run_semantic("10 or unknownvar and otherunknown");
        assert_eq!(e, Expr::Int(10));
    }

    #[test]
    fn const_push_down_combines_adjacent_constants() {
        let (e, errs) = run_semantic("numHours * 24 * 60");
        assert!(errs.is_empty());
        match e {
            Expr::BinOp { op: BinOp::Mul, left, right, .. } => {
                assert!(matches!(*left, Expr::Ident(ref s) if s == "numHours"));
                assert_eq!(*right, Expr::Int(1440));
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn not_on_empty_array_is_true() {
        let (e, _) = run_semantic("not []");
        assert_eq!(e, Expr::Bool(true));
    }

    #[test]
    fn overflow_during_fold_is_a_compile_error() {
        let (_e, errs) = run_semantic("1 + 101000000000000000 * 20000000000000000");
        assert!(!errs.is_empty());
    }

    #[test]
    fn oversized_literal_repetition_is_a_compile_error_not_an_allocation() {
        let (_e, errs) = run_semantic("'a' * 999999999999999");
        assert!(!errs.is_empty());
        assert!(errs[0].msg.contains("Out of Memory"));
    }
}
