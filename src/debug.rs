//! Minimal textual dumps for `compile(.., debug: true)`.
//!
//! Deliberately not a pretty-printer: that's a separate external tool, out
//! of scope here. This just captures `{:#?}`/`{:?}` snapshots of each
//! intermediate stage so a host tool could build a real printer on top
//! without reaching into crate internals.

use crate::ast::Expr;
use crate::compiler::Program;

#[derive(Debug, Clone, Default)]
pub struct DebugTrace {
    pub ast_after_parse: String,
    pub ast_after_parse_value: String,
    pub ast_after_const_fold: String,
    pub ast_after_const_pushdown: String,
    pub constants: String,
    pub disassembly: String,
}

impl DebugTrace {
    pub(crate) fn snapshot_ast(expr: &Expr) -> String {
        format!("{:#?}", expr)
    }

    pub(crate) fn snapshot_program(program: &Program) -> (String, String) {
        (format!("{:#?}", program.constants), program.disassemble())
    }
}
