//! Symbolic state wrappers produced by a symbolic-execution engine.
//!
//! A [`SymbolicValue`] ties an AST root to the engine-side metadata that
//! identifies it (a stable id, whether it shadows a register or a memory
//! cell, a free-form comment). [`SymbolicExpression`] extends the value
//! with taint and origin information and knows how to render itself in the
//! representation its context currently selects.

use std::fmt;

use crate::node::AstNode;
use crate::repr::ReprMode;

/// What a symbolic value shadows on the concrete machine.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SymbolicKind {
    Register,
    Memory,
}

/// An AST root plus the engine-side identity attached to it.
#[derive(Clone, Debug)]
pub struct SymbolicValue {
    ast: AstNode,
    id: usize,
    kind: SymbolicKind,
    comment: String,
}

impl SymbolicValue {
    pub fn new(ast: AstNode, id: usize, kind: SymbolicKind, comment: impl Into<String>) -> Self {
        SymbolicValue {
            ast,
            id,
            kind,
            comment: comment.into(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> SymbolicKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: SymbolicKind) {
        self.kind = kind;
    }

    pub fn is_register(&self) -> bool {
        self.kind == SymbolicKind::Register
    }

    pub fn is_memory(&self) -> bool {
        self.kind == SymbolicKind::Memory
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn ast(&self) -> &AstNode {
        &self.ast
    }

    pub fn set_ast(&mut self, ast: AstNode) {
        self.ast = ast;
    }

    /// True iff the underlying tree contains a free variable.
    pub fn is_symbolized(&self) -> bool {
        self.ast.is_symbolized()
    }

    fn representation_mode(&self) -> ReprMode {
        self.ast
            .context()
            .map(|ctx| ctx.representation_mode())
            .unwrap_or(ReprMode::Smt)
    }
}

/// A symbolic expression: a [`SymbolicValue`] enriched with taint and
/// origin metadata, rendered as `<id> = <ast>` with an optional trailing
/// comment.
#[derive(Clone, Debug)]
pub struct SymbolicExpression {
    value: SymbolicValue,
    origin: Option<String>,
    tainted: bool,
}

impl SymbolicExpression {
    pub fn new(ast: AstNode, id: usize, kind: SymbolicKind, comment: impl Into<String>) -> Self {
        SymbolicExpression {
            value: SymbolicValue::new(ast, id, kind, comment),
            origin: None,
            tainted: false,
        }
    }

    pub fn value(&self) -> &SymbolicValue {
        &self.value
    }

    pub fn ast(&self) -> &AstNode {
        self.value.ast()
    }

    pub fn id(&self) -> usize {
        self.value.id()
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    pub fn set_tainted(&mut self, tainted: bool) {
        self.tainted = tainted;
    }

    /// The register or memory location this expression originated from.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn set_origin(&mut self, origin: impl Into<String>) {
        self.origin = Some(origin.into());
    }

    /// The expression's reference symbol in the current representation:
    /// `ref!<id>` for SMT, `ref_<id>` for the Python-like surface.
    pub fn formatted_id(&self) -> String {
        match self.value.representation_mode() {
            ReprMode::Smt => format!("ref!{}", self.value.id()),
            ReprMode::Python => format!("ref_{}", self.value.id()),
        }
    }

    /// The comment with the current representation's comment prefix, or an
    /// empty string if there is no comment.
    pub fn formatted_comment(&self) -> String {
        if self.value.comment().is_empty() {
            return String::new();
        }
        let mode = self.value.representation_mode();
        format!("{} {}", mode.comment_prefix(), self.value.comment())
    }
}

impl fmt::Display for SymbolicExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.formatted_id(), self.value.ast())?;
        if !self.value.comment().is_empty() {
            write!(f, " {}", self.formatted_comment())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AstContext;
    use crate::num::U512;

    #[test]
    fn value_metadata() {
        let ctx = AstContext::new();
        let x = ctx.variable("x", 8).unwrap();
        let one = ctx.bv(U512::one(), 8).unwrap();
        let e = ctx.bvadd(&x, &one).unwrap();

        let mut value = SymbolicValue::new(e.clone(), 7, SymbolicKind::Register, "al");
        assert!(value.is_register());
        assert!(!value.is_memory());
        assert!(value.is_symbolized());
        assert_eq!(value.id(), 7);
        assert_eq!(value.comment(), "al");

        value.set_kind(SymbolicKind::Memory);
        assert!(value.is_memory());
    }

    #[test]
    fn expression_rendering_follows_the_representation_mode() {
        let ctx = AstContext::new();
        let one = ctx.bv(U512::one(), 8).unwrap();
        let two = ctx.bv(U512::from(2u32), 8).unwrap();
        let e = ctx.bvadd(&one, &two).unwrap();
        let expr = SymbolicExpression::new(e, 3, SymbolicKind::Register, "sum");

        assert_eq!(expr.formatted_id(), "ref!3");
        assert_eq!(expr.formatted_comment(), "; sum");
        assert_eq!(
            expr.to_string(),
            "ref!3 = (bvadd (_ bv1 8) (_ bv2 8)) ; sum"
        );

        ctx.set_representation_mode(ReprMode::Python);
        assert_eq!(expr.formatted_id(), "ref_3");
        assert_eq!(expr.formatted_comment(), "# sum");
        assert_eq!(expr.to_string(), "ref_3 = ((0x1 + 0x2) & 0xff) # sum");
    }

    #[test]
    fn taint_and_origin() {
        let ctx = AstContext::new();
        let e = ctx.bv(U512::one(), 8).unwrap();
        let mut expr = SymbolicExpression::new(e, 0, SymbolicKind::Memory, "");
        assert!(!expr.is_tainted());
        assert_eq!(expr.origin(), None);
        assert_eq!(expr.formatted_comment(), "");

        expr.set_tainted(true);
        expr.set_origin("rax");
        assert!(expr.is_tainted());
        assert_eq!(expr.origin(), Some("rax"));
    }
}
