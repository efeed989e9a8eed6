//! SMT-LIB 2 concrete syntax.
//!
//! Output follows the QF_BV conventions downstream consumers parse:
//! `(_ bvN W)` literals, indexed operators for extraction, extension, and
//! rotation, and plain application syntax everywhere else. References print
//! as `ref!<id>` symbols.

use std::fmt::{self, Write};

use crate::node::{AstNode, NodeKind};

pub fn write_node(out: &mut dyn Write, node: &AstNode) -> fmt::Result {
    let children = node.children();
    match node.kind() {
        NodeKind::Bv => {
            let value = children[0].decimal_value().unwrap_or_default();
            let size = children[1].decimal_value().unwrap_or_default();
            write!(out, "(_ bv{value} {size})")
        }
        NodeKind::Bvrol => indexed(out, "rotate_left", &children[0], &children[1]),
        NodeKind::Bvror => indexed(out, "rotate_right", &children[0], &children[1]),
        NodeKind::Sx => indexed(out, "sign_extend", &children[0], &children[1]),
        NodeKind::Zx => indexed(out, "zero_extend", &children[0], &children[1]),
        NodeKind::Extract => {
            let high = children[0].decimal_value().unwrap_or_default();
            let low = children[1].decimal_value().unwrap_or_default();
            write!(out, "((_ extract {high} {low}) ")?;
            write_node(out, &children[2])?;
            out.write_char(')')
        }
        NodeKind::Let => {
            let alias = children[0].text_value().unwrap_or_default();
            write!(out, "(let (({alias} ")?;
            write_node(out, &children[1])?;
            out.write_str(")) ")?;
            write_node(out, &children[2])?;
            out.write_char(')')
        }
        NodeKind::Equal => application(out, "=", &children),
        NodeKind::Land => application(out, "and", &children),
        NodeKind::Lor => application(out, "or", &children),
        NodeKind::Lnot => application(out, "not", &children),
        NodeKind::Decimal => write!(out, "{}", node.decimal_value().unwrap_or_default()),
        NodeKind::String => out.write_str(&node.text_value().unwrap_or_default()),
        NodeKind::Variable => out.write_str(&node.variable_name().unwrap_or_default()),
        NodeKind::Reference => write!(out, "ref!{}", node.reference_id().unwrap_or_default()),
        kind => application(out, kind.symbol(), &children),
    }
}

/// `(<symbol> <child> <child> ...)`
fn application(out: &mut dyn Write, symbol: &str, children: &[AstNode]) -> fmt::Result {
    write!(out, "({symbol}")?;
    for child in children {
        out.write_char(' ')?;
        write_node(out, child)?;
    }
    out.write_char(')')
}

/// `((_ <symbol> <index>) <expr>)`
fn indexed(out: &mut dyn Write, symbol: &str, index: &AstNode, expr: &AstNode) -> fmt::Result {
    let index = index.decimal_value().unwrap_or_default();
    write!(out, "((_ {symbol} {index}) ")?;
    write_node(out, expr)?;
    out.write_char(')')
}

#[cfg(test)]
mod tests {
    use crate::builder::AstContext;
    use crate::num::U512;
    use crate::repr::{ReprMode, to_string};

    fn smt(node: &crate::node::AstNode) -> String {
        to_string(ReprMode::Smt, node)
    }

    #[test]
    fn literals() {
        let ctx = AstContext::new();
        let e = ctx.bv(U512::from(0xFFu32), 8).unwrap();
        assert_eq!(smt(&e), "(_ bv255 8)");
    }

    #[test]
    fn applications() {
        let ctx = AstContext::new();
        let a = ctx.bv(U512::from(1u32), 8).unwrap();
        let b = ctx.bv(U512::from(2u32), 8).unwrap();
        let sum = ctx.bvadd(&a, &b).unwrap();
        assert_eq!(smt(&sum), "(bvadd (_ bv1 8) (_ bv2 8))");

        let eq = ctx.equal(&a, &b).unwrap();
        assert_eq!(smt(&eq), "(= (_ bv1 8) (_ bv2 8))");

        let both = ctx.land(&eq, &eq).unwrap();
        assert_eq!(
            smt(&both),
            "(and (= (_ bv1 8) (_ bv2 8)) (= (_ bv1 8) (_ bv2 8)))"
        );
    }

    #[test]
    fn indexed_operators() {
        let ctx = AstContext::new();
        let e = ctx.bv(U512::from(0xABCDu32), 16).unwrap();
        let ex = ctx.extract(11, 4, &e).unwrap();
        assert_eq!(smt(&ex), "((_ extract 11 4) (_ bv43981 16))");

        let byte = ctx.bv(U512::from(0x80u32), 8).unwrap();
        assert_eq!(
            smt(&ctx.sx(8, &byte).unwrap()),
            "((_ sign_extend 8) (_ bv128 8))"
        );
        assert_eq!(
            smt(&ctx.zx(8, &byte).unwrap()),
            "((_ zero_extend 8) (_ bv128 8))"
        );
        assert_eq!(
            smt(&ctx.bvrol(4, &byte).unwrap()),
            "((_ rotate_left 4) (_ bv128 8))"
        );
        assert_eq!(
            smt(&ctx.bvror(4, &byte).unwrap()),
            "((_ rotate_right 4) (_ bv128 8))"
        );
    }

    #[test]
    fn ite_and_let() {
        let ctx = AstContext::new();
        let t = ctx.bvtrue().unwrap();
        let a = ctx.bv(U512::from(1u32), 8).unwrap();
        let b = ctx.bv(U512::from(2u32), 8).unwrap();
        let cond = ctx.equal(&t, &t).unwrap();
        let ite = ctx.ite(&cond, &a, &b).unwrap();
        assert_eq!(
            smt(&ite),
            "(ite (= (_ bv1 1) (_ bv1 1)) (_ bv1 8) (_ bv2 8))"
        );

        let bound = ctx.let_binding("alias", &a, &b).unwrap();
        assert_eq!(smt(&bound), "(let ((alias (_ bv1 8))) (_ bv2 8))");
    }

    #[test]
    fn symbols_and_references() {
        let ctx = AstContext::new();
        let x = ctx.variable("x", 8).unwrap();
        assert_eq!(smt(&x), "x");

        let r = ctx.reference(&x, 3).unwrap();
        assert_eq!(smt(&r), "ref!3");

        let d = ctx.decimal(U512::from(42u32));
        assert_eq!(smt(&d), "42");
    }
}
