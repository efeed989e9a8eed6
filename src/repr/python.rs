//! Python-like expression syntax.
//!
//! Renders nodes as expressions a scripting surface can evaluate directly:
//! wrapping arithmetic is spelled with an explicit mask
//! (`((a + b) & 0xff)`), pointwise operators stay bare, and the handful of
//! operations Python has no operator for (signed division, rotation, sign
//! extension) print as helper calls. References print as `ref_<id>`
//! symbols.

use std::fmt::{self, Write};

use crate::node::{AstNode, NodeKind};
use crate::num::U512;

pub fn write_node(out: &mut dyn Write, node: &AstNode) -> fmt::Result {
    let children = node.children();
    let mask = node.bitvector_mask();
    match node.kind() {
        NodeKind::Bvadd => masked_infix(out, "+", &children[0], &children[1], mask),
        NodeKind::Bvsub => masked_infix(out, "-", &children[0], &children[1], mask),
        NodeKind::Bvmul => masked_infix(out, "*", &children[0], &children[1], mask),
        NodeKind::Bvshl => masked_infix(out, "<<", &children[0], &children[1], mask),
        NodeKind::Bvand => infix(out, "&", &children[0], &children[1]),
        NodeKind::Bvor => infix(out, "|", &children[0], &children[1]),
        NodeKind::Bvxor => infix(out, "^", &children[0], &children[1]),
        NodeKind::Bvlshr => infix(out, ">>", &children[0], &children[1]),
        NodeKind::Bvnand => negated_infix(out, "&", &children[0], &children[1], mask),
        NodeKind::Bvnor => negated_infix(out, "|", &children[0], &children[1], mask),
        NodeKind::Bvxnor => negated_infix(out, "^", &children[0], &children[1], mask),
        NodeKind::Bvneg => {
            out.write_str("(-")?;
            write_node(out, &children[0])?;
            write!(out, " & 0x{mask:x})")
        }
        NodeKind::Bvnot => {
            out.write_str("(~")?;
            write_node(out, &children[0])?;
            write!(out, " & 0x{mask:x})")
        }
        NodeKind::Bvudiv => infix(out, "/", &children[0], &children[1]),
        NodeKind::Bvurem => infix(out, "%", &children[0], &children[1]),
        NodeKind::Bvuge => infix(out, ">=", &children[0], &children[1]),
        NodeKind::Bvugt => infix(out, ">", &children[0], &children[1]),
        NodeKind::Bvule => infix(out, "<=", &children[0], &children[1]),
        NodeKind::Bvult => infix(out, "<", &children[0], &children[1]),
        NodeKind::Bvashr => helper(out, "ashr", &children),
        NodeKind::Bvsdiv => helper(out, "sdiv", &children),
        NodeKind::Bvsrem => helper(out, "srem", &children),
        NodeKind::Bvsmod => helper(out, "smod", &children),
        NodeKind::Bvsge => helper(out, "sge", &children),
        NodeKind::Bvsgt => helper(out, "sgt", &children),
        NodeKind::Bvsle => helper(out, "sle", &children),
        NodeKind::Bvslt => helper(out, "slt", &children),
        NodeKind::Bvrol => helper(out, "rol", &children),
        NodeKind::Bvror => helper(out, "ror", &children),
        NodeKind::Sx => helper(out, "sx", &children),
        NodeKind::Equal => infix(out, "==", &children[0], &children[1]),
        NodeKind::Distinct => {
            out.write_str("(not ")?;
            infix(out, "==", &children[0], &children[1])?;
            out.write_char(')')
        }
        NodeKind::Land => chain(out, "and", &children),
        NodeKind::Lor => chain(out, "or", &children),
        NodeKind::Lnot => {
            out.write_str("(not ")?;
            write_node(out, &children[0])?;
            out.write_char(')')
        }
        NodeKind::Ite => {
            out.write_char('(')?;
            write_node(out, &children[1])?;
            out.write_str(" if ")?;
            write_node(out, &children[0])?;
            out.write_str(" else ")?;
            write_node(out, &children[2])?;
            out.write_char(')')
        }
        NodeKind::Extract => {
            let low = children[1].decimal_value().unwrap_or_default();
            out.write_str("((")?;
            write_node(out, &children[2])?;
            write!(out, " >> {low}) & 0x{mask:x})")
        }
        NodeKind::Zx => {
            out.write_char('(')?;
            write_node(out, &children[1])?;
            write!(out, " & 0x{mask:x})")
        }
        NodeKind::Concat => {
            // high bits first: fold into nested shift-or expressions
            for _ in 1..children.len() {
                out.write_str("((")?;
            }
            write_node(out, &children[0])?;
            for child in &children[1..] {
                write!(out, " << {}) | ", child.bitvector_size())?;
                write_node(out, child)?;
                out.write_char(')')?;
            }
            Ok(())
        }
        // python has no let; the body is the value of the binding
        NodeKind::Let => write_node(out, &children[2]),
        NodeKind::Bv => write!(out, "0x{:x}", node.evaluate()),
        NodeKind::Decimal => write!(out, "{}", node.decimal_value().unwrap_or_default()),
        NodeKind::String => out.write_str(&node.text_value().unwrap_or_default()),
        NodeKind::Variable => out.write_str(&node.variable_name().unwrap_or_default()),
        NodeKind::Reference => write!(out, "ref_{}", node.reference_id().unwrap_or_default()),
    }
}

/// `(<lhs> <op> <rhs>)`
fn infix(out: &mut dyn Write, op: &str, lhs: &AstNode, rhs: &AstNode) -> fmt::Result {
    out.write_char('(')?;
    write_node(out, lhs)?;
    write!(out, " {op} ")?;
    write_node(out, rhs)?;
    out.write_char(')')
}

/// `((<lhs> <op> <rhs>) & 0x<mask>)`
fn masked_infix(
    out: &mut dyn Write,
    op: &str,
    lhs: &AstNode,
    rhs: &AstNode,
    mask: U512,
) -> fmt::Result {
    out.write_char('(')?;
    infix(out, op, lhs, rhs)?;
    write!(out, " & 0x{mask:x})")
}

/// `(~(<lhs> <op> <rhs>) & 0x<mask>)`
fn negated_infix(
    out: &mut dyn Write,
    op: &str,
    lhs: &AstNode,
    rhs: &AstNode,
    mask: U512,
) -> fmt::Result {
    out.write_str("(~")?;
    infix(out, op, lhs, rhs)?;
    write!(out, " & 0x{mask:x})")
}

/// `<name>(<child>, <child>, ...)`
fn helper(out: &mut dyn Write, name: &str, children: &[AstNode]) -> fmt::Result {
    write!(out, "{name}(")?;
    for (index, child) in children.iter().enumerate() {
        if index > 0 {
            out.write_str(", ")?;
        }
        write_node(out, child)?;
    }
    out.write_char(')')
}

/// `(<child> <word> <child> <word> ...)`
fn chain(out: &mut dyn Write, word: &str, children: &[AstNode]) -> fmt::Result {
    out.write_char('(')?;
    for (index, child) in children.iter().enumerate() {
        if index > 0 {
            write!(out, " {word} ")?;
        }
        write_node(out, child)?;
    }
    out.write_char(')')
}

#[cfg(test)]
mod tests {
    use crate::builder::AstContext;
    use crate::num::U512;
    use crate::repr::{ReprMode, to_string};

    fn py(node: &crate::node::AstNode) -> String {
        to_string(ReprMode::Python, node)
    }

    #[test]
    fn masked_arithmetic() {
        let ctx = AstContext::new();
        let a = ctx.bv(U512::from(0xFFu32), 8).unwrap();
        let b = ctx.bv(U512::from(2u32), 8).unwrap();
        let sum = ctx.bvadd(&a, &b).unwrap();
        assert_eq!(py(&sum), "((0xff + 0x2) & 0xff)");

        let neg = ctx.bvneg(&b).unwrap();
        assert_eq!(py(&neg), "(-0x2 & 0xff)");

        let nand = ctx.bvnand(&a, &b).unwrap();
        assert_eq!(py(&nand), "(~(0xff & 0x2) & 0xff)");
    }

    #[test]
    fn bare_pointwise_operators() {
        let ctx = AstContext::new();
        let a = ctx.bv(U512::from(0x0Fu32), 8).unwrap();
        let b = ctx.bv(U512::from(0xF0u32), 8).unwrap();
        assert_eq!(py(&ctx.bvor(&a, &b).unwrap()), "(0xf | 0xf0)");
        assert_eq!(py(&ctx.bvlshr(&a, &b).unwrap()), "(0xf >> 0xf0)");
        assert_eq!(py(&ctx.bvult(&a, &b).unwrap()), "(0xf < 0xf0)");
    }

    #[test]
    fn helper_calls_for_signed_forms() {
        let ctx = AstContext::new();
        let a = ctx.bv(U512::from(0xF9u32), 8).unwrap();
        let b = ctx.bv(U512::from(3u32), 8).unwrap();
        assert_eq!(py(&ctx.bvsdiv(&a, &b).unwrap()), "sdiv(0xf9, 0x3)");
        assert_eq!(py(&ctx.bvslt(&a, &b).unwrap()), "slt(0xf9, 0x3)");
        assert_eq!(py(&ctx.bvrol(4, &a).unwrap()), "rol(4, 0xf9)");
    }

    #[test]
    fn structure_forms() {
        let ctx = AstContext::new();
        let a = ctx.bv(U512::from(0xABu32), 8).unwrap();
        let b = ctx.bv(U512::from(0xCDu32), 8).unwrap();
        let cat = ctx.concat(&a, &b).unwrap();
        assert_eq!(py(&cat), "((0xab << 8) | 0xcd)");

        let e = ctx.bv(U512::from(0xABCDu32), 16).unwrap();
        let ex = ctx.extract(11, 4, &e).unwrap();
        assert_eq!(py(&ex), "((0xabcd >> 4) & 0xff)");

        let byte = ctx.bv(U512::from(0x80u32), 8).unwrap();
        assert_eq!(py(&ctx.zx(8, &byte).unwrap()), "(0x80 & 0xffff)");
        assert_eq!(py(&ctx.sx(8, &byte).unwrap()), "sx(8, 0x80)");
    }

    #[test]
    fn logic_and_references() {
        let ctx = AstContext::new();
        let t = ctx.bvtrue().unwrap();
        let f = ctx.bvfalse().unwrap();
        let eq = ctx.equal(&t, &f).unwrap();
        let ne = ctx.distinct(&t, &f).unwrap();
        assert_eq!(py(&eq), "(0x1 == 0x0)");
        assert_eq!(py(&ne), "(not (0x1 == 0x0))");
        assert_eq!(py(&ctx.lnot(&eq).unwrap()), "(not (0x1 == 0x0))");
        assert_eq!(py(&ctx.land(&eq, &ne).unwrap()), "((0x1 == 0x0) and (not (0x1 == 0x0)))");

        let x = ctx.variable("x", 8).unwrap();
        assert_eq!(py(&x), "x");
        let r = ctx.reference(&x, 9).unwrap();
        assert_eq!(py(&r), "ref_9");

        let ite = ctx.ite(&eq, &t, &f).unwrap();
        assert_eq!(py(&ite), "(0x1 if (0x1 == 0x0) else 0x0)");
    }
}
