//! Per-kind initialization: arity/width/kind validation and the concrete
//! evaluation rules.
//!
//! Construction errors are raised here and abort the build; evaluation
//! itself is total. Division, remainder, and modulo by zero follow the
//! SMT-LIB total-function semantics.

use crate::error::{AstError, Result};
use crate::node::{AstNode, NodeKind};
use crate::num::{U512, WrappingOps, bit_mask, modular_sign_extend, shl, shr};

/// Recomputes and stores `size`, `eval`, and the symbolized flag of `node`
/// from its children and payload.
pub(crate) fn reinit(node: &AstNode) -> Result<()> {
    let kind = node.kind();
    let op = kind.symbol();
    let children = node.children();
    let symbolized = children.iter().any(|c| c.is_symbolized());

    match kind {
        NodeKind::Bvadd => {
            let size = same_width(op, &children)?;
            let eval = children[0].evaluate().wrapping_add(children[1].evaluate()) & bit_mask(size);
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvsub => {
            let size = same_width(op, &children)?;
            let eval = children[0].evaluate().wrapping_sub(children[1].evaluate()) & bit_mask(size);
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvmul => {
            let size = same_width(op, &children)?;
            let eval = children[0].evaluate().wrapping_mul(children[1].evaluate()) & bit_mask(size);
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvand => {
            let size = same_width(op, &children)?;
            let eval = children[0].evaluate() & children[1].evaluate();
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvor => {
            let size = same_width(op, &children)?;
            let eval = children[0].evaluate() | children[1].evaluate();
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvxor => {
            let size = same_width(op, &children)?;
            let eval = children[0].evaluate() ^ children[1].evaluate();
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvnand => {
            let size = same_width(op, &children)?;
            let eval = !(children[0].evaluate() & children[1].evaluate()) & bit_mask(size);
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvnor => {
            let size = same_width(op, &children)?;
            let eval = !(children[0].evaluate() | children[1].evaluate()) & bit_mask(size);
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvxnor => {
            let size = same_width(op, &children)?;
            let eval = !(children[0].evaluate() ^ children[1].evaluate()) & bit_mask(size);
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvneg => {
            require_children(op, &children, 1, "at least 1")?;
            let size = children[0].bitvector_size();
            let eval = children[0].evaluate().wrapping_neg() & bit_mask(size);
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvnot => {
            require_children(op, &children, 1, "at least 1")?;
            let size = children[0].bitvector_size();
            let eval = !children[0].evaluate() & bit_mask(size);
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvshl => {
            let size = same_width(op, &children)?;
            let eval = shl(children[0].evaluate(), shift_amount(&children[1])) & bit_mask(size);
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvlshr => {
            let size = same_width(op, &children)?;
            let eval = shr(children[0].evaluate(), shift_amount(&children[1]));
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvashr => {
            let size = same_width(op, &children)?;
            let eval = ashr(&children[0], shift_amount(&children[1]), size);
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvrol | NodeKind::Bvror => {
            require_children(op, &children, 2, "at least 2")?;
            let rot = decimal_u32(op, &children[0], "rotate count")?;
            let size = children[1].bitvector_size();
            let value = children[1].evaluate();
            let rot = if size == 0 { 0 } else { rot % size };
            let eval = if rot == 0 {
                value & bit_mask(size)
            } else if kind == NodeKind::Bvrol {
                (shl(value, rot) | shr(value, size - rot)) & bit_mask(size)
            } else {
                (shr(value, rot) | shl(value, size - rot)) & bit_mask(size)
            };
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvudiv => {
            let size = same_width(op, &children)?;
            let (a, b) = (children[0].evaluate(), children[1].evaluate());
            let eval = if b.is_zero() { bit_mask(size) } else { a / b };
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvurem => {
            let size = same_width(op, &children)?;
            let (a, b) = (children[0].evaluate(), children[1].evaluate());
            let eval = if b.is_zero() { a } else { a % b };
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvsdiv => {
            let size = same_width(op, &children)?;
            let sa = modular_sign_extend(children[0].evaluate(), size);
            let sb = modular_sign_extend(children[1].evaluate(), size);
            let eval = if sb.is_zero() {
                // SMT-LIB total division: 1 for a negative dividend, -1 otherwise
                if sa.is_negative() {
                    U512::one()
                } else {
                    U512::MAX & bit_mask(size)
                }
            } else {
                (sa / sb).to_raw() & bit_mask(size)
            };
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvsrem => {
            let size = same_width(op, &children)?;
            let sa = modular_sign_extend(children[0].evaluate(), size);
            let sb = modular_sign_extend(children[1].evaluate(), size);
            let eval = if children[1].evaluate().is_zero() {
                children[0].evaluate()
            } else {
                // sign follows the dividend
                (sa - (sa / sb) * sb).to_raw() & bit_mask(size)
            };
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvsmod => {
            let size = same_width(op, &children)?;
            let sa = modular_sign_extend(children[0].evaluate(), size);
            let sb = modular_sign_extend(children[1].evaluate(), size);
            let eval = if children[1].evaluate().is_zero() {
                children[0].evaluate()
            } else {
                // sign follows the divisor: ((sa mod sb) + sb) mod sb
                let r = sa % sb;
                let adjusted = if r.is_zero() || r.is_negative() == sb.is_negative() {
                    r
                } else {
                    r + sb
                };
                adjusted.to_raw() & bit_mask(size)
            };
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Bvuge | NodeKind::Bvugt | NodeKind::Bvule | NodeKind::Bvult => {
            same_width(op, &children)?;
            let (a, b) = (children[0].evaluate(), children[1].evaluate());
            let truth = match kind {
                NodeKind::Bvuge => a >= b,
                NodeKind::Bvugt => a > b,
                NodeKind::Bvule => a <= b,
                _ => a < b,
            };
            node.store_init(1, bool_eval(truth), symbolized);
        }
        NodeKind::Bvsge | NodeKind::Bvsgt | NodeKind::Bvsle | NodeKind::Bvslt => {
            let size = same_width(op, &children)?;
            let sa = modular_sign_extend(children[0].evaluate(), size);
            let sb = modular_sign_extend(children[1].evaluate(), size);
            let truth = match kind {
                NodeKind::Bvsge => sa >= sb,
                NodeKind::Bvsgt => sa > sb,
                NodeKind::Bvsle => sa <= sb,
                _ => sa < sb,
            };
            node.store_init(1, bool_eval(truth), symbolized);
        }
        NodeKind::Equal => {
            require_children(op, &children, 2, "at least 2")?;
            let truth = children[0].evaluate() == children[1].evaluate();
            node.store_init(1, bool_eval(truth), symbolized);
        }
        NodeKind::Distinct => {
            require_children(op, &children, 2, "at least 2")?;
            let truth = children[0].evaluate() != children[1].evaluate();
            node.store_init(1, bool_eval(truth), symbolized);
        }
        NodeKind::Bv => {
            require_children(op, &children, 2, "at least 2")?;
            let value = children[0]
                .decimal_value()
                .ok_or_else(|| AstError::kind(op, "value and size must be decimal nodes"))?;
            let size = decimal_u32(op, &children[1], "size")?;
            if size == 0 {
                return Err(AstError::range(op, "size cannot be zero"));
            }
            if size > crate::num::MAX_BITS_SUPPORTED {
                return Err(AstError::range(op, "size cannot exceed MAX_BITS_SUPPORTED"));
            }
            node.store_init(size, value & bit_mask(size), symbolized);
        }
        NodeKind::Concat => {
            require_children(op, &children, 2, "at least 2")?;
            let mut size = 0u32;
            for child in &children {
                size += child.bitvector_size();
            }
            if size > crate::num::MAX_BITS_SUPPORTED {
                return Err(AstError::range(op, "size cannot exceed MAX_BITS_SUPPORTED"));
            }
            let mut eval = children[0].evaluate();
            for child in &children[1..] {
                eval = shl(eval, child.bitvector_size()) | child.evaluate();
            }
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Extract => {
            require_children(op, &children, 3, "at least 3")?;
            let high = decimal_u32(op, &children[0], "high bit")?;
            let low = decimal_u32(op, &children[1], "low bit")?;
            if low > high {
                return Err(AstError::range(op, "the high bit must not be below the low bit"));
            }
            if high >= children[2].bitvector_size() {
                return Err(AstError::range(
                    op,
                    "extraction exceeds the width of the child expression",
                ));
            }
            let size = high - low + 1;
            let eval = shr(children[2].evaluate(), low) & bit_mask(size);
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Sx | NodeKind::Zx => {
            require_children(op, &children, 2, "at least 2")?;
            let ext = decimal_u32(op, &children[0], "extension size")?;
            let child_size = children[1].bitvector_size();
            let size = ext
                .checked_add(child_size)
                .ok_or_else(|| AstError::range(op, "size cannot exceed MAX_BITS_SUPPORTED"))?;
            if size > crate::num::MAX_BITS_SUPPORTED {
                return Err(AstError::range(op, "size cannot exceed MAX_BITS_SUPPORTED"));
            }
            let value = children[1].evaluate();
            let eval = if kind == NodeKind::Zx || !children[1].is_signed() {
                value & bit_mask(size)
            } else {
                (value | !bit_mask(child_size)) & bit_mask(size)
            };
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Ite => {
            require_children(op, &children, 3, "at least 3")?;
            // a 1-bit vector is accepted as a condition alongside proper
            // logical nodes, so `ite(bvtrue(), ..)` works
            if !children[0].is_logical() && children[0].bitvector_size() != 1 {
                return Err(AstError::kind(op, "the condition must be a logical node"));
            }
            if children[1].bitvector_size() != children[2].bitvector_size() {
                return Err(AstError::Width {
                    op,
                    lhs: children[1].bitvector_size(),
                    rhs: children[2].bitvector_size(),
                });
            }
            let size = children[1].bitvector_size();
            let eval = if children[0].evaluate().is_zero() {
                children[2].evaluate()
            } else {
                children[1].evaluate()
            };
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Land | NodeKind::Lor => {
            require_children(op, &children, 2, "at least 2")?;
            let mut truth = kind == NodeKind::Land;
            for child in &children {
                if !child.is_logical() {
                    return Err(AstError::kind(op, "every operand must be a logical node"));
                }
                if kind == NodeKind::Land {
                    truth = truth && !child.evaluate().is_zero();
                } else {
                    truth = truth || !child.evaluate().is_zero();
                }
            }
            node.store_init(1, bool_eval(truth), symbolized);
        }
        NodeKind::Lnot => {
            require_children(op, &children, 1, "at least 1")?;
            if !children[0].is_logical() {
                return Err(AstError::kind(op, "the operand must be a logical node"));
            }
            node.store_init(1, bool_eval(children[0].evaluate().is_zero()), symbolized);
        }
        NodeKind::Let => {
            require_children(op, &children, 3, "at least 3")?;
            if children[0].kind() != NodeKind::String {
                return Err(AstError::kind(op, "the alias must be a string node"));
            }
            let size = children[2].bitvector_size();
            let eval = children[2].evaluate();
            node.store_init(size, eval, symbolized);
        }
        NodeKind::Reference => {
            let referent = node
                .referent()
                .expect("reference node always carries its referent");
            node.store_init(
                referent.bitvector_size(),
                referent.evaluate(),
                referent.is_symbolized(),
            );
        }
        NodeKind::Decimal | NodeKind::String => {
            node.store_init(0, U512::zero(), false);
        }
        NodeKind::Variable => {
            let name = node
                .variable_name()
                .expect("variable node always carries its name");
            let ctx = node
                .context()
                .ok_or_else(|| AstError::variable(&name, "owning context was dropped"))?;
            let eval = ctx.value_of(&name)? & node.bitvector_mask();
            node.store_init(node.bitvector_size(), eval, true);
        }
    }
    Ok(())
}

/// Arithmetic shift right with sign fill.
fn ashr(value: &AstNode, shift: u32, size: u32) -> U512 {
    let signed = value.is_signed();
    let mask = bit_mask(size);
    if shift >= size {
        return if signed { mask } else { U512::zero() };
    }
    if shift == 0 {
        return value.evaluate();
    }
    let fill = if signed {
        shl(U512::one(), size - 1) & mask
    } else {
        U512::zero()
    };
    let mut eval = value.evaluate() & mask;
    for _ in 0..shift {
        eval = (shr(eval, 1) | fill) & mask;
    }
    eval
}

fn bool_eval(truth: bool) -> U512 {
    if truth { U512::one() } else { U512::zero() }
}

/// Shift amounts follow the original's semantics: the low 32 bits of the
/// operand's evaluation.
fn shift_amount(node: &AstNode) -> u32 {
    node.evaluate().low_u64() as u32
}

fn require_children(
    op: &'static str,
    children: &[AstNode],
    min: usize,
    expected: &'static str,
) -> Result<()> {
    if children.len() < min {
        return Err(AstError::Arity {
            op,
            expected,
            got: children.len(),
        });
    }
    Ok(())
}

fn same_width(op: &'static str, children: &[AstNode]) -> Result<u32> {
    require_children(op, children, 2, "at least 2")?;
    let (lhs, rhs) = (children[0].bitvector_size(), children[1].bitvector_size());
    if lhs != rhs {
        return Err(AstError::Width { op, lhs, rhs });
    }
    Ok(lhs)
}

fn decimal_u32(op: &'static str, child: &AstNode, what: &str) -> Result<u32> {
    let value = child
        .decimal_value()
        .ok_or_else(|| AstError::kind(op, format!("the {what} must be a decimal node")))?;
    Ok(value.low_u64() as u32)
}
