//! Structural hashing.
//!
//! The hash is a compression over the 2^512 ring, mixed with the node kind,
//! the child count, and the recursion depth. Commutative operators fold
//! their children's hashes with a plain product, so operand order does not
//! matter; position-sensitive operators square each child's hash `i + 1`
//! times first, so it does. Leaves override the template entirely.
//!
//! The hash is deliberately not injective; callers that need equality
//! combine it with the evaluation and the width (see
//! [`AstNode::equal_to`](crate::node::AstNode::equal_to)).

use crate::node::{AstNode, NodeKind, Payload};
use crate::num::{U512, WrappingOps, pow, rotl};

pub(crate) fn structural(node: &AstNode, depth: u32) -> U512 {
    let kind = node.kind();
    match node.payload() {
        Payload::Decimal(value) => U512::from(kind as u32) ^ value,
        Payload::Text(text) => text_hash(kind, &text, depth),
        Payload::Variable(name) => text_hash(kind, &name, depth),
        Payload::Reference { id, .. } => U512::from(kind as u32) ^ U512::from(id as u64),
        Payload::None => {
            let children = node.children();
            let mut h = U512::from(kind as u32);
            if !children.is_empty() {
                h = h.wrapping_mul(U512::from(children.len() as u64));
            }
            for (index, child) in children.iter().enumerate() {
                let child_hash = structural(child, depth + 1);
                let mixed = if order_sensitive(kind) {
                    pow(child_hash, index as u32 + 1)
                } else {
                    child_hash
                };
                h = h.wrapping_mul(mixed);
            }
            rotl(h, depth)
        }
    }
}

fn text_hash(kind: NodeKind, text: &str, depth: u32) -> U512 {
    let mut h = U512::from(kind as u32);
    for (index, byte) in text.bytes().enumerate() {
        h = h ^ pow(U512::from(byte), index as u32 + 1);
    }
    rotl(h, depth)
}

/// Operators whose semantics depend on operand order also hash
/// position-sensitively; the commutative ones do not.
fn order_sensitive(kind: NodeKind) -> bool {
    !matches!(
        kind,
        NodeKind::Bvadd
            | NodeKind::Bvand
            | NodeKind::Bvor
            | NodeKind::Bvxor
            | NodeKind::Bvmul
            | NodeKind::Bvnand
            | NodeKind::Bvnor
            | NodeKind::Bvxnor
            | NodeKind::Bvneg
            | NodeKind::Bvnot
            | NodeKind::Distinct
            | NodeKind::Equal
            | NodeKind::Land
            | NodeKind::Lor
            | NodeKind::Lnot
    )
}
