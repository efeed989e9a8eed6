//! Operator overloading on [`AstNode`] handles.
//!
//! Nodes remember the context that created them, so standard operators can
//! build new nodes without threading the [`AstContext`] through every call
//! site:
//!
//! ```rust
//! use bvexpr::{AstContext, U512};
//!
//! let ctx = AstContext::new();
//! let a = ctx.bv(U512::from(0x0Fu32), 8)?;
//! let b = ctx.bv(U512::from(0xF0u32), 8)?;
//!
//! let merged = &a | &b;
//! assert_eq!(merged.evaluate(), U512::from(0xFFu32));
//! # Ok::<(), bvexpr::AstError>(())
//! ```
//!
//! # Panics
//!
//! The operator traits cannot report errors, so these implementations panic
//! where the named constructor would have returned one: mismatched operand
//! widths, or a node whose owning context has been dropped. Use the
//! [`AstContext`] methods directly when the operands are not known to be
//! compatible.

use std::ops::{Add, BitAnd, BitOr, BitXor, Mul, Neg, Not, Shl, Shr, Sub};

use crate::builder::AstContext;
use crate::error::Result;
use crate::node::AstNode;

impl AstNode {
    fn ops_context(&self) -> AstContext {
        self.context()
            .expect("node operators require a live owning context")
    }
}

fn applied(result: Result<AstNode>) -> AstNode {
    match result {
        Ok(node) => node,
        Err(err) => panic!("ast operator: {err}"),
    }
}

macro_rules! binary_op {
    ($op:ident, $method:ident, $ctor:ident) => {
        impl $op for &AstNode {
            type Output = AstNode;
            fn $method(self, rhs: &AstNode) -> AstNode {
                applied(self.ops_context().$ctor(self, rhs))
            }
        }

        impl $op for AstNode {
            type Output = AstNode;
            fn $method(self, rhs: AstNode) -> AstNode {
                $op::$method(&self, &rhs)
            }
        }
    };
}

binary_op!(Add, add, bvadd);
binary_op!(Sub, sub, bvsub);
binary_op!(Mul, mul, bvmul);
binary_op!(BitAnd, bitand, bvand);
binary_op!(BitOr, bitor, bvor);
binary_op!(BitXor, bitxor, bvxor);
binary_op!(Shl, shl, bvshl);
binary_op!(Shr, shr, bvlshr);

impl Neg for &AstNode {
    type Output = AstNode;
    fn neg(self) -> AstNode {
        applied(self.ops_context().bvneg(self))
    }
}

impl Neg for AstNode {
    type Output = AstNode;
    fn neg(self) -> AstNode {
        -&self
    }
}

impl Not for &AstNode {
    type Output = AstNode;
    fn not(self) -> AstNode {
        applied(self.ops_context().bvnot(self))
    }
}

impl Not for AstNode {
    type Output = AstNode;
    fn not(self) -> AstNode {
        !&self
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::AstContext;
    use crate::num::U512;

    #[test]
    fn operators_build_through_the_context() {
        let ctx = AstContext::new();
        let a = ctx.bv(U512::from(0xFFu32), 8).unwrap();
        let b = ctx.bv(U512::from(0x02u32), 8).unwrap();

        assert_eq!((&a + &b).evaluate(), U512::from(0x01u32));
        assert_eq!((&a - &b).evaluate(), U512::from(0xFDu32));
        assert_eq!((&a & &b).evaluate(), U512::from(0x02u32));
        assert_eq!((&a ^ &a).evaluate(), U512::zero());
        assert_eq!((!&b).evaluate(), U512::from(0xFDu32));
        assert_eq!((-&b).evaluate(), U512::from(0xFEu32));
        assert_eq!((&a >> &b).evaluate(), U512::from(0x3Fu32));
    }

    #[test]
    #[should_panic(expected = "ast operator")]
    fn mismatched_widths_panic() {
        let ctx = AstContext::new();
        let a = ctx.bv(U512::one(), 8).unwrap();
        let b = ctx.bv(U512::one(), 16).unwrap();
        let _ = &a + &b;
    }
}
