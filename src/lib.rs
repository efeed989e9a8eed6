//! A typed bit-vector expression engine over the SMT-LIB QF_BV logic.
//!
//! `bvexpr` lets clients construct, inspect, and concretely evaluate
//! symbolic expressions over fixed-width bit-vectors and booleans. Every
//! node caches its bit-width and concrete evaluation; the crate maintains a
//! parent/child dependency DAG so that rebinding a free variable
//! re-propagates evaluations through every expression that contains it,
//! without rebuilding anything.
//!
//! All construction goes through an [`AstContext`], which validates operand
//! widths and kinds up front, owns the free-variable environment, and
//! selects the textual surface syntax (SMT-LIB 2 or a Python-like form).
//!
//! ```rust
//! use bvexpr::{AstContext, U512};
//!
//! let ctx = AstContext::new();
//! let x = ctx.variable("x", 8)?;
//! let one = ctx.bv(U512::one(), 8)?;
//! let e = ctx.bvadd(&x, &one)?;
//!
//! assert_eq!(e.evaluate(), U512::from(1u32));
//! ctx.update_variable("x", U512::from(0x10u32))?;
//! assert_eq!(e.evaluate(), U512::from(0x11u32));
//!
//! assert_eq!(e.to_string(), "(bvadd x (_ bv1 8))");
//! # Ok::<(), bvexpr::AstError>(())
//! ```

pub mod builder;
pub mod error;
pub mod node;
pub mod num;
pub mod repr;
pub mod solver;
pub mod symbolic;

pub mod prelude {
    pub use crate::builder::AstContext;
    pub use crate::error::{AstError, Result};
    pub use crate::node::{AstNode, NodeKind};
    pub use crate::num::{MAX_BITS_SUPPORTED, S512, U512};
    pub use crate::repr::ReprMode;
    pub use crate::solver::{SolverBackend, SolverModel};
    pub use crate::symbolic::{SymbolicExpression, SymbolicKind, SymbolicValue};
}

pub use builder::AstContext;
pub use error::{AstError, Result};
pub use node::{AstNode, NodeKind};
pub use num::{MAX_BITS_SUPPORTED, S512, U512};
pub use repr::ReprMode;
