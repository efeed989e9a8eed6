//! The bridge contract between the AST core and an external SMT solver.
//!
//! The core does not solve anything itself; it only requires that a backend
//! provide these total functions. Failures (including timeouts) surface as
//! [`AstError::Solver`](crate::error::AstError::Solver) /
//! [`AstError::SolverTimeout`](crate::error::AstError::SolverTimeout) and
//! completeness is never assumed.

use hashbrown::HashMap;
use rapidhash::quality::RandomState;

use crate::error::Result;
use crate::node::AstNode;
use crate::num::U512;

/// One variable assignment inside a model returned by the solver.
#[derive(Clone, Debug)]
pub struct SolverModel {
    id: usize,
    name: String,
    value: U512,
    size: u32,
}

impl SolverModel {
    pub fn new(id: usize, name: impl Into<String>, value: U512, size: u32) -> Self {
        SolverModel {
            id,
            name: name.into(),
            value,
            size,
        }
    }

    /// The symbolic variable id this assignment is for.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The concrete bit-vector value.
    pub fn value(&self) -> U512 {
        self.value
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

/// A model: symbolic variable id to assignment.
pub type ModelMap = HashMap<usize, SolverModel, RandomState>;

/// Narrow interface to an external SMT solver.
///
/// Implementations live outside the core. `simplify` must return a
/// structurally new root with the same logical meaning; `evaluate` is a
/// ground evaluation used for cross-checks against the core's own cached
/// evaluations.
pub trait SolverBackend {
    /// Rewrites `node` into a simpler, logically equivalent tree.
    fn simplify(&self, node: &AstNode) -> Result<AstNode>;

    /// Ground evaluation of `node` through the solver.
    fn evaluate(&self, node: &AstNode) -> Result<U512>;

    /// Computes one model satisfying `constraint`.
    fn model(&self, constraint: &AstNode) -> Result<ModelMap>;

    /// Computes up to `limit` distinct models satisfying `constraint`.
    fn models(&self, constraint: &AstNode, limit: u32) -> Result<Vec<ModelMap>>;
}
