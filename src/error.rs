use thiserror::Error;

/// Result type used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, AstError>;

/// Error raised by AST construction, mutation, and the surrounding services.
///
/// Construction is strict: a node that would violate an arity, width, kind,
/// or range contract is never created, and the error names the operation
/// that rejected it. Concrete evaluation itself is total and never fails.
#[derive(Error, Debug)]
pub enum AstError {
    /// Wrong number of children for an operator.
    #[error("{op}: expected {expected} children, got {got}")]
    Arity {
        /// Operator that rejected the construction.
        op: &'static str,
        /// Human-readable arity contract (e.g. "at least 2").
        expected: &'static str,
        /// Number of children actually supplied.
        got: usize,
    },

    /// Operand bit-widths are incompatible.
    #[error("{op}: operand widths differ ({lhs} vs {rhs})")]
    Width {
        op: &'static str,
        lhs: u32,
        rhs: u32,
    },

    /// An operand has an unexpected node kind (e.g. a rotate count that is
    /// not a decimal, or a non-logical `ite` condition).
    #[error("{op}: {message}")]
    Kind {
        op: &'static str,
        message: String,
    },

    /// A size or bound is out of range (zero width, width above
    /// [`MAX_BITS_SUPPORTED`](crate::num::MAX_BITS_SUPPORTED), bad extract
    /// bounds, extension overflow).
    #[error("{op}: {message}")]
    Range {
        op: &'static str,
        message: String,
    },

    /// `set_child` addressed a child slot that does not exist.
    #[error("no child slot at index {index}")]
    NullChild { index: usize },

    /// Variable table inconsistency: double registration, missing name, or
    /// a size mismatch against an existing binding.
    #[error("variable `{name}`: {message}")]
    Variable {
        name: String,
        message: String,
    },

    /// An identifier does not name a known representation mode.
    #[error("unknown representation mode {mode}")]
    Representation { mode: u32 },

    /// Failure surfaced from the external solver bridge.
    #[error("solver: {message}")]
    Solver { message: String },

    /// The external solver gave up before producing an answer.
    #[error("solver timed out")]
    SolverTimeout,
}

impl AstError {
    pub(crate) fn kind(op: &'static str, message: impl Into<String>) -> Self {
        AstError::Kind {
            op,
            message: message.into(),
        }
    }

    pub(crate) fn range(op: &'static str, message: impl Into<String>) -> Self {
        AstError::Range {
            op,
            message: message.into(),
        }
    }

    pub(crate) fn variable(name: impl Into<String>, message: impl Into<String>) -> Self {
        AstError::Variable {
            name: name.into(),
            message: message.into(),
        }
    }
}
