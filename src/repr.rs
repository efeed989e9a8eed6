//! Surface-syntax printing.
//!
//! Two representations are supported, selected per context: SMT-LIB 2
//! concrete syntax ([`smt`]) and a Python-like expression syntax
//! ([`python`]). The dispatcher here routes
//! [`AstContext::print`](crate::builder::AstContext::print) to the selected
//! printer.

use std::fmt;

use crate::error::AstError;
use crate::node::AstNode;

pub mod python;
pub mod smt;

/// The closed set of surface syntaxes.
///
/// The discriminants are stable identifiers for foreign callers;
/// [`ReprMode::from_id`] validates them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum ReprMode {
    /// SMT-LIB 2 concrete syntax; comment prefix `;`.
    Smt = 0,
    /// Python-like expression syntax; comment prefix `#`.
    Python = 1,
}

impl ReprMode {
    /// Resolves a raw mode identifier.
    pub fn from_id(id: u32) -> Result<ReprMode, AstError> {
        match id {
            0 => Ok(ReprMode::Smt),
            1 => Ok(ReprMode::Python),
            mode => Err(AstError::Representation { mode }),
        }
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    /// The line-comment prefix of the syntax.
    pub fn comment_prefix(self) -> &'static str {
        match self {
            ReprMode::Smt => ";",
            ReprMode::Python => "#",
        }
    }
}

impl TryFrom<u32> for ReprMode {
    type Error = AstError;

    fn try_from(id: u32) -> Result<ReprMode, AstError> {
        ReprMode::from_id(id)
    }
}

/// Writes `node` to `out` in the given representation.
pub fn print(mode: ReprMode, out: &mut dyn fmt::Write, node: &AstNode) -> fmt::Result {
    match mode {
        ReprMode::Smt => smt::write_node(out, node),
        ReprMode::Python => python::write_node(out, node),
    }
}

/// Renders `node` to a fresh string in the given representation.
pub fn to_string(mode: ReprMode, node: &AstNode) -> String {
    let mut out = String::new();
    print(mode, &mut out, node).expect("formatting into a String cannot fail");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_identifiers_round_trip() {
        assert_eq!(ReprMode::from_id(0).unwrap(), ReprMode::Smt);
        assert_eq!(ReprMode::from_id(1).unwrap(), ReprMode::Python);
        assert_eq!(ReprMode::Smt.id(), 0);
        assert_eq!(ReprMode::Python.id(), 1);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = ReprMode::from_id(7).unwrap_err();
        assert!(matches!(err, AstError::Representation { mode: 7 }));
    }

    #[test]
    fn comment_prefixes() {
        assert_eq!(ReprMode::Smt.comment_prefix(), ";");
        assert_eq!(ReprMode::Python.comment_prefix(), "#");
    }
}
