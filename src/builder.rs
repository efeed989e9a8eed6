//! The builder context: the single entry point through which clients
//! construct nodes.
//!
//! An [`AstContext`] owns the free-variable environment and selects the
//! textual representation. Every constructor validates operand widths and
//! kinds up front and returns an initialized node whose cached evaluation
//! is already consistent with its children. Two contexts are fully
//! independent; a context and the nodes it created form one single-threaded
//! ownership domain.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use hashbrown::HashMap;
use rapidhash::quality::RandomState;

use crate::error::{AstError, Result};
use crate::node::{AstNode, NodeKind, Payload};
use crate::num::{MAX_BITS_SUPPORTED, U512};
use crate::repr::{self, ReprMode};

mod ast_ops;

struct VariableSlot {
    node: AstNode,
    value: U512,
}

pub(crate) struct ContextInner {
    variables: RefCell<HashMap<String, VariableSlot, RandomState>>,
    mode: Cell<ReprMode>,
}

/// Builder and environment for bit-vector ASTs.
///
/// # Example
/// ```rust
/// use bvexpr::{AstContext, U512};
///
/// let ctx = AstContext::new();
/// let a = ctx.bv(U512::from(0xFFu32), 8)?;
/// let b = ctx.bv(U512::from(0x02u32), 8)?;
/// let sum = ctx.bvadd(&a, &b)?;
///
/// // 8-bit wrap-around: 0xFF + 0x02 == 0x01
/// assert_eq!(sum.evaluate(), U512::from(0x01u32));
/// assert_eq!(sum.bitvector_size(), 8);
/// # Ok::<(), bvexpr::AstError>(())
/// ```
pub struct AstContext {
    inner: Rc<ContextInner>,
}

impl Default for AstContext {
    fn default() -> Self {
        AstContext {
            inner: Rc::new(ContextInner {
                variables: RefCell::new(HashMap::with_hasher(RandomState::new())),
                mode: Cell::new(ReprMode::Smt),
            }),
        }
    }
}

impl AstContext {
    /// Creates a new, empty context.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_inner(inner: Rc<ContextInner>) -> Self {
        AstContext { inner }
    }

    fn weak(&self) -> Weak<ContextInner> {
        Rc::downgrade(&self.inner)
    }

    /// Allocates a node, appends its children in order, and initializes it.
    /// The node is dropped if any construction contract fails.
    fn build(
        &self,
        kind: NodeKind,
        payload: Payload,
        children: impl IntoIterator<Item = AstNode>,
    ) -> Result<AstNode> {
        let node = AstNode::raw(kind, payload, self.weak());
        for child in children {
            node.add_child(child);
        }
        node.init()?;
        Ok(node)
    }

    // --- leaves ---------------------------------------------------------

    /// A `decimal` literal: a plain number with no bit-vector width.
    /// Decimals parameterize operators (extract bounds, extension sizes,
    /// rotate counts) and the two children of a `bv` literal.
    pub fn decimal(&self, value: U512) -> AstNode {
        let node = AstNode::raw(NodeKind::Decimal, Payload::Decimal(value), self.weak());
        node.store_init(0, U512::zero(), false);
        node
    }

    /// A `string` literal (used as the alias of a `let` binding).
    pub fn string(&self, text: impl Into<String>) -> AstNode {
        let node = AstNode::raw(NodeKind::String, Payload::Text(text.into()), self.weak());
        node.store_init(0, U512::zero(), false);
        node
    }

    /// A bit-vector literal of the given width. The value is masked to
    /// `size` bits; `size` must be in `1..=512`.
    pub fn bv(&self, value: U512, size: u32) -> Result<AstNode> {
        let value = self.decimal(value);
        let size = self.decimal(U512::from(size));
        self.build(NodeKind::Bv, Payload::None, [value, size])
    }

    /// The 1-bit literal `1`.
    pub fn bvtrue(&self) -> Result<AstNode> {
        self.bv(U512::one(), 1)
    }

    /// The 1-bit literal `0`.
    pub fn bvfalse(&self) -> Result<AstNode> {
        self.bv(U512::zero(), 1)
    }

    /// A free variable of the given width.
    ///
    /// The first call for a name registers it with an initial concrete
    /// value of zero; later calls return the cached node. Asking for an
    /// existing name with a different width is an error.
    ///
    /// # Example
    /// ```rust
    /// use bvexpr::{AstContext, U512};
    ///
    /// let ctx = AstContext::new();
    /// let x = ctx.variable("x", 8)?;
    /// let again = ctx.variable("x", 8)?;
    /// assert!(x.ptr_eq(&again));
    /// assert!(ctx.variable("x", 16).is_err());
    /// # Ok::<(), bvexpr::AstError>(())
    /// ```
    pub fn variable(&self, name: impl Into<String>, size: u32) -> Result<AstNode> {
        let name = name.into();
        if size == 0 || size > MAX_BITS_SUPPORTED {
            return Err(AstError::range(
                "variable",
                format!("width must be in 1..={MAX_BITS_SUPPORTED}, got {size}"),
            ));
        }
        if let Some(slot) = self.inner.variables.borrow().get(&name) {
            let existing = slot.node.bitvector_size();
            if existing != size {
                return Err(AstError::variable(
                    &name,
                    format!("size mismatch against existing binding ({existing} vs {size})"),
                ));
            }
            return Ok(slot.node.clone());
        }
        let node = AstNode::raw(
            NodeKind::Variable,
            Payload::Variable(name.clone()),
            self.weak(),
        );
        node.set_bitvector_size(size);
        self.init_variable(&name, U512::zero(), node.clone())?;
        node.init()?;
        Ok(node)
    }

    // --- bit-vector operators -------------------------------------------

    pub fn bvadd(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvadd, lhs, rhs)
    }

    pub fn bvsub(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvsub, lhs, rhs)
    }

    pub fn bvmul(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvmul, lhs, rhs)
    }

    pub fn bvand(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvand, lhs, rhs)
    }

    pub fn bvor(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvor, lhs, rhs)
    }

    pub fn bvxor(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvxor, lhs, rhs)
    }

    pub fn bvnand(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvnand, lhs, rhs)
    }

    pub fn bvnor(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvnor, lhs, rhs)
    }

    pub fn bvxnor(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvxnor, lhs, rhs)
    }

    /// Two's-complement negation.
    pub fn bvneg(&self, expr: &AstNode) -> Result<AstNode> {
        self.build(NodeKind::Bvneg, Payload::None, [expr.clone()])
    }

    /// Bitwise complement.
    pub fn bvnot(&self, expr: &AstNode) -> Result<AstNode> {
        self.build(NodeKind::Bvnot, Payload::None, [expr.clone()])
    }

    pub fn bvshl(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvshl, lhs, rhs)
    }

    /// Logical (zero-filling) right shift.
    pub fn bvlshr(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvlshr, lhs, rhs)
    }

    /// Arithmetic (sign-filling) right shift.
    pub fn bvashr(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvashr, lhs, rhs)
    }

    /// Left rotation by a constant count.
    pub fn bvrol(&self, rot: u32, expr: &AstNode) -> Result<AstNode> {
        self.bvrol_node(&self.decimal(U512::from(rot)), expr)
    }

    /// Left rotation where the count is an existing `decimal` node.
    pub fn bvrol_node(&self, rot: &AstNode, expr: &AstNode) -> Result<AstNode> {
        self.build(NodeKind::Bvrol, Payload::None, [rot.clone(), expr.clone()])
    }

    /// Right rotation by a constant count.
    pub fn bvror(&self, rot: u32, expr: &AstNode) -> Result<AstNode> {
        self.bvror_node(&self.decimal(U512::from(rot)), expr)
    }

    /// Right rotation where the count is an existing `decimal` node.
    pub fn bvror_node(&self, rot: &AstNode, expr: &AstNode) -> Result<AstNode> {
        self.build(NodeKind::Bvror, Payload::None, [rot.clone(), expr.clone()])
    }

    /// Unsigned division; division by zero yields the all-ones pattern.
    pub fn bvudiv(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvudiv, lhs, rhs)
    }

    /// Unsigned remainder; a zero divisor yields the dividend.
    pub fn bvurem(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvurem, lhs, rhs)
    }

    /// Signed division, truncating toward zero.
    pub fn bvsdiv(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvsdiv, lhs, rhs)
    }

    /// Signed remainder; the sign follows the dividend.
    pub fn bvsrem(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvsrem, lhs, rhs)
    }

    /// Signed modulo; the sign follows the divisor.
    pub fn bvsmod(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvsmod, lhs, rhs)
    }

    // --- comparisons ----------------------------------------------------

    pub fn bvuge(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvuge, lhs, rhs)
    }

    pub fn bvugt(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvugt, lhs, rhs)
    }

    pub fn bvule(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvule, lhs, rhs)
    }

    pub fn bvult(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvult, lhs, rhs)
    }

    pub fn bvsge(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvsge, lhs, rhs)
    }

    pub fn bvsgt(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvsgt, lhs, rhs)
    }

    pub fn bvsle(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvsle, lhs, rhs)
    }

    pub fn bvslt(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Bvslt, lhs, rhs)
    }

    pub fn equal(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Equal, lhs, rhs)
    }

    pub fn distinct(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Distinct, lhs, rhs)
    }

    // --- structure ------------------------------------------------------

    /// Concatenation of two expressions; the left operand lands in the
    /// high bits.
    pub fn concat(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Concat, lhs, rhs)
    }

    /// N-ary concatenation, high bits first. Takes two or more operands.
    pub fn concat_many(&self, exprs: impl IntoIterator<Item = AstNode>) -> Result<AstNode> {
        self.build(NodeKind::Concat, Payload::None, exprs)
    }

    /// Extraction of bits `low..=high`.
    ///
    /// Extracting the full width of `expr` is an identity and returns the
    /// very same handle.
    ///
    /// # Example
    /// ```rust
    /// use bvexpr::{AstContext, U512};
    ///
    /// let ctx = AstContext::new();
    /// let e = ctx.bv(U512::from(0xABCDu32), 16)?;
    /// let full = ctx.extract(15, 0, &e)?;
    /// assert!(full.ptr_eq(&e));
    ///
    /// let byte = ctx.extract(11, 4, &e)?;
    /// assert_eq!(byte.evaluate(), U512::from(0xBCu32));
    /// # Ok::<(), bvexpr::AstError>(())
    /// ```
    pub fn extract(&self, high: u32, low: u32, expr: &AstNode) -> Result<AstNode> {
        // full-width extraction is an identity
        if low == 0 && high.checked_add(1) == Some(expr.bitvector_size()) {
            return Ok(expr.clone());
        }
        let high = self.decimal(U512::from(high));
        let low = self.decimal(U512::from(low));
        self.build(NodeKind::Extract, Payload::None, [high, low, expr.clone()])
    }

    /// Sign extension by `ext` bits. `sx(0, e)` is an identity and returns
    /// the same handle.
    pub fn sx(&self, ext: u32, expr: &AstNode) -> Result<AstNode> {
        if ext == 0 {
            return Ok(expr.clone());
        }
        let ext = self.decimal(U512::from(ext));
        self.build(NodeKind::Sx, Payload::None, [ext, expr.clone()])
    }

    /// Zero extension by `ext` bits. `zx(0, e)` is an identity and returns
    /// the same handle.
    pub fn zx(&self, ext: u32, expr: &AstNode) -> Result<AstNode> {
        if ext == 0 {
            return Ok(expr.clone());
        }
        let ext = self.decimal(U512::from(ext));
        self.build(NodeKind::Zx, Payload::None, [ext, expr.clone()])
    }

    /// If-then-else over bit-vectors: `cond` must be logical, both branches
    /// must share a width.
    pub fn ite(&self, cond: &AstNode, then: &AstNode, otherwise: &AstNode) -> Result<AstNode> {
        self.build(
            NodeKind::Ite,
            Payload::None,
            [cond.clone(), then.clone(), otherwise.clone()],
        )
    }

    // --- boolean connectives --------------------------------------------

    pub fn land(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Land, lhs, rhs)
    }

    /// N-ary conjunction over logical nodes. Takes two or more operands.
    pub fn land_many(&self, exprs: impl IntoIterator<Item = AstNode>) -> Result<AstNode> {
        self.build(NodeKind::Land, Payload::None, exprs)
    }

    pub fn lor(&self, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.binary(NodeKind::Lor, lhs, rhs)
    }

    /// N-ary disjunction over logical nodes. Takes two or more operands.
    pub fn lor_many(&self, exprs: impl IntoIterator<Item = AstNode>) -> Result<AstNode> {
        self.build(NodeKind::Lor, Payload::None, exprs)
    }

    pub fn lnot(&self, expr: &AstNode) -> Result<AstNode> {
        self.build(NodeKind::Lnot, Payload::None, [expr.clone()])
    }

    /// A `let` binding: `alias` names `bound` inside `body`. Width and
    /// evaluation are the body's.
    pub fn let_binding(
        &self,
        alias: impl Into<String>,
        bound: &AstNode,
        body: &AstNode,
    ) -> Result<AstNode> {
        let alias = self.string(alias);
        self.build(
            NodeKind::Let,
            Payload::None,
            [alias, bound.clone(), body.clone()],
        )
    }

    /// A named alias for a whole sub-expression, used by symbolic-execution
    /// engines to share structure under stable ids. The reference mirrors
    /// the referent's width, evaluation, and symbolization, and tracks them
    /// under propagation.
    pub fn reference(&self, ast: &AstNode, id: usize) -> Result<AstNode> {
        let node = AstNode::raw(
            NodeKind::Reference,
            Payload::Reference {
                id,
                ast: ast.clone(),
            },
            self.weak(),
        );
        ast.set_parent(&node);
        node.init()?;
        Ok(node)
    }

    fn binary(&self, kind: NodeKind, lhs: &AstNode, rhs: &AstNode) -> Result<AstNode> {
        self.build(kind, Payload::None, [lhs.clone(), rhs.clone()])
    }

    // --- variable environment -------------------------------------------

    /// Registers a variable binding. Fails if the name is already taken.
    pub fn init_variable(
        &self,
        name: impl Into<String>,
        value: U512,
        node: AstNode,
    ) -> Result<()> {
        let name = name.into();
        let mut vars = self.inner.variables.borrow_mut();
        if vars.contains_key(&name) {
            return Err(AstError::variable(name, "already registered"));
        }
        vars.insert(name, VariableSlot { node, value });
        Ok(())
    }

    /// Rebinds the concrete value of a variable and re-propagates the
    /// cached evaluation through every expression that contains it.
    ///
    /// # Example
    /// ```rust
    /// use bvexpr::{AstContext, U512};
    ///
    /// let ctx = AstContext::new();
    /// let x = ctx.variable("x", 8)?;
    /// let one = ctx.bv(U512::one(), 8)?;
    /// let e = ctx.bvadd(&x, &one)?;
    /// assert_eq!(e.evaluate(), U512::from(1u32));
    ///
    /// ctx.update_variable("x", U512::from(0x10u32))?;
    /// assert_eq!(e.evaluate(), U512::from(0x11u32));
    /// # Ok::<(), bvexpr::AstError>(())
    /// ```
    pub fn update_variable(&self, name: &str, value: U512) -> Result<()> {
        let node = {
            let mut vars = self.inner.variables.borrow_mut();
            let slot = vars
                .get_mut(name)
                .ok_or_else(|| AstError::variable(name, "not registered"))?;
            slot.value = value;
            slot.node.clone()
        };
        tracing::debug!(name, value = %value, "rebinding variable");
        node.init()
    }

    /// The concrete value currently bound to a variable.
    pub fn value_of(&self, name: &str) -> Result<U512> {
        self.inner
            .variables
            .borrow()
            .get(name)
            .map(|slot| slot.value)
            .ok_or_else(|| AstError::variable(name, "not registered"))
    }

    /// The node registered for a variable name, if any.
    pub fn variable_node(&self, name: &str) -> Option<AstNode> {
        self.inner
            .variables
            .borrow()
            .get(name)
            .map(|slot| slot.node.clone())
    }

    // --- representation -------------------------------------------------

    /// Selects the surface syntax used by [`print`](Self::print) and by the
    /// `Display` implementation of [`AstNode`].
    pub fn set_representation_mode(&self, mode: ReprMode) {
        tracing::debug!(?mode, "switching representation mode");
        self.inner.mode.set(mode);
    }

    pub fn representation_mode(&self) -> ReprMode {
        self.inner.mode.get()
    }

    /// Writes `node` to `out` in the currently selected representation.
    pub fn print(&self, out: &mut dyn fmt::Write, node: &AstNode) -> fmt::Result {
        repr::print(self.inner.mode.get(), out, node)
    }
}
