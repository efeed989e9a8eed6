//! The AST node core: kinds, the shared node header, handles, and the
//! parent/child dependency graph.
//!
//! Nodes are shared by design. An [`AstNode`] is a cheap owning handle; a
//! node stays alive as long as any caller, any parent child-slot, or the
//! context's variable table holds one. Parent back-edges are weak and never
//! extend a lifetime — expired entries are pruned lazily when the parents
//! are read.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use hashbrown::{HashMap, HashSet};
use rapidhash::quality::RandomState;

use crate::builder::{AstContext, ContextInner};
use crate::error::{AstError, Result};
use crate::num::{U512, bit_mask, shr};
use crate::repr;

mod hash;
mod init;

/// The closed set of node kinds.
///
/// The discriminant values participate in the structural hash, so they are
/// pinned explicitly and must never be reordered.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u32)]
pub enum NodeKind {
    Bvadd = 1,
    Bvand = 2,
    Bvashr = 3,
    Bvlshr = 4,
    Bvmul = 5,
    Bvnand = 6,
    Bvneg = 7,
    Bvnor = 8,
    Bvnot = 9,
    Bvor = 10,
    Bvrol = 11,
    Bvror = 12,
    Bvsdiv = 13,
    Bvsge = 14,
    Bvsgt = 15,
    Bvshl = 16,
    Bvsle = 17,
    Bvslt = 18,
    Bvsmod = 19,
    Bvsrem = 20,
    Bvsub = 21,
    Bvudiv = 22,
    Bvuge = 23,
    Bvugt = 24,
    Bvule = 25,
    Bvult = 26,
    Bvurem = 27,
    Bvxnor = 28,
    Bvxor = 29,
    Bv = 30,
    Concat = 31,
    Decimal = 32,
    Distinct = 33,
    Equal = 34,
    Extract = 35,
    Ite = 36,
    Land = 37,
    Let = 38,
    Lnot = 39,
    Lor = 40,
    Reference = 41,
    String = 42,
    Sx = 43,
    Variable = 44,
    Zx = 45,
}

impl NodeKind {
    /// The stable symbolic name of the kind (`bvadd`, `extract`, ...).
    pub fn symbol(self) -> &'static str {
        match self {
            NodeKind::Bvadd => "bvadd",
            NodeKind::Bvand => "bvand",
            NodeKind::Bvashr => "bvashr",
            NodeKind::Bvlshr => "bvlshr",
            NodeKind::Bvmul => "bvmul",
            NodeKind::Bvnand => "bvnand",
            NodeKind::Bvneg => "bvneg",
            NodeKind::Bvnor => "bvnor",
            NodeKind::Bvnot => "bvnot",
            NodeKind::Bvor => "bvor",
            NodeKind::Bvrol => "bvrol",
            NodeKind::Bvror => "bvror",
            NodeKind::Bvsdiv => "bvsdiv",
            NodeKind::Bvsge => "bvsge",
            NodeKind::Bvsgt => "bvsgt",
            NodeKind::Bvshl => "bvshl",
            NodeKind::Bvsle => "bvsle",
            NodeKind::Bvslt => "bvslt",
            NodeKind::Bvsmod => "bvsmod",
            NodeKind::Bvsrem => "bvsrem",
            NodeKind::Bvsub => "bvsub",
            NodeKind::Bvudiv => "bvudiv",
            NodeKind::Bvuge => "bvuge",
            NodeKind::Bvugt => "bvugt",
            NodeKind::Bvule => "bvule",
            NodeKind::Bvult => "bvult",
            NodeKind::Bvurem => "bvurem",
            NodeKind::Bvxnor => "bvxnor",
            NodeKind::Bvxor => "bvxor",
            NodeKind::Bv => "bv",
            NodeKind::Concat => "concat",
            NodeKind::Decimal => "decimal",
            NodeKind::Distinct => "distinct",
            NodeKind::Equal => "equal",
            NodeKind::Extract => "extract",
            NodeKind::Ite => "ite",
            NodeKind::Land => "land",
            NodeKind::Let => "let",
            NodeKind::Lnot => "lnot",
            NodeKind::Lor => "lor",
            NodeKind::Reference => "reference",
            NodeKind::String => "string",
            NodeKind::Sx => "sx",
            NodeKind::Variable => "variable",
            NodeKind::Zx => "zx",
        }
    }

    /// True for nodes whose value is a single predicate bit: the eight
    /// signed/unsigned comparisons, `equal`, `distinct`, and the boolean
    /// connectives.
    pub fn is_logical(self) -> bool {
        matches!(
            self,
            NodeKind::Bvsge
                | NodeKind::Bvsgt
                | NodeKind::Bvsle
                | NodeKind::Bvslt
                | NodeKind::Bvuge
                | NodeKind::Bvugt
                | NodeKind::Bvule
                | NodeKind::Bvult
                | NodeKind::Distinct
                | NodeKind::Equal
                | NodeKind::Land
                | NodeKind::Lnot
                | NodeKind::Lor
        )
    }

    /// True for the payload-carrying leaves.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            NodeKind::Bv | NodeKind::Decimal | NodeKind::String | NodeKind::Variable
        )
    }
}

bitflags! {
    /// Cached per-node properties.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub(crate) struct NodeFlags: u8 {
        /// A `variable` node is reachable from this node.
        const SYMBOLIZED = 0b01;
        /// The node's kind is logical (cached from [`NodeKind::is_logical`]).
        const LOGICAL    = 0b10;
    }
}

/// Kind-specific payload stored next to the shared header.
#[derive(Clone)]
pub(crate) enum Payload {
    None,
    /// `decimal` literal value.
    Decimal(U512),
    /// `string` literal text.
    Text(String),
    /// `variable` name; the concrete value lives in the context.
    Variable(String),
    /// `reference` id plus the referenced tree, kept out-of-band rather
    /// than as a child slot.
    Reference { id: usize, ast: AstNode },
}

/// Shared node header. Access goes through [`AstNode`].
pub(crate) struct Node {
    kind: NodeKind,
    payload: Payload,
    children: Vec<AstNode>,
    /// Weak back-edges keyed by the parent's address.
    parents: HashMap<usize, WeakAstNode, RandomState>,
    size: u32,
    eval: U512,
    flags: NodeFlags,
    ctx: Weak<ContextInner>,
}

/// An owning handle to an AST node.
///
/// Handles are reference-counted: cloning one is cheap and shares the node.
/// All nodes are created through an [`AstContext`](crate::builder::AstContext);
/// the context validates operand widths and kinds at construction time and
/// keeps each node's cached evaluation consistent with its children.
#[derive(Clone)]
pub struct AstNode {
    inner: Rc<RefCell<Node>>,
}

/// A non-owning handle, used for parent back-edges.
#[derive(Clone)]
pub(crate) struct WeakAstNode {
    inner: Weak<RefCell<Node>>,
}

impl WeakAstNode {
    fn upgrade(&self) -> Option<AstNode> {
        self.inner.upgrade().map(|inner| AstNode { inner })
    }
}

impl AstNode {
    /// Allocates a node in its default, uninitialized state.
    pub(crate) fn raw(kind: NodeKind, payload: Payload, ctx: Weak<ContextInner>) -> AstNode {
        let mut flags = NodeFlags::empty();
        if kind.is_logical() {
            flags |= NodeFlags::LOGICAL;
        }
        AstNode {
            inner: Rc::new(RefCell::new(Node {
                kind,
                payload,
                children: Vec::new(),
                parents: HashMap::with_hasher(RandomState::new()),
                size: 0,
                eval: U512::zero(),
                flags,
                ctx,
            })),
        }
    }

    /// Stable address of the node, used as its identity in parent maps.
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    pub(crate) fn downgrade(&self) -> WeakAstNode {
        WeakAstNode {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// True iff both handles point at the very same node.
    pub fn ptr_eq(&self, other: &AstNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn kind(&self) -> NodeKind {
        self.inner.borrow().kind
    }

    /// Bit-width of the node. Zero for the non-bit-vector leaves
    /// (`decimal`, `string`).
    pub fn bitvector_size(&self) -> u32 {
        self.inner.borrow().size
    }

    /// The all-ones mask for this node's width: `(1 << size) - 1`.
    pub fn bitvector_mask(&self) -> U512 {
        bit_mask(self.inner.borrow().size)
    }

    /// The cached concrete evaluation, already masked to the node's width.
    pub fn evaluate(&self) -> U512 {
        self.inner.borrow().eval
    }

    /// True iff the top bit of the evaluation is set within the node's
    /// width field.
    pub fn is_signed(&self) -> bool {
        let n = self.inner.borrow();
        if n.size == 0 {
            return false;
        }
        !(shr(n.eval, n.size - 1) & U512::one()).is_zero()
    }

    /// True iff a `variable` node is reachable from this node.
    pub fn is_symbolized(&self) -> bool {
        self.inner.borrow().flags.contains(NodeFlags::SYMBOLIZED)
    }

    /// True iff the node's value is a single predicate bit.
    pub fn is_logical(&self) -> bool {
        self.inner.borrow().flags.contains(NodeFlags::LOGICAL)
    }

    pub fn is_leaf(&self) -> bool {
        self.kind().is_leaf()
    }

    /// Structural equality: equal evaluation, equal width, and equal
    /// structural hash.
    ///
    /// The hash is a compression over the 2^512 ring and is not injective
    /// on its own; the evaluation and width comparisons guard against
    /// collisions.
    pub fn equal_to(&self, other: &AstNode) -> bool {
        self.evaluate() == other.evaluate()
            && self.bitvector_size() == other.bitvector_size()
            && self.structural_hash(1) == other.structural_hash(1)
    }

    /// The structural hash of the tree rooted here.
    ///
    /// Stable across runs: it depends only on kinds, payloads, child order
    /// (for position-sensitive operators), and the starting `depth`.
    /// Commutative operators mix their children order-insensitively, so
    /// `bvadd(a, b)` and `bvadd(b, a)` hash identically.
    pub fn structural_hash(&self, depth: u32) -> U512 {
        hash::structural(self, depth)
    }

    /// The ordered children, as fresh owning handles.
    pub fn children(&self) -> Vec<AstNode> {
        self.inner.borrow().children.clone()
    }

    pub fn child(&self, index: usize) -> Option<AstNode> {
        self.inner.borrow().children.get(index).cloned()
    }

    pub fn child_count(&self) -> usize {
        self.inner.borrow().children.len()
    }

    /// The live parents of the node.
    ///
    /// Back-edges are weak; any entry whose parent has been dropped is
    /// pruned here before the remainder is returned.
    pub fn parents(&self) -> Vec<AstNode> {
        let mut res = Vec::new();
        let mut expired = Vec::new();
        {
            let n = self.inner.borrow();
            for (&addr, weak) in &n.parents {
                match weak.upgrade() {
                    Some(parent) => res.push(parent),
                    None => expired.push(addr),
                }
            }
        }
        if !expired.is_empty() {
            let mut n = self.inner.borrow_mut();
            for addr in expired {
                n.parents.remove(&addr);
            }
        }
        res
    }

    /// Registers `parent` as a parent of `self`. Idempotent: a live entry
    /// for the same parent is left untouched, an expired one is replaced.
    pub(crate) fn set_parent(&self, parent: &AstNode) {
        let mut n = self.inner.borrow_mut();
        let entry = n.parents.entry(parent.addr());
        entry
            .and_modify(|weak| {
                if weak.upgrade().is_none() {
                    *weak = parent.downgrade();
                }
            })
            .or_insert_with(|| parent.downgrade());
    }

    /// Removes the back-edge to `parent`. A no-op if there is none.
    pub(crate) fn remove_parent(&self, parent: &AstNode) {
        self.inner.borrow_mut().parents.remove(&parent.addr());
    }

    /// Appends a child and registers the back-edge.
    pub(crate) fn add_child(&self, child: AstNode) {
        child.set_parent(self);
        self.inner.borrow_mut().children.push(child);
    }

    /// Replaces the child at `index` and re-initializes the node, which
    /// re-propagates size, evaluation, and symbolization to every ancestor.
    ///
    /// The replaced child keeps its back-edge only if it still occupies
    /// another slot of this node.
    pub fn set_child(&self, index: usize, child: AstNode) -> Result<()> {
        let outgoing = {
            let mut n = self.inner.borrow_mut();
            if index >= n.children.len() {
                return Err(AstError::NullChild { index });
            }
            std::mem::replace(&mut n.children[index], child.clone())
        };
        child.set_parent(self);
        let still_used = self
            .inner
            .borrow()
            .children
            .iter()
            .any(|c| c.ptr_eq(&outgoing));
        if !still_used {
            outgoing.remove_parent(self);
        }
        self.init()
    }

    /// Recomputes this node's size, evaluation, and symbolization from its
    /// children, then walks every live parent so the change reaches the
    /// roots. Termination is guaranteed by the DAG invariant.
    pub(crate) fn init(&self) -> Result<()> {
        init::reinit(self)?;
        self.update_parents()
    }

    fn update_parents(&self) -> Result<()> {
        let parents = self.parents();
        if !parents.is_empty() {
            tracing::trace!(
                kind = self.kind().symbol(),
                parents = parents.len(),
                "propagating re-initialization"
            );
        }
        for parent in parents {
            parent.init()?;
        }
        Ok(())
    }

    /// Pins the width of a node whose size is not derived from children
    /// (`variable` nodes).
    pub(crate) fn set_bitvector_size(&self, size: u32) {
        self.inner.borrow_mut().size = size;
    }

    /// Stores the result of a per-kind initialization.
    pub(crate) fn store_init(&self, size: u32, eval: U512, symbolized: bool) {
        let mut n = self.inner.borrow_mut();
        n.size = size;
        n.eval = eval;
        n.flags.set(NodeFlags::SYMBOLIZED, symbolized);
    }

    /// The context that created this node, if it is still alive.
    pub fn context(&self) -> Option<AstContext> {
        self.inner
            .borrow()
            .ctx
            .upgrade()
            .map(AstContext::from_inner)
    }

    pub(crate) fn payload(&self) -> Payload {
        self.inner.borrow().payload.clone()
    }

    /// The literal value of a `decimal` node.
    pub fn decimal_value(&self) -> Option<U512> {
        match &self.inner.borrow().payload {
            Payload::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    /// The text of a `string` node.
    pub fn text_value(&self) -> Option<String> {
        match &self.inner.borrow().payload {
            Payload::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    /// The name of a `variable` node.
    pub fn variable_name(&self) -> Option<String> {
        match &self.inner.borrow().payload {
            Payload::Variable(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// The id of a `reference` node.
    pub fn reference_id(&self) -> Option<usize> {
        match &self.inner.borrow().payload {
            Payload::Reference { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// The tree a `reference` node stands for.
    pub fn referent(&self) -> Option<AstNode> {
        match &self.inner.borrow().payload {
            Payload::Reference { ast, .. } => Some(ast.clone()),
            _ => None,
        }
    }

    /// Returns a structurally identical tree whose nodes are all fresh
    /// copies of the originals.
    ///
    /// Cached sizes and evaluations are carried over, so the copy is ready
    /// to use without re-initialization. A `reference` copy shares its
    /// referent with the original rather than cloning it.
    pub fn deep_copy(&self) -> AstNode {
        let copy = {
            let n = self.inner.borrow();
            let copy = AstNode::raw(n.kind, n.payload.clone(), n.ctx.clone());
            {
                let mut c = copy.inner.borrow_mut();
                c.size = n.size;
                c.eval = n.eval;
                c.flags = n.flags;
            }
            copy
        };
        for child in self.children() {
            copy.add_child(child.deep_copy());
        }
        if let Some(referent) = copy.referent() {
            referent.set_parent(&copy);
        }
        copy
    }

    /// Collects every distinct node of the tree rooted here, in
    /// depth-first order. Shared subtrees are visited once.
    pub fn unique_nodes(&self) -> Vec<AstNode> {
        let mut seen: HashSet<usize, RandomState> = HashSet::with_hasher(RandomState::new());
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            if !seen.insert(node.addr()) {
                continue;
            }
            let children = node.children();
            stack.extend(children.into_iter().rev());
            out.push(node);
        }
        out
    }
}

impl fmt::Display for AstNode {
    /// Renders the node in the representation currently selected on its
    /// context; SMT syntax if the context is gone.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.context() {
            Some(ctx) => ctx.print(f, self),
            None => repr::smt::write_node(f, self),
        }
    }
}

impl fmt::Debug for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.inner.borrow();
        f.debug_struct("AstNode")
            .field("kind", &n.kind)
            .field("size", &n.size)
            .field("eval", &n.eval)
            .field("children", &n.children.len())
            .finish()
    }
}
