//! Dependency-graph maintenance: variable update propagation and the
//! universal invariants of the DAG.

use bvexpr::{AstContext, AstNode, U512};

/// Checks the universal invariants on every node reachable from `root`:
/// masked evaluations, symbolization as the OR over children, and
/// parent/child edge consistency.
fn assert_invariants(root: &AstNode) {
    for node in root.unique_nodes() {
        // eval stays masked to the width
        assert_eq!(
            node.evaluate(),
            node.evaluate() & node.bitvector_mask(),
            "unmasked evaluation on {:?}",
            node
        );
        if node.is_logical() {
            assert!(node.evaluate() <= U512::one(), "logical eval must be 0 or 1");
        }

        let children = node.children();
        if !children.is_empty() {
            let expected = children.iter().any(|c| c.is_symbolized());
            assert_eq!(
                node.is_symbolized(),
                expected,
                "symbolized flag out of sync on {:?}",
                node
            );
        }

        // every child edge has a matching parent back-edge
        for child in &children {
            assert!(
                child.parents().iter().any(|p| p.ptr_eq(&node)),
                "missing back-edge from child of {:?}",
                node
            );
        }
        // every parent back-edge has a matching child edge
        for parent in node.parents() {
            assert!(
                parent.children().iter().any(|c| c.ptr_eq(&node))
                    || parent
                        .referent()
                        .is_some_and(|referent| referent.ptr_eq(&node)),
                "dangling back-edge on {:?}",
                node
            );
        }
    }
}

#[test]
fn update_reaches_a_direct_expression() {
    let ctx = AstContext::new();
    let x = ctx.variable("x", 8).unwrap();
    let one = ctx.bv(U512::one(), 8).unwrap();
    let e = ctx.bvadd(&x, &one).unwrap();
    assert_eq!(e.evaluate(), U512::one());

    ctx.update_variable("x", U512::from(0x10u32)).unwrap();
    assert_eq!(e.evaluate(), U512::from(0x11u32));
    assert_invariants(&e);
}

#[test]
fn update_reaches_every_ancestor_transitively() {
    let ctx = AstContext::new();
    let x = ctx.variable("x", 8).unwrap();
    let two = ctx.bv(U512::from(2u32), 8).unwrap();

    // ((x * 2) + 2) concatenated under a wider root
    let product = ctx.bvmul(&x, &two).unwrap();
    let sum = ctx.bvadd(&product, &two).unwrap();
    let root = ctx.concat(&sum, &x).unwrap();
    assert_eq!(root.evaluate(), U512::from(0x0200u32));

    ctx.update_variable("x", U512::from(3u32)).unwrap();
    assert_eq!(product.evaluate(), U512::from(6u32));
    assert_eq!(sum.evaluate(), U512::from(8u32));
    assert_eq!(root.evaluate(), U512::from(0x0803u32));
    assert_invariants(&root);
}

#[test]
fn update_reaches_shared_subtrees_once_per_parent() {
    let ctx = AstContext::new();
    let x = ctx.variable("x", 8).unwrap();
    // x appears twice under the same parent
    let doubled = ctx.bvadd(&x, &x).unwrap();
    ctx.update_variable("x", U512::from(5u32)).unwrap();
    assert_eq!(doubled.evaluate(), U512::from(10u32));
    assert_invariants(&doubled);
}

#[test]
fn update_flows_through_comparisons_and_ite() {
    let ctx = AstContext::new();
    let x = ctx.variable("x", 8).unwrap();
    let limit = ctx.bv(U512::from(0x10u32), 8).unwrap();
    let below = ctx.bvult(&x, &limit).unwrap();
    let low = ctx.bv(U512::one(), 8).unwrap();
    let high = ctx.bv(U512::from(2u32), 8).unwrap();
    let pick = ctx.ite(&below, &low, &high).unwrap();

    // x == 0 < 0x10
    assert_eq!(below.evaluate(), U512::one());
    assert_eq!(pick.evaluate(), U512::one());

    ctx.update_variable("x", U512::from(0x20u32)).unwrap();
    assert_eq!(below.evaluate(), U512::zero());
    assert_eq!(pick.evaluate(), U512::from(2u32));
    assert_invariants(&pick);
}

#[test]
fn update_keeps_symbolization_stable() {
    let ctx = AstContext::new();
    let x = ctx.variable("x", 8).unwrap();
    let lit = ctx.bv(U512::from(7u32), 8).unwrap();
    let e = ctx.bvxor(&x, &lit).unwrap();
    assert!(e.is_symbolized());
    assert!(!lit.is_symbolized());

    ctx.update_variable("x", U512::from(0xFFu32)).unwrap();
    assert!(e.is_symbolized());
    assert!(x.is_symbolized());
}

#[test]
fn references_track_their_referent() {
    let ctx = AstContext::new();
    let x = ctx.variable("x", 16).unwrap();
    let mask = ctx.bv(U512::from(0x00FFu32), 16).unwrap();
    let masked = ctx.bvand(&x, &mask).unwrap();
    let r = ctx.reference(&masked, 1).unwrap();
    let widened = ctx.zx(16, &r).unwrap();

    ctx.update_variable("x", U512::from(0xABCDu32)).unwrap();
    assert_eq!(r.evaluate(), U512::from(0xCDu32));
    assert_eq!(widened.evaluate(), U512::from(0xCDu32));
    assert_eq!(widened.bitvector_size(), 32);
    assert_invariants(&widened);
}

#[test]
fn set_child_propagates_to_ancestors() {
    let ctx = AstContext::new();
    let a = ctx.bv(U512::from(1u32), 8).unwrap();
    let b = ctx.bv(U512::from(2u32), 8).unwrap();
    let c = ctx.bv(U512::from(0x40u32), 8).unwrap();
    let sum = ctx.bvadd(&a, &b).unwrap();
    let root = ctx.bvmul(&sum, &b).unwrap();
    assert_eq!(root.evaluate(), U512::from(6u32));

    sum.set_child(0, c).unwrap();
    assert_eq!(sum.evaluate(), U512::from(0x42u32));
    assert_eq!(root.evaluate(), U512::from(0x84u32));
    assert_invariants(&root);
}

#[test]
fn contexts_are_independent() {
    let a = AstContext::new();
    let b = AstContext::new();
    let xa = a.variable("x", 8).unwrap();
    let xb = b.variable("x", 8).unwrap();

    a.update_variable("x", U512::from(1u32)).unwrap();
    b.update_variable("x", U512::from(2u32)).unwrap();
    assert_eq!(xa.evaluate(), U512::from(1u32));
    assert_eq!(xb.evaluate(), U512::from(2u32));
}

#[test]
fn equality_is_structural_not_physical() {
    let ctx = AstContext::new();
    let x = ctx.variable("x", 8).unwrap();
    let one = ctx.bv(U512::one(), 8).unwrap();
    let e1 = ctx.bvadd(&x, &one).unwrap();
    let e2 = ctx
        .bvadd(&x, &ctx.bv(U512::one(), 8).unwrap())
        .unwrap();

    assert!(!e1.ptr_eq(&e2));
    assert!(e1.equal_to(&e2));

    // and equality survives a propagation step
    ctx.update_variable("x", U512::from(0x42u32)).unwrap();
    assert!(e1.equal_to(&e2));
}

#[test]
fn the_graph_stays_acyclic_from_the_builders() {
    let ctx = AstContext::new();
    let x = ctx.variable("x", 8).unwrap();
    let y = ctx.variable("y", 8).unwrap();
    let sum = ctx.bvadd(&x, &y).unwrap();
    let product = ctx.bvmul(&sum, &x).unwrap();
    let root = ctx.bvxor(&product, &sum).unwrap();

    // a DFS that terminates is the cheap acyclicity witness; also make
    // sure the shared nodes appear exactly once
    let nodes = root.unique_nodes();
    let total: usize = nodes.len();
    assert_eq!(total, 5, "root, product, sum, x, y");
    assert_invariants(&root);
}
