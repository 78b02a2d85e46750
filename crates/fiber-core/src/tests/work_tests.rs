use super::*;

fn node(tag: &str) -> WorkNode {
    WorkNode::new(ElementKind::from(tag), Props::new())
}

/// Links `children` under `parent` in order.
fn link(arena: &mut WorkArena, parent: NodeId, children: &[NodeId]) {
    for (index, &child) in children.iter().enumerate() {
        arena.get_mut(child).expect("child").parent = Some(parent);
        arena.get_mut(child).expect("child").sibling = children.get(index + 1).copied();
    }
    arena.get_mut(parent).expect("parent").child = children.first().copied();
}

#[test]
fn stale_ids_do_not_alias_reused_slots() {
    let mut arena = WorkArena::new();
    let first = arena.insert(node("a"));
    assert!(arena.remove(first).is_some());

    let second = arena.insert(node("b"));
    assert_ne!(first, second);
    assert!(arena.get(first).is_none());
    assert_eq!(arena.get(second).map(|node| node.kind().label()), Some("b"));
    assert!(arena.remove(first).is_none());
}

#[test]
fn depth_first_order_stays_inside_the_subtree() {
    let mut arena = WorkArena::new();
    let root = arena.insert(node("root"));
    let a = arena.insert(node("a"));
    let a1 = arena.insert(node("a1"));
    let b = arena.insert(node("b"));
    link(&mut arena, root, &[a, b]);
    link(&mut arena, a, &[a1]);

    assert_eq!(arena.subtree(root), vec![root, a, a1, b]);
    assert_eq!(arena.subtree(a), vec![a, a1]);
    assert_eq!(arena.next_in(root, b), None);
    assert_eq!(arena.children(root), vec![a, b]);
}

#[test]
fn free_tree_removes_every_node() {
    let mut arena = WorkArena::new();
    let root = arena.insert(node("root"));
    let a = arena.insert(node("a"));
    let b = arena.insert(node("b"));
    link(&mut arena, root, &[a, b]);
    let other = arena.insert(node("other"));

    let freed = arena.free_tree(root);

    assert_eq!(freed.len(), 3);
    assert_eq!(arena.len(), 1);
    assert!(arena.contains(other));
    assert!(!arena.contains(a));
}

#[test]
fn only_component_nodes_carry_hooks() {
    let component = crate::element::Component::new(|_: &Props| {
        crate::element::Element::host("div").build()
    });
    let with_hooks = WorkNode::new(ElementKind::from(component), Props::new());
    assert!(with_hooks.hooks.is_some());
    assert!(node("div").hooks.is_none());
    assert!(WorkNode::new(ElementKind::Text, Props::new()).hooks.is_none());
}
