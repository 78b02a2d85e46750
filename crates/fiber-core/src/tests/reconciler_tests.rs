use super::*;
use crate::element::Element;
use crate::props::Scalar;
use crate::runtime::WorkState;

fn kinds(state: &WorkState, parent: NodeId) -> Vec<(String, Option<Op>)> {
    state
        .arena
        .children(parent)
        .into_iter()
        .filter_map(|id| state.arena.get(id))
        .map(|node| (node.kind().label().to_owned(), node.op()))
        .collect()
}

/// A committed parent with `children` already reconciled, plus a fresh
/// in-progress parent whose alternate is the committed one.
fn committed(children: &[Child]) -> (WorkState, NodeId, NodeId) {
    let mut state = WorkState::default();
    let old = state
        .arena
        .insert(WorkNode::new(ElementKind::from("ul"), Props::new()));
    reconcile_children(&mut state, old, children).expect("reconcile");
    for id in state.arena.children(old) {
        if let Some(node) = state.arena.get_mut(id) {
            node.op = None;
        }
    }
    let mut fresh = WorkNode::new(ElementKind::from("ul"), Props::new());
    fresh.alternate = Some(old);
    let new = state.arena.insert(fresh);
    (state, old, new)
}

fn li(text: &str) -> Child {
    Child::Element(Element::host("li").child(text).build())
}

#[test]
fn first_render_adds_every_child() {
    let mut state = WorkState::default();
    let parent = state
        .arena
        .insert(WorkNode::new(ElementKind::from("div"), Props::new()));

    reconcile_children(&mut state, parent, &[li("a"), Child::Scalar("b".into())])
        .expect("reconcile");

    assert_eq!(
        kinds(&state, parent),
        vec![
            ("li".to_owned(), Some(Op::Add)),
            ("#text".to_owned(), Some(Op::Add)),
        ]
    );
    assert!(state.deletions.is_empty());
}

#[test]
fn same_kind_at_same_position_updates_and_inherits_host() {
    let (mut state, old, new) = committed(&[li("a")]);
    let old_child = state.arena.children(old)[0];
    state.arena.get_mut(old_child).expect("old child").host = Some(crate::host::HostId(9));

    reconcile_children(&mut state, new, &[li("changed")]).expect("reconcile");

    let child = state.arena.children(new)[0];
    let node = state.arena.get(child).expect("new child");
    assert_eq!(node.op(), Some(Op::Update));
    assert_eq!(node.host(), Some(crate::host::HostId(9)));
    assert_eq!(node.alternate(), Some(old_child));
}

#[test]
fn shorter_list_deletes_the_tail_by_position() {
    let (mut state, old, new) = committed(&[li("a"), li("b"), li("c")]);
    let old_children = state.arena.children(old);

    reconcile_children(&mut state, new, &[li("a"), li("c")]).expect("reconcile");

    assert_eq!(
        kinds(&state, new),
        vec![
            ("li".to_owned(), Some(Op::Update)),
            ("li".to_owned(), Some(Op::Update)),
        ]
    );
    assert_eq!(state.deletions, vec![old_children[2]]);
    assert_eq!(
        state.arena.get(old_children[2]).and_then(|node| node.op()),
        Some(Op::Delete)
    );
}

#[test]
fn kind_change_replaces_the_node() {
    let (mut state, old, new) = committed(&[li("a"), Child::Scalar("tail".into())]);
    let old_children = state.arena.children(old);

    reconcile_children(
        &mut state,
        new,
        &[Child::Scalar("now text".into()), li("x")],
    )
    .expect("reconcile");

    assert_eq!(
        kinds(&state, new),
        vec![
            ("#text".to_owned(), Some(Op::Add)),
            ("li".to_owned(), Some(Op::Add)),
        ]
    );
    assert_eq!(state.deletions, old_children);
}

#[test]
fn text_children_keep_their_value_as_a_property() {
    let mut state = WorkState::default();
    let parent = state
        .arena
        .insert(WorkNode::new(ElementKind::from("p"), Props::new()));

    reconcile_children(&mut state, parent, &[Child::Scalar(Scalar::from(7i64))]).expect("reconcile");

    let child = state.arena.children(parent)[0];
    let props = state.arena.get(child).expect("text").props();
    assert_eq!(
        props.get(crate::props::NODE_VALUE).map(ToString::to_string),
        Some("7".to_owned())
    );
}

fn left(_: &Props) -> Element {
    Element::host("b").child("left").build()
}

fn right(_: &Props) -> Element {
    Element::host("b").child("right").build()
}

#[test]
fn component_kinds_follow_render_identity() {
    use crate::element::Component;

    let as_ptr = |render: fn(&Props) -> Element| ElementKind::from(Component::new(render));
    assert_eq!(as_ptr(left), as_ptr(left));
    assert_ne!(as_ptr(left), as_ptr(right));
    assert_eq!(ElementKind::from(Component::new(left)), ElementKind::from(Component::new(left)));

    let boxed = || -> Box<dyn Fn(&Props) -> Element> { Box::new(left) };
    assert_ne!(
        ElementKind::from(Component::new(boxed())),
        ElementKind::from(Component::new(boxed())),
        "boxed renders have no stable identity"
    );
}
