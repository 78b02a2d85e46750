use std::rc::Rc;

use fiber_core::{
    children, create_element, use_state, Component, Element, HostAdapter, HostId, HostNodeKind,
    MemoryHost, Mutation, Props, RenderError,
};
use fiber_testing::TestRoot;

fn list(items: &[&str]) -> Element {
    Element::host("ul")
        .child(
            items
                .iter()
                .map(|item| Element::host("li").child(*item).build())
                .collect::<Vec<_>>(),
        )
        .build()
}

fn greeting(props: &Props) -> Element {
    let name = props.get_str("name").unwrap_or("nobody");
    Element::host("h1")
        .attr("class", "greeting")
        .child("Hello, ")
        .child(name.to_owned())
        .build()
}

fn structural(mutations: &[Mutation]) -> Vec<&Mutation> {
    mutations.iter().filter(|m| !m.is_property()).collect()
}

#[test]
fn fresh_mount_mirrors_the_element_tree() {
    let app = create_element(
        "main",
        Props::new().with("id", "app"),
        children![
            Element::component(&Component::new(greeting), Props::new().with("name", "Ada")),
            Element::host("p").child(3).child(" items"),
            vec![Element::host("hr").build(), Element::host("hr").build()],
            None::<Element>,
        ],
    );

    let root = TestRoot::mount(app);

    assert_eq!(
        root.dump(),
        concat!(
            r#"<main id="app">"#,
            r#"<h1 class="greeting">Hello, Ada</h1>"#,
            "<p>3 items</p>",
            "<hr></hr><hr></hr>",
            "</main>"
        )
    );
}

#[test]
fn second_commit_of_the_same_tree_changes_nothing() {
    let app = Element::host("section")
        .attr("title", "t")
        .on("onClick", |_| {})
        .child(list(&["a", "b"]))
        .child(Element::component(&Component::new(greeting), Props::new()))
        .build();
    let mut root = TestRoot::mount(app);
    let before = root.dump();
    root.take_mutations();

    root.render().expect("render again");
    let stats = root.flush().expect("commit");

    assert_eq!(stats.added, 0);
    assert_eq!(stats.deleted, 0);
    assert!(root.take_mutations().is_empty());
    assert_eq!(root.dump(), before);
}

#[test]
fn hello_to_world_reuses_the_text_host() {
    let mut root = TestRoot::mount(Element::host("div").child("hello").build());
    let div = root.host().children(root.container())[0];
    let text = root.host().children(div)[0];
    root.take_mutations();

    root.update(Element::host("div").child("world").build());
    let stats = root.flush().expect("commit");

    assert_eq!(stats.added, 0);
    assert_eq!(stats.deleted, 0);
    assert_eq!(root.host().children(div), &[text]);
    assert_eq!(root.dump(), "<div>world</div>");
    assert_eq!(
        root.take_mutations(),
        vec![Mutation::SetProperty {
            id: text,
            name: "nodeValue".to_owned()
        }]
    );
}

#[test]
fn removal_is_by_position_not_identity() {
    let mut root = TestRoot::mount(list(&["a", "b", "c"]));
    let ul = root.host().children(root.container())[0];
    let items: Vec<HostId> = root.host().children(ul).to_vec();
    let dropped_text = root.host().children(items[2])[0];
    root.take_mutations();

    root.update(list(&["a", "c"]));
    let stats = root.flush().expect("commit");

    assert_eq!(stats.deleted, 1);
    assert_eq!(root.host().children(ul), &items[..2]);
    assert!(!root.host().contains(items[2]));
    assert_eq!(root.dump(), "<ul><li>a</li><li>c</li></ul>");
    assert_eq!(
        structural(&root.take_mutations()),
        vec![
            &Mutation::Remove {
                parent: ul,
                child: items[2]
            },
            &Mutation::Release { id: dropped_text },
            &Mutation::Release { id: items[2] },
        ]
    );
}

#[test]
fn replaced_node_is_inserted_at_its_position() {
    let mut root = TestRoot::mount(
        Element::host("div")
            .child(Element::host("p").child("first"))
            .child(Element::host("span").child("second"))
            .build(),
    );
    let div = root.host().children(root.container())[0];
    let span = root.host().children(div)[1];

    root.update(
        Element::host("div")
            .child(Element::host("em").child("first"))
            .child(Element::host("span").child("second"))
            .build(),
    );
    let stats = root.flush().expect("commit");

    assert_eq!(stats.deleted, 1);
    assert_eq!(root.dump(), "<div><em>first</em><span>second</span></div>");
    assert_eq!(root.host().children(div)[1], span);
}

#[test]
fn replacing_a_component_type_remounts_its_subtree() {
    fn left(_: &Props) -> Element {
        Element::host("b").child("left").build()
    }
    fn right(_: &Props) -> Element {
        Element::host("b").child("right").build()
    }
    let wrap = |component: Component| {
        Element::host("div")
            .child(Element::component(&component, Props::new()))
            .child(Element::host("i").child("tail"))
            .build()
    };
    let mut root = TestRoot::mount(wrap(Component::new(left)));
    let div = root.host().children(root.container())[0];
    let before = root.host().children(div)[0];

    root.update(wrap(Component::new(right)));
    root.flush();

    let after = root.host().children(div)[0];
    assert_ne!(before, after);
    assert!(!root.host().contains(before));
    assert_eq!(root.dump(), "<div><b>right</b><i>tail</i></div>");
}

fn alpha(_: &Props) -> Element {
    let (label, _) = use_state("alpha-state".to_owned());
    Element::host("p").child(label).build()
}

fn beta(_: &Props) -> Element {
    let (label, _) = use_state("beta-state".to_owned());
    Element::host("p").child(label).build()
}

fn pick(render: fn(&Props) -> Element) -> Element {
    Element::component(&Component::new(render), Props::new())
}

#[test]
fn function_pointer_components_are_told_apart_by_address() {
    let mut root = TestRoot::mount(pick(alpha));
    assert_eq!(root.text(), "alpha-state");
    let first = root.host().children(root.container())[0];

    root.update(pick(alpha));
    let stats = root.flush().expect("commit");
    assert_eq!(stats.added, 0);
    assert_eq!(root.host().children(root.container()), &[first]);

    root.update(pick(beta));
    let stats = root.flush().expect("commit");
    assert_eq!(stats.deleted, 1);
    assert_eq!(root.text(), "beta-state");
    assert!(!root.host().contains(first));
}

#[test]
fn shared_rc_components_keep_state_only_for_the_same_allocation() {
    let shared: Rc<dyn Fn(&Props) -> Element> = Rc::new(alpha);
    let wrap = |render: &Rc<dyn Fn(&Props) -> Element>| {
        Element::component(&Component::from_rc(Rc::clone(render)), Props::new())
    };
    let mut root = TestRoot::mount(wrap(&shared));
    let first = root.host().children(root.container())[0];

    root.update(wrap(&shared));
    root.flush();
    assert_eq!(root.host().children(root.container()), &[first]);

    let other: Rc<dyn Fn(&Props) -> Element> = Rc::new(beta);
    root.update(wrap(&other));
    root.flush();
    assert_eq!(root.text(), "beta-state");
    assert_ne!(root.host().children(root.container())[0], first);
}

#[test]
fn attribute_and_listener_diffs_are_minimal() {
    let mut root = TestRoot::mount(
        Element::host("button")
            .attr("id", "go")
            .attr("disabled", true)
            .on("onClick", |_| {})
            .build(),
    );
    let button = root.find("id", "go");
    root.take_mutations();

    root.update(
        Element::host("button")
            .attr("id", "go")
            .attr("class", "primary")
            .on("onClick", |_| {})
            .build(),
    );
    root.flush();

    let mut mutations = root.take_mutations();
    mutations.sort_by_key(|m| format!("{m:?}"));
    assert_eq!(
        mutations,
        vec![
            Mutation::AddListener {
                id: button,
                event: "click".to_owned()
            },
            Mutation::ClearProperty {
                id: button,
                name: "disabled".to_owned()
            },
            Mutation::RemoveListener {
                id: button,
                event: "click".to_owned()
            },
            Mutation::SetProperty {
                id: button,
                name: "class".to_owned()
            },
        ]
    );
    let node = root.host().node(button).expect("button");
    assert_eq!(node.listener_count("click"), 1);
    assert!(matches!(node.kind, HostNodeKind::Element { .. }));
}

#[test]
fn rendering_into_a_missing_container_is_an_error() {
    let mut host = MemoryHost::new();
    let container = host.create_container("root");
    host.release(container).expect("release");
    let mut root = fiber_core::mount(list(&["a"]), host);

    assert_eq!(
        root.render(container),
        Err(RenderError::MissingContainer { container })
    );
    assert!(!root.has_pending_work());
}
