use std::cell::RefCell;

use fiber_core::{
    deps, use_effect, use_ref, use_state, Component, EffectCleanup, Element, MutableRef, PropValue,
    Props, SetState,
};
use fiber_testing::{EventLog, TestRoot};

fn log_of(props: &Props) -> EventLog {
    props
        .get_data::<EventLog>("log")
        .map(|log| (*log).clone())
        .expect("component rendered without a log")
}

fn counter(props: &Props) -> Element {
    let start = props.get("start").and_then(PropValue::as_int).unwrap_or(0);
    let (count, set_count) = use_state(start);
    Element::host("button")
        .attr("id", "inc")
        .on("onClick", move |_| set_count.update(|n| n + 1))
        .child(count)
        .build()
}

#[test]
fn queued_updates_all_apply() {
    let element = Element::component(&Component::new(counter), Props::new().with("start", 5));
    let mut root = TestRoot::mount(element);
    assert_eq!(root.text(), "5");

    for _ in 0..7 {
        assert_eq!(root.click("id", "inc").delivered, 1);
    }
    root.flush();
    assert_eq!(root.text(), "12");

    for expected in 13..=15 {
        root.click("id", "inc");
        root.flush();
        assert_eq!(root.text(), expected.to_string());
    }
}

#[test]
fn updates_survive_an_interrupted_render() {
    let element = Element::component(&Component::new(counter), Props::new());
    let mut root = TestRoot::mount(element);

    root.click("id", "inc");
    root.step(1);
    assert!(root.has_pending_work());
    root.click("id", "inc");
    root.flush();

    assert_eq!(root.text(), "2");
}

#[test]
fn refs_keep_identity_while_state_changes() {
    thread_local! {
        static SEEN: RefCell<Vec<MutableRef<Vec<i64>>>> = RefCell::new(Vec::new());
    }
    fn history(_: &Props) -> Element {
        let (value, set_value) = use_state(0i64);
        let seen = use_ref(Vec::new());
        seen.update(|values| values.push(value));
        SEEN.with(|all| all.borrow_mut().push(seen.clone()));
        Element::host("button")
            .attr("id", "bump")
            .on("onClick", move |_| set_value.update(|n| n + 10))
            .child(value)
            .build()
    }
    let mut root = TestRoot::mount(Element::component(&Component::new(history), Props::new()));
    for _ in 0..3 {
        root.click("id", "bump");
        root.flush();
    }

    SEEN.with(|all| {
        let all = all.borrow();
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|seen| seen.ptr_eq(&all[0])));
        assert_eq!(all[0].current(), vec![0, 10, 20, 30]);
    });
}

fn effects(props: &Props) -> Element {
    let log = log_of(props);
    let dep = props.get("dep").and_then(PropValue::as_int).unwrap_or(0);
    {
        let log = log.clone();
        use_effect(move || log.push("every"), None);
    }
    {
        let log = log.clone();
        use_effect(
            move || {
                log.push("mount");
                EffectCleanup::new(move || log.push("mount cleanup"))
            },
            deps![],
        );
    }
    use_effect(
        move || {
            log.push(format!("dep {dep}"));
            EffectCleanup::new(move || log.push(format!("cleanup {dep}")))
        },
        deps![dep],
    );
    Element::host("div").child(dep).build()
}

fn effects_app(log: &EventLog, dep: i64, show: bool) -> Element {
    let child = show.then(|| {
        Element::component(
            &Component::new(effects),
            Props::new().with("dep", dep).with_data("log", log.clone()),
        )
    });
    Element::host("main").child(child).build()
}

#[test]
fn effects_follow_their_dependencies() {
    let log = EventLog::new();
    let mut root = TestRoot::mount(effects_app(&log, 1, true));
    assert_eq!(log.take(), vec!["every", "mount", "dep 1"]);

    root.update(effects_app(&log, 1, true));
    root.flush();
    assert_eq!(log.take(), vec!["every"]);

    root.update(effects_app(&log, 2, true));
    root.flush();
    assert_eq!(log.take(), vec!["every", "cleanup 1", "dep 2"]);

    root.update(effects_app(&log, 2, false));
    let stats = root.flush().expect("commit");
    assert_eq!(stats.effects_run, 0);
    assert_eq!(log.take(), vec!["mount cleanup", "cleanup 2"]);
    assert_eq!(root.dump(), "<main></main>");
}

#[test]
fn effect_may_schedule_a_follow_up_render() {
    fn loader(_: &Props) -> Element {
        let (data, set_data) = use_state(None::<String>);
        use_effect(move || set_data.set(Some("loaded".to_owned())), deps![]);
        Element::host("p")
            .child(data.unwrap_or_else(|| "loading".to_owned()))
            .build()
    }
    let root = TestRoot::mount(Element::component(&Component::new(loader), Props::new()));

    assert_eq!(root.text(), "loaded");
    assert!(!root.has_pending_work());
}

#[test]
fn panicking_effect_does_not_stop_the_others() {
    fn fragile(props: &Props) -> Element {
        let log = log_of(props);
        use_effect(|| -> () { panic!("effect failure") }, deps![]);
        use_effect(move || log.push("survivor"), deps![]);
        Element::host("span").build()
    }
    let _ = env_logger::builder().is_test(true).try_init();
    let log = EventLog::new();
    let element = Element::component(
        &Component::new(fragile),
        Props::new().with_data("log", log.clone()),
    );
    let mut root = TestRoot::new(element);
    root.render().expect("render");

    let stats = root.flush().expect("commit");

    assert_eq!(stats.effects_run, 2);
    assert_eq!(stats.effect_failures, 1);
    assert_eq!(log.take(), vec!["survivor"]);
    assert_eq!(root.dump(), "<span></span>");
}

#[test]
fn setter_of_an_unmounted_component_is_ignored() {
    thread_local! {
        static SETTER: RefCell<Option<SetState<i64>>> = RefCell::new(None);
    }
    fn leaf(_: &Props) -> Element {
        let (value, set_value) = use_state(1i64);
        SETTER.with(|slot| *slot.borrow_mut() = Some(set_value));
        Element::host("em").child(value).build()
    }
    let app = |show: bool| {
        Element::host("div")
            .child(show.then(|| Element::component(&Component::new(leaf), Props::new())))
            .build()
    };
    let mut root = TestRoot::mount(app(true));
    let setter = SETTER.with(|slot| slot.borrow_mut().take()).expect("setter");

    root.update(app(false));
    root.flush();
    assert!(!setter.is_live());

    setter.set(99);
    assert!(!root.has_pending_work());
    assert_eq!(root.dump(), "<div></div>");
}

#[test]
fn state_set_while_rendering_restarts_the_cycle() {
    thread_local! {
        static SETTER: RefCell<Option<SetState<i64>>> = RefCell::new(None);
    }
    fn parity(_: &Props) -> Element {
        let (value, set_value) = use_state(0i64);
        if value == 1 {
            set_value.set(2);
        }
        SETTER.with(|slot| *slot.borrow_mut() = Some(set_value));
        let (tag, label) = if value % 2 == 0 {
            ("div", "even")
        } else {
            ("span", "odd")
        };
        Element::host(tag).child(format!("{label} {value}")).build()
    }
    let mut root = TestRoot::mount(Element::component(&Component::new(parity), Props::new()));
    assert_eq!(root.dump(), "<div>even 0</div>");
    let div = root.host().children(root.container())[0];
    let text = root.host().children(div)[0];
    root.take_mutations();

    let setter = SETTER.with(|slot| slot.borrow_mut().take()).expect("setter");
    setter.set(1);
    let stats = root.flush().expect("commit");

    assert_eq!(stats.added, 0);
    assert_eq!(stats.deleted, 0);
    assert_eq!(root.dump(), "<div>even 2</div>");
    assert_eq!(root.host().children(root.container()), &[div]);
    assert_eq!(root.host().children(div), &[text]);
    assert!(!root.has_pending_work());
}
