mod app;

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fiber_core::{Event, HostId, MemoryHost, Root};
use fiber_runtime_std::StdRuntime;

/// A scripted user interaction against the rendered host tree.
enum Step {
    Click(&'static str, &'static str),
    Input(&'static str, &'static str, &'static str),
}

const SCRIPT: &[Step] = &[
    Step::Click("class", "add-button"),
    Step::Input("id", "userFamilyName", "Hamilton"),
    Step::Input("id", "userGivenName", "Margaret"),
    Step::Click("id", "gender-Female"),
    Step::Input("id", "phone", "5550100006"),
    Step::Click("id", "confirm"),
    Step::Click("data-action", "update-2"),
    Step::Input("id", "phone", "5550199999"),
    Step::Click("id", "confirm"),
    Step::Click("data-action", "delete-4"),
];

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("=== fiber user table ===");
    println!("Runs a scripted session against an in-memory host and prints");
    println!("the table after each step. Set RUST_LOG=debug to see commits.");
    println!();

    let runtime = StdRuntime::from_env();
    log::info!("scheduler options: {:?}", runtime.options());
    let wakes = Arc::new(AtomicUsize::new(0));
    {
        let wakes = Arc::clone(&wakes);
        runtime.set_frame_waker(move || {
            wakes.fetch_add(1, Ordering::Relaxed);
        });
    }
    let mut host = MemoryHost::new();
    let container = host.create_container("app");
    let mut root = runtime.mount(app::app_element(), host);
    root.render(container)?;
    let slices = runtime.run_until_idle(&mut root)?;
    log::info!("initial render took {slices} slices");
    print_table(&root, container);

    for step in SCRIPT {
        let (name, value) = match step {
            Step::Click(name, value) | Step::Input(name, value, _) => (*name, *value),
        };
        let target = root
            .host()
            .find_by_attr(container, name, value)
            .ok_or_else(|| format!("no element with {name}={value:?}"))?;
        let event = match step {
            Step::Click(..) => Event::new("click", target),
            Step::Input(_, _, text) => Event::new("input", target).with_value(*text),
        };
        let outcome = root.host().dispatch(target, &event);
        if outcome.failed > 0 {
            log::warn!("{} listeners failed on {name}={value}", outcome.failed);
        }
        runtime.run_until_idle(&mut root)?;
        if matches!(step, Step::Click("id", "confirm") | Step::Click("data-action", _)) {
            println!("after {} on {name}={value}:", event.kind);
            print_table(&root, container);
        }
    }

    runtime.clear_frame_waker();
    log::info!(
        "{} frame wake-ups, {} live work nodes at exit",
        wakes.load(Ordering::Relaxed),
        root.runtime().live_nodes()
    );
    Ok(())
}

fn print_table(root: &Root<MemoryHost>, container: HostId) {
    let host = root.host();
    let Some(table) = host.find_by_attr(container, "class", "user-table") else {
        println!("  (no table)");
        return;
    };
    let body = host
        .children(table)
        .iter()
        .copied()
        .find(|child| host.node(*child).and_then(|node| node.tag()) == Some("tbody"));
    let Some(body) = body else {
        println!("  (no rows)");
        return;
    };
    for row in host.children(body) {
        let cells: Vec<String> = host
            .children(*row)
            .iter()
            .map(|cell| host.text_content(*cell))
            .collect();
        println!("  {}", cells.join(" | "));
    }
    println!();
}
