use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fiber_core::{mount, Element, HostId, MemoryHost, Root, UnitBudget};

const SECTION_COUNT: usize = 4;
const ROWS_PER_SECTION: usize = 32;
const ROW_SAMPLES: &[usize] = &[8, 16, 32, 64];

fn table(sections: usize, rows_per_section: usize, revision: usize) -> Element {
    Element::host("div")
        .child(
            (0..sections)
                .map(|section| {
                    Element::host("section")
                        .attr("id", format!("section-{section}"))
                        .child(Element::host("h2").child(format!("Section {section}")))
                        .child(
                            (0..rows_per_section)
                                .map(|row| {
                                    Element::host("tr")
                                        .attr("data-row", format!("{section}-{row}"))
                                        .child(Element::host("td").child(format!("Item {row}")))
                                        .child(Element::host("td").child(revision))
                                        .build()
                                })
                                .collect::<Vec<_>>(),
                        )
                        .build()
                })
                .collect::<Vec<_>>(),
        )
        .build()
}

fn host_node_count(sections: usize, rows_per_section: usize) -> usize {
    1 + sections * (3 + rows_per_section * 5)
}

struct Fixture {
    root: Root<MemoryHost>,
    container: HostId,
    sections: usize,
    rows_per_section: usize,
    revision: usize,
}

impl Fixture {
    fn new(sections: usize, rows_per_section: usize) -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_container("body");
        let root = mount(table(sections, rows_per_section, 0), host);
        Self {
            root,
            container,
            sections,
            rows_per_section,
            revision: 0,
        }
    }

    fn mount(&mut self) {
        self.root.render(self.container).expect("render");
        self.root.flush().expect("flush");
    }

    fn bump(&mut self) {
        self.revision += 1;
        self.root
            .update(table(self.sections, self.rows_per_section, self.revision));
    }
}

fn bench_mount(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_mount");
    for &rows_per_section in ROW_SAMPLES {
        group.bench_with_input(
            BenchmarkId::new("host_nodes", host_node_count(SECTION_COUNT, rows_per_section)),
            &rows_per_section,
            |b, &rows_per_section| {
                b.iter(|| {
                    let mut fixture = Fixture::new(SECTION_COUNT, rows_per_section);
                    fixture.mount();
                    black_box(fixture.root.host().len());
                });
            },
        );
    }
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut fixture = Fixture::new(SECTION_COUNT, ROWS_PER_SECTION);
    // Mount once so steady-state updates are measured.
    fixture.mount();

    c.bench_function("reconcile_update", |b| {
        b.iter(|| {
            fixture.bump();
            let stats = fixture.root.flush().expect("flush");
            black_box(stats);
        });
    });
}

fn bench_time_sliced(c: &mut Criterion) {
    let mut fixture = Fixture::new(SECTION_COUNT, ROWS_PER_SECTION);
    fixture.mount();

    c.bench_function("reconcile_sliced_update", |b| {
        b.iter(|| {
            fixture.bump();
            let mut slices = 0usize;
            while fixture.root.has_pending_work() {
                fixture
                    .root
                    .work_loop(&UnitBudget::new(64))
                    .expect("slice");
                slices += 1;
            }
            black_box(slices);
        });
    });
}

criterion_group!(reconcile, bench_mount, bench_update, bench_time_sliced);
criterion_main!(reconcile);
