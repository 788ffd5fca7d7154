use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use diskscan::classify::{self, rules};
use std::hint::black_box;

fn sample_paths(n: usize) -> Vec<String> {
    let shapes = [
        "/home/user/project/src/main.rs",
        "/home/user/project/target/debug/deps/main-abc123",
        "/home/user/project/node_modules/react/index.js",
        "/home/user/.cache/pip/wheels/a/b/c.whl",
        "/var/tmp/session-42.lock",
        "/home/user/Downloads/installer.crdownload",
        "/home/user/project/.git/objects/pack/pack-1.pack",
    ];
    (0..n).map(|i| shapes[i % shapes.len()].to_owned()).collect()
}

fn bench_classify(c: &mut Criterion) {
    let ruleset = classify::compile_ruleset(&rules::default_rules(), &Default::default()).unwrap();
    let paths = sample_paths(2000);

    let mut group = c.benchmark_group("classify_dispatch");
    group.throughput(Throughput::Elements(paths.len() as u64));

    group.bench_function("for_file_automaton_find", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for path in &paths {
                let lowered = path.to_lowercase();
                hits += black_box(ruleset.for_file.automaton.find(lowered.as_bytes()).unwrap().len());
            }
            black_box(hits)
        });
    });

    group.bench_function("for_file_prefix_trie_find", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for path in &paths {
                let name = path.rsplit('/').next().unwrap().to_lowercase();
                hits += black_box(ruleset.for_file.prefix_trie.find(name.as_bytes()).unwrap().len());
            }
            black_box(hits)
        });
    });

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let rule_table = rules::default_rules();

    let mut group = c.benchmark_group("compile_ruleset");
    group.bench_with_input(
        BenchmarkId::new("default_rule_table", rule_table.len()),
        &rule_table,
        |b, rule_table| {
            b.iter(|| black_box(classify::compile_ruleset(black_box(rule_table), &Default::default()).unwrap()));
        },
    );
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(200)
        .warm_up_time(std::time::Duration::from_millis(500))
        .measurement_time(std::time::Duration::from_secs(3));
    targets = bench_classify, bench_compile
}
criterion_main!(benches);
