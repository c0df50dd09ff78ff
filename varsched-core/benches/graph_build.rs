//! Graph construction and activation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use varsched_core::{DependencyGraph, ManualExecutor, UnknownReferencePolicy, Variable, VariableSet};

/// A layered graph: every variable references two variables of the layer
/// above it.
fn layered_templates(layers: usize, width: usize) -> Vec<(String, String)> {
    let mut templates = Vec::with_capacity(layers * width);
    for layer in 0..layers {
        for column in 0..width {
            let name = format!("v{layer}_{column}");
            let template = if layer == 0 {
                format!("label_values({name})")
            } else {
                let left = format!("v{}_{}", layer - 1, column);
                let right = format!("v{}_{}", layer - 1, (column + 1) % width);
                format!("label_values(x{{a=\"${left}\", b=\"${{{right}}}\"}})")
            };
            templates.push((name, template));
        }
    }
    templates
}

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    for &(layers, width) in &[(4, 4), (10, 10), (20, 25)] {
        let templates = layered_templates(layers, width);
        group.bench_with_input(
            BenchmarkId::from_parameter(layers * width),
            &templates,
            |b, templates| {
                b.iter(|| {
                    DependencyGraph::build(
                        templates.iter().map(|(n, t)| (n.as_str(), t.as_str())),
                        UnknownReferencePolicy::Ignore,
                    )
                    .map(|graph| black_box(graph.edge_count()))
                })
            },
        );
    }
    group.finish();
}

fn bench_activation(c: &mut Criterion) {
    let templates = layered_templates(10, 10);
    c.bench_function("activate_100", |b| {
        b.iter(|| {
            let variables = templates
                .iter()
                .map(|(name, template)| Variable::query(name.as_str(), template.as_str()));
            let mut set = VariableSet::new(variables, ManualExecutor::new())
                .expect("unique names");
            set.activate().expect("acyclic");
            black_box(set.is_loading())
        })
    });
}

criterion_group!(benches, bench_graph_build, bench_activation);
criterion_main!(benches);
