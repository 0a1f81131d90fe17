use agentkernel::domain::models::AgentKind;
use agentkernel::services::cost_calculator::{estimate_cost, get_model_pricing};
use agentkernel::services::router::{IdleAgent, Router};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn idle_pool(n: usize) -> Vec<IdleAgent> {
    (0..n)
        .map(|i| IdleAgent {
            id: format!("agent-{i}"),
            kind: match i % 3 {
                0 => AgentKind::Coder,
                1 => AgentKind::Qa,
                _ => AgentKind::Cto,
            },
        })
        .collect()
}

fn bench_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_route");
    for pool_size in [1usize, 10, 100] {
        let idle = idle_pool(pool_size);
        group.bench_with_input(BenchmarkId::from_parameter(pool_size), &idle, |b, idle| {
            b.iter(|| Router::route(None, 6.5, 1, idle));
        });
    }
    group.finish();
}

fn bench_estimate_cost(c: &mut Criterion) {
    c.bench_function("estimate_cost_sonnet", |b| {
        b.iter(|| estimate_cost("claude-sonnet-4", 12_000, 3_000));
    });
}

fn bench_get_model_pricing(c: &mut Criterion) {
    c.bench_function("get_model_pricing_lookup", |b| {
        b.iter(|| get_model_pricing("claude-opus-4"));
    });
}

criterion_group!(benches, bench_route, bench_estimate_cost, bench_get_model_pricing);
criterion_main!(benches);
