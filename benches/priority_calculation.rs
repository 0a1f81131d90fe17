use agentkernel::domain::models::TaskType;
use agentkernel::services::complexity_assessor::{assess, heuristic_score};
use criterion::{criterion_group, criterion_main, Criterion};

const DESCRIPTION: &str = "Refactor the auth module to integrate the new database schema. \
Step 1: update the API contract. Step 2: migrate existing sessions. Step 3: add tests.";

const JUDGE_RESPONSE: &str =
    "```json\n{\"complexity\": 7.5, \"reasoning\": \"touches auth and persistence\", \"factors\": [\"api\", \"database\"]}\n```";

fn bench_heuristic_score(c: &mut Criterion) {
    c.bench_function("heuristic_score", |b| {
        b.iter(|| heuristic_score("Refactor auth module", DESCRIPTION, TaskType::Refactor, 7, 1));
    });
}

fn bench_assess_without_judge(c: &mut Criterion) {
    c.bench_function("assess_router_only", |b| {
        b.iter(|| assess("Refactor auth module", DESCRIPTION, TaskType::Refactor, 7, 1, None));
    });
}

fn bench_assess_with_judge(c: &mut Criterion) {
    c.bench_function("assess_dual_with_judge", |b| {
        b.iter(|| assess("Refactor auth module", DESCRIPTION, TaskType::Refactor, 7, 1, Some(JUDGE_RESPONSE)));
    });
}

criterion_group!(benches, bench_heuristic_score, bench_assess_without_judge, bench_assess_with_judge);
criterion_main!(benches);
