use criterion::{criterion_group, criterion_main};

mod benchmarks;
use benchmarks::efficacy_queries::{therapeutic_benchmarks, vaccine_benchmarks};

criterion_group!(efficacy_benches, vaccine_benchmarks, therapeutic_benchmarks,);

criterion_main!(efficacy_benches);
