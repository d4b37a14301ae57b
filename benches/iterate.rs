use criterion::*;
use std::hint::black_box;

use soa_ecs::prelude::*;

mod common;
use common::*;

fn iterate_benchmark(c: &mut Criterion) {
    init_components();

    let mut group = c.benchmark_group("iterate");

    group.bench_function("each_mut_write_wealth_100k", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                populate(&mut world, AGENTS_MED);
                let query = Query::<(Wealth,)>::new().unwrap();
                (world, query)
            },
            |(mut world, query)| {
                query.each_mut(&mut world, |(wealth,)| {
                    wealth.value *= 1.0001;
                });
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("each_read_productivity_100k", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                populate(&mut world, AGENTS_MED);
                let query = Query::<(Productivity,)>::new().unwrap();
                (world, query)
            },
            |(world, query)| {
                let mut total = 0.0f32;
                query.each(&world, |(productivity,)| {
                    total += productivity.rate;
                });
                black_box(total);
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("each_mut_prod_to_wealth_100k", |b| {
        b.iter_batched(
            || {
                let mut world = World::new();
                populate(&mut world, AGENTS_MED);
                let query = Query::<(Productivity, Wealth)>::new().unwrap();
                (world, query)
            },
            |(mut world, query)| {
                query.each_mut(&mut world, |(productivity, wealth)| {
                    wealth.value += productivity.rate;
                });
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
