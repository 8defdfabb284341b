//! Assignment kernel and dispatch benchmarks
//!
//! Measures:
//! - Per-element cost of single calls against one strided call
//! - Overload resolution with and without the dispatch cache

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use weft::{Dispatcher, Engine, KernelRequest, Kwds, Type, TypeId};

const LEN: usize = 4096;

/// int32 -> float64 over a contiguous buffer
fn bench_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign_int32_to_float64");
    group.throughput(Throughput::Elements(LEN as u64));

    let chain = Engine::default()
        .assign_kernel(&Type::float64(), &Type::int32(), &Kwds::new(), KernelRequest::Strided)
        .unwrap();
    let src: Vec<i32> = (0..LEN as i32).collect();
    let mut dst = vec![0f64; LEN];

    group.bench_function("single", |b| {
        b.iter(|| {
            for (out, value) in dst.iter_mut().zip(&src) {
                unsafe {
                    chain
                        .single((out as *mut f64).cast(), &[(value as *const i32).cast()])
                        .unwrap()
                };
            }
            black_box(&dst);
        })
    });

    group.bench_function("strided", |b| {
        b.iter(|| {
            unsafe {
                chain
                    .strided(dst.as_mut_ptr().cast(), 8, &[src.as_ptr().cast()], &[4], LEN)
                    .unwrap()
            };
            black_box(&dst);
        })
    });

    group.finish();
}

/// Dispatch over a table shaped like the assign overloads
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let table: [[TypeId; 2]; 8] = [
        [TypeId::Scalar, TypeId::Scalar],
        [TypeId::StringKind, TypeId::Scalar],
        [TypeId::Scalar, TypeId::StringKind],
        [TypeId::StringKind, TypeId::StringKind],
        [TypeId::Categorical, TypeId::StringKind],
        [TypeId::Option, TypeId::Any],
        [TypeId::Any, TypeId::Option],
        [TypeId::Struct, TypeId::Struct],
    ];
    let queries = [
        [TypeId::Float64, TypeId::Int32],
        [TypeId::String, TypeId::Float32],
        [TypeId::Categorical, TypeId::FixedString],
        [TypeId::Option, TypeId::String],
        [TypeId::Struct, TypeId::Struct],
    ];

    for capacity in [0, 1024] {
        let mut dispatcher = Dispatcher::new(capacity);
        for (i, params) in table.iter().enumerate() {
            dispatcher.insert(*params, i).unwrap();
        }
        let label = if capacity == 0 { "uncached" } else { "cached" };
        group.bench_with_input(BenchmarkId::from_parameter(label), &queries, |b, queries| {
            b.iter(|| {
                for args in queries {
                    black_box(dispatcher.resolve(black_box(args)).unwrap());
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_execution, bench_dispatch);
criterion_main!(benches);
