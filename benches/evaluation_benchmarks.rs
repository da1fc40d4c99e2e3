//! Performance benchmarks for the lazy evaluator.
//!
//! - Lists: building and walking cons lists of growing length
//! - Sharing: a diamond of applications where every level reuses the one below
//!
//! ```bash
//! cargo bench --bench evaluation_benchmarks
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use weave::core::{Term, Type, collect_list, evaluate_as};

fn add() -> Term {
    Term::native(
        "add",
        Type::function([Type::int(), Type::int()], Type::int()),
        |args| {
            let a: i64 = evaluate_as(&args[0])?;
            let b: i64 = evaluate_as(&args[1])?;
            Ok(Term::value(a + b))
        },
    )
}

fn list_of(len: i64) -> Term {
    (0..len)
        .rev()
        .fold(Term::nil(), |tail, n| Term::cons(Term::value(n), tail))
}

/// `depth` levels of `x + x`, each level sharing the one below.
fn diamond(depth: usize) -> Term {
    let add = add();
    (0..depth).fold(Term::value(1i64), |below, _| {
        Term::apply_all(add.clone(), [below.clone(), below])
    })
}

fn list_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("lists");
    for len in [10i64, 100, 1000] {
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("collect", len), &len, |b, &len| {
            b.iter(|| {
                let list = list_of(len);
                black_box(collect_list(&list).unwrap().len())
            });
        });
    }
    group.finish();
}

fn sharing_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("sharing");
    for depth in [8usize, 32, 60] {
        group.bench_with_input(BenchmarkId::new("diamond", depth), &depth, |b, &depth| {
            b.iter(|| {
                // Fresh terms each iteration; a reused term would hit the cache.
                let term = diamond(depth);
                black_box(evaluate_as::<i64>(&term).unwrap())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, list_benchmarks, sharing_benchmarks);
criterion_main!(benches);
