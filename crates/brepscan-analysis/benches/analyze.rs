use brepscan_analysis::{analyze, AnalysisConfig, ClassifierStrategy};
use brepscan_kernel_analytic::{AnalyticKernel, PartSpec, StockFace};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// 120 x 120 x 25 plate with a 3 x 3 grid of through holes.
fn hole_grid() -> AnalyticKernel {
    let mut part = PartSpec::block([120.0, 120.0, 25.0]);
    for i in 0..3 {
        for j in 0..3 {
            let center = [30.0 + 30.0 * i as f64, 30.0 + 30.0 * j as f64];
            part = part.through_hole(StockFace::Top, center, 8.0);
        }
    }
    AnalyticKernel::new(part).unwrap()
}

fn bench_analyze(c: &mut Criterion) {
    let kernel = hole_grid();
    let mut group = c.benchmark_group("analyze");
    for strategy in [
        ClassifierStrategy::RayCast,
        ClassifierStrategy::CenterDistance,
        ClassifierStrategy::Hybrid,
    ] {
        let mut config = AnalysisConfig::default();
        config.topology.strategy = strategy;
        group.bench_function(format!("hole_grid_{strategy:?}"), |b| {
            b.iter(|| analyze(black_box(&kernel), &config).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
