// Performance benchmarks for the effects chain control path
//
// Run with: cargo bench --bench chain_bench

use cadenza_core::domain::effects::{AudioUnitRegistry, EffectsUnit, EqType, PresetUnit};
use cadenza_core::domain::graph::AudioGraph;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

fn graph() -> AudioGraph {
    AudioGraph::new(Arc::new(AudioUnitRegistry::new()))
}

fn bench_parameter_writes(c: &mut Criterion) {
    let mut graph = graph();

    c.bench_function("delay_set_time", |b| {
        let mut t = 0.0;
        b.iter(|| {
            t = (t + 0.01) % 2.0;
            graph.master_mut().delay_mut().set_time(black_box(t));
        });
    });

    c.bench_function("eq_set_band", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % 15;
            graph.master_mut().eq_mut().set_band(black_box(i), black_box(3.0));
        });
    });

    c.bench_function("master_toggle_state", |b| {
        b.iter(|| {
            black_box(graph.master_mut().toggle_state());
        });
    });
}

fn bench_eq_preset_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("eq_apply_preset");

    for eq_type in [EqType::TenBand, EqType::FifteenBand].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(eq_type), eq_type, |b, &eq_type| {
            let mut eq = cadenza_core::domain::effects::EqUnit::new(eq_type);
            b.iter(|| {
                black_box(eq.apply_preset_named(black_box("Rock")));
            });
        });
    }

    group.finish();
}

fn bench_snapshot_reads(c: &mut Criterion) {
    let graph = graph();
    let handles = graph.render_handles();
    let mut gains = [0.0_f32; 15];

    c.bench_function("read_eq_and_output", |b| {
        b.iter(|| {
            handles.eq.read_band_gains(&mut gains);
            black_box(gains);
            black_box(handles.output.gain());
            black_box(handles.master.bypass.get());
        });
    });
}

fn bench_master_settings_as_preset(c: &mut Criterion) {
    let graph = graph();

    c.bench_function("master_settings_as_preset", |b| {
        b.iter(|| {
            black_box(graph.master().settings_as_preset());
        });
    });
}

criterion_group!(
    benches,
    bench_parameter_writes,
    bench_eq_preset_apply,
    bench_snapshot_reads,
    bench_master_settings_as_preset
);
criterion_main!(benches);
