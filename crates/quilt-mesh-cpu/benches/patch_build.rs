use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use quilt_geom::Vec3;
use quilt_mesh_cpu::{build_patch_mesh, select_level};
use quilt_world::{NoiseElevation, PatchSettings};

fn bench_build_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_patch_mesh");
    let src = NoiseElevation::default();
    for max_detail in [8i64, 32, 128] {
        let settings = PatchSettings::new(max_detail, 1.0).unwrap();
        let reference = Vec3::new(0.5, 2.0, 0.5);
        group.bench_function(format!("full_detail_{max_detail}"), |b| {
            b.iter(|| {
                let level = select_level(Vec3::ZERO, reference, settings.max_detail(), 1.0);
                let mesh =
                    build_patch_mesh(&src, Vec3::ZERO, &settings, level, reference).unwrap();
                black_box(mesh.triangle_count())
            })
        });
    }
    group.finish();
}

fn bench_select_level(c: &mut Criterion) {
    c.bench_function("select_level_grid_16x16", |b| {
        b.iter(|| {
            let mut acc = 0u32;
            for z in -8..8 {
                for x in -8..8 {
                    let anchor = Vec3::new(x as f32, 0.0, z as f32);
                    acc += select_level(anchor, black_box(Vec3::new(0.3, 1.0, -0.2)), 16, 1.0);
                }
            }
            acc
        })
    });
}

fn short_config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_millis(500))
        .measurement_time(Duration::from_secs(3))
        .sample_size(30)
}

criterion_group! {
    name = benches;
    config = short_config();
    targets = bench_build_patch, bench_select_level
}
criterion_main!(benches);
