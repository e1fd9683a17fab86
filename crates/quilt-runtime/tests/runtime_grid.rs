use std::sync::Arc;

use proptest::prelude::*;
use quilt_geom::Vec3;
use quilt_mesh_cpu::select_level;
use quilt_runtime::{MeshSlots, PatchId, Runtime, RuntimeError};
use quilt_world::{ConfigError, NoiseElevation, TerrainConfig};

fn config(radius: i32) -> TerrainConfig {
    let mut cfg = TerrainConfig::default();
    cfg.runtime.grid_radius = radius;
    cfg.runtime.workers = 2;
    cfg
}

fn runtime(radius: i32) -> Runtime<NoiseElevation> {
    let cfg = config(radius);
    let src = Arc::new(NoiseElevation::new(&cfg.height));
    match Runtime::new(&cfg, src) {
        Ok(rt) => rt,
        Err(e) => panic!("runtime: {e}"),
    }
}

/// World-space height of the shown mesh of `id` along its edge shared with
/// the +X neighbor, at fraction `t` of the edge.
fn right_edge(slots: &MeshSlots, id: PatchId, t: f32) -> f32 {
    let mesh = &slots.get(id).unwrap().mesh;
    edge_lerp(|i| mesh.height_at(mesh.level, i), mesh.level, t)
}

fn left_edge(slots: &MeshSlots, id: PatchId, t: f32) -> f32 {
    let mesh = &slots.get(id).unwrap().mesh;
    edge_lerp(|i| mesh.height_at(0, i), mesh.level, t)
}

fn edge_lerp(h: impl Fn(u32) -> f32, level: u32, t: f32) -> f32 {
    let p = t * level as f32;
    let i = (p.floor() as u32).min(level - 1);
    let f = p - i as f32;
    h(i) + (h(i + 1) - h(i)) * f
}

#[test]
fn invalid_max_detail_builds_nothing() {
    let mut cfg = config(1);
    cfg.patch.max_detail = 0;
    let res = Runtime::new(&cfg, Arc::new(NoiseElevation::default()));
    assert!(matches!(
        res,
        Err(RuntimeError::Config(ConfigError::InvalidMaxDetail(0)))
    ));
}

#[test]
fn request_all_applies_every_patch_once() {
    let rt = runtime(1);
    assert_eq!(rt.len(), 9);
    assert_eq!(rt.workers(), 2);

    let summary = rt.request_all(Vec3::ZERO).unwrap();
    assert_eq!(summary.built, 9);
    assert_eq!(summary.total(), 9);

    let mut slots = MeshSlots::new();
    assert_eq!(slots.apply_all(rt.drain_apply_commands()), 9);
    assert_eq!(slots.len(), 9);

    let again = rt.request_all(Vec3::new(0.1, 0.0, -0.2)).unwrap();
    assert_eq!(again.unchanged, 9);
    assert!(rt.drain_apply_commands().is_empty());

    let stats = rt.stats();
    assert_eq!(stats.patches, 9);
    assert_eq!(stats.requests, 18);
    assert_eq!(stats.generated, 9);
    assert_eq!(stats.cache_entries, 9);
}

#[test]
fn submit_all_finishes_in_the_background() {
    let rt = runtime(1);
    rt.submit_all(Vec3::new(-3.0, 0.0, 0.0));
    rt.wait_idle();
    assert_eq!(rt.pending(), 0);
    let cmds = rt.drain_apply_commands();
    assert_eq!(cmds.len(), 9);
    for cmd in &cmds {
        let patch = rt.patch(cmd.patch).unwrap();
        assert_eq!(patch.applied_key(), Some(cmd.key));
    }
}

#[test]
fn wait_idle_returns_once_every_queued_request_is_done() {
    let rt = runtime(1);
    // Nothing queued: must not block.
    rt.wait_idle();

    rt.submit_all(Vec3::ZERO);
    rt.submit_all(Vec3::new(6.0, 0.0, 0.0));
    rt.submit_all(Vec3::ZERO);
    rt.wait_idle();
    assert_eq!(rt.pending(), 0);
    assert_eq!(rt.stats().requests, 27);

    // Leftover completion signals do not confuse a later wait.
    rt.submit_all(Vec3::new(0.0, 0.0, 6.0));
    rt.wait_idle();
    assert_eq!(rt.pending(), 0);
    assert_eq!(rt.stats().requests, 36);
}

#[test]
fn shown_meshes_meet_across_levels() {
    let rt = runtime(2);
    let reference = Vec3::new(-3.0, 0.0, 0.0);
    rt.request_all(reference).unwrap();
    let mut slots = MeshSlots::new();
    slots.apply_all(rt.drain_apply_commands());

    let a = PatchId::new(0, 0);
    let b = PatchId::new(1, 0);
    assert_eq!(slots.get(a).unwrap().mesh.level, 8);
    assert_eq!(slots.get(b).unwrap().mesh.level, 4);
    for i in 0..=16 {
        let t = i as f32 / 16.0;
        let gap = (right_edge(&slots, a, t) - left_edge(&slots, b, t)).abs();
        assert!(gap < 1e-4, "t={t} gap={gap}");
    }

    for p in rt.patches() {
        let id = p.id();
        for next in [PatchId::new(id.x + 1, id.z), PatchId::new(id.x, id.z + 1)] {
            if let Some(gap) = slots.seam_gap(id, next) {
                assert!(gap < 1e-4, "{id:?} -> {next:?} gap={gap}");
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    // After any walk, each patch shows the level it selects for the last stop
    #[test]
    fn walk_ends_at_the_last_reference(
        stops in prop::collection::vec((-6.0f32..6.0, -6.0f32..6.0), 1..6),
    ) {
        let rt = runtime(1);
        let mut slots = MeshSlots::new();
        let mut last = Vec3::ZERO;
        for (x, z) in stops {
            last = Vec3::new(x, 0.0, z);
            rt.request_all(last).unwrap();
            slots.apply_all(rt.drain_apply_commands());
        }
        for p in rt.patches() {
            let shown = slots.get(p.id()).unwrap();
            prop_assert_eq!(Some(shown.key), p.applied_key());
            let settings = rt.settings();
            let canonical = quilt_runtime::canonical_reference(last, settings.scale());
            let want = select_level(p.anchor(), canonical, settings.max_detail(), settings.scale());
            prop_assert_eq!(shown.mesh.level, want);
        }
    }
}
