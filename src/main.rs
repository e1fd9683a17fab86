use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use quilt_geom::Vec3;
use quilt_runtime::{MeshSlots, PatchId, Runtime};
use quilt_world::{NoiseElevation, TerrainConfig, read_config_from_path};

#[derive(Parser, Debug)]
#[command(name = "quilt", about = "Build a seam-free LOD terrain grid along a viewer path")]
struct Cli {
    /// TOML config file ([patch], [height], [runtime] sections)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Grid radius in patches around the origin
    #[arg(long)]
    radius: Option<i32>,
    /// Highest subdivision level of a patch
    #[arg(long, allow_hyphen_values = true)]
    max_detail: Option<i64>,
    /// World size of one patch
    #[arg(long, allow_hyphen_values = true)]
    scale: Option<f32>,
    /// Noise seed
    #[arg(long, allow_hyphen_values = true)]
    seed: Option<i32>,
    /// Worker threads (0 = available parallelism)
    #[arg(long)]
    workers: Option<usize>,
    /// Viewer start position (3 floats: X Y Z)
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_hyphen_values = true)]
    viewer: Option<Vec<f32>>,
    /// Number of viewer moves along +X after the first request
    #[arg(long, default_value_t = 8)]
    steps: u32,
    /// Distance per move, in world units
    #[arg(long, default_value_t = 0.75, allow_hyphen_values = true)]
    step_size: f32,
    /// Queue requests on the pool and wait, instead of requesting synchronously
    #[arg(long)]
    background: bool,
}

fn load_config(cli: &Cli) -> Result<TerrainConfig, Box<dyn Error>> {
    let mut cfg = match &cli.config {
        Some(path) => read_config_from_path(path)
            .map_err(|e| format!("config {}: {e}", path.display()))?,
        None => TerrainConfig::default(),
    };
    if let Some(r) = cli.radius {
        cfg.runtime.grid_radius = r;
    }
    if let Some(m) = cli.max_detail {
        cfg.patch.max_detail = m;
    }
    if let Some(s) = cli.scale {
        cfg.patch.scale = s;
    }
    if let Some(seed) = cli.seed {
        cfg.height.seed = seed;
    }
    if let Some(w) = cli.workers {
        cfg.runtime.workers = w;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn max_seam_gap(rt: &Runtime<NoiseElevation>, slots: &MeshSlots) -> f32 {
    rt.patches()
        .flat_map(|p| {
            let id = p.id();
            [PatchId::new(id.x + 1, id.z), PatchId::new(id.x, id.z + 1)]
                .into_iter()
                .filter_map(move |next| slots.seam_gap(id, next))
        })
        .fold(0.0, f32::max)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    let source = Arc::new(NoiseElevation::new(&cfg.height));
    let rt = Runtime::new(&cfg, source)?;
    let mut slots = MeshSlots::new();

    let start = match cli.viewer.as_deref() {
        Some([x, y, z]) => Vec3::new(*x, *y, *z),
        _ => Vec3::new(0.0, 2.0, 0.0),
    };

    let t0 = Instant::now();
    for step in 0..=cli.steps {
        let viewer = start + Vec3::X * (step as f32 * cli.step_size);
        if cli.background {
            rt.submit_all(viewer);
            rt.wait_idle();
        } else {
            let summary = rt.request_all(viewer)?;
            log::debug!(target: "lod", "step {} {:?}", step, summary);
        }
        let changed = slots.apply_all(rt.drain_apply_commands());
        log::info!(
            target: "lod",
            "step {} viewer=({:.2}, {:.2}, {:.2}) applied={} tris={}",
            step,
            viewer.x,
            viewer.y,
            viewer.z,
            changed,
            slots.total_triangles()
        );
    }

    let stats = rt.stats();
    let (applied, ignored) = slots.counts();
    let gap = max_seam_gap(&rt, &slots);
    log::info!(
        target: "perf",
        "ms={:.2} walk patches={} requests={} generated={} cache_hits={} unchanged={} stale={} cached={}",
        t0.elapsed().as_secs_f64() * 1000.0,
        stats.patches,
        stats.requests,
        stats.generated,
        stats.cache_hits,
        stats.unchanged,
        stats.stale,
        stats.cache_entries
    );
    log::info!(
        "shown={} tris={} applied={} ignored={} max_seam_gap={:.2e}",
        slots.len(),
        slots.total_triangles(),
        applied,
        ignored,
        gap
    );
    if gap > 1e-3 {
        log::warn!("seam gap {gap:.2e} exceeds tolerance");
    }
    Ok(())
}
