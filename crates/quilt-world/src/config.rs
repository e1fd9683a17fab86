use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Largest accepted `max_detail`. Keeps a single patch under ~16.8M vertices so
/// `u32` indices always fit.
pub const MAX_DETAIL_LIMIT: i64 = 4096;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("max_detail must be in 1..=4096, got {0}")]
    InvalidMaxDetail(i64),
    #[error("scale must be finite and positive, got {0}")]
    InvalidScale(f32),
    #[error("octaves must be at least 1, got {0}")]
    InvalidOctaves(i32),
    #[error("failed to read config")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Validated per-patch settings shared by every patch of a terrain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchSettings {
    max_detail: u32,
    scale: f32,
}

impl PatchSettings {
    pub fn new(max_detail: i64, scale: f32) -> Result<Self, ConfigError> {
        if max_detail <= 0 || max_detail > MAX_DETAIL_LIMIT {
            return Err(ConfigError::InvalidMaxDetail(max_detail));
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ConfigError::InvalidScale(scale));
        }
        Ok(Self {
            max_detail: max_detail as u32,
            scale,
        })
    }

    #[inline]
    pub fn max_detail(&self) -> u32 {
        self.max_detail
    }

    /// World-space side length of one patch.
    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self {
            max_detail: default_max_detail() as u32,
            scale: default_scale(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TerrainConfig {
    #[serde(default)]
    pub patch: PatchSection,
    #[serde(default)]
    pub height: Height,
    #[serde(default)]
    pub runtime: RuntimeSection,
}

impl TerrainConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: TerrainConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.patch_settings()?;
        if self.height.octaves < 1 {
            return Err(ConfigError::InvalidOctaves(self.height.octaves));
        }
        Ok(())
    }

    pub fn patch_settings(&self) -> Result<PatchSettings, ConfigError> {
        PatchSettings::new(self.patch.max_detail, self.patch.scale)
    }
}

pub fn load_config_from_path(path: &Path) -> Result<TerrainConfig, ConfigError> {
    let cfg = read_config_from_path(path)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Parses a config file without validating it, for callers that still apply
/// overrides before calling [`TerrainConfig::validate`].
pub fn read_config_from_path(path: &Path) -> Result<TerrainConfig, ConfigError> {
    let s = fs::read_to_string(path)?;
    Ok(toml::from_str(&s)?)
}

#[derive(Clone, Debug, Deserialize)]
pub struct PatchSection {
    #[serde(default = "default_max_detail")]
    pub max_detail: i64,
    #[serde(default = "default_scale")]
    pub scale: f32,
}
fn default_max_detail() -> i64 {
    8
}
fn default_scale() -> f32 {
    1.0
}
impl Default for PatchSection {
    fn default() -> Self {
        Self {
            max_detail: default_max_detail(),
            scale: default_scale(),
        }
    }
}

/// Fractal height-noise parameters for [`crate::NoiseElevation`].
#[derive(Clone, Debug, Deserialize)]
pub struct Height {
    #[serde(default = "default_seed")]
    pub seed: i32,
    #[serde(default = "default_height_freq")]
    pub frequency: f32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    #[serde(default)]
    pub base: f32,
    #[serde(default = "d_oct")]
    pub octaves: i32,
    #[serde(default = "d_pers")]
    pub persistence: f32,
    #[serde(default = "d_lac")]
    pub lacunarity: f32,
}
fn default_seed() -> i32 {
    1337
}
fn default_height_freq() -> f32 {
    0.05
}
fn default_amplitude() -> f32 {
    4.0
}
fn d_oct() -> i32 {
    4
}
fn d_pers() -> f32 {
    0.5
}
fn d_lac() -> f32 {
    2.0
}
impl Default for Height {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            frequency: default_height_freq(),
            amplitude: default_amplitude(),
            base: 0.0,
            octaves: d_oct(),
            persistence: d_pers(),
            lacunarity: d_lac(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeSection {
    /// Worker threads for LOD requests; 0 picks from available parallelism.
    #[serde(default)]
    pub workers: usize,
    /// Patches spawned in each direction around the origin tile.
    #[serde(default = "default_grid_radius")]
    pub grid_radius: i32,
}
fn default_grid_radius() -> i32 {
    4
}
impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            workers: 0,
            grid_radius: default_grid_radius(),
        }
    }
}
