//! Elevation sampling and terrain configuration.
#![forbid(unsafe_code)]

pub mod config;
pub mod elevation;

pub use config::{
    ConfigError, Height, MAX_DETAIL_LIMIT, PatchSection, PatchSettings, RuntimeSection, TerrainConfig,
    load_config_from_path, read_config_from_path,
};
pub use elevation::{ElevationSource, NoiseElevation};
