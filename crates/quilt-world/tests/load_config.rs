use std::path::PathBuf;

use quilt_world::{
    ConfigError, ElevationSource, NoiseElevation, load_config_from_path, read_config_from_path,
};

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("quilt-world-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_terrain_toml_from_disk() {
    let path = scratch_file(
        "terrain.toml",
        "[patch]\nmax_detail = 32\nscale = 4.0\n\n[height]\nseed = 11\noctaves = 2\n",
    );
    let cfg = load_config_from_path(&path).unwrap();
    let settings = cfg.patch_settings().unwrap();
    assert_eq!(settings.max_detail(), 32);
    assert_eq!(settings.scale(), 4.0);

    let src = NoiseElevation::new(&cfg.height);
    assert_eq!(src.params().seed, 11);
    assert!(src.elevation(12.5, -3.25).is_finite());
}

#[test]
fn invalid_file_is_rejected_at_load_time() {
    let path = scratch_file("bad.toml", "[patch]\nmax_detail = -2\n");
    let err = load_config_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidMaxDetail(-2)));
}

#[test]
fn missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("quilt-world-definitely-missing.toml");
    let err = load_config_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn read_defers_validation_to_the_caller() {
    let path = scratch_file("deferred.toml", "[patch]\nmax_detail = 0\nscale = 3.0\n");
    let mut cfg = read_config_from_path(&path).unwrap();
    assert!(matches!(cfg.validate(), Err(ConfigError::InvalidMaxDetail(0))));
    cfg.patch.max_detail = 16;
    cfg.validate().unwrap();
    assert_eq!(cfg.patch_settings().unwrap().scale(), 3.0);
}
