//! CPU patch mesher: LOD selection, border classification and seam-corrected
//! grid meshing (engine-only).
#![forbid(unsafe_code)]

pub mod build;
pub mod edge;
pub mod lod;
pub mod mesh_build;
pub mod seam;

use thiserror::Error;

pub use build::build_patch_mesh;
pub use edge::{EdgeTag, classify};
pub use lod::{clamp_level, floor_pow2, is_pow2, round_up_pow2, select_level};
pub use mesh_build::PatchMesh;
pub use seam::PatchSampler;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("elevation source returned {value} at ({x}, {z})")]
    NonFiniteElevation { x: f32, z: f32, value: f32 },
}
