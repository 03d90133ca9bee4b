//! Rig Retarget - Wasm Core
//!
//! Transfers skeletal animation clips between rigs with different proportions,
//! bind poses and bone names. Scenes are first brought into one canonical
//! space (right-handed, +Y up, +Z forward, meters), then a per-bone
//! precomputation turns every source rotation key into a target key with two
//! quaternion products.
//!
//! The core modules are plain Rust and unit-tested natively. The `wasm32`
//! bindings are a thin layer over [`session`].

pub mod animation;
#[cfg(target_arch = "wasm32")]
mod bench;
pub mod coords;
pub mod error;
pub mod mapping;
pub mod math;
pub mod retarget;
pub mod scene;
pub mod session;
pub mod skeleton;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use bench::run_benchmarks;

pub use animation::{AnimationClip, Track, TrackKind};
pub use coords::{canonicalize, infer_coordinate_system, ConversionReport, CoordinateSystem};
pub use error::RetargetError;
pub use mapping::{auto_map, compatibility, BoneMapping, CompatibilityReport};
pub use math::Transform;
pub use retarget::{
    precompute, retarget_clip, JobState, Precomputation, RetargetJob, RetargetOptions,
    RetargetOutput, RetargetWarning,
};
pub use scene::Scene;
pub use session::{create_session, destroy_session, with_session, with_session_mut};
pub use skeleton::{analyze, build_skeleton, BindPoseSnapshot, BoneId, Skeleton};
