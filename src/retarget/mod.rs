//! Transfer of animation clips between mapped skeletons.
//!
//! Per mapped pair the bind poses reduce to two quaternions, so each keyframe
//! costs two products and a normalize:
//! `q_tgt = left * q_src * right` with
//! `left = inv(parent_frame_tgt) * parent_frame_src` and
//! `right = inv(world_rest_src) * world_rest_tgt`.

pub mod clip;
pub mod job;
pub mod precompute;
pub mod warning;

use serde::{Deserialize, Serialize};

pub use clip::{retarget_clip, retarget_clip_named, RetargetOutput};
pub use job::{JobState, RetargetJob};
pub use precompute::{precompute, BonePair, Precomputation};
pub use warning::RetargetWarning;

/// Bind-pose strategy flags, fixed at precompute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetargetOptions {
    /// Hold unmapped target bones at their local rest
    pub use_target_rest: bool,
    /// Retarget the root position track; otherwise drop it
    pub preserve_hip_position: bool,
    /// Pass scale tracks through when bind scales agree
    pub preserve_scale: bool,
    /// Include each skeleton's embedded world transform in bind math
    pub embed_world: bool,
}

impl Default for RetargetOptions {
    fn default() -> Self {
        Self {
            use_target_rest: true,
            preserve_hip_position: true,
            preserve_scale: false,
            embed_world: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[test]
    #[wasm_bindgen_test]
    fn test_options_from_partial_json() {
        let options: RetargetOptions =
            serde_json::from_str(r#"{ "embedWorld": true, "preserveScale": true }"#).unwrap();
        assert!(options.embed_world);
        assert!(options.preserve_scale);
        assert!(options.use_target_rest);
        assert!(options.preserve_hip_position);
    }
}
