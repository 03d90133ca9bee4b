use std::hint::black_box;
use std::sync::Arc;

use wasm_bindgen::prelude::*;

use crate::animation::{AnimationClip, RotationTrack, Track};
use crate::error::RetargetError;
use crate::mapping::BoneMapping;
use crate::math::{Quat, Transform, Vec3};
use crate::retarget::{precompute, retarget_clip, RetargetOptions};
use crate::skeleton::{BindPoseSnapshot, BoneSpec, Skeleton};

#[derive(serde::Serialize)]
pub struct BenchmarkResults {
    pub iterations: i32,
    pub bones: usize,
    pub keyframes: usize,
    pub precompute_ms: f64,
    pub retarget_ms: f64,
    pub sample_pose_ms: f64,
}

/// Chain of `bones` bones, each offset along +Y and slightly twisted.
fn chain_skeleton(prefix: &str, bones: usize, length: f32) -> Result<Skeleton, RetargetError> {
    let specs = (0..bones)
        .map(|i| {
            let local = if i == 0 {
                Transform::IDENTITY
            } else {
                Transform::from_translation_rotation(
                    Vec3::new(0.0, length, 0.0),
                    Quat::from_rotation_y(0.05 * i as f32),
                )
            };
            BoneSpec::new(format!("{}Bone{}", prefix, i), i.checked_sub(1), local)
        })
        .collect();
    Skeleton::new(specs, None)
}

fn wave_clip(bones: usize, keyframes: usize) -> AnimationClip {
    let times: Vec<f32> = (0..keyframes).map(|k| k as f32 / 30.0).collect();
    let tracks = (0..bones)
        .map(|i| {
            let values = times
                .iter()
                .map(|t| Quat::from_rotation_z((t * 4.0 + i as f32).sin() * 0.3))
                .collect();
            Track::Rotation(RotationTrack::new(format!("Bone{}", i), times.clone(), values))
        })
        .collect();
    AnimationClip::new("bench", times.last().copied().unwrap_or(0.0), tracks)
}

/// Time precompute, clip retargeting and pose sampling on synthetic chains
#[wasm_bindgen]
pub fn run_benchmarks(iterations: i32, bones: usize, keyframes: usize) -> Result<JsValue, JsValue> {
    let to_js = |e: RetargetError| JsValue::from_str(&e.to_string());
    let perf = web_sys::window()
        .and_then(|w| w.performance())
        .ok_or_else(|| JsValue::from_str("performance timer unavailable"))?;

    let bones = bones.max(1);
    let source = Arc::new(chain_skeleton("", bones, 0.1).map_err(to_js)?);
    let target = Arc::new(chain_skeleton("mixamorig:", bones, 0.12).map_err(to_js)?);
    let source_bind = Arc::new(BindPoseSnapshot::capture(source.clone(), false).map_err(to_js)?);
    let target_bind = Arc::new(BindPoseSnapshot::capture(target, false).map_err(to_js)?);

    let mut mapping = BoneMapping::new();
    for i in 0..bones {
        mapping.add_manual(&format!("Bone{}", i), &format!("mixamorig:Bone{}", i));
    }
    let options = RetargetOptions::default();
    let clip = wave_clip(bones, keyframes.max(1));

    // Warm-up to trigger JIT
    let precomp = precompute(&source_bind, &target_bind, &mapping, options).map_err(to_js)?;
    for _ in 0..10 {
        black_box(retarget_clip(&precomp, &clip).map_err(to_js)?);
    }

    let start = perf.now();
    for _ in 0..iterations {
        black_box(precompute(&source_bind, &target_bind, &mapping, options).map_err(to_js)?);
    }
    let precompute_ms = perf.now() - start;

    let start = perf.now();
    for _ in 0..iterations {
        black_box(retarget_clip(&precomp, &clip).map_err(to_js)?);
    }
    let retarget_ms = perf.now() - start;

    let start = perf.now();
    for i in 0..iterations {
        let pose = clip.sample_pose(&source, (i as f32 / 30.0) % clip.duration.max(1e-3));
        pose.compute_all();
        black_box(pose.world_position(source.root_id()));
    }
    let sample_pose_ms = perf.now() - start;

    let result = BenchmarkResults {
        iterations,
        bones,
        keyframes: clip.tracks.first().map_or(0, |t| t.len()),
        precompute_ms,
        retarget_ms,
        sample_pose_ms,
    };
    log::info!(
        "bench: {} bones x {} keys, precompute {:.2} ms, retarget {:.2} ms",
        result.bones,
        result.keyframes,
        result.precompute_ms,
        result.retarget_ms
    );

    serde_wasm_bindgen::to_value(&result).map_err(|e| JsValue::from_str(&e.to_string()))
}
