use glam::{Quat, Vec3};
use serde::Serialize;

use super::precompute::Precomputation;
use super::RetargetWarning;
use crate::animation::{AnimationClip, Keyframes, RotationTrack, Track, TrackKind};
use crate::error::RetargetError;
use crate::math::{quat_mul, quat_normalize};
use crate::skeleton::BoneId;

/// Keys whose norm leaves this range are renormalized with a warning
const RENORMALIZE_RANGE: std::ops::RangeInclusive<f32> = 0.9..=1.1;

/// Keys whose norm leaves this range make the clip malformed
const MALFORMED_RANGE: std::ops::RangeInclusive<f32> = 0.5..=2.0;

/// Relative tolerance for "same bind scale"
const SCALE_TOLERANCE: f32 = 0.01;

/// A retargeted clip plus everything that was dropped or repaired on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetargetOutput {
    pub clip: AnimationClip,
    pub warnings: Vec<RetargetWarning>,
}

/// Output track with its sort key: target bone, kind, input position.
struct Emitted {
    target: BoneId,
    kind: TrackKind,
    order: usize,
    track: Track,
}

/// Retarget a source clip onto the target skeleton, keeping its name.
pub fn retarget_clip(
    precomp: &Precomputation,
    clip: &AnimationClip,
) -> Result<RetargetOutput, RetargetError> {
    retarget_clip_named(precomp, clip, None)
}

/// Retarget a source clip, optionally renaming the output.
///
/// Rotation tracks on mapped bones are conjugated by the pair quaternions.
/// The root position track is offset and scaled by the proportion ratio in
/// world space. Scale tracks pass through only when enabled and the bind
/// scales agree. Everything else is dropped. Output tracks are ordered by
/// target bone, then kind, then input order. The warnings start with the
/// ones precompute recorded.
pub fn retarget_clip_named(
    precomp: &Precomputation,
    clip: &AnimationClip,
    rename: Option<&str>,
) -> Result<RetargetOutput, RetargetError> {
    clip.validate()?;

    let source_root_name = precomp.source.skeleton().bone_name(precomp.source_root);
    let target_skeleton = precomp.target.skeleton();
    let mut warnings = precomp.warnings.clone();
    let mut emitted: Vec<Emitted> = Vec::with_capacity(clip.tracks.len());

    for (order, track) in clip.tracks.iter().enumerate() {
        match track {
            Track::Rotation(keys) => {
                let Some(&pair_index) = precomp.pair_by_source.get(&keys.bone_name) else {
                    if !precomp.skipped_entry(&keys.bone_name) {
                        warnings.push(RetargetWarning::UnmappedTrack {
                            bone: keys.bone_name.clone(),
                            track: TrackKind::Rotation,
                        });
                    }
                    continue;
                };
                let target = precomp.pairs[pair_index].target;
                let values = retarget_rotations(precomp, pair_index, keys, &mut warnings)?;
                let (times, values) = if values.is_empty() {
                    (vec![0.0], vec![precomp.target_bind_local[pair_index]])
                } else {
                    (keys.times.clone(), values)
                };
                emitted.push(Emitted {
                    target,
                    kind: TrackKind::Rotation,
                    order,
                    track: Track::Rotation(Keyframes::new(
                        target_skeleton.bone_name(target),
                        times,
                        values,
                    )),
                });
            }
            Track::Position(keys) => {
                if keys.bone_name != source_root_name || !precomp.options.preserve_hip_position {
                    log::trace!("dropping position track on `{}`", keys.bone_name);
                    continue;
                }
                let target = precomp.target_root;
                let values = keys
                    .values
                    .iter()
                    .map(|&p| retarget_root_position(precomp, p))
                    .collect();
                emitted.push(Emitted {
                    target,
                    kind: TrackKind::Position,
                    order,
                    track: Track::Position(Keyframes::new(
                        target_skeleton.bone_name(target),
                        keys.times.clone(),
                        values,
                    )),
                });
            }
            Track::Scale(keys) => {
                let Some(&pair_index) = precomp.pair_by_source.get(&keys.bone_name) else {
                    if !precomp.skipped_entry(&keys.bone_name) {
                        warnings.push(RetargetWarning::UnmappedTrack {
                            bone: keys.bone_name.clone(),
                            track: TrackKind::Scale,
                        });
                    }
                    continue;
                };
                if !precomp.options.preserve_scale {
                    log::trace!("dropping scale track on `{}`", keys.bone_name);
                    continue;
                }
                let pair = &precomp.pairs[pair_index];
                let source_scale = precomp.source.world_rest(pair.source).scale;
                let target_scale = precomp.target.world_rest(pair.target).scale;
                if !scales_match(source_scale, target_scale) {
                    warnings.push(RetargetWarning::ScaleMismatch {
                        bone: keys.bone_name.clone(),
                    });
                    continue;
                }
                emitted.push(Emitted {
                    target: pair.target,
                    kind: TrackKind::Scale,
                    order,
                    track: Track::Scale(Keyframes::new(
                        target_skeleton.bone_name(pair.target),
                        keys.times.clone(),
                        keys.values.clone(),
                    )),
                });
            }
        }
    }

    if precomp.options.use_target_rest {
        let base = clip.tracks.len();
        for (k, &target) in precomp.unmapped_targets.iter().enumerate() {
            emitted.push(Emitted {
                target,
                kind: TrackKind::Rotation,
                order: base + k,
                track: Track::Rotation(RotationTrack::new(
                    target_skeleton.bone_name(target),
                    vec![0.0],
                    vec![precomp.target.local_rest(target).rotation],
                )),
            });
        }
    }

    emitted.sort_by_key(|e| (e.target, e.kind, e.order));

    let name = rename.map_or_else(|| clip.name.clone(), str::to_string);
    log::debug!(
        "retargeted clip `{}` as `{}`: {} tracks in, {} out, {} warnings",
        clip.name,
        name,
        clip.tracks.len(),
        emitted.len(),
        warnings.len()
    );

    Ok(RetargetOutput {
        clip: AnimationClip::new(
            name,
            clip.duration,
            emitted.into_iter().map(|e| e.track).collect(),
        ),
        warnings,
    })
}

/// `left * q * right` for every key, checking key norms first.
fn retarget_rotations(
    precomp: &Precomputation,
    pair_index: usize,
    keys: &RotationTrack,
    warnings: &mut Vec<RetargetWarning>,
) -> Result<Vec<Quat>, RetargetError> {
    let left = precomp.left[pair_index];
    let right = precomp.right[pair_index];

    let mut out = Vec::with_capacity(keys.values.len());
    for (keyframe, &q) in keys.values.iter().enumerate() {
        let norm = q.length();
        if !MALFORMED_RANGE.contains(&norm) {
            return Err(RetargetError::MalformedClip {
                track: format!("{}.{}", keys.bone_name, TrackKind::Rotation.property()),
                keyframe,
                norm,
            });
        }
        if !RENORMALIZE_RANGE.contains(&norm) {
            warnings.push(RetargetWarning::QuaternionRenormalized {
                track: format!("{}.{}", keys.bone_name, TrackKind::Rotation.property()),
                keyframe,
                norm,
            });
        }
        let q = quat_normalize(q)?;
        out.push(quat_normalize(quat_mul(quat_mul(left, q), right))?);
    }
    Ok(out)
}

/// Source root key to world, offset from the bind position scaled by the
/// proportion ratio, then into the target root's parent space.
fn retarget_root_position(precomp: &Precomputation, local: Vec3) -> Vec3 {
    let world = precomp.source_root_frame.transform_point(local);
    let offset = (world - precomp.source_root_bind_position) * precomp.proportion_ratio;
    let target_world = precomp.target_root_bind_position + offset;
    precomp.target_root_frame_inverse.transform_point(target_world)
}

fn scales_match(a: Vec3, b: Vec3) -> bool {
    let diff = (a - b).abs();
    let reference = a.abs().max(b.abs());
    diff.cmple(reference * SCALE_TOLERANCE).all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;
    use std::f32::consts::FRAC_PI_2;
    use std::sync::Arc;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::animation::{PositionTrack, ScaleTrack};
    use crate::mapping::{auto_map, BoneMapping};
    use crate::math::{quat_approx_eq, Transform};
    use crate::retarget::{precompute, RetargetOptions};
    use crate::skeleton::tests::chain_specs;
    use crate::skeleton::{capture_bind, BindPoseSnapshot, BoneSpec, Skeleton};

    fn bind(specs: Vec<BoneSpec>, embedded: Option<Transform>) -> Arc<BindPoseSnapshot> {
        let skeleton = Arc::new(Skeleton::new(specs, embedded).unwrap());
        Arc::new(capture_bind(&skeleton, false).unwrap())
    }

    fn setup(
        src: Vec<BoneSpec>,
        tgt: Vec<BoneSpec>,
        options: RetargetOptions,
    ) -> Precomputation {
        let src = bind(src, None);
        let tgt = bind(tgt, None);
        let mapping = auto_map(src.skeleton(), tgt.skeleton());
        precompute(&src, &tgt, &mapping, options).unwrap()
    }

    fn spine_clip() -> AnimationClip {
        AnimationClip::new(
            "nod",
            1.0,
            vec![Track::Rotation(RotationTrack::new(
                "Spine",
                vec![0.0, 1.0],
                vec![
                    Quat::from_xyzw(0.0, 0.0, 0.0, 1.0),
                    Quat::from_xyzw(0.0, 0.7071, 0.0, 0.7071),
                ],
            ))],
        )
    }

    fn rotation_values(track: &Track) -> &[Quat] {
        match track {
            Track::Rotation(t) => &t.values,
            other => panic!("expected rotation track, got {:?}", other),
        }
    }

    fn position_values(track: &Track) -> &[Vec3] {
        match track {
            Track::Position(t) => &t.values,
            other => panic!("expected position track, got {:?}", other),
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_identity_skeletons() {
        let pre = setup(
            chain_specs(["Root", "Spine", "Head"], 1.0),
            chain_specs(["Root", "Spine", "Head"], 1.0),
            RetargetOptions::default(),
        );
        let clip = spine_clip();
        let out = retarget_clip(&pre, &clip).unwrap();

        assert_eq!(out.clip.name, "nod");
        assert_eq!(out.clip.duration, 1.0);
        assert_eq!(out.clip.tracks.len(), 1);
        assert!(out.warnings.is_empty());
        assert_eq!(out.clip.tracks[0].times(), clip.tracks[0].times());

        let expected = rotation_values(&clip.tracks[0]);
        for (got, want) in rotation_values(&out.clip.tracks[0]).iter().zip(expected) {
            assert!(
                quat_approx_eq(*got, want.normalize(), 1e-5),
                "got {:?}, want {:?}",
                got,
                want
            );
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_identity_holds_for_random_clips() {
        let mut rng = StdRng::seed_from_u64(3);
        let pre = setup(
            chain_specs(["Root", "Spine", "Head"], 1.0),
            chain_specs(["Root", "Spine", "Head"], 1.0),
            RetargetOptions::default(),
        );

        for _ in 0..20 {
            let count = rng.random_range(1..8);
            let times: Vec<f32> = (0..count).map(|i| i as f32 * 0.1).collect();
            let mut tracks = Vec::new();
            for bone in ["Root", "Spine", "Head"] {
                let values = (0..count)
                    .map(|_| {
                        Quat::from_euler(
                            glam::EulerRot::XYZ,
                            rng.random_range(-3.0..3.0),
                            rng.random_range(-3.0..3.0),
                            rng.random_range(-3.0..3.0),
                        )
                    })
                    .collect();
                tracks.push(Track::Rotation(RotationTrack::new(bone, times.clone(), values)));
            }
            let positions = (0..count)
                .map(|_| Vec3::new(rng.random_range(-2.0..2.0), 0.0, rng.random_range(-2.0..2.0)))
                .collect();
            tracks.push(Track::Position(PositionTrack::new("Root", times.clone(), positions)));
            let clip = AnimationClip::new("random", times[count - 1], tracks);

            let out = retarget_clip(&pre, &clip).unwrap();
            assert_eq!(out.clip.tracks.len(), 4);
            for track in &out.clip.tracks {
                let original = clip
                    .tracks
                    .iter()
                    .find(|t| t.bone_name() == track.bone_name() && t.kind() == track.kind())
                    .unwrap();
                match (original, track) {
                    (Track::Rotation(a), Track::Rotation(b)) => {
                        for (x, y) in a.values.iter().zip(&b.values) {
                            assert!(quat_approx_eq(*x, *y, 1e-5));
                        }
                    }
                    (Track::Position(a), Track::Position(b)) => {
                        for (x, y) in a.values.iter().zip(&b.values) {
                            assert!(x.abs_diff_eq(*y, 1e-5), "{:?} vs {:?}", x, y);
                        }
                    }
                    other => panic!("unexpected pair {:?}", other),
                }
            }
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_renamed_bones() {
        let pre = setup(
            chain_specs(["Hips", "Spine", "Head"], 1.0),
            chain_specs(["mixamorig:Hips", "mixamorig:Spine", "mixamorig:Head"], 1.0),
            RetargetOptions::default(),
        );
        let clip = spine_clip();
        let out = retarget_clip(&pre, &clip).unwrap();

        assert_eq!(out.clip.tracks.len(), 1);
        assert_eq!(out.clip.tracks[0].bone_name(), "mixamorig:Spine");
        let expected = rotation_values(&clip.tracks[0]);
        for (got, want) in rotation_values(&out.clip.tracks[0]).iter().zip(expected) {
            assert!(quat_approx_eq(*got, want.normalize(), 1e-5));
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_root_motion_scales_with_proportions() {
        let pre = setup(
            chain_specs(["Root", "Spine", "Head"], 1.0),
            chain_specs(["Root", "Spine", "Head"], 2.0),
            RetargetOptions::default(),
        );
        let clip = AnimationClip::new(
            "walk",
            1.0,
            vec![Track::Position(PositionTrack::new(
                "Root",
                vec![0.0, 1.0],
                vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)],
            ))],
        );

        let out = retarget_clip(&pre, &clip).unwrap();
        let values = position_values(&out.clip.tracks[0]);
        assert!(values[0].abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(
            (values[1].x - 2.0).abs() <= 0.02 && values[1].y.abs() < 1e-5,
            "got {:?}",
            values[1]
        );
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_root_motion_dropped_when_disabled() {
        let options = RetargetOptions {
            preserve_hip_position: false,
            ..RetargetOptions::default()
        };
        let pre = setup(
            chain_specs(["Root", "Spine", "Head"], 1.0),
            chain_specs(["Root", "Spine", "Head"], 1.0),
            options,
        );
        let clip = AnimationClip::new(
            "walk",
            1.0,
            vec![
                Track::Position(PositionTrack::new("Root", vec![0.0], vec![Vec3::X])),
                Track::Position(PositionTrack::new("Spine", vec![0.0], vec![Vec3::X])),
            ],
        );
        let out = retarget_clip(&pre, &clip).unwrap();
        assert!(out.clip.tracks.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_rotated_container_keeps_world_direction() {
        // Source lives in a container turned 90 degrees about Y; its local
        // -X is world +Z.
        let container = Transform::from_rotation(Quat::from_rotation_y(FRAC_PI_2));
        let src = bind(chain_specs(["Hips", "Spine", "Head"], 1.0), Some(container));
        let tgt = bind(chain_specs(["Hips", "Spine", "Head"], 1.0), None);
        let mapping = auto_map(src.skeleton(), tgt.skeleton());
        let local_step = Quat::from_rotation_y(FRAC_PI_2).inverse() * Vec3::Z;

        let clip = AnimationClip::new(
            "forward",
            1.0,
            vec![Track::Position(PositionTrack::new(
                "Hips",
                vec![0.0, 1.0],
                vec![Vec3::ZERO, local_step],
            ))],
        );

        let embedded = RetargetOptions {
            embed_world: true,
            ..RetargetOptions::default()
        };
        let pre = precompute(&src, &tgt, &mapping, embedded).unwrap();
        let out = retarget_clip(&pre, &clip).unwrap();
        let end = position_values(&out.clip.tracks[0])[1];
        assert!(end.abs_diff_eq(Vec3::Z, 1e-5), "moved along {:?}", end);

        // The target pose moves the same way in world space.
        let pose = out.clip.sample_pose(tgt.skeleton(), 1.0);
        assert!(pose
            .world_position(tgt.skeleton().root_id())
            .abs_diff_eq(Vec3::Z, 1e-5));

        let flat = precompute(&src, &tgt, &mapping, RetargetOptions::default()).unwrap();
        let out = retarget_clip(&flat, &clip).unwrap();
        let end = position_values(&out.clip.tracks[0])[1];
        assert!(end.abs_diff_eq(local_step, 1e-5), "moved along {:?}", end);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_unmapped_track_dropped_with_one_warning() {
        let mut src_specs = chain_specs(["Hips", "Spine", "Head"], 1.0);
        src_specs.push(BoneSpec::new("Tail", Some(0), Transform::from_translation(Vec3::NEG_Z)));
        let options = RetargetOptions {
            use_target_rest: false,
            ..RetargetOptions::default()
        };
        let pre = setup(src_specs, chain_specs(["Hips", "Spine", "Head"], 1.0), options);

        let clip = AnimationClip::new(
            "wag",
            1.0,
            vec![Track::Rotation(RotationTrack::new(
                "Tail",
                vec![0.0, 1.0],
                vec![Quat::IDENTITY, Quat::from_rotation_y(0.5)],
            ))],
        );
        let out = retarget_clip(&pre, &clip).unwrap();
        assert!(out.clip.tracks.iter().all(|t| t.bone_name() != "Tail"));
        assert!(out.clip.tracks.is_empty());
        assert_eq!(
            out.warnings,
            vec![RetargetWarning::UnmappedTrack {
                bone: "Tail".to_string(),
                track: TrackKind::Rotation,
            }]
        );
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_bind_pose_round_trip() {
        // Rest rotations differ between rigs.
        let mut src_specs = chain_specs(["Hips", "Spine", "Head"], 1.0);
        src_specs[1].local_rest.rotation = Quat::from_rotation_x(0.4);
        let mut tgt_specs = chain_specs(["Hips", "Spine", "Head"], 1.5);
        tgt_specs[0].local_rest.rotation = Quat::from_rotation_y(1.2);
        tgt_specs[2].local_rest.rotation = Quat::from_rotation_z(-0.7);

        let src = bind(src_specs, None);
        let tgt = bind(tgt_specs, None);
        let mapping = auto_map(src.skeleton(), tgt.skeleton());
        let pre = precompute(&src, &tgt, &mapping, RetargetOptions::default()).unwrap();

        // A clip that holds the source at its bind pose.
        let tracks = src
            .skeleton()
            .bones()
            .iter()
            .map(|b| {
                Track::Rotation(RotationTrack::new(
                    b.name.clone(),
                    vec![0.0],
                    vec![b.local_rest.rotation],
                ))
            })
            .collect();
        let clip = AnimationClip::new("bind", 0.0, tracks);

        let out = retarget_clip(&pre, &clip).unwrap();
        let pose = out.clip.sample_pose(tgt.skeleton(), 0.0);
        for bone in tgt.skeleton().bones() {
            assert!(
                quat_approx_eq(pose.local(bone.id).rotation, bone.local_rest.rotation, 1e-5),
                "bone {} left its bind rotation",
                bone.name
            );
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_output_is_reproducible_and_ordered() {
        let mut src_specs = chain_specs(["Hips", "Spine", "Head"], 1.0);
        src_specs.push(BoneSpec::new("LeftArm", Some(1), Transform::from_translation(Vec3::X)));
        let mut tgt_specs = chain_specs(["Hips", "Spine", "Head"], 1.0);
        tgt_specs.push(BoneSpec::new("LeftArm", Some(1), Transform::from_translation(Vec3::X)));
        tgt_specs.push(BoneSpec::new("Jaw", Some(2), Transform::IDENTITY));
        let pre = setup(src_specs, tgt_specs, RetargetOptions::default());

        let clip = AnimationClip::new(
            "mixed",
            1.0,
            vec![
                Track::Rotation(RotationTrack::new("Head", vec![0.0], vec![Quat::from_rotation_x(0.2)])),
                Track::Position(PositionTrack::new("Hips", vec![0.0], vec![Vec3::Y])),
                Track::Rotation(RotationTrack::new("Hips", vec![0.0], vec![Quat::IDENTITY])),
                Track::Rotation(RotationTrack::new("LeftArm", vec![0.0], vec![Quat::from_rotation_z(0.3)])),
            ],
        );

        let first = retarget_clip(&pre, &clip).unwrap();
        let second = retarget_clip(&pre, &clip).unwrap();
        assert_eq!(
            first.clip.to_json_string().unwrap(),
            second.clip.to_json_string().unwrap()
        );

        let paths: Vec<String> = first.clip.tracks.iter().map(Track::property_path).collect();
        assert_eq!(
            paths,
            [
                "Hips.quaternion",
                "Hips.position",
                "Head.quaternion",
                "Jaw.quaternion",
                "LeftArm.quaternion",
            ]
        );
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_quaternion_norm_checks() {
        let pre = setup(
            chain_specs(["Root", "Spine", "Head"], 1.0),
            chain_specs(["Root", "Spine", "Head"], 1.0),
            RetargetOptions::default(),
        );

        let slightly_off = AnimationClip::new(
            "off",
            0.0,
            vec![Track::Rotation(RotationTrack::new(
                "Spine",
                vec![0.0],
                vec![Quat::from_xyzw(0.0, 0.0, 0.0, 1.2)],
            ))],
        );
        let out = retarget_clip(&pre, &slightly_off).unwrap();
        assert_eq!(out.warnings.len(), 1);
        let q = rotation_values(&out.clip.tracks[0])[0];
        assert!((q.length() - 1.0).abs() < 1e-5);

        let broken = AnimationClip::new(
            "broken",
            0.0,
            vec![Track::Rotation(RotationTrack::new(
                "Spine",
                vec![0.0],
                vec![Quat::from_xyzw(0.0, 0.0, 0.0, 3.0)],
            ))],
        );
        assert!(matches!(
            retarget_clip(&pre, &broken),
            Err(RetargetError::MalformedClip { keyframe: 0, .. })
        ));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_scale_passthrough_rules() {
        let options = RetargetOptions {
            preserve_scale: true,
            use_target_rest: false,
            ..RetargetOptions::default()
        };
        let mut tgt_specs = chain_specs(["Root", "Spine", "Head"], 1.0);
        tgt_specs[2].local_rest.scale = Vec3::splat(1.5);
        let pre = setup(chain_specs(["Root", "Spine", "Head"], 1.0), tgt_specs, options);

        let clip = AnimationClip::new(
            "pulse",
            1.0,
            vec![
                Track::Scale(ScaleTrack::new("Spine", vec![0.0, 1.0], vec![Vec3::ONE, Vec3::splat(1.2)])),
                Track::Scale(ScaleTrack::new("Head", vec![0.0], vec![Vec3::ONE])),
            ],
        );
        let out = retarget_clip(&pre, &clip).unwrap();
        assert_eq!(out.clip.tracks.len(), 1);
        assert_eq!(out.clip.tracks[0].property_path(), "Spine.scale");
        assert_eq!(
            out.warnings,
            vec![RetargetWarning::ScaleMismatch {
                bone: "Head".to_string()
            }]
        );
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_rename_and_invalid_clip() {
        let pre = setup(
            chain_specs(["Root", "Spine", "Head"], 1.0),
            chain_specs(["Root", "Spine", "Head"], 1.0),
            RetargetOptions::default(),
        );
        let out = retarget_clip_named(&pre, &spine_clip(), Some("nod_retargeted")).unwrap();
        assert_eq!(out.clip.name, "nod_retargeted");

        let bad = AnimationClip::new(
            "bad",
            1.0,
            vec![Track::Rotation(RotationTrack::new("Spine", vec![0.0, 1.0], vec![Quat::IDENTITY]))],
        );
        assert!(matches!(
            retarget_clip(&pre, &bad),
            Err(RetargetError::InvalidInput(_))
        ));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_empty_mapping_holds_target_rest() {
        let src = bind(chain_specs(["Root", "Spine", "Head"], 1.0), None);
        let tgt = bind(chain_specs(["Root", "Spine", "Head"], 1.0), None);
        let pre = precompute(&src, &tgt, &BoneMapping::new(), RetargetOptions::default()).unwrap();

        let out = retarget_clip(&pre, &spine_clip()).unwrap();
        assert_eq!(out.clip.tracks.len(), 3);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.clip.tracks.iter().all(|t| t.len() == 1));
    }
}
