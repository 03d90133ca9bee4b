use std::collections::HashMap;
use std::sync::Arc;

use glam::{Quat, Vec3};

use super::{RetargetOptions, RetargetWarning};
use crate::animation::{AnimationClip, PositionTrack, RotationTrack, Track};
use crate::error::RetargetError;
use crate::mapping::BoneMapping;
use crate::math::{quat_inverse, quat_mul, Transform, EPSILON};
use crate::skeleton::{BindPoseSnapshot, BoneId};

/// One resolved mapping entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonePair {
    pub source: BoneId,
    pub target: BoneId,
    pub source_name: String,
}

/// Everything per-keyframe retargeting needs, computed once per job.
///
/// `left`, `right` and `target_bind_local` are parallel to `pairs`, which
/// are sorted by target bone.
#[derive(Debug, Clone)]
pub struct Precomputation {
    pub(super) source: Arc<BindPoseSnapshot>,
    pub(super) target: Arc<BindPoseSnapshot>,
    pub(super) options: RetargetOptions,
    pub(super) pairs: Vec<BonePair>,
    pub(super) left: Vec<Quat>,
    pub(super) right: Vec<Quat>,
    pub(super) target_bind_local: Vec<Quat>,
    pub(super) pair_by_source: HashMap<String, usize>,
    pub(super) unmapped_targets: Vec<BoneId>,
    pub(super) proportion_ratio: f32,
    pub(super) source_root: BoneId,
    pub(super) target_root: BoneId,
    pub(super) source_root_bind_position: Vec3,
    pub(super) target_root_bind_position: Vec3,
    pub(super) source_root_frame: Transform,
    pub(super) target_root_frame_inverse: Transform,
    pub(super) warnings: Vec<RetargetWarning>,
}

/// Resolve the mapping against both bind poses and cache the per-pair
/// quaternions, the proportion ratio and the root frames.
///
/// Snapshots captured with a different `embed_world` than `options` asks for
/// are recaptured. Entries naming missing bones are skipped with a warning.
pub fn precompute(
    source: &Arc<BindPoseSnapshot>,
    target: &Arc<BindPoseSnapshot>,
    mapping: &BoneMapping,
    options: RetargetOptions,
) -> Result<Precomputation, RetargetError> {
    mapping.check_injective()?;

    let source = matching_snapshot(source, options.embed_world)?;
    let target = matching_snapshot(target, options.embed_world)?;
    let src_skeleton = source.skeleton();
    let tgt_skeleton = target.skeleton();

    let mut warnings = Vec::new();
    for (name, &count) in src_skeleton.duplicates().iter().chain(tgt_skeleton.duplicates()) {
        warnings.push(RetargetWarning::DuplicateBoneName {
            name: name.clone(),
            count,
        });
    }

    let mut pairs = Vec::with_capacity(mapping.len());
    for (src_name, entry) in mapping.iter() {
        let Some(src_id) = src_skeleton.find_bone(src_name) else {
            warnings.push(RetargetWarning::MissingSourceBone {
                source: src_name.to_string(),
            });
            continue;
        };
        let Some(tgt_id) = tgt_skeleton.find_bone(&entry.target) else {
            warnings.push(RetargetWarning::MissingTargetBone {
                source: src_name.to_string(),
                target: entry.target.clone(),
            });
            continue;
        };
        pairs.push(BonePair {
            source: src_id,
            target: tgt_id,
            source_name: src_name.to_string(),
        });
    }
    pairs.sort_by_key(|p| p.target);

    let mut left = Vec::with_capacity(pairs.len());
    let mut right = Vec::with_capacity(pairs.len());
    let mut target_bind_local = Vec::with_capacity(pairs.len());
    let mut pair_by_source = HashMap::with_capacity(pairs.len());
    let mut source_length = 0.0;
    let mut target_length = 0.0;

    for (i, pair) in pairs.iter().enumerate() {
        let src_parent = source.parent_frame(pair.source).rotation;
        let tgt_parent = target.parent_frame(pair.target).rotation;
        left.push(quat_mul(quat_inverse(tgt_parent), src_parent));
        right.push(quat_mul(
            source.world_rest_inverse(pair.source).rotation,
            target.world_rest(pair.target).rotation,
        ));
        target_bind_local.push(target.local_rest(pair.target).rotation);
        pair_by_source.insert(pair.source_name.clone(), i);

        if let (Some(src_len), Some(tgt_len)) =
            (source.bone_length(pair.source), target.bone_length(pair.target))
        {
            source_length += src_len;
            target_length += tgt_len;
        }
    }

    let proportion_ratio = if source_length > EPSILON && target_length > EPSILON {
        target_length / source_length
    } else {
        1.0
    };

    let mut mapped_target = vec![false; tgt_skeleton.len()];
    for pair in &pairs {
        mapped_target[pair.target.index()] = true;
    }
    let unmapped_targets = tgt_skeleton
        .ids()
        .filter(|id| !mapped_target[id.index()])
        .collect();

    let source_root = src_skeleton.root_id();
    let target_root = tgt_skeleton.root_id();
    let target_root_frame_inverse = target
        .parent_frame(target_root)
        .inverse()
        .map_err(|_| RetargetError::DegenerateBind {
            bone_name: tgt_skeleton.bone_name(target_root).to_string(),
        })?;

    log::debug!(
        "precomputed {} bone pairs ({} warnings, proportion ratio {:.4})",
        pairs.len(),
        warnings.len(),
        proportion_ratio
    );

    Ok(Precomputation {
        source_root_bind_position: source.world_position(source_root),
        target_root_bind_position: target.world_position(target_root),
        source_root_frame: source.parent_frame(source_root),
        target_root_frame_inverse,
        source_root,
        target_root,
        source,
        target,
        options,
        pairs,
        left,
        right,
        target_bind_local,
        pair_by_source,
        unmapped_targets,
        proportion_ratio,
        warnings,
    })
}

fn matching_snapshot(
    snapshot: &Arc<BindPoseSnapshot>,
    embed_world: bool,
) -> Result<Arc<BindPoseSnapshot>, RetargetError> {
    let wants_embedding = embed_world && snapshot.skeleton().embedded_world().is_some();
    if snapshot.is_embedded() == wants_embedding {
        Ok(Arc::clone(snapshot))
    } else {
        BindPoseSnapshot::capture(Arc::clone(snapshot.skeleton()), embed_world).map(Arc::new)
    }
}

impl Precomputation {
    pub fn options(&self) -> &RetargetOptions {
        &self.options
    }

    pub fn source(&self) -> &Arc<BindPoseSnapshot> {
        &self.source
    }

    pub fn target(&self) -> &Arc<BindPoseSnapshot> {
        &self.target
    }

    pub fn pairs(&self) -> &[BonePair] {
        &self.pairs
    }

    pub fn left(&self) -> &[Quat] {
        &self.left
    }

    pub fn right(&self) -> &[Quat] {
        &self.right
    }

    pub fn pair_for_source(&self, source_name: &str) -> Option<&BonePair> {
        self.pair_by_source.get(source_name).map(|&i| &self.pairs[i])
    }

    /// Target bones no mapping entry reaches, in bone order.
    pub fn unmapped_targets(&self) -> &[BoneId] {
        &self.unmapped_targets
    }

    pub fn proportion_ratio(&self) -> f32 {
        self.proportion_ratio
    }

    pub fn source_root_bind_position(&self) -> Vec3 {
        self.source_root_bind_position
    }

    pub fn target_root_bind_position(&self) -> Vec3 {
        self.target_root_bind_position
    }

    /// Issues found while resolving the mapping
    pub fn warnings(&self) -> &[RetargetWarning] {
        &self.warnings
    }

    /// Whether the mapping names `source` but precompute had to skip it.
    pub(super) fn skipped_entry(&self, source: &str) -> bool {
        self.warnings.iter().any(|w| match w {
            RetargetWarning::MissingTargetBone { source: name, .. }
            | RetargetWarning::MissingSourceBone { source: name } => name == source,
            _ => false,
        })
    }

    /// One-key clip holding every target bone at its bind pose.
    pub fn rest_pose_clip(&self, name: impl Into<String>) -> AnimationClip {
        let skeleton = self.target.skeleton();
        let mut tracks: Vec<Track> = skeleton
            .bones()
            .iter()
            .map(|bone| {
                Track::Rotation(RotationTrack::new(
                    bone.name.clone(),
                    vec![0.0],
                    vec![bone.local_rest.rotation],
                ))
            })
            .collect();

        let root = skeleton.bone(self.target_root);
        let insert_at = self.target_root.index() + 1;
        tracks.insert(
            insert_at,
            Track::Position(PositionTrack::new(
                root.name.clone(),
                vec![0.0],
                vec![root.local_rest.translation],
            )),
        );

        AnimationClip::new(name, 0.0, tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;
    use crate::mapping::auto_map;
    use crate::math::quat_approx_eq;
    use crate::skeleton::tests::chain_specs;
    use crate::skeleton::{capture_bind, BoneSpec, Skeleton};
    use std::f32::consts::FRAC_PI_2;

    fn snapshot(specs: Vec<BoneSpec>, embedded: Option<Transform>) -> Arc<BindPoseSnapshot> {
        let skeleton = Arc::new(Skeleton::new(specs, embedded).unwrap());
        Arc::new(capture_bind(&skeleton, false).unwrap())
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_identity_pairs_have_identity_quaternions() {
        let src = snapshot(chain_specs(["Root", "Spine", "Head"], 1.0), None);
        let tgt = snapshot(chain_specs(["Root", "Spine", "Head"], 1.0), None);
        let mapping = auto_map(src.skeleton(), tgt.skeleton());

        let pre = precompute(&src, &tgt, &mapping, RetargetOptions::default()).unwrap();
        assert_eq!(pre.pairs().len(), 3);
        for (l, r) in pre.left().iter().zip(pre.right()) {
            assert!(quat_approx_eq(*l, Quat::IDENTITY, 1e-6));
            assert!(quat_approx_eq(*r, Quat::IDENTITY, 1e-6));
        }
        assert!((pre.proportion_ratio() - 1.0).abs() < 1e-6);
        assert!(pre.unmapped_targets().is_empty());
        assert!(pre.warnings().is_empty());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_proportion_ratio_of_doubled_skeleton() {
        let src = snapshot(chain_specs(["Root", "Spine", "Head"], 1.0), None);
        let tgt = snapshot(chain_specs(["Root", "Spine", "Head"], 2.0), None);
        let mapping = auto_map(src.skeleton(), tgt.skeleton());

        let pre = precompute(&src, &tgt, &mapping, RetargetOptions::default()).unwrap();
        assert!((pre.proportion_ratio() - 2.0).abs() < 1e-6);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_ratio_defaults_to_one_without_lengths() {
        let src = snapshot(vec![BoneSpec::new("Hips", None, Transform::IDENTITY)], None);
        let tgt = snapshot(vec![BoneSpec::new("Hips", None, Transform::IDENTITY)], None);
        let mapping = auto_map(src.skeleton(), tgt.skeleton());
        let pre = precompute(&src, &tgt, &mapping, RetargetOptions::default()).unwrap();
        assert_eq!(pre.proportion_ratio(), 1.0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_missing_bones_are_warnings() {
        let src = snapshot(chain_specs(["Root", "Spine", "Head"], 1.0), None);
        let tgt = snapshot(chain_specs(["Root", "Spine", "Head"], 1.0), None);
        let mut mapping = BoneMapping::new();
        mapping.add_manual("Root", "Root");
        mapping.add_manual("Spine", "Chest");
        mapping.add_manual("Tail", "Head");

        let pre = precompute(&src, &tgt, &mapping, RetargetOptions::default()).unwrap();
        assert_eq!(pre.pairs().len(), 1);
        assert_eq!(pre.warnings().len(), 2);
        assert!(pre.warnings().contains(&RetargetWarning::MissingTargetBone {
            source: "Spine".to_string(),
            target: "Chest".to_string(),
        }));
        assert_eq!(pre.unmapped_targets(), &[BoneId(1), BoneId(2)]);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_rotated_rest_gives_conjugating_quaternions() {
        // Target spine rests rotated 90 degrees about Z.
        let src = snapshot(chain_specs(["Root", "Spine", "Head"], 1.0), None);
        let mut tgt_specs = chain_specs(["Root", "Spine", "Head"], 1.0);
        tgt_specs[1].local_rest.rotation = Quat::from_rotation_z(FRAC_PI_2);
        let tgt = snapshot(tgt_specs, None);
        let mapping = auto_map(src.skeleton(), tgt.skeleton());

        let pre = precompute(&src, &tgt, &mapping, RetargetOptions::default()).unwrap();
        let spine = pre.pair_by_source["Spine"];
        assert!(quat_approx_eq(pre.left()[spine], Quat::IDENTITY, 1e-6));
        assert!(quat_approx_eq(
            pre.right()[spine],
            Quat::from_rotation_z(FRAC_PI_2),
            1e-6
        ));

        // Head's parent frames differ by the spine rest rotation.
        let head = pre.pair_by_source["Head"];
        assert!(quat_approx_eq(
            pre.left()[head],
            Quat::from_rotation_z(-FRAC_PI_2),
            1e-6
        ));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_embed_option_recaptures_snapshots() {
        let container = Transform::from_rotation(Quat::from_rotation_y(FRAC_PI_2));
        let src = snapshot(chain_specs(["Hips", "Spine", "Head"], 1.0), Some(container));
        let tgt = snapshot(chain_specs(["Hips", "Spine", "Head"], 1.0), None);
        let mapping = auto_map(src.skeleton(), tgt.skeleton());
        assert!(!src.is_embedded());

        let options = RetargetOptions {
            embed_world: true,
            ..RetargetOptions::default()
        };
        let pre = precompute(&src, &tgt, &mapping, options).unwrap();
        assert!(pre.source().is_embedded());
        assert!(!pre.target().is_embedded());
        let hips = pre.pair_by_source["Hips"];
        assert!(quat_approx_eq(
            pre.left()[hips],
            Quat::from_rotation_y(FRAC_PI_2),
            1e-6
        ));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_rest_pose_clip_covers_every_bone() {
        let src = snapshot(chain_specs(["Root", "Spine", "Head"], 1.0), None);
        let tgt = snapshot(chain_specs(["Hips", "Spine", "Head"], 1.0), None);
        let pre = precompute(&src, &tgt, &BoneMapping::new(), RetargetOptions::default()).unwrap();

        let clip = pre.rest_pose_clip("rest");
        assert_eq!(clip.tracks.len(), 4);
        assert_eq!(clip.tracks[1].property_path(), "Hips.position");
        assert!(clip.validate().is_ok());
    }
}
