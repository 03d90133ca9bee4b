use indexmap::IndexMap;
use serde::Serialize;

use super::Skeleton;
use crate::mapping::names::{side_of, Side};

/// Structural summary of a skeleton.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkeletonAnalysis {
    pub bone_count: usize,
    pub root_bones: Vec<String>,
    pub functional_root: String,
    pub max_depth: usize,
    /// Both left and right tagged bones are present
    pub has_symmetry: bool,
    /// Side-tagged bones whose parent is not on the same side
    pub limb_count: usize,
    pub duplicate_names: IndexMap<String, usize>,
}

pub fn analyze(skeleton: &Skeleton) -> SkeletonAnalysis {
    let sides: Vec<Option<Side>> = skeleton.bones().iter().map(|b| side_of(&b.name)).collect();

    let has_left = sides.contains(&Some(Side::Left));
    let has_right = sides.contains(&Some(Side::Right));

    let limb_count = skeleton
        .bones()
        .iter()
        .filter(|bone| {
            let side = sides[bone.id.index()];
            side.is_some() && bone.parent.map(|p| sides[p.index()]) != Some(side)
        })
        .count();

    // Parents precede children, so one forward pass fills depths.
    let mut depths = vec![0usize; skeleton.len()];
    for bone in skeleton.bones() {
        depths[bone.id.index()] = bone.parent.map_or(1, |p| depths[p.index()] + 1);
    }

    SkeletonAnalysis {
        bone_count: skeleton.len(),
        root_bones: skeleton.topological_roots().map(|b| b.name.clone()).collect(),
        functional_root: skeleton.root_bone().name.clone(),
        max_depth: depths.iter().copied().max().unwrap_or(0),
        has_symmetry: has_left && has_right,
        limb_count,
        duplicate_names: skeleton.duplicates().clone(),
    }
}
