//! Heuristic bone matching and mapping reports.

use indexmap::IndexMap;
use serde::Serialize;

use super::names::{
    body_part, canonical_name, levenshtein, side_of, strip_prefix, synonym_groups, Side,
};
use super::{BoneMapping, MappingOrigin};
use crate::skeleton::{Bone, Skeleton};

/// Match percentage at or above which a pair of skeletons is reported compatible
pub const COMPATIBILITY_THRESHOLD: f32 = 50.0;

/// Largest edit distance accepted by the fuzzy stage
const MAX_EDIT_DISTANCE: usize = 2;

/// Canonical names this short are too ambiguous for fuzzy matching
const MIN_FUZZY_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedBone {
    pub source: String,
    pub target: String,
    pub origin: MappingOrigin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoMapReport {
    pub successes: Vec<MappedBone>,
    /// Source bones left without a target
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingInfo {
    pub mapped: Vec<MappedBone>,
    pub unmapped_source: Vec<String>,
    pub unmapped_target: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityReport {
    /// Mapped source bones over all source bones, in percent
    pub match_percentage: f32,
    pub matching: Vec<String>,
    /// Source bones with no usable mapping
    pub missing: Vec<String>,
    /// Target bones nothing maps onto
    pub extra: Vec<String>,
    pub compatible: bool,
    pub source_duplicates: IndexMap<String, usize>,
    pub target_duplicates: IndexMap<String, usize>,
}

/// Precomputed name forms of one bone.
struct Candidate<'a> {
    name: &'a str,
    lower: String,
    stripped: String,
    canonical: String,
    side: Option<Side>,
    groups: Vec<usize>,
}

impl<'a> Candidate<'a> {
    fn new(bone: &'a Bone) -> Self {
        let name = bone.name.as_str();
        Self {
            name,
            lower: name.to_lowercase(),
            stripped: strip_prefix(name).to_lowercase(),
            canonical: canonical_name(name),
            side: side_of(name),
            groups: synonym_groups(&body_part(name)),
        }
    }
}

/// Bones whose name resolves to themselves, i.e. first occurrences.
fn unique_bones(skeleton: &Skeleton) -> impl Iterator<Item = &Bone> + '_ {
    skeleton
        .bones()
        .iter()
        .filter(move |b| skeleton.find_bone(&b.name) == Some(b.id))
}

/// One matching stage: each unassigned source takes the first unclaimed
/// target, in target order, that satisfies `matches`.
fn run_stage(
    sources: &[Candidate],
    targets: &[Candidate],
    assigned: &mut [Option<usize>],
    claimed: &mut [bool],
    matches: impl Fn(&Candidate, &Candidate) -> bool,
) {
    for (si, source) in sources.iter().enumerate() {
        if assigned[si].is_some() {
            continue;
        }
        let hit = targets
            .iter()
            .enumerate()
            .find(|(ti, target)| !claimed[*ti] && matches(source, *target));
        if let Some((ti, _)) = hit {
            assigned[si] = Some(ti);
            claimed[ti] = true;
        }
    }
}

/// Fuzzy stage: closest unclaimed target on the same side, first one on ties.
fn run_fuzzy_stage(
    sources: &[Candidate],
    targets: &[Candidate],
    assigned: &mut [Option<usize>],
    claimed: &mut [bool],
) {
    for (si, source) in sources.iter().enumerate() {
        if assigned[si].is_some() || source.canonical.len() < MIN_FUZZY_LEN {
            continue;
        }
        let best = targets
            .iter()
            .enumerate()
            .filter(|(ti, target)| {
                !claimed[*ti]
                    && target.side == source.side
                    && target.canonical.len() >= MIN_FUZZY_LEN
            })
            .map(|(ti, target)| (levenshtein(&source.canonical, &target.canonical), ti))
            .filter(|(distance, _)| *distance <= MAX_EDIT_DISTANCE)
            .min();
        if let Some((_, ti)) = best {
            assigned[si] = Some(ti);
            claimed[ti] = true;
        }
    }
}

impl BoneMapping {
    /// Replace all automatic entries with fresh heuristic matches.
    ///
    /// Stages run in order over all source bones, so a strong match anywhere
    /// wins over a weak one: exact name, prefix-stripped name, canonical
    /// form, synonyms (primary meaning, then secondary), edit distance.
    /// Manual entries and the targets they hold are left alone.
    pub fn auto_map(&mut self, source: &Skeleton, target: &Skeleton) -> AutoMapReport {
        self.clear_auto();

        let sources: Vec<Candidate> = unique_bones(source)
            .filter(|b| self.entry(&b.name).is_none())
            .map(Candidate::new)
            .collect();
        let targets: Vec<Candidate> = unique_bones(target).map(Candidate::new).collect();

        let mut claimed: Vec<bool> = targets
            .iter()
            .map(|t| self.source_for_target(t.name).is_some())
            .collect();
        let mut assigned = vec![None; sources.len()];

        run_stage(&sources, &targets, &mut assigned, &mut claimed, |s, t| {
            s.lower == t.lower
        });
        run_stage(&sources, &targets, &mut assigned, &mut claimed, |s, t| {
            s.stripped == t.stripped
        });
        run_stage(&sources, &targets, &mut assigned, &mut claimed, |s, t| {
            !s.canonical.is_empty() && s.canonical == t.canonical
        });
        for meaning in 0..2 {
            run_stage(&sources, &targets, &mut assigned, &mut claimed, |s, t| {
                s.side == t.side
                    && s.groups.get(meaning).is_some()
                    && s.groups.get(meaning) == t.groups.first()
            });
        }
        run_fuzzy_stage(&sources, &targets, &mut assigned, &mut claimed);

        let mut report = AutoMapReport::default();
        for (source_bone, hit) in sources.iter().zip(&assigned) {
            match hit {
                Some(ti) => {
                    let target_name = targets[*ti].name;
                    if self.insert_auto(source_bone.name, target_name) {
                        report.successes.push(MappedBone {
                            source: source_bone.name.to_string(),
                            target: target_name.to_string(),
                            origin: MappingOrigin::Auto,
                        });
                    } else {
                        report.failures.push(source_bone.name.to_string());
                    }
                }
                None => report.failures.push(source_bone.name.to_string()),
            }
        }
        self.sort_by_source(source);

        log::debug!(
            "auto-mapped {} of {} source bones",
            report.successes.len(),
            sources.len()
        );
        report
    }

    /// Mapped pairs plus the bones left out on either side.
    pub fn mapping_info(&self, source: &Skeleton, target: &Skeleton) -> MappingInfo {
        let mapped = self
            .iter()
            .map(|(src, entry)| MappedBone {
                source: src.to_string(),
                target: entry.target.clone(),
                origin: entry.origin,
            })
            .collect();
        let unmapped_source = unique_bones(source)
            .filter(|b| self.get(&b.name).is_none())
            .map(|b| b.name.clone())
            .collect();
        let unmapped_target = unique_bones(target)
            .filter(|b| self.source_for_target(&b.name).is_none())
            .map(|b| b.name.clone())
            .collect();

        MappingInfo {
            mapped,
            unmapped_source,
            unmapped_target,
        }
    }
}

/// Fresh automatic mapping between two skeletons.
pub fn auto_map(source: &Skeleton, target: &Skeleton) -> BoneMapping {
    let mut mapping = BoneMapping::new();
    mapping.auto_map(source, target);
    mapping
}

/// How much of the source skeleton a mapping carries over to the target.
pub fn compatibility(
    source: &Skeleton,
    target: &Skeleton,
    mapping: &BoneMapping,
) -> CompatibilityReport {
    let mut matching = Vec::new();
    let mut missing = Vec::new();
    let mut used_targets = Vec::new();

    for bone in unique_bones(source) {
        match mapping.get(&bone.name) {
            Some(tgt) if target.find_bone(tgt).is_some() => {
                matching.push(bone.name.clone());
                used_targets.push(tgt);
            }
            _ => missing.push(bone.name.clone()),
        }
    }

    let extra = unique_bones(target)
        .filter(|b| !used_targets.contains(&b.name.as_str()))
        .map(|b| b.name.clone())
        .collect();

    let total = matching.len() + missing.len();
    let match_percentage = if total == 0 {
        0.0
    } else {
        matching.len() as f32 / total as f32 * 100.0
    };

    CompatibilityReport {
        compatible: !matching.is_empty() && match_percentage >= COMPATIBILITY_THRESHOLD,
        match_percentage,
        matching,
        missing,
        extra,
        source_duplicates: source.duplicates().clone(),
        target_duplicates: target.duplicates().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;
    use crate::math::Transform;
    use crate::skeleton::BoneSpec;

    /// First bone is the parent of all others.
    fn flat(names: &[&str]) -> Skeleton {
        let specs = names
            .iter()
            .enumerate()
            .map(|(i, name)| BoneSpec::new(*name, (i > 0).then_some(0), Transform::IDENTITY))
            .collect();
        Skeleton::new(specs, None).unwrap()
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_prefixed_names() {
        let source = flat(&["Hips", "Spine", "Head"]);
        let target = flat(&["mixamorig:Hips", "mixamorig:Spine", "mixamorig:Head"]);

        let mapping = auto_map(&source, &target);
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.get("Hips"), Some("mixamorig:Hips"));
        assert_eq!(mapping.get("Spine"), Some("mixamorig:Spine"));
        assert_eq!(mapping.get("Head"), Some("mixamorig:Head"));
        assert!(mapping.iter().all(|(_, e)| e.origin == MappingOrigin::Auto));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_engine_rig_onto_mixamo() {
        let source = flat(&[
            "pelvis",
            "spine_01",
            "clavicle_l",
            "upperarm_l",
            "lowerarm_l",
            "hand_l",
            "thigh_r",
            "calf_r",
            "foot_r",
        ]);
        let target = flat(&[
            "mixamorig:Hips",
            "mixamorig:Spine",
            "mixamorig:LeftShoulder",
            "mixamorig:LeftArm",
            "mixamorig:LeftForeArm",
            "mixamorig:LeftHand",
            "mixamorig:RightUpLeg",
            "mixamorig:RightLeg",
            "mixamorig:RightFoot",
        ]);

        let mut mapping = BoneMapping::new();
        let report = mapping.auto_map(&source, &target);
        assert!(report.failures.is_empty(), "unmatched: {:?}", report.failures);

        let expected = [
            ("pelvis", "mixamorig:Hips"),
            ("spine_01", "mixamorig:Spine"),
            ("clavicle_l", "mixamorig:LeftShoulder"),
            ("upperarm_l", "mixamorig:LeftArm"),
            ("lowerarm_l", "mixamorig:LeftForeArm"),
            ("hand_l", "mixamorig:LeftHand"),
            ("thigh_r", "mixamorig:RightUpLeg"),
            ("calf_r", "mixamorig:RightLeg"),
            ("foot_r", "mixamorig:RightFoot"),
        ];
        for (src, tgt) in expected {
            assert_eq!(mapping.get(src), Some(tgt), "mapping for {}", src);
        }
        assert!(mapping.check_injective().is_ok());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_sides_never_cross() {
        let source = flat(&["Hips", "LeftHand"]);
        let target = flat(&["Hips", "RightHand"]);
        let mapping = auto_map(&source, &target);
        assert_eq!(mapping.get("LeftHand"), None);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_manual_entries_survive_auto_map() {
        let source = flat(&["Hips", "Spine", "Tail"]);
        let target = flat(&["Hips", "Spine"]);

        let mut mapping = BoneMapping::new();
        assert!(mapping.add_manual("Spine", "Hips"));
        let report = mapping.auto_map(&source, &target);

        assert_eq!(mapping.entry("Spine").map(|e| e.origin), Some(MappingOrigin::Manual));
        assert_eq!(mapping.get("Spine"), Some("Hips"));
        assert_eq!(mapping.get("Hips"), None);
        assert!(report.failures.contains(&"Hips".to_string()));
        assert!(report.failures.contains(&"Tail".to_string()));

        // Entries follow the source skeleton order.
        let order: Vec<_> = mapping.iter().map(|(s, _)| s).collect();
        assert_eq!(order, ["Spine"]);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_mapping_info_and_compatibility() {
        let source = flat(&["Hips", "Spine", "Tail"]);
        let target = flat(&["Hips", "Spine", "Head"]);
        let mapping = auto_map(&source, &target);

        let info = mapping.mapping_info(&source, &target);
        assert_eq!(info.mapped.len(), 2);
        assert_eq!(info.unmapped_source, ["Tail"]);
        assert_eq!(info.unmapped_target, ["Head"]);

        let report = compatibility(&source, &target, &mapping);
        assert!((report.match_percentage - 200.0 / 3.0).abs() < 1e-3);
        assert_eq!(report.matching, ["Hips", "Spine"]);
        assert_eq!(report.missing, ["Tail"]);
        assert_eq!(report.extra, ["Head"]);
        assert!(report.compatible);

        let empty = compatibility(&source, &target, &BoneMapping::new());
        assert!(!empty.compatible);
        assert_eq!(empty.match_percentage, 0.0);
    }
}
