//! Bone tree stored as a contiguous, parent-sorted array.

pub mod analysis;
pub mod bind;
mod cache;
pub mod pose;

use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RetargetError;
use crate::math::Transform;
use crate::scene::{NodeKind, Scene};

pub use analysis::{analyze, SkeletonAnalysis};
pub use bind::{capture_bind, BindPoseSnapshot};
pub use pose::Pose;

static ROOT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*(hips?|pelvis|root).*$").expect("root pattern is valid"));

/// Index of a bone inside its [`Skeleton`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoneId(pub u32);

impl BoneId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub id: BoneId,
    pub name: String,
    pub parent: Option<BoneId>,
    pub local_rest: Transform,
}

/// Loader-side description of a bone. `parent` indexes the input slice,
/// which need not be topologically sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneSpec {
    pub name: String,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub local_rest: Transform,
}

impl BoneSpec {
    pub fn new(name: impl Into<String>, parent: Option<usize>, local_rest: Transform) -> Self {
        Self {
            name: name.into(),
            parent,
            local_rest,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    bones: Vec<Bone>,
    parent_index: Vec<i32>,
    name_index: HashMap<String, BoneId>,
    duplicates: IndexMap<String, usize>,
    root_id: BoneId,
    scene_frame: Option<Transform>,
    embedded_world: Option<Transform>,
}

impl Skeleton {
    /// Build a skeleton from bone specs in any order.
    ///
    /// Bones are re-ordered depth-first from each root, children in input
    /// order, so every parent precedes its children.
    pub fn new(
        specs: Vec<BoneSpec>,
        embedded_world: Option<Transform>,
    ) -> Result<Self, RetargetError> {
        if let Some(embedded) = &embedded_world {
            if !embedded.is_finite() {
                return Err(RetargetError::invalid("embedded world transform is not finite"));
            }
        }
        for spec in &specs {
            if !spec.local_rest.is_finite() {
                return Err(RetargetError::invalid(format!(
                    "bone `{}` has a non-finite rest transform",
                    spec.name
                )));
            }
        }

        let order = topological_order(&specs)?;

        let mut new_index = vec![0usize; specs.len()];
        for (new, &old) in order.iter().enumerate() {
            new_index[old] = new;
        }

        let mut bones = Vec::with_capacity(specs.len());
        let mut parent_index = Vec::with_capacity(specs.len());
        let mut name_index = HashMap::with_capacity(specs.len());
        let mut counts: IndexMap<String, usize> = IndexMap::new();

        for (new, &old) in order.iter().enumerate() {
            let spec = &specs[old];
            let parent = spec.parent.map(|p| BoneId::from_index(new_index[p]));
            let id = BoneId::from_index(new);

            name_index.entry(spec.name.clone()).or_insert(id);
            *counts.entry(spec.name.clone()).or_insert(0) += 1;

            parent_index.push(parent.map_or(-1, |p| p.index() as i32));
            bones.push(Bone {
                id,
                name: spec.name.clone(),
                parent,
                local_rest: spec.local_rest,
            });
        }

        counts.retain(|_, count| *count > 1);

        let root_id = detect_root(&bones)
            .ok_or_else(|| RetargetError::invalid("skeleton has no bones"))?;

        Ok(Self {
            bones,
            parent_index,
            name_index,
            duplicates: counts,
            root_id,
            scene_frame: None,
            embedded_world,
        })
    }

    /// Place the skeleton under a scene root transform. Unlike
    /// `embedded_world`, it always applies to the roots.
    pub fn with_scene_frame(mut self, frame: Transform) -> Result<Self, RetargetError> {
        if !frame.is_finite() {
            return Err(RetargetError::invalid("scene frame is not finite"));
        }
        self.scene_frame = if frame.approx_eq(&Transform::IDENTITY, 1e-6) {
            None
        } else {
            Some(frame)
        };
        Ok(self)
    }

    /// Collect the bones of a scene into a skeleton.
    ///
    /// Non-bone nodes between two bones are folded into the child's local rest.
    /// The scene root, which carries the canonical conversion, becomes the
    /// scene frame. The nodes between it and each topological root form that
    /// root's container. The container of the functional root's tree is kept
    /// as `embedded_world`; other root trees are re-expressed relative to it.
    pub fn extract_from_scene(scene: &Scene) -> Result<Self, RetargetError> {
        scene.validate()?;
        let nodes = scene.nodes();

        let mut slot_of_node: Vec<Option<usize>> = vec![None; nodes.len()];
        let mut specs = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            if node.kind == NodeKind::Bone {
                slot_of_node[i] = Some(specs.len());
                specs.push(BoneSpec::new(node.name.clone(), None, node.transform));
            }
        }
        if specs.is_empty() {
            return Err(RetargetError::invalid(format!(
                "scene `{}` contains no bones",
                scene.name
            )));
        }

        let mut containers: Vec<Option<Transform>> = vec![None; specs.len()];
        for (i, node) in nodes.iter().enumerate() {
            let Some(slot) = slot_of_node[i] else {
                continue;
            };

            let mut chain = Transform::IDENTITY;
            let mut parent_bone = None;
            let mut cursor = node.parent;
            while let Some(p) = cursor {
                if let Some(parent_slot) = slot_of_node[p] {
                    parent_bone = Some(parent_slot);
                    break;
                }
                chain = nodes[p].transform.compose(&chain);
                cursor = nodes[p].parent;
            }

            match parent_bone {
                Some(parent_slot) => {
                    specs[slot].parent = Some(parent_slot);
                    specs[slot].local_rest = chain.compose(&node.transform);
                }
                None => containers[slot] = Some(chain),
            }
        }

        let order = topological_order(&specs)?;
        let functional = order
            .iter()
            .copied()
            .find(|&i| is_root_name(&specs[i].name))
            .unwrap_or(order[0]);
        let mut top = functional;
        while let Some(parent) = specs[top].parent {
            top = parent;
        }
        let embedded = containers[top].unwrap_or(Transform::IDENTITY);
        let embedded_inverse = embedded.inverse().map_err(|_| RetargetError::DegenerateBind {
            bone_name: specs[top].name.clone(),
        })?;

        for (slot, container) in containers.iter().enumerate() {
            if let Some(container) = container {
                if slot != top {
                    let relative = embedded_inverse.compose(container);
                    specs[slot].local_rest = relative.compose(&specs[slot].local_rest);
                }
            }
        }

        let embedded_world = if embedded.approx_eq(&Transform::IDENTITY, 1e-6) {
            None
        } else {
            Some(embedded)
        };

        let skeleton = Self::new(specs, embedded_world)?.with_scene_frame(scene.root)?;
        log::debug!(
            "extracted {} bones from `{}` (root `{}`, embedded: {})",
            skeleton.len(),
            scene.name,
            skeleton.root_bone().name,
            skeleton.embedded_world.is_some()
        );
        Ok(skeleton)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, id: BoneId) -> &Bone {
        &self.bones[id.index()]
    }

    pub fn ids(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.bones.iter().map(|b| b.id)
    }

    /// `-1` for roots, otherwise an index smaller than the bone's own.
    pub fn parent_index(&self) -> &[i32] {
        &self.parent_index
    }

    pub fn parent(&self, id: BoneId) -> Option<BoneId> {
        self.bones[id.index()].parent
    }

    /// First bone carrying `name`
    pub fn find_bone(&self, name: &str) -> Option<BoneId> {
        self.name_index.get(name).copied()
    }

    pub fn bone_name(&self, id: BoneId) -> &str {
        &self.bones[id.index()].name
    }

    /// Names that occur more than once, with their counts.
    pub fn duplicates(&self) -> &IndexMap<String, usize> {
        &self.duplicates
    }

    /// The functional root: the locomotion bone.
    pub fn root_id(&self) -> BoneId {
        self.root_id
    }

    pub fn root_bone(&self) -> &Bone {
        &self.bones[self.root_id.index()]
    }

    pub fn embedded_world(&self) -> Option<&Transform> {
        self.embedded_world.as_ref()
    }

    pub fn scene_frame(&self) -> Option<&Transform> {
        self.scene_frame.as_ref()
    }

    /// Frame the roots' local rests live in: the scene frame, followed by
    /// the embedded container when `embed_world` is set.
    pub fn root_frame(&self, embed_world: bool) -> Transform {
        let container = self.embedded_world.filter(|_| embed_world);
        match (self.scene_frame, container) {
            (Some(scene), Some(container)) => scene.compose(&container),
            (Some(scene), None) => scene,
            (None, Some(container)) => container,
            (None, None) => Transform::IDENTITY,
        }
    }

    /// World transform of a root bone with local transform `local`.
    pub fn root_world(&self, local: &Transform, embed_world: bool) -> Transform {
        let container = self.embedded_world.filter(|_| embed_world);
        match (self.scene_frame, container) {
            (Some(scene), Some(container)) => scene.compose(&container.compose(local)),
            (Some(frame), None) | (None, Some(frame)) => frame.compose(local),
            (None, None) => *local,
        }
    }

    /// Bones without a parent bone.
    pub fn topological_roots(&self) -> impl Iterator<Item = &Bone> + '_ {
        self.bones.iter().filter(|b| b.parent.is_none())
    }

    pub fn children(&self, id: BoneId) -> impl Iterator<Item = &Bone> + '_ {
        self.bones.iter().filter(move |b| b.parent == Some(id))
    }

    /// Number of bones on the path from a topological root, 1 for roots.
    pub fn depth(&self, id: BoneId) -> usize {
        let mut depth = 1;
        let mut cursor = self.parent(id);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.parent(parent);
        }
        depth
    }

    /// Rest transforms composed from the topological roots, without any
    /// container.
    pub fn model_rest_transforms(&self) -> Vec<Transform> {
        let mut world: Vec<Transform> = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let t = match bone.parent {
                Some(parent) => world[parent.index()].compose(&bone.local_rest),
                None => bone.local_rest,
            };
            world.push(t);
        }
        world
    }
}

fn is_root_name(name: &str) -> bool {
    ROOT_NAME.is_match(&name.to_lowercase())
}

/// Functional root: first bone whose lowercased name mentions hips, pelvis or
/// root, else the first bone without a parent.
pub fn detect_root(bones: &[Bone]) -> Option<BoneId> {
    bones
        .iter()
        .find(|b| is_root_name(&b.name))
        .or_else(|| bones.iter().find(|b| b.parent.is_none()))
        .map(|b| b.id)
}

/// Build the skeleton of a loaded scene.
pub fn build_skeleton(scene: &Scene) -> Result<Skeleton, RetargetError> {
    Skeleton::extract_from_scene(scene)
}

/// Depth-first preorder over the spec forest, children in input order.
fn topological_order(specs: &[BoneSpec]) -> Result<Vec<usize>, RetargetError> {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];
    let mut roots = Vec::new();

    for (i, spec) in specs.iter().enumerate() {
        match spec.parent {
            Some(p) if p >= specs.len() => {
                return Err(RetargetError::invalid(format!(
                    "bone `{}` has parent index {} out of range",
                    spec.name, p
                )));
            }
            Some(p) if p == i => {
                return Err(RetargetError::invalid(format!(
                    "bone `{}` is its own parent",
                    spec.name
                )));
            }
            Some(p) => children[p].push(i),
            None => roots.push(i),
        }
    }

    let mut order = Vec::with_capacity(specs.len());
    let mut stack: Vec<usize> = roots.into_iter().rev().collect();
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(children[i].iter().rev());
    }

    if order.len() != specs.len() {
        return Err(RetargetError::invalid("bone hierarchy contains a cycle"));
    }
    Ok(order)
}
