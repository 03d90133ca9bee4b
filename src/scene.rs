//! In-memory scene as handed over by an external model loader.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::animation::AnimationClip;
use crate::coords::CoordinateSystem;
use crate::error::RetargetError;
use crate::math::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Group,
    Mesh,
    Bone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    /// Index into [`Scene::nodes`]
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub transform: Transform,
}

impl SceneNode {
    pub fn new(
        name: impl Into<String>,
        kind: NodeKind,
        parent: Option<usize>,
        transform: Transform,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            parent,
            transform,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn largest_dimension(&self) -> f32 {
        self.size().max_element()
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this box after `transform`.
    pub fn transformed(&self, transform: &Transform) -> Aabb {
        let corners = self.corners();
        let mut out = Aabb::from_point(transform.transform_point(corners[0]));
        for corner in &corners[1..] {
            out.extend(transform.transform_point(*corner));
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneUserData {
    #[serde(
        rename = "coordinateSystem",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub coordinate_system: Option<CoordinateSystem>,
}

/// A loaded model: a node hierarchy under a root transform, plus its clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub name: String,
    #[serde(default)]
    pub root: Transform,
    #[serde(default)]
    nodes: Vec<SceneNode>,
    /// Mesh bounds reported by the loader, in the root's local space
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Aabb>,
    #[serde(default)]
    pub clips: Vec<AnimationClip>,
    #[serde(default)]
    pub user_data: SceneUserData,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: Transform::IDENTITY,
            nodes: Vec::new(),
            bounds: None,
            clips: Vec::new(),
            user_data: SceneUserData::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, RetargetError> {
        let scene: Scene = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn to_json_string(&self) -> Result<String, RetargetError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Append a node and return its index.
    pub fn add_node(&mut self, node: SceneNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        parent: Option<usize>,
        transform: Transform,
    ) -> usize {
        self.add_node(SceneNode::new(name, NodeKind::Bone, parent, transform))
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|c| c.name == name)
    }

    /// Check parent indices, cycles and finiteness.
    pub fn validate(&self) -> Result<(), RetargetError> {
        if !self.root.is_finite() {
            return Err(RetargetError::invalid(format!(
                "scene `{}` has a non-finite root transform",
                self.name
            )));
        }
        if let Some(node) = self.nodes.iter().find(|n| !n.transform.is_finite()) {
            return Err(RetargetError::invalid(format!(
                "node `{}` has a non-finite transform",
                node.name
            )));
        }
        self.topological_order().map(|_| ())
    }

    /// World transforms of all nodes, indexed like [`Scene::nodes`].
    pub fn world_transforms(&self) -> Result<Vec<Transform>, RetargetError> {
        self.validate()?;
        let mut world = vec![Transform::IDENTITY; self.nodes.len()];
        for i in self.topological_order()? {
            let node = &self.nodes[i];
            world[i] = match node.parent {
                Some(parent) => world[parent].compose(&node.transform),
                None => self.root.compose(&node.transform),
            };
        }
        Ok(world)
    }

    /// Indices of bone nodes with no bone ancestor.
    pub fn root_bones(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind == NodeKind::Bone)
            .filter(|(_, node)| {
                let mut cursor = node.parent;
                let mut steps = 0;
                while let Some(p) = cursor {
                    if self.nodes[p].kind == NodeKind::Bone || steps > self.nodes.len() {
                        return false;
                    }
                    cursor = self.nodes[p].parent;
                    steps += 1;
                }
                true
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// World-space bounds over node origins and loader bounds.
    pub fn world_bounds(&self) -> Result<Option<Aabb>, RetargetError> {
        let world = self.world_transforms()?;
        let mut bounds = self.bounds.map(|b| b.transformed(&self.root));
        for t in &world {
            match bounds.as_mut() {
                Some(b) => b.extend(t.translation),
                None => bounds = Some(Aabb::from_point(t.translation)),
            }
        }
        Ok(bounds)
    }

    fn topological_order(&self) -> Result<Vec<usize>, RetargetError> {
        let n = self.nodes.len();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut roots = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            match node.parent {
                Some(p) if p >= n || p == i => {
                    return Err(RetargetError::invalid(format!(
                        "node `{}` has invalid parent index {}",
                        node.name, p
                    )));
                }
                Some(p) => children[p].push(i),
                None => roots.push(i),
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut stack = roots;
        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend_from_slice(&children[i]);
        }
        if order.len() != n {
            return Err(RetargetError::invalid(format!(
                "scene `{}` node hierarchy contains a cycle",
                self.name
            )));
        }
        Ok(order)
    }
}
