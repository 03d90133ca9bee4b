use std::sync::Arc;

use glam::Vec3;

use super::{BoneId, Skeleton};
use crate::error::RetargetError;
use crate::math::{Transform, EPSILON};

/// World-space rest transforms of a skeleton, captured once before
/// retargeting.
#[derive(Debug, Clone)]
pub struct BindPoseSnapshot {
    skeleton: Arc<Skeleton>,
    world_rest: Vec<Transform>,
    world_rest_inverse: Vec<Transform>,
    embedded: bool,
}

impl BindPoseSnapshot {
    /// Walk the bones parent-first and cache world rest transforms with
    /// their inverses. Roots sit in the skeleton's scene frame; with
    /// `embed_world` the embedded container is folded in as well.
    pub fn capture(skeleton: Arc<Skeleton>, embed_world: bool) -> Result<Self, RetargetError> {
        let embedded = embed_world && skeleton.embedded_world().is_some();

        let mut world_rest: Vec<Transform> = Vec::with_capacity(skeleton.len());
        let mut world_rest_inverse = Vec::with_capacity(skeleton.len());

        for bone in skeleton.bones() {
            let world = match bone.parent {
                Some(parent) => world_rest[parent.index()].compose(&bone.local_rest),
                None => skeleton.root_world(&bone.local_rest, embedded),
            };

            if world.scale.abs().min_element() < EPSILON || !world.is_finite() {
                return Err(RetargetError::DegenerateBind {
                    bone_name: bone.name.clone(),
                });
            }
            let inverse = world.inverse().map_err(|_| RetargetError::DegenerateBind {
                bone_name: bone.name.clone(),
            })?;

            world_rest.push(world);
            world_rest_inverse.push(inverse);
        }

        Ok(Self {
            skeleton,
            world_rest,
            world_rest_inverse,
            embedded,
        })
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    /// Whether an embedded world transform was folded into the roots.
    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn len(&self) -> usize {
        self.world_rest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.world_rest.is_empty()
    }

    pub fn local_rest(&self, id: BoneId) -> &Transform {
        &self.skeleton.bone(id).local_rest
    }

    pub fn world_rest(&self, id: BoneId) -> &Transform {
        &self.world_rest[id.index()]
    }

    pub fn world_rest_inverse(&self, id: BoneId) -> &Transform {
        &self.world_rest_inverse[id.index()]
    }

    /// World transform of the space a bone's local rest lives in: the parent
    /// bone's world rest, or the skeleton's root frame for roots.
    pub fn parent_frame(&self, id: BoneId) -> Transform {
        match self.skeleton.parent(id) {
            Some(parent) => self.world_rest[parent.index()],
            None => self.skeleton.root_frame(self.embedded),
        }
    }

    pub fn world_position(&self, id: BoneId) -> Vec3 {
        self.world_rest[id.index()].translation
    }

    /// Distance to the parent bone's bind position; `None` for roots.
    pub fn bone_length(&self, id: BoneId) -> Option<f32> {
        self.skeleton
            .parent(id)
            .map(|parent| self.world_position(id).distance(self.world_position(parent)))
    }
}

/// Capture the bind pose of a shared skeleton.
pub fn capture_bind(
    skeleton: &Arc<Skeleton>,
    embed_world: bool,
) -> Result<BindPoseSnapshot, RetargetError> {
    BindPoseSnapshot::capture(Arc::clone(skeleton), embed_world)
}
