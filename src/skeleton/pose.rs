use std::cell::RefCell;

use glam::{Quat, Vec3};

use super::cache::PoseCache;
use super::{BoneId, Skeleton};
use crate::math::Transform;

/// Local transforms for every bone of a skeleton.
///
/// World transforms are computed via forward kinematics on demand and cached
/// behind a `RefCell`; setters mark the touched bone and its descendants
/// dirty.
#[derive(Debug, Clone)]
pub struct Pose<'a> {
    skeleton: &'a Skeleton,
    local: Vec<Transform>,
    embed_world: bool,
    cache: RefCell<PoseCache>,
}

impl<'a> Pose<'a> {
    /// Every bone at its local rest transform.
    pub fn bind_pose(skeleton: &'a Skeleton) -> Self {
        Self {
            skeleton,
            local: skeleton.bones().iter().map(|b| b.local_rest).collect(),
            embed_world: false,
            cache: RefCell::new(PoseCache::new(skeleton.len())),
        }
    }

    /// Put roots inside the skeleton's embedded world transform.
    pub fn with_embedded_world(mut self, embed: bool) -> Self {
        if self.embed_world != embed {
            self.embed_world = embed;
            self.cache.get_mut().dirty.mark_all();
        }
        self
    }

    pub fn skeleton(&self) -> &'a Skeleton {
        self.skeleton
    }

    pub fn local(&self, bone: BoneId) -> &Transform {
        &self.local[bone.index()]
    }

    pub fn set_local(&mut self, bone: BoneId, transform: Transform) {
        if self.local[bone.index()] != transform {
            self.local[bone.index()] = transform;
            self.mark_dirty(bone);
        }
    }

    pub fn set_rotation(&mut self, bone: BoneId, rotation: Quat) {
        if self.local[bone.index()].rotation != rotation {
            self.local[bone.index()].rotation = rotation;
            self.mark_dirty(bone);
        }
    }

    pub fn set_translation(&mut self, bone: BoneId, translation: Vec3) {
        if self.local[bone.index()].translation != translation {
            self.local[bone.index()].translation = translation;
            self.mark_dirty(bone);
        }
    }

    pub fn set_scale(&mut self, bone: BoneId, scale: Vec3) {
        if self.local[bone.index()].scale != scale {
            self.local[bone.index()].scale = scale;
            self.mark_dirty(bone);
        }
    }

    fn mark_dirty(&mut self, bone: BoneId) {
        let parent_index = self.skeleton.parent_index();
        self.cache.get_mut().dirty.mark_dirty(bone, parent_index);
    }

    /// World transform of a bone (computes FK if needed)
    pub fn world(&self, bone: BoneId) -> Transform {
        self.ensure_computed(bone);
        self.cache.borrow().world[bone.index()]
    }

    pub fn world_position(&self, bone: BoneId) -> Vec3 {
        self.world(bone).translation
    }

    fn ensure_computed(&self, bone: BoneId) {
        if !self.cache.borrow().dirty.is_dirty(bone) {
            return;
        }

        // Ancestors first; they're ordered topologically.
        let mut chain = vec![bone];
        let mut cursor = self.skeleton.parent(bone);
        while let Some(parent) = cursor {
            if !self.cache.borrow().dirty.is_dirty(parent) {
                break;
            }
            chain.push(parent);
            cursor = self.skeleton.parent(parent);
        }

        for id in chain.into_iter().rev() {
            self.compute_bone(id);
        }
    }

    fn compute_bone(&self, bone: BoneId) {
        let local = self.local[bone.index()];
        let mut cache = self.cache.borrow_mut();

        let world = match self.skeleton.parent(bone) {
            Some(parent) => cache.world[parent.index()].compose(&local),
            None => self.skeleton.root_world(&local, self.embed_world),
        };

        cache.world[bone.index()] = world;
        cache.dirty.clear(bone);
    }

    /// Force recomputation of all bones
    pub fn compute_all(&self) {
        for id in self.skeleton.ids() {
            self.compute_bone(id);
        }
        self.cache.borrow_mut().dirty.clear_all();
    }

    pub fn is_any_dirty(&self) -> bool {
        self.cache.borrow().dirty.is_any_dirty()
    }
}
