use crate::math::Transform;

use super::BoneId;

/// Dirty flags for lazy forward kinematics.
/// Bit i corresponds to the bone with index i.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyFlags {
    words: Vec<u64>,
    len: usize,
}

impl DirtyFlags {
    /// Create with all bones marked dirty
    pub fn all_dirty(len: usize) -> Self {
        let mut flags = Self::cleared(len);
        flags.mark_all();
        flags
    }

    /// Create with no bone marked dirty
    pub fn cleared(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    #[inline]
    pub fn is_dirty(&self, bone: BoneId) -> bool {
        let i = bone.index();
        (self.words[i / 64] >> (i % 64)) & 1 != 0
    }

    #[inline]
    pub fn is_any_dirty(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// Mark a bone and all of its descendants dirty.
    ///
    /// Parents precede children in `parent_index`, so a single forward scan
    /// reaches every descendant.
    pub fn mark_dirty(&mut self, bone: BoneId, parent_index: &[i32]) {
        self.set(bone.index());
        for i in bone.index() + 1..self.len {
            let parent = parent_index[i];
            if parent >= 0 && self.is_dirty(BoneId::from_index(parent as usize)) {
                self.set(i);
            }
        }
    }

    pub fn mark_all(&mut self) {
        for i in 0..self.len {
            self.set(i);
        }
    }

    #[inline]
    pub fn clear(&mut self, bone: BoneId) {
        let i = bone.index();
        self.words[i / 64] &= !(1 << (i % 64));
    }

    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    #[inline]
    fn set(&mut self, i: usize) {
        self.words[i / 64] |= 1 << (i % 64);
    }
}

/// Cache for forward kinematics results
#[derive(Debug, Clone)]
pub struct PoseCache {
    /// Lazily computed world transforms
    pub world: Vec<Transform>,
    pub dirty: DirtyFlags,
}

impl PoseCache {
    pub fn new(len: usize) -> Self {
        Self {
            world: vec![Transform::IDENTITY; len],
            dirty: DirtyFlags::all_dirty(len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_dirty_reaches_descendants_only() {
        // 0 -> 1 -> 2, 0 -> 3
        let parents = [-1, 0, 1, 0];
        let mut flags = DirtyFlags::cleared(4);
        assert!(!flags.is_any_dirty());

        flags.mark_dirty(BoneId(1), &parents);
        assert!(!flags.is_dirty(BoneId(0)));
        assert!(flags.is_dirty(BoneId(1)));
        assert!(flags.is_dirty(BoneId(2)));
        assert!(!flags.is_dirty(BoneId(3)));

        flags.clear_all();
        assert!(!flags.is_any_dirty());
    }

    #[test]
    fn test_flags_span_multiple_words() {
        let len = 130;
        let parents: Vec<i32> = (0..len as i32).map(|i| i - 1).collect();
        let mut flags = DirtyFlags::cleared(len);
        flags.mark_dirty(BoneId(100), &parents);
        assert!(!flags.is_dirty(BoneId(99)));
        assert!(flags.is_dirty(BoneId(129)));

        flags.clear(BoneId(129));
        assert!(!flags.is_dirty(BoneId(129)));
        assert!(DirtyFlags::all_dirty(len).is_dirty(BoneId(64)));
    }
}
