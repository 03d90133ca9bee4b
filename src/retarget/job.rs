use std::sync::Arc;

use serde::Serialize;

use super::clip::{retarget_clip_named, RetargetOutput};
use super::precompute::{precompute, Precomputation};
use super::RetargetOptions;
use crate::animation::AnimationClip;
use crate::error::RetargetError;
use crate::mapping::{AutoMapReport, BoneMapping, MappingEntry};
use crate::skeleton::{BindPoseSnapshot, Skeleton};

/// Lifecycle of a retargeting job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    Idle,
    /// Both skeletons loaded
    Configured,
    /// Mapping established, possibly empty
    Mapped,
    Precomputed,
    /// At least one clip emitted from the current precomputation
    Emitting,
}

impl JobState {
    pub const fn name(self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Configured => "configured",
            JobState::Mapped => "mapped",
            JobState::Precomputed => "precomputed",
            JobState::Emitting => "emitting",
        }
    }
}

/// One source/target pairing with its mapping and cached precomputation.
///
/// Loading a model drops automatic mapping entries and the precomputation.
/// Editing the mapping or the options drops the precomputation.
#[derive(Debug, Clone)]
pub struct RetargetJob {
    state: JobState,
    options: RetargetOptions,
    source: Option<Arc<BindPoseSnapshot>>,
    target: Option<Arc<BindPoseSnapshot>>,
    mapping: BoneMapping,
    precomputation: Option<Precomputation>,
}

impl Default for RetargetJob {
    fn default() -> Self {
        Self::new(RetargetOptions::default())
    }
}

impl RetargetJob {
    pub fn new(options: RetargetOptions) -> Self {
        Self {
            state: JobState::Idle,
            options,
            source: None,
            target: None,
            mapping: BoneMapping::new(),
            precomputation: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn options(&self) -> &RetargetOptions {
        &self.options
    }

    pub fn mapping(&self) -> &BoneMapping {
        &self.mapping
    }

    pub fn source_skeleton(&self) -> Option<&Arc<Skeleton>> {
        self.source.as_ref().map(|s| s.skeleton())
    }

    pub fn target_skeleton(&self) -> Option<&Arc<Skeleton>> {
        self.target.as_ref().map(|s| s.skeleton())
    }

    pub fn precomputation(&self) -> Option<&Precomputation> {
        self.precomputation.as_ref()
    }

    pub fn load_source(&mut self, skeleton: Arc<Skeleton>) -> Result<(), RetargetError> {
        let snapshot = BindPoseSnapshot::capture(skeleton, self.options.embed_world)?;
        self.source = Some(Arc::new(snapshot));
        self.on_model_loaded();
        Ok(())
    }

    pub fn load_target(&mut self, skeleton: Arc<Skeleton>) -> Result<(), RetargetError> {
        let snapshot = BindPoseSnapshot::capture(skeleton, self.options.embed_world)?;
        self.target = Some(Arc::new(snapshot));
        self.on_model_loaded();
        Ok(())
    }

    fn on_model_loaded(&mut self) {
        self.mapping.clear_auto();
        self.precomputation = None;
        self.state = if self.source.is_some() && self.target.is_some() {
            JobState::Configured
        } else {
            JobState::Idle
        };
    }

    /// Replace the bind-pose strategy. A changed value drops the
    /// precomputation.
    pub fn set_options(&mut self, options: RetargetOptions) {
        if options == self.options {
            return;
        }
        self.options = options;
        self.invalidate_precomputation();
    }

    fn invalidate_precomputation(&mut self) {
        self.precomputation = None;
        if self.state > JobState::Mapped {
            self.state = JobState::Mapped;
        }
    }

    fn snapshots(
        &self,
        operation: &'static str,
    ) -> Result<(Arc<BindPoseSnapshot>, Arc<BindPoseSnapshot>), RetargetError> {
        match (&self.source, &self.target) {
            (Some(source), Some(target)) => Ok((Arc::clone(source), Arc::clone(target))),
            _ => Err(RetargetError::InvalidState {
                operation,
                state: self.state.name(),
            }),
        }
    }

    fn on_mapping_edited(&mut self) {
        self.precomputation = None;
        self.state = JobState::Mapped;
    }

    /// Recompute the automatic entries.
    pub fn auto_map(&mut self) -> Result<AutoMapReport, RetargetError> {
        let (source, target) = self.snapshots("auto-map")?;
        let report = self
            .mapping
            .auto_map(source.skeleton(), target.skeleton());
        self.on_mapping_edited();
        Ok(report)
    }

    /// Add a user override; both names must exist.
    pub fn add_manual(&mut self, source: &str, target: &str) -> Result<bool, RetargetError> {
        let (src, tgt) = self.snapshots("edit the mapping")?;
        if src.skeleton().find_bone(source).is_none() {
            return Err(RetargetError::UnknownBone(source.to_string()));
        }
        if tgt.skeleton().find_bone(target).is_none() {
            return Err(RetargetError::UnknownBone(target.to_string()));
        }
        let added = self.mapping.add_manual(source, target);
        if added {
            self.on_mapping_edited();
        }
        Ok(added)
    }

    pub fn remove_mapping(&mut self, source: &str) -> Result<Option<MappingEntry>, RetargetError> {
        self.snapshots("edit the mapping")?;
        let removed = self.mapping.remove(source);
        if removed.is_some() {
            self.on_mapping_edited();
        }
        Ok(removed)
    }

    pub fn clear_mapping(&mut self) -> Result<(), RetargetError> {
        self.snapshots("edit the mapping")?;
        self.mapping.clear();
        self.on_mapping_edited();
        Ok(())
    }

    /// Install a mapping wholesale, e.g. one restored from a document.
    /// Entries naming missing bones are kept and reported at precompute.
    pub fn set_mapping(&mut self, mapping: BoneMapping) -> Result<(), RetargetError> {
        self.snapshots("set the mapping")?;
        mapping.check_injective()?;
        self.mapping = mapping;
        self.on_mapping_edited();
        Ok(())
    }

    /// Build the precomputation for the current mapping and options.
    pub fn precompute(&mut self) -> Result<&Precomputation, RetargetError> {
        if self.state < JobState::Mapped {
            return Err(RetargetError::InvalidState {
                operation: "precompute",
                state: self.state.name(),
            });
        }
        if self.precomputation.is_none() {
            let (source, target) = self.snapshots("precompute")?;
            self.precomputation = Some(precompute(&source, &target, &self.mapping, self.options)?);
        }
        if self.state == JobState::Mapped {
            self.state = JobState::Precomputed;
        }
        self.precomputation
            .as_ref()
            .ok_or(RetargetError::InvalidState {
                operation: "precompute",
                state: self.state.name(),
            })
    }

    pub fn retarget(&mut self, clip: &AnimationClip) -> Result<RetargetOutput, RetargetError> {
        self.retarget_named(clip, None)
    }

    /// Retarget one clip, precomputing first if the mapping changed.
    pub fn retarget_named(
        &mut self,
        clip: &AnimationClip,
        rename: Option<&str>,
    ) -> Result<RetargetOutput, RetargetError> {
        if self.state < JobState::Mapped {
            return Err(RetargetError::InvalidState {
                operation: "retarget",
                state: self.state.name(),
            });
        }
        self.precompute()?;
        let Some(precomputation) = &self.precomputation else {
            return Err(RetargetError::InvalidState {
                operation: "retarget",
                state: self.state.name(),
            });
        };
        let output = retarget_clip_named(precomputation, clip, rename)?;
        self.state = JobState::Emitting;
        Ok(output)
    }

    /// Retarget clips in order; the first failure aborts the batch.
    pub fn retarget_clips(
        &mut self,
        clips: &[AnimationClip],
    ) -> Result<Vec<RetargetOutput>, RetargetError> {
        clips.iter().map(|clip| self.retarget(clip)).collect()
    }

    /// End the job and release both models.
    pub fn finish(&mut self) {
        *self = Self::new(self.options);
    }
}
