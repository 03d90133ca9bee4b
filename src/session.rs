//! Handle-based registry of retargeting sessions.
//!
//! The core modules take explicit references. This registry is the one piece
//! of global state, kept for host bindings that can only pass integers
//! across the boundary.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::animation::AnimationClip;
use crate::coords::{canonicalize, ConversionReport, CoordinateSystem};
use crate::error::RetargetError;
use crate::mapping::{compatibility, CompatibilityReport, MappingInfo};
use crate::retarget::{RetargetJob, RetargetOptions, RetargetOutput};
use crate::scene::Scene;
use crate::skeleton::{analyze, build_skeleton, Skeleton, SkeletonAnalysis};

pub type SessionHandle = u32;

/// What the host learns about a scene once it is loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSummary {
    pub conversion: ConversionReport,
    pub analysis: SkeletonAnalysis,
    pub clip_names: Vec<String>,
}

/// A retargeting job plus the canonicalized scenes it was loaded from.
pub struct RetargetSession {
    pub job: RetargetJob,
    source_scene: Option<Scene>,
    target_scene: Option<Scene>,
}

impl RetargetSession {
    pub fn new(options: RetargetOptions) -> Self {
        Self {
            job: RetargetJob::new(options),
            source_scene: None,
            target_scene: None,
        }
    }

    pub fn source_scene(&self) -> Option<&Scene> {
        self.source_scene.as_ref()
    }

    pub fn target_scene(&self) -> Option<&Scene> {
        self.target_scene.as_ref()
    }

    /// Canonicalize `scene`, extract its skeleton and make it the source.
    /// On error the previously loaded source stays in place.
    pub fn load_source_scene(
        &mut self,
        mut scene: Scene,
        descriptor: Option<CoordinateSystem>,
    ) -> Result<SceneSummary, RetargetError> {
        let (skeleton, summary) = prepare_scene(&mut scene, descriptor)?;
        self.job.load_source(skeleton)?;
        log::info!("loaded source `{}` ({} bones)", scene.name, summary.analysis.bone_count);
        self.source_scene = Some(scene);
        Ok(summary)
    }

    pub fn load_target_scene(
        &mut self,
        mut scene: Scene,
        descriptor: Option<CoordinateSystem>,
    ) -> Result<SceneSummary, RetargetError> {
        let (skeleton, summary) = prepare_scene(&mut scene, descriptor)?;
        self.job.load_target(skeleton)?;
        log::info!("loaded target `{}` ({} bones)", scene.name, summary.analysis.bone_count);
        self.target_scene = Some(scene);
        Ok(summary)
    }

    fn skeletons(&self, operation: &'static str) -> Result<(&Skeleton, &Skeleton), RetargetError> {
        match (self.job.source_skeleton(), self.job.target_skeleton()) {
            (Some(source), Some(target)) => Ok((source.as_ref(), target.as_ref())),
            _ => Err(RetargetError::InvalidState {
                operation,
                state: self.job.state().name(),
            }),
        }
    }

    pub fn compatibility(&self) -> Result<CompatibilityReport, RetargetError> {
        let (source, target) = self.skeletons("check compatibility")?;
        Ok(compatibility(source, target, self.job.mapping()))
    }

    pub fn mapping_info(&self) -> Result<MappingInfo, RetargetError> {
        let (source, target) = self.skeletons("describe the mapping")?;
        Ok(self.job.mapping().mapping_info(source, target))
    }

    pub fn source_clip(&self, name: &str) -> Result<&AnimationClip, RetargetError> {
        let scene = self
            .source_scene
            .as_ref()
            .ok_or(RetargetError::InvalidState {
                operation: "look up a clip",
                state: self.job.state().name(),
            })?;
        scene
            .clip(name)
            .ok_or_else(|| RetargetError::invalid(format!("no clip named `{}`", name)))
    }

    /// Retarget a clip carried by the source scene.
    pub fn retarget_source_clip(
        &mut self,
        name: &str,
        rename: Option<&str>,
    ) -> Result<RetargetOutput, RetargetError> {
        let clip = self
            .source_scene
            .as_ref()
            .and_then(|scene| scene.clip(name))
            .ok_or_else(|| RetargetError::invalid(format!("no clip named `{}`", name)))?;
        self.job.retarget_named(clip, rename)
    }

    pub fn retarget_all_source_clips(&mut self) -> Result<Vec<RetargetOutput>, RetargetError> {
        let clips = self
            .source_scene
            .as_ref()
            .map(|scene| scene.clips.as_slice())
            .unwrap_or_default();
        self.job.retarget_clips(clips)
    }
}

fn prepare_scene(
    scene: &mut Scene,
    descriptor: Option<CoordinateSystem>,
) -> Result<(Arc<Skeleton>, SceneSummary), RetargetError> {
    let conversion = canonicalize(scene, descriptor)?;
    let skeleton = Arc::new(build_skeleton(scene)?);
    let summary = SceneSummary {
        conversion,
        analysis: analyze(&skeleton),
        clip_names: scene.clips.iter().map(|clip| clip.name.clone()).collect(),
    };
    Ok((skeleton, summary))
}

// Global registry, thin wrapper for host bindings only
thread_local! {
    static SESSIONS: RefCell<HashMap<SessionHandle, RetargetSession>> =
        RefCell::new(HashMap::new());
    static NEXT_HANDLE: Cell<SessionHandle> = const { Cell::new(1) };
}

/// Register a new session and return its handle. Handles are never reused.
pub fn create_session(options: RetargetOptions) -> SessionHandle {
    let handle = NEXT_HANDLE.with(|next| {
        let handle = next.get();
        next.set(handle.wrapping_add(1).max(1));
        handle
    });
    SESSIONS.with(|sessions| {
        sessions
            .borrow_mut()
            .insert(handle, RetargetSession::new(options));
    });
    log::debug!("created retarget session {}", handle);
    handle
}

/// Drop a session. Returns false if the handle was unknown.
pub fn destroy_session(handle: SessionHandle) -> bool {
    let removed = SESSIONS.with(|sessions| sessions.borrow_mut().remove(&handle).is_some());
    if removed {
        log::debug!("destroyed retarget session {}", handle);
    }
    removed
}

/// Execute a closure with immutable access to a session
///
/// Returns None if the handle is unknown
pub fn with_session<F, R>(handle: SessionHandle, f: F) -> Option<R>
where
    F: FnOnce(&RetargetSession) -> R,
{
    SESSIONS.with(|sessions| sessions.borrow().get(&handle).map(f))
}

/// Execute a closure with mutable access to a session
///
/// Returns None if the handle is unknown
pub fn with_session_mut<F, R>(handle: SessionHandle, f: F) -> Option<R>
where
    F: FnOnce(&mut RetargetSession) -> R,
{
    SESSIONS.with(|sessions| sessions.borrow_mut().get_mut(&handle).map(f))
}
