use std::fmt;

use serde::Serialize;

use crate::animation::TrackKind;

/// Non-fatal issue found while precomputing or emitting a clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RetargetWarning {
    /// Track on a source bone that has no mapping
    UnmappedTrack { bone: String, track: TrackKind },
    /// Mapping entry whose target bone does not exist
    MissingTargetBone { source: String, target: String },
    /// Mapping entry whose source bone does not exist
    MissingSourceBone { source: String },
    DuplicateBoneName { name: String, count: usize },
    /// Scale track dropped because bind scales differ
    ScaleMismatch { bone: String },
    QuaternionRenormalized {
        track: String,
        keyframe: usize,
        norm: f32,
    },
}

impl fmt::Display for RetargetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetargetWarning::UnmappedTrack { bone, track } => {
                write!(f, "dropped {:?} track on unmapped bone `{}`", track, bone)
            }
            RetargetWarning::MissingTargetBone { source, target } => write!(
                f,
                "mapping `{}` -> `{}` ignored: no such target bone",
                source, target
            ),
            RetargetWarning::MissingSourceBone { source } => {
                write!(f, "mapping for `{}` ignored: no such source bone", source)
            }
            RetargetWarning::DuplicateBoneName { name, count } => {
                write!(f, "bone name `{}` occurs {} times", name, count)
            }
            RetargetWarning::ScaleMismatch { bone } => {
                write!(f, "dropped scale track on `{}`: bind scales differ", bone)
            }
            RetargetWarning::QuaternionRenormalized {
                track,
                keyframe,
                norm,
            } => write!(
                f,
                "renormalized keyframe {} of `{}` (norm {})",
                keyframe, track, norm
            ),
        }
    }
}
