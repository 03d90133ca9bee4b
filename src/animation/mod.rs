//! Animation clips and keyframe tracks.

pub mod clip;
pub mod track;

pub use clip::{AnimationClip, AnimationClipJson, TrackJson};
pub use track::{
    parse_property_path, Keyframe, Keyframes, PositionTrack, RotationTrack, ScaleTrack, Track,
    TrackKind,
};
