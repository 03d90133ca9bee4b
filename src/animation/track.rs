use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;

use crate::error::RetargetError;
use crate::math::quat_slerp;

// Keyframe arrays are handed out as flat f32 slices
assert_eq_size!(Quat, [f32; 4]);
assert_eq_size!(Vec3, [f32; 3]);

/// Which bone property a track animates.
///
/// The declaration order is the emission order of retargeted tracks that share
/// a target bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Rotation,
    Position,
    Scale,
}

impl TrackKind {
    /// Property-path suffix used by the interchange format
    pub const fn property(self) -> &'static str {
        match self {
            TrackKind::Rotation => "quaternion",
            TrackKind::Position => "position",
            TrackKind::Scale => "scale",
        }
    }

    pub fn from_property(property: &str) -> Option<Self> {
        match property {
            "quaternion" | "rotation" => Some(TrackKind::Rotation),
            "position" | "translation" => Some(TrackKind::Position),
            "scale" => Some(TrackKind::Scale),
            _ => None,
        }
    }

    /// Number of floats per keyframe value
    pub const fn components(self) -> usize {
        match self {
            TrackKind::Rotation => 4,
            TrackKind::Position | TrackKind::Scale => 3,
        }
    }
}

/// A value that can live in a keyframe track.
pub trait Keyframe: Copy + bytemuck::Pod {
    const COMPONENTS: usize;

    fn interpolate(a: Self, b: Self, t: f32) -> Self;

    fn from_components(slice: &[f32]) -> Self;

    fn is_finite(&self) -> bool;
}

impl Keyframe for Quat {
    const COMPONENTS: usize = 4;

    #[inline]
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        quat_slerp(a, b, t)
    }

    fn from_components(slice: &[f32]) -> Self {
        Quat::from_xyzw(slice[0], slice[1], slice[2], slice[3])
    }

    fn is_finite(&self) -> bool {
        Quat::is_finite(*self)
    }
}

impl Keyframe for Vec3 {
    const COMPONENTS: usize = 3;

    #[inline]
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }

    fn from_components(slice: &[f32]) -> Self {
        Vec3::from_slice(slice)
    }

    fn is_finite(&self) -> bool {
        Vec3::is_finite(*self)
    }
}

/// Time-indexed values for one property of one bone.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframes<T> {
    pub bone_name: String,
    pub times: Vec<f32>,
    pub values: Vec<T>,
}

pub type RotationTrack = Keyframes<Quat>;
pub type PositionTrack = Keyframes<Vec3>;
pub type ScaleTrack = Keyframes<Vec3>;

impl<T: Keyframe> Keyframes<T> {
    pub fn new(bone_name: impl Into<String>, times: Vec<f32>, values: Vec<T>) -> Self {
        Self {
            bone_name: bone_name.into(),
            times,
            values,
        }
    }

    /// Build from a flat float array as found in interchange files.
    pub fn from_flat(
        bone_name: impl Into<String>,
        times: Vec<f32>,
        flat: &[f32],
    ) -> Result<Self, RetargetError> {
        let bone_name = bone_name.into();
        if flat.len() % T::COMPONENTS != 0 {
            return Err(RetargetError::invalid(format!(
                "track `{}` has {} values, not a multiple of {}",
                bone_name,
                flat.len(),
                T::COMPONENTS
            )));
        }
        let values = flat
            .chunks_exact(T::COMPONENTS)
            .map(T::from_components)
            .collect();
        Ok(Self {
            bone_name,
            times,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Values as one contiguous float slice
    pub fn flat_values(&self) -> &[f32] {
        bytemuck::cast_slice(&self.values)
    }

    pub fn validate(&self) -> Result<(), RetargetError> {
        if self.times.len() != self.values.len() {
            return Err(RetargetError::invalid(format!(
                "track `{}` has {} times but {} values",
                self.bone_name,
                self.times.len(),
                self.values.len()
            )));
        }
        if self.times.iter().any(|t| !t.is_finite()) {
            return Err(RetargetError::invalid(format!(
                "track `{}` has a non-finite keyframe time",
                self.bone_name
            )));
        }
        if self.times.windows(2).any(|w| w[1] < w[0]) {
            return Err(RetargetError::invalid(format!(
                "track `{}` has decreasing keyframe times",
                self.bone_name
            )));
        }
        if self.values.iter().any(|v| !v.is_finite()) {
            return Err(RetargetError::invalid(format!(
                "track `{}` has a non-finite keyframe value",
                self.bone_name
            )));
        }
        Ok(())
    }

    /// Sample at `time`, clamping outside the keyed range. Only keys with
    /// both a time and a value are used.
    pub fn sample(&self, time: f32) -> Option<T> {
        let keyed = self.times.len().min(self.values.len());
        if keyed == 0 {
            return None;
        }

        let next_idx = self.times[..keyed].partition_point(|&t| t <= time);

        if next_idx == 0 {
            return Some(self.values[0]);
        }
        if next_idx >= keyed {
            return Some(self.values[keyed - 1]);
        }

        let prev = next_idx - 1;
        let segment_duration = self.times[next_idx] - self.times[prev];
        let t = if segment_duration > 0.0 {
            (time - self.times[prev]) / segment_duration
        } else {
            0.0
        };

        Some(T::interpolate(self.values[prev], self.values[next_idx], t))
    }
}

/// One animated property of one bone.
#[derive(Debug, Clone, PartialEq)]
pub enum Track {
    Rotation(RotationTrack),
    Position(PositionTrack),
    Scale(ScaleTrack),
}

impl Track {
    pub fn kind(&self) -> TrackKind {
        match self {
            Track::Rotation(_) => TrackKind::Rotation,
            Track::Position(_) => TrackKind::Position,
            Track::Scale(_) => TrackKind::Scale,
        }
    }

    pub fn bone_name(&self) -> &str {
        match self {
            Track::Rotation(t) => &t.bone_name,
            Track::Position(t) => &t.bone_name,
            Track::Scale(t) => &t.bone_name,
        }
    }

    pub fn times(&self) -> &[f32] {
        match self {
            Track::Rotation(t) => &t.times,
            Track::Position(t) => &t.times,
            Track::Scale(t) => &t.times,
        }
    }

    pub fn len(&self) -> usize {
        self.times().len()
    }

    pub fn is_empty(&self) -> bool {
        self.times().is_empty()
    }

    pub fn end_time(&self) -> f32 {
        self.times().last().copied().unwrap_or(0.0)
    }

    pub fn flat_values(&self) -> &[f32] {
        match self {
            Track::Rotation(t) => t.flat_values(),
            Track::Position(t) => t.flat_values(),
            Track::Scale(t) => t.flat_values(),
        }
    }

    /// `"<bone>.<property>"`, e.g. `"Spine.quaternion"`
    pub fn property_path(&self) -> String {
        format!("{}.{}", self.bone_name(), self.kind().property())
    }

    /// Parse a property path and flat values into a typed track.
    pub fn from_property_path(
        path: &str,
        times: Vec<f32>,
        values: &[f32],
    ) -> Result<Track, RetargetError> {
        let (bone_name, kind) = parse_property_path(path)?;
        Ok(match kind {
            TrackKind::Rotation => Track::Rotation(Keyframes::from_flat(bone_name, times, values)?),
            TrackKind::Position => Track::Position(Keyframes::from_flat(bone_name, times, values)?),
            TrackKind::Scale => Track::Scale(Keyframes::from_flat(bone_name, times, values)?),
        })
    }

    pub fn validate(&self) -> Result<(), RetargetError> {
        match self {
            Track::Rotation(t) => t.validate(),
            Track::Position(t) => t.validate(),
            Track::Scale(t) => t.validate(),
        }
    }
}

/// Split `"<bone>.<property>"` or `".bones[<bone>].<property>"`.
pub fn parse_property_path(path: &str) -> Result<(String, TrackKind), RetargetError> {
    let (target, property) = path
        .rsplit_once('.')
        .ok_or_else(|| RetargetError::invalid(format!("track name `{path}` has no property")))?;

    let kind = TrackKind::from_property(property).ok_or_else(|| {
        RetargetError::invalid(format!("unsupported track property `{property}` in `{path}`"))
    })?;

    let bone = target
        .strip_prefix(".bones[")
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(target);

    if bone.is_empty() {
        return Err(RetargetError::invalid(format!(
            "track name `{path}` has no bone"
        )));
    }

    Ok((bone.to_string(), kind))
}
