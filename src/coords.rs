//! Coordinate-system descriptors and the one-shot conversion of a scene into
//! canonical space: right-handed, +Y up, +Z forward, meters.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::RetargetError;
use crate::math::{quat_approx_eq, Transform};
use crate::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "X")]
    PosX,
    #[serde(rename = "-X")]
    NegX,
    #[serde(rename = "Y")]
    PosY,
    #[serde(rename = "-Y")]
    NegY,
    #[serde(rename = "Z")]
    PosZ,
    #[serde(rename = "-Z")]
    NegZ,
}

impl Axis {
    pub fn to_vec3(self) -> Vec3 {
        match self {
            Axis::PosX => Vec3::X,
            Axis::NegX => Vec3::NEG_X,
            Axis::PosY => Vec3::Y,
            Axis::NegY => Vec3::NEG_Y,
            Axis::PosZ => Vec3::Z,
            Axis::NegZ => Vec3::NEG_Z,
        }
    }

    pub fn is_orthogonal_to(self, other: Axis) -> bool {
        self.to_vec3().dot(other.to_vec3()) == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Right,
    Left,
}

/// Native coordinate system of a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateSystem {
    pub up_axis: Axis,
    pub forward_axis: Axis,
    pub handedness: Handedness,
    /// Meters per model unit
    pub unit_scale: f32,
}

impl CoordinateSystem {
    pub const CANONICAL: CoordinateSystem = CoordinateSystem {
        up_axis: Axis::PosY,
        forward_axis: Axis::PosZ,
        handedness: Handedness::Right,
        unit_scale: 1.0,
    };

    /// Blender-style: +Z up, -Y forward
    pub const fn z_up(unit_scale: f32) -> Self {
        Self {
            up_axis: Axis::PosZ,
            forward_axis: Axis::NegY,
            handedness: Handedness::Right,
            unit_scale,
        }
    }

    pub fn validate(&self) -> Result<(), RetargetError> {
        if !self.up_axis.is_orthogonal_to(self.forward_axis) {
            return Err(RetargetError::invalid(format!(
                "up axis {:?} and forward axis {:?} are not orthogonal",
                self.up_axis, self.forward_axis
            )));
        }
        if !self.unit_scale.is_finite() || self.unit_scale <= 0.0 {
            return Err(RetargetError::invalid(format!(
                "unit scale must be positive, got {}",
                self.unit_scale
            )));
        }
        Ok(())
    }

    pub fn is_canonical(&self) -> bool {
        *self == Self::CANONICAL
    }

    /// Rotation taking this system's up/forward onto +Y/+Z.
    pub fn conversion_rotation(&self) -> Quat {
        let up = self.up_axis.to_vec3();
        let forward = self.forward_axis.to_vec3();
        let right = up.cross(forward);
        // Columns map canonical axes to native ones; the transpose inverts it.
        let native = Mat3::from_cols(right, up, forward);
        Quat::from_mat3(&native.transpose()).normalize()
    }
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// Outcome of [`canonicalize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub applied: bool,
    pub rotation: Quat,
    pub scale: f32,
    pub original_descriptor: CoordinateSystem,
    /// Descriptor came from the heuristics rather than the caller or loader
    pub inferred: bool,
    /// Input was left-handed; reported only, no mirroring is applied
    pub handedness_mismatch: bool,
}

/// Guess the native coordinate system of a scene.
///
/// Up: a root bone whose world +Y leans more towards +Z than +Y means Z-up.
/// Scale: largest bounding box dimension over 100 means centimeters, under
/// 0.1 means millimeters. Handedness: sign of the root basis determinant.
pub fn infer_coordinate_system(scene: &Scene) -> Result<CoordinateSystem, RetargetError> {
    let world = scene.world_transforms()?;

    let z_up = scene.root_bones().into_iter().any(|i| {
        let bone_up = world[i].rotation * Vec3::Y;
        bone_up.dot(Vec3::Z) > bone_up.dot(Vec3::Y)
    });

    let unit_scale = match scene.world_bounds()? {
        Some(bounds) if bounds.largest_dimension() > 100.0 => 0.01,
        Some(bounds) if bounds.largest_dimension() < 0.1 => 0.001,
        _ => 1.0,
    };

    let handedness = if scene.root.basis_determinant() < 0.0 {
        Handedness::Left
    } else {
        Handedness::Right
    };

    let mut descriptor = if z_up {
        CoordinateSystem::z_up(unit_scale)
    } else {
        CoordinateSystem {
            unit_scale,
            ..CoordinateSystem::CANONICAL
        }
    };
    descriptor.handedness = handedness;
    Ok(descriptor)
}

/// Bring a scene into canonical space by composing one rotation and uniform
/// scale into its root. Per-node transforms are left untouched.
///
/// The descriptor is taken from `descriptor`, then the scene's user data,
/// then inferred. A scene already marked canonical is left alone.
pub fn canonicalize(
    scene: &mut Scene,
    descriptor: Option<CoordinateSystem>,
) -> Result<ConversionReport, RetargetError> {
    scene.validate()?;

    let marked = scene.user_data.coordinate_system;
    if marked.is_some_and(|d| d.is_canonical()) {
        return Ok(ConversionReport {
            applied: false,
            rotation: Quat::IDENTITY,
            scale: 1.0,
            original_descriptor: CoordinateSystem::CANONICAL,
            inferred: false,
            handedness_mismatch: false,
        });
    }

    let (original, inferred) = match descriptor.or(marked) {
        Some(d) => {
            d.validate()?;
            (d, false)
        }
        None => (infer_coordinate_system(scene)?, true),
    };

    let rotation = original.conversion_rotation();
    let scale = original.unit_scale;
    let rotate = !quat_approx_eq(rotation, Quat::IDENTITY, 1e-6);
    let rescale = (scale - 1.0).abs() > 1e-6;
    let applied = rotate || rescale;

    if applied {
        let conversion = Transform::new(Vec3::ZERO, rotation, Vec3::splat(scale));
        scene.root = conversion.compose(&scene.root);
    }
    scene.user_data.coordinate_system = Some(CoordinateSystem::CANONICAL);

    let handedness_mismatch = original.handedness == Handedness::Left;
    if handedness_mismatch {
        log::warn!(
            "scene `{}` is left-handed; converted without mirroring",
            scene.name
        );
    }
    log::debug!(
        "canonicalized `{}`: up {:?}, forward {:?}, scale {} (applied: {})",
        scene.name,
        original.up_axis,
        original.forward_axis,
        scale,
        applied
    );

    Ok(ConversionReport {
        applied,
        rotation,
        scale,
        original_descriptor: original,
        inferred,
        handedness_mismatch,
    })
}
