//! Linear algebra primitives on top of glam.
//!
//! Quaternion helpers renormalize their output whenever it drifts from unit
//! length, so long chains of products stay usable as rotations.

pub use glam::{Mat3, Mat4, Quat, Vec3};

use serde::{Deserialize, Serialize};

use crate::error::MathError;

/// Maximum allowed drift of `|q|` from 1 before a quaternion is renormalized
pub const NORM_TOLERANCE: f32 = 1e-4;

/// Lengths below this are treated as zero
pub const EPSILON: f32 = 1e-8;

/// Multiply two quaternions, renormalizing the product if it drifted.
#[inline]
pub fn quat_mul(a: Quat, b: Quat) -> Quat {
    renormalize(a * b)
}

/// Inverse of a unit quaternion (its conjugate).
#[inline]
pub fn quat_inverse(q: Quat) -> Quat {
    q.conjugate()
}

/// Spherical interpolation along the shortest arc.
#[inline]
pub fn quat_slerp(a: Quat, b: Quat, t: f32) -> Quat {
    renormalize(a.slerp(b, t))
}

/// Normalize a quaternion, failing on zero length.
pub fn quat_normalize(q: Quat) -> Result<Quat, MathError> {
    let len = q.length();
    if !len.is_finite() || len < EPSILON {
        return Err(MathError::Degenerate);
    }
    Ok(q / len)
}

/// Renormalize only when `|q|` has drifted past [`NORM_TOLERANCE`].
#[inline]
pub fn renormalize(q: Quat) -> Quat {
    let len = q.length();
    if (len - 1.0).abs() > NORM_TOLERANCE && len > EPSILON {
        q / len
    } else {
        q
    }
}

/// Treat `q` and `-q` as the same rotation.
pub fn quat_approx_eq(a: Quat, b: Quat, tolerance: f32) -> bool {
    a.dot(b).abs() >= 1.0 - tolerance
}

#[inline]
pub fn vec_add(a: Vec3, b: Vec3) -> Vec3 {
    a + b
}

#[inline]
pub fn vec_sub(a: Vec3, b: Vec3) -> Vec3 {
    a - b
}

#[inline]
pub fn vec_scale(v: Vec3, s: f32) -> Vec3 {
    v * s
}

/// Component-wise product, used for non-uniform scale.
#[inline]
pub fn vec_component_mul(a: Vec3, b: Vec3) -> Vec3 {
    a * b
}

/// Normalize a vector, failing on zero length.
pub fn vec_normalize(v: Vec3) -> Result<Vec3, MathError> {
    let len = v.length();
    if !len.is_finite() || len < EPSILON {
        return Err(MathError::Degenerate);
    }
    Ok(v / len)
}

/// Translation, rotation, scale.
///
/// Maps a point `v` to `translation + rotation * (scale * v)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default)]
    pub rotation: Quat,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn from_translation_rotation(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// `self ∘ child`: apply `child` first, then `self`.
    ///
    /// Exact for uniform scale. With non-uniform scale on a rotated parent the
    /// shear is dropped, as in any TRS hierarchy.
    pub fn compose(&self, child: &Transform) -> Transform {
        Transform {
            translation: vec_add(
                self.translation,
                self.rotation * vec_component_mul(self.scale, child.translation),
            ),
            rotation: quat_mul(self.rotation, child.rotation),
            scale: vec_component_mul(self.scale, child.scale),
        }
    }

    /// Inverse transform. Fails when any scale component is zero.
    pub fn inverse(&self) -> Result<Transform, MathError> {
        if self.scale.abs().min_element() < EPSILON || !self.scale.is_finite() {
            return Err(MathError::Degenerate);
        }
        let inv_scale = self.scale.recip();
        let inv_rotation = quat_inverse(self.rotation);
        Ok(Transform {
            translation: vec_component_mul(inv_scale, inv_rotation * -self.translation),
            rotation: inv_rotation,
            scale: inv_scale,
        })
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * vec_component_mul(self.scale, point)
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Determinant of the linear part; negative for a mirrored basis.
    pub fn basis_determinant(&self) -> f32 {
        (Mat3::from_quat(self.rotation) * Mat3::from_diagonal(self.scale)).determinant()
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }

    pub fn approx_eq(&self, other: &Transform, tolerance: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, tolerance)
            && quat_approx_eq(self.rotation, other.rotation, tolerance)
            && self.scale.abs_diff_eq(other.scale, tolerance)
    }
}

/// Function-call spelling of [`Transform::compose`].
#[inline]
pub fn trs_compose(parent: &Transform, child: &Transform) -> Transform {
    parent.compose(child)
}

#[inline]
pub fn trs_inverse(t: &Transform) -> Result<Transform, MathError> {
    t.inverse()
}

#[inline]
pub fn trs_to_matrix4(t: &Transform) -> Mat4 {
    t.to_matrix()
}
