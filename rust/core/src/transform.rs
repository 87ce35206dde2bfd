// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of the service's 4x4 occurrence transforms.
//!
//! The service sends a homogeneous matrix `M` as 16 doubles in row order,
//! with the translation stored in the last row. That layout belongs to the
//! row-vector convention `p' = p·M`, so the upper left 3x3 block is the
//! transpose of the rotation applied as `R·p + t`. The block must be a pure
//! rotation; anything with scale, shear or a reflection is rejected instead
//! of being re-orthonormalized.

use crate::error::{Error, Result};
use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Maximum deviation of `RᵀR` from identity and of `det R` from one.
const ROTATION_TOLERANCE: f64 = 1e-4;

/// Placement of an occurrence: translation plus unit rotation.
///
/// Components are stored in single precision. Decoding happens in double
/// precision and the results are narrowed with `as`. The narrowing is lossy
/// and defined, but it rounds to the nearest representable `f32` rather
/// than truncating toward zero; the lost mantissa bits are not recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Decode 16 row-major values.
    ///
    /// Translation is read from `values[12..15]`. The rotation is the
    /// transpose of the upper left 3x3 block, so that `R·p + t` equals the
    /// first three components of `[p, 1]·M`.
    pub fn from_row_major(values: &[f64]) -> Result<Self> {
        let m: &[f64; 16] = values.try_into().map_err(|_| {
            Error::MalformedTransform(format!("expected 16 values, got {}", values.len()))
        })?;

        if let Some(index) = m.iter().position(|v| !v.is_finite()) {
            return Err(Error::MalformedTransform(format!(
                "non-finite value at index {}",
                index
            )));
        }

        // Transposed block: column j of M's block is row j of R.
        let block = Matrix3::new(
            m[0], m[4], m[8], //
            m[1], m[5], m[9], //
            m[2], m[6], m[10],
        );

        let orthogonality_error = (block.transpose() * block - Matrix3::identity()).norm();
        if orthogonality_error > ROTATION_TOLERANCE {
            return Err(Error::MalformedTransform(format!(
                "rotation block is not orthonormal (deviation {:.3e})",
                orthogonality_error
            )));
        }

        let det = block.determinant();
        if (det - 1.0).abs() > ROTATION_TOLERANCE {
            return Err(Error::MalformedTransform(format!(
                "rotation block has determinant {:.6}",
                det
            )));
        }

        let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(block));

        Ok(Self {
            translation: Vector3::new(m[12] as f32, m[13] as f32, m[14] as f32),
            rotation: UnitQuaternion::new_unchecked(Quaternion::new(
                q.w as f32, q.i as f32, q.j as f32, q.k as f32,
            )),
        })
    }

    /// Recompose the 16 row-major values in the layout accepted by
    /// [`Transform::from_row_major`].
    pub fn to_row_major(&self) -> [f64; 16] {
        let r = self.rotation.to_rotation_matrix();
        let r = r.matrix();
        let t = &self.translation;
        [
            r[(0, 0)] as f64, r[(1, 0)] as f64, r[(2, 0)] as f64, 0.0,
            r[(0, 1)] as f64, r[(1, 1)] as f64, r[(2, 1)] as f64, 0.0,
            r[(0, 2)] as f64, r[(1, 2)] as f64, r[(2, 2)] as f64, 0.0,
            t.x as f64, t.y as f64, t.z as f64, 1.0,
        ]
    }
}
