//! Similarity transform fitting and assembly.

use serde::{Deserialize, Serialize};

use crate::error::AlignError;
use crate::linalg::{centroid3, dot3, mat33_mul_vec3, mat33_transpose};

/// Below this centered-position spread the scale is considered undetermined.
const SPREAD_TOL: f64 = 1e-10;

/// Below this magnitude the scale factor is treated as zero for inversion.
pub(crate) const ZERO_SCALE_TOL: f64 = 1e-12;

/// A uniform-scale similarity transform `p' = s·R·p + t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    /// Uniform scale factor.
    pub scale: f64,
    /// Row-major orthonormal rotation matrix, determinant +1.
    pub rotation: [[f64; 3]; 3],
    /// Translation vector.
    pub translation: [f64; 3],
}

impl SimilarityTransform {
    /// Apply the transform to a point.
    pub fn apply(&self, point: &[f64; 3]) -> [f64; 3] {
        let r = mat33_mul_vec3(&self.rotation, point);
        [
            self.scale * r[0] + self.translation[0],
            self.scale * r[1] + self.translation[1],
            self.scale * r[2] + self.translation[2],
        ]
    }

    /// The 4x4 homogeneous matrix `[[s·R, t], [0, 0, 0, 1]]`, row-major.
    pub fn to_homogeneous(&self) -> [[f64; 4]; 4] {
        let mut out = [[0.0; 4]; 4];
        for i in 0..3 {
            for j in 0..3 {
                out[i][j] = self.scale * self.rotation[i][j];
            }
            out[i][3] = self.translation[i];
        }
        out[3][3] = 1.0;
        out
    }

    /// The exact algebraic inverse: `s' = 1/s`, `R' = Rᵀ`, `t' = -s'·R'·t`.
    ///
    /// Built from the closed form rather than a general 4x4 matrix
    /// inversion so conditioning errors in the forward transform are not
    /// amplified. Returns `None` when the scale is numerically zero and the
    /// inverse is undefined.
    pub fn inverse(&self) -> Option<SimilarityTransform> {
        if self.scale.abs() < ZERO_SCALE_TOL || !self.scale.is_finite() {
            return None;
        }
        let s_inv = 1.0 / self.scale;
        let r_inv = mat33_transpose(&self.rotation);
        let rt = mat33_mul_vec3(&r_inv, &self.translation);
        Some(SimilarityTransform {
            scale: s_inv,
            rotation: r_inv,
            translation: [-s_inv * rt[0], -s_inv * rt[1], -s_inv * rt[2]],
        })
    }
}

/// A 4x4 matrix fully populated with NaN, the sentinel for an undefined
/// inverse. Callers get a shape-stable response and must check for NaN
/// before using it.
pub(crate) fn nan_homogeneous() -> [[f64; 4]; 4] {
    [[f64::NAN; 4]; 4]
}

/// Fit the uniform scale and translation given the averaged rotation.
///
/// Rotates the A-positions by `r_est`, centers both point sets at their
/// centroids and solves the one-dimensional regression through the origin
/// `s = Σ bᵢ·aᵢ / Σ aᵢ·aᵢ`, the exact minimizer of `Σ‖bᵢ - s·aᵢ‖²`.
/// The translation follows as `t = c_B - s·c_A_rot`.
///
/// # Arguments
///
/// * `r_est` - Averaged rotation mapping frame A into frame B.
/// * `positions_a` - Positions observed in frame A.
/// * `positions_b` - Positions observed in frame B, same length.
///
/// # Returns
///
/// The scale factor and translation of the A-to-B similarity transform.
pub fn fit_scale_translation(
    r_est: &[[f64; 3]; 3],
    positions_a: &[[f64; 3]],
    positions_b: &[[f64; 3]],
) -> Result<(f64, [f64; 3]), AlignError> {
    debug_assert_eq!(positions_a.len(), positions_b.len());

    let rotated_a: Vec<[f64; 3]> = positions_a
        .iter()
        .map(|p| mat33_mul_vec3(r_est, p))
        .collect();

    let centroid_a_rot = centroid3(&rotated_a);
    let centroid_b = centroid3(positions_b);

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (pa, pb) in rotated_a.iter().zip(positions_b.iter()) {
        let a = [
            pa[0] - centroid_a_rot[0],
            pa[1] - centroid_a_rot[1],
            pa[2] - centroid_a_rot[2],
        ];
        let b = [
            pb[0] - centroid_b[0],
            pb[1] - centroid_b[1],
            pb[2] - centroid_b[2],
        ];
        numerator += dot3(&b, &a);
        denominator += dot3(&a, &a);
    }

    if denominator.abs() < SPREAD_TOL {
        return Err(AlignError::DegenerateScale {
            spread: denominator,
        });
    }

    let scale = numerator / denominator;
    let translation = [
        centroid_b[0] - scale * centroid_a_rot[0],
        centroid_b[1] - scale * centroid_a_rot[1],
        centroid_b[2] - scale * centroid_a_rot[2],
    ];

    Ok((scale, translation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    #[test]
    fn test_fit_pure_scale() {
        let a = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let b: Vec<[f64; 3]> = a.iter().map(|p| [3.0 * p[0], 3.0 * p[1], 3.0 * p[2]]).collect();
        let (s, t) = fit_scale_translation(&IDENTITY, &a, &b).unwrap();
        assert_relative_eq!(s, 3.0, epsilon = 1e-12);
        assert_relative_eq!(t[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(t[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(t[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fit_scale_and_translation() {
        let a = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 2.0]];
        let b: Vec<[f64; 3]> = a
            .iter()
            .map(|p| [2.0 * p[0] + 1.0, 2.0 * p[1] - 0.5, 2.0 * p[2]])
            .collect();
        let (s, t) = fit_scale_translation(&IDENTITY, &a, &b).unwrap();
        assert_relative_eq!(s, 2.0, epsilon = 1e-12);
        assert_relative_eq!(t[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(t[1], -0.5, epsilon = 1e-12);
        assert_relative_eq!(t[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_coincident_points_degenerate() {
        let a = vec![[1.0, 1.0, 1.0]; 3];
        let b = vec![[2.0, 2.0, 2.0]; 3];
        let err = fit_scale_translation(&IDENTITY, &a, &b).unwrap_err();
        assert!(matches!(err, AlignError::DegenerateScale { .. }));
    }

    #[test]
    fn test_homogeneous_layout() {
        let t = SimilarityTransform {
            scale: 2.0,
            rotation: IDENTITY,
            translation: [1.0, 2.0, 3.0],
        };
        let h = t.to_homogeneous();
        assert_eq!(h[0], [2.0, 0.0, 0.0, 1.0]);
        assert_eq!(h[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = SimilarityTransform {
            scale: 2.5,
            rotation: [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [1.0, -2.0, 0.5],
        };
        let inv = t.inverse().unwrap();
        let p = [0.3, -1.2, 4.0];
        let back = inv.apply(&t.apply(&p));
        assert_relative_eq!(back[0], p[0], epsilon = 1e-12);
        assert_relative_eq!(back[1], p[1], epsilon = 1e-12);
        assert_relative_eq!(back[2], p[2], epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_of_zero_scale_is_none() {
        let t = SimilarityTransform {
            scale: 0.0,
            rotation: IDENTITY,
            translation: [0.0, 0.0, 0.0],
        };
        assert!(t.inverse().is_none());
    }
}
