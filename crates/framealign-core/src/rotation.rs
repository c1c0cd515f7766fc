//! Rotation averaging under the chordal L2 metric on SO(3).

use nalgebra::{Matrix4, Vector4};

use crate::error::AlignError;
use crate::quat::{quat_conjugate, quat_mul, quat_norm, quat_to_mat33};

/// Tolerance on the norm of an input quaternion before it is rejected.
const UNIT_NORM_TOL: f64 = 1e-6;

/// Average the per-pair relative rotations `q_b ∘ q_a⁻¹`.
///
/// The N relative rotations are averaged by accumulating the 4x4 outer
/// product sum `M = Σ qᵢqᵢᵀ` and taking the eigenvector of `M` with the
/// largest eigenvalue. Because `qqᵀ == (-q)(-q)ᵀ`, the construction is
/// immune to the unit-quaternion double cover: flipping the sign of any
/// input quaternion leaves `M` unchanged. A naive component-wise mean does
/// not have this property and silently corrupts the result whenever the
/// input signs are inconsistent.
///
/// # Arguments
///
/// * `quats_a` - Orientations observed in frame A, unit `[x, y, z, w]`.
/// * `quats_b` - Orientations observed in frame B, same length as `quats_a`.
///
/// # Returns
///
/// The averaged rotation as a row-major orthonormal matrix with
/// determinant +1, mapping frame-A directions into frame B.
pub fn average_relative_rotations(
    quats_a: &[[f64; 4]],
    quats_b: &[[f64; 4]],
) -> Result<[[f64; 3]; 3], AlignError> {
    debug_assert_eq!(quats_a.len(), quats_b.len());

    let mut m = Matrix4::<f64>::zeros();
    for (i, (qa, qb)) in quats_a.iter().zip(quats_b.iter()).enumerate() {
        check_unit(qa, i, "A")?;
        check_unit(qb, i, "B")?;

        // inverse of a unit quaternion is its conjugate
        let q_rel = quat_mul(qb, &quat_conjugate(qa));
        let v = Vector4::from_column_slice(&q_rel);
        m += v * v.transpose();
    }

    if m.iter().any(|x| !x.is_finite()) {
        return Err(AlignError::RotationAveraging(
            "outer-product accumulator contains non-finite values".to_string(),
        ));
    }

    let eig = m.symmetric_eigen();
    let mut best = 0;
    for i in 1..4 {
        if eig.eigenvalues[i] > eig.eigenvalues[best] {
            best = i;
        }
    }

    let v = eig.eigenvectors.column(best);
    let norm = v.norm();
    if norm < UNIT_NORM_TOL || !norm.is_finite() {
        return Err(AlignError::RotationAveraging(
            "degenerate principal eigenvector".to_string(),
        ));
    }

    let q_mean = [v[0] / norm, v[1] / norm, v[2] / norm, v[3] / norm];
    Ok(quat_to_mat33(&q_mean))
}

fn check_unit(q: &[f64; 4], index: usize, frame: &str) -> Result<(), AlignError> {
    if q.iter().any(|x| !x.is_finite()) {
        return Err(AlignError::RotationAveraging(format!(
            "quaternion {index} in frame {frame} contains non-finite components"
        )));
    }
    let norm = quat_norm(q);
    if (norm - 1.0).abs() > UNIT_NORM_TOL {
        return Err(AlignError::RotationAveraging(format!(
            "quaternion {index} in frame {frame} has norm {norm:.6}, expected 1"
        )));
    }
    Ok(())
}
