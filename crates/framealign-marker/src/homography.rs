//! Planar homography estimation via direct linear transform.

use crate::errors::MarkerError;

/// Compute the homography mapping four 2d source points onto four 2d
/// destination points.
///
/// Builds the standard 8x9 DLT system and takes the right-singular vector
/// of the smallest singular value. The result is normalized to unit
/// Frobenius norm.
///
/// # Arguments
///
/// * `src` - Source points, shape (4, 2).
/// * `dst` - Destination points, shape (4, 2).
///
/// # Returns
///
/// The row-major 3x3 homography from `src` to `dst`.
pub fn homography_4pt(
    src: &[[f64; 2]; 4],
    dst: &[[f64; 2]; 4],
) -> Result<[[f64; 3]; 3], MarkerError> {
    let mut mat_a = faer::Mat::<f64>::zeros(8, 9);
    for i in 0..4 {
        let (s, d) = (src[i], dst[i]);

        mat_a.write(2 * i, 0, s[0]);
        mat_a.write(2 * i, 1, s[1]);
        mat_a.write(2 * i, 2, 1.0);
        mat_a.write(2 * i, 6, -d[0] * s[0]);
        mat_a.write(2 * i, 7, -d[0] * s[1]);
        mat_a.write(2 * i, 8, -d[0]);

        mat_a.write(2 * i + 1, 3, s[0]);
        mat_a.write(2 * i + 1, 4, s[1]);
        mat_a.write(2 * i + 1, 5, 1.0);
        mat_a.write(2 * i + 1, 6, -d[1] * s[0]);
        mat_a.write(2 * i + 1, 7, -d[1] * s[1]);
        mat_a.write(2 * i + 1, 8, -d[1]);
    }

    // null space of A: right-singular vector of the smallest singular value
    let svd = mat_a.svd();
    let h = svd.v().col(8);

    let mut homo = [
        [h[0], h[1], h[2]],
        [h[3], h[4], h[5]],
        [h[6], h[7], h[8]],
    ];

    let norm = homo
        .iter()
        .flatten()
        .map(|x| x * x)
        .sum::<f64>()
        .sqrt();
    if norm < f64::EPSILON || !norm.is_finite() {
        return Err(MarkerError::Homography("null-space vector is zero".to_string()));
    }
    for row in homo.iter_mut() {
        for x in row.iter_mut() {
            *x /= norm;
        }
    }

    let det = homo[0][0] * (homo[1][1] * homo[2][2] - homo[1][2] * homo[2][1])
        - homo[0][1] * (homo[1][0] * homo[2][2] - homo[1][2] * homo[2][0])
        + homo[0][2] * (homo[1][0] * homo[2][1] - homo[1][1] * homo[2][0]);
    if det.abs() < 1e-8 {
        return Err(MarkerError::Homography(format!(
            "determinant {det:.3e} is too small"
        )));
    }

    Ok(homo)
}
