//! Small fixed-size helpers shared across the estimation pipeline.
//!
//! Matrices are row-major `[[f64; 3]; 3]`, vectors `[f64; 3]`.

/// Dot product of two 3-vectors.
pub fn dot3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Multiply a 3x3 matrix with a 3-vector.
pub fn mat33_mul_vec3(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Transpose of a 3x3 matrix.
pub fn mat33_transpose(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

/// Product of two 3x3 matrices.
pub fn mat33_mul(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut c = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            c[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    c
}

/// Determinant of a 3x3 matrix.
pub fn det_mat33(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Mean of a set of 3-vectors.
///
/// PRECONDITION: `points` is non-empty.
pub fn centroid3(points: &[[f64; 3]]) -> [f64; 3] {
    let mut c = [0.0; 3];
    for p in points {
        c[0] += p[0];
        c[1] += p[1];
        c[2] += p[2];
    }
    let n = points.len() as f64;
    [c[0] / n, c[1] / n, c[2] / n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mat33_mul_vec3() {
        let m = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        let v = [1.0, 2.0, 3.0];
        let r = mat33_mul_vec3(&m, &v);
        assert_relative_eq!(r[0], -2.0);
        assert_relative_eq!(r[1], 1.0);
        assert_relative_eq!(r[2], 3.0);
    }

    #[test]
    fn test_transpose_roundtrip() {
        let m = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        assert_eq!(mat33_transpose(&mat33_transpose(&m)), m);
    }

    #[test]
    fn test_det_rotation_is_one() {
        let m = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert_relative_eq!(det_mat33(&m), 1.0);
    }

    #[test]
    fn test_centroid3() {
        let pts = vec![[0.0, 0.0, 0.0], [2.0, 4.0, 6.0]];
        assert_eq!(centroid3(&pts), [1.0, 2.0, 3.0]);
    }
}
