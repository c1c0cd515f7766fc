//! Square-marker pose solving.
//!
//! Follows the plane-based pose recipe: estimate the homography from the
//! canonical square to the normalized image corners, read off the first
//! two rotation columns and the translation, and re-orthonormalize the
//! rotation by projecting onto SO(3).

use framealign_core::linalg::{det_mat33, mat33_mul_vec3, mat33_transpose};
use framealign_core::quat::{mat33_to_quat, quat_norm};
use framealign_core::Pose;
use image::GrayImage;

use crate::camera::CameraIntrinsics;
use crate::detector::{MarkerCorners, MarkerDetector};
use crate::errors::MarkerError;
use crate::homography::homography_4pt;

/// Solve the camera pose from the four ordered corner pixels of a square
/// marker.
///
/// The marker defines the coordinate frame: it spans the z=0 plane with
/// the corner order top-left, top-right, bottom-right, bottom-left mapping
/// to `(-L/2, L/2)`, `(L/2, L/2)`, `(L/2, -L/2)`, `(-L/2, -L/2)`.
///
/// # Arguments
///
/// * `corners` - The four corner pixels in canonical order.
/// * `intrinsics` - Pinhole calibration of the observing camera.
/// * `side_length` - Marker side length in meters; sets the metric scale.
///
/// # Returns
///
/// The camera pose expressed in the marker frame: position and unit
/// orientation quaternion.
pub fn solve_square_pose(
    corners: &MarkerCorners,
    intrinsics: &CameraIntrinsics,
    side_length: f64,
) -> Result<Pose, MarkerError> {
    if !(side_length > 0.0) {
        return Err(MarkerError::InvalidSideLength(side_length));
    }

    let half = side_length / 2.0;
    let object: [[f64; 2]; 4] = [[-half, half], [half, half], [half, -half], [-half, -half]];
    let normalized: [[f64; 2]; 4] = core::array::from_fn(|i| intrinsics.normalize(&corners[i]));

    // homography from the marker plane to normalized image coordinates;
    // with K folded out its columns are (r1, r2, t) up to a common scale
    let h = homography_4pt(&object, &normalized)?;
    let (r_marker_to_cam, t) = decompose_planar_homography(&h)?;

    // camera pose in the marker frame
    let r_cam = mat33_transpose(&r_marker_to_cam);
    let rt = mat33_mul_vec3(&r_cam, &t);
    let position = [-rt[0], -rt[1], -rt[2]];

    let mut orientation = mat33_to_quat(&r_cam);
    let norm = quat_norm(&orientation);
    if !norm.is_finite() || norm < f64::EPSILON {
        return Err(MarkerError::DegenerateQuad(
            "orientation quaternion is not finite".to_string(),
        ));
    }
    for c in orientation.iter_mut() {
        *c /= norm;
    }

    Ok(Pose {
        position,
        orientation,
    })
}

/// Detect a marker in a grayscale image and solve the camera pose.
///
/// This is the single-image acquisition operation: it either produces the
/// camera pose in the marker coordinate frame or reports that no marker
/// was found (`Ok(None)`). Detection is delegated to the supplied
/// [`MarkerDetector`].
pub fn estimate_single_pose<D: MarkerDetector + ?Sized>(
    detector: &D,
    image: &GrayImage,
    k: &[[f64; 3]; 3],
    side_length: f64,
) -> Result<Option<Pose>, MarkerError> {
    let intrinsics = CameraIntrinsics::from_matrix(k)?;

    let corners = match detector.detect(image)? {
        Some(corners) => corners,
        None => {
            log::debug!("no marker detected in {}x{} image", image.width(), image.height());
            return Ok(None);
        }
    };

    solve_square_pose(&corners, &intrinsics, side_length).map(Some)
}

/// Decompose a marker-plane homography (normalized intrinsics) into the
/// marker-to-camera rotation and translation.
fn decompose_planar_homography(
    h: &[[f64; 3]; 3],
) -> Result<([[f64; 3]; 3], [f64; 3]), MarkerError> {
    let h1 = [h[0][0], h[1][0], h[2][0]];
    let h2 = [h[0][1], h[1][1], h[2][1]];
    let h3 = [h[0][2], h[1][2], h[2][2]];

    let n1 = (h1[0] * h1[0] + h1[1] * h1[1] + h1[2] * h1[2]).sqrt();
    let n2 = (h2[0] * h2[0] + h2[1] * h2[1] + h2[2] * h2[2]).sqrt();
    if n1 < f64::EPSILON || n2 < f64::EPSILON {
        return Err(MarkerError::Homography(
            "homography rotation columns are zero".to_string(),
        ));
    }
    // scale so that the rotation columns have approximately unit norm
    let s = 1.0 / (n1 * n2).sqrt();

    let mut r1 = [h1[0] * s, h1[1] * s, h1[2] * s];
    let mut r2 = [h2[0] * s, h2[1] * s, h2[2] * s];
    let mut t = [h3[0] * s, h3[1] * s, h3[2] * s];

    // the marker must lie in front of the camera
    if t[2] < 0.0 {
        for i in 0..3 {
            r1[i] = -r1[i];
            r2[i] = -r2[i];
            t[i] = -t[i];
        }
    }

    let r3 = [
        r1[1] * r2[2] - r1[2] * r2[1],
        r1[2] * r2[0] - r1[0] * r2[2],
        r1[0] * r2[1] - r1[1] * r2[0],
    ];

    let r = [
        [r1[0], r2[0], r3[0]],
        [r1[1], r2[1], r3[1]],
        [r1[2], r2[2], r3[2]],
    ];

    Ok((project_to_so3(&r)?, t))
}

/// Project a near-rotation matrix onto SO(3) via the SVD polar factor.
fn project_to_so3(r: &[[f64; 3]; 3]) -> Result<[[f64; 3]; 3], MarkerError> {
    let mut mat = faer::Mat::<f64>::zeros(3, 3);
    for i in 0..3 {
        for j in 0..3 {
            mat.write(i, j, r[i][j]);
        }
    }

    let svd = mat.svd();
    let (u, v) = (svd.u(), svd.v());

    let mut u_arr = [[0.0; 3]; 3];
    let mut v_arr = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            u_arr[i][j] = u.read(i, j);
            v_arr[i][j] = v.read(i, j);
        }
    }

    // R = U * diag(1, 1, d) * Vᵀ with d chosen so that det(R) = +1
    let mut proj = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            proj[i][j] =
                u_arr[i][0] * v_arr[j][0] + u_arr[i][1] * v_arr[j][1] + u_arr[i][2] * v_arr[j][2];
        }
    }
    if det_mat33(&proj) < 0.0 {
        for i in 0..3 {
            for j in 0..3 {
                proj[i][j] = u_arr[i][0] * v_arr[j][0] + u_arr[i][1] * v_arr[j][1]
                    - u_arr[i][2] * v_arr[j][2];
            }
        }
    }

    if proj.iter().flatten().any(|x| !x.is_finite()) {
        return Err(MarkerError::DegenerateQuad(
            "rotation projection produced non-finite values".to_string(),
        ));
    }

    Ok(proj)
}
