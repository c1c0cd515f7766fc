//! Pinhole camera intrinsics.

use crate::errors::MarkerError;

/// Pinhole intrinsics without distortion terms.
///
/// The pose solver works in normalized image coordinates, so distortion is
/// expected to be corrected upstream (or negligible, as for typical phone
/// cameras at the image center).
#[derive(Debug, Clone, Copy)]
pub struct CameraIntrinsics {
    /// Focal length along x, in pixels.
    pub fx: f64,
    /// Focal length along y, in pixels.
    pub fy: f64,
    /// Principal point x, in pixels.
    pub cx: f64,
    /// Principal point y, in pixels.
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Build intrinsics from a row-major 3x3 calibration matrix.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> Result<Self, MarkerError> {
        let (fx, fy) = (k[0][0], k[1][1]);
        if !fx.is_finite() || !fy.is_finite() || fx.abs() < f64::EPSILON || fy.abs() < f64::EPSILON
        {
            return Err(MarkerError::InvalidIntrinsics(format!(
                "focal lengths fx={fx}, fy={fy}"
            )));
        }
        Ok(Self {
            fx,
            fy,
            cx: k[0][2],
            cy: k[1][2],
        })
    }

    /// Map a pixel coordinate to normalized image coordinates (K⁻¹ applied).
    pub fn normalize(&self, pixel: &[f64; 2]) -> [f64; 2] {
        [(pixel[0] - self.cx) / self.fx, (pixel[1] - self.cy) / self.fy]
    }
}
