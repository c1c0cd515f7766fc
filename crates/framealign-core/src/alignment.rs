//! The full estimation pipeline: intake, rotation averaging, similarity fit.

use crate::error::{AlignError, AlignWarning};
use crate::pose::{split_pairs, PosePair, RECOMMENDED_SAMPLES};
use crate::rotation::average_relative_rotations;
use crate::similarity::{
    fit_scale_translation, nan_homogeneous, SimilarityTransform, ZERO_SCALE_TOL,
};

/// Result of a frame alignment estimate.
///
/// The forward transform maps frame-A coordinates into frame B. The
/// inverse is assembled from the closed form, not a numerical matrix
/// inversion; when the scale is numerically zero it is a NaN-populated
/// sentinel and [`AlignWarning::InverseUndefined`] is recorded.
#[derive(Debug, Clone)]
pub struct FrameAlignment {
    /// Estimated uniform scale factor (A to B).
    pub scale: f64,
    /// Estimated rotation matrix (A to B), row-major.
    pub rotation: [[f64; 3]; 3],
    /// Estimated translation vector (A to B).
    pub translation: [f64; 3],
    /// Forward 4x4 homogeneous transform, row-major.
    pub a_to_b: [[f64; 4]; 4],
    /// Inverse 4x4 homogeneous transform, row-major. All NaN when the
    /// scale is numerically zero.
    pub b_to_a: [[f64; 4]; 4],
    /// Non-fatal conditions observed during estimation.
    pub warnings: Vec<AlignWarning>,
}

impl FrameAlignment {
    /// Whether the inverse transform is usable.
    pub fn has_valid_inverse(&self) -> bool {
        !self.warnings.contains(&AlignWarning::InverseUndefined)
    }
}

/// Estimate the similarity transform mapping frame A into frame B from a
/// batch of paired 6-DoF pose observations.
///
/// Each call is a pure function of its batch: no state is kept across
/// calls and independent calls may run concurrently.
///
/// # Arguments
///
/// * `pairs` - At least two pose correspondences; three or more are
///   recommended for noise robustness.
///
/// # Errors
///
/// * [`AlignError::InsufficientSamples`] - fewer than two pairs.
/// * [`AlignError::RotationAveraging`] - malformed orientation data.
/// * [`AlignError::DegenerateScale`] - no positional spread to fit a scale.
pub fn estimate_alignment(pairs: &[PosePair]) -> Result<FrameAlignment, AlignError> {
    let columns = split_pairs(pairs)?;

    let mut warnings = Vec::new();
    if columns.len() < RECOMMENDED_SAMPLES {
        warnings.push(AlignWarning::LowSampleCount {
            actual: columns.len(),
        });
    }

    let rotation = average_relative_rotations(&columns.quats_a, &columns.quats_b)?;
    let (scale, translation) =
        fit_scale_translation(&rotation, &columns.positions_a, &columns.positions_b)?;

    log::debug!(
        "alignment over {} pairs: scale={scale:.6}, translation={translation:?}",
        columns.len()
    );

    let forward = SimilarityTransform {
        scale,
        rotation,
        translation,
    };
    let a_to_b = forward.to_homogeneous();

    let b_to_a = match forward.inverse() {
        Some(inverse) => inverse.to_homogeneous(),
        None => {
            log::warn!("scale factor {scale:.3e} is below {ZERO_SCALE_TOL:.0e}; inverse transform is undefined");
            warnings.push(AlignWarning::InverseUndefined);
            nan_homogeneous()
        }
    };

    Ok(FrameAlignment {
        scale,
        rotation,
        translation,
        a_to_b,
        b_to_a,
        warnings,
    })
}
