//! Pose value types and batch validation.

use serde::{Deserialize, Serialize};

use crate::error::AlignError;

/// Minimum number of pose pairs required for an estimate.
pub const MIN_SAMPLES: usize = 2;

/// Below this many pairs the estimate is flagged as noise-sensitive.
pub const RECOMMENDED_SAMPLES: usize = 3;

/// A 6-DoF pose: position plus orientation as a unit quaternion `[x, y, z, w]`.
///
/// The orientation is expected to have unit norm; callers must renormalize
/// before use, the estimator rejects quaternions that are off by more than
/// a floating tolerance rather than fixing them up silently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in the frame's coordinates.
    pub position: [f64; 3],
    /// Orientation as a unit quaternion, scalar part last.
    pub orientation: [f64; 4],
}

/// One correspondence: the same rig observed simultaneously in frame A
/// and in frame B.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PosePair {
    /// The observation expressed in frame A.
    pub pose_a: Pose,
    /// The observation expressed in frame B.
    pub pose_b: Pose,
}

/// A batch of pose pairs decomposed into parallel columns.
///
/// Order follows the input batch; the downstream averaging and least
/// squares are order-invariant.
#[derive(Debug, Clone)]
pub struct PoseColumns {
    /// Positions observed in frame A.
    pub positions_a: Vec<[f64; 3]>,
    /// Orientations observed in frame A.
    pub quats_a: Vec<[f64; 4]>,
    /// Positions observed in frame B.
    pub positions_b: Vec<[f64; 3]>,
    /// Orientations observed in frame B.
    pub quats_b: Vec<[f64; 4]>,
}

impl PoseColumns {
    /// Number of pairs in the batch.
    pub fn len(&self) -> usize {
        self.positions_a.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.positions_a.is_empty()
    }
}

/// Validate a batch of pose pairs and decompose it into parallel columns.
///
/// Fails with [`AlignError::InsufficientSamples`] for fewer than
/// [`MIN_SAMPLES`] pairs. A batch below [`RECOMMENDED_SAMPLES`] pairs is
/// accepted with a warning logged; the caller records the corresponding
/// [`crate::AlignWarning::LowSampleCount`] on the result.
pub fn split_pairs(pairs: &[PosePair]) -> Result<PoseColumns, AlignError> {
    if pairs.len() < MIN_SAMPLES {
        return Err(AlignError::InsufficientSamples {
            actual: pairs.len(),
        });
    }
    if pairs.len() < RECOMMENDED_SAMPLES {
        log::warn!(
            "alignment batch has only {} pose pairs; result may be noise-sensitive",
            pairs.len()
        );
    }

    let mut columns = PoseColumns {
        positions_a: Vec::with_capacity(pairs.len()),
        quats_a: Vec::with_capacity(pairs.len()),
        positions_b: Vec::with_capacity(pairs.len()),
        quats_b: Vec::with_capacity(pairs.len()),
    };
    for pair in pairs {
        columns.positions_a.push(pair.pose_a.position);
        columns.quats_a.push(pair.pose_a.orientation);
        columns.positions_b.push(pair.pose_b.position);
        columns.quats_b.push(pair.pose_b.orientation);
    }

    Ok(columns)
}
