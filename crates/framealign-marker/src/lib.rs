#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Camera intrinsics and pixel normalization.
pub mod camera;

/// Marker detection trait and the built-in dark-square detector.
pub mod detector;

/// Error types.
pub mod errors;

/// Planar homography estimation.
pub mod homography;

/// Square-marker pose solving.
pub mod pose;

pub use camera::CameraIntrinsics;
pub use detector::{DarkSquareDetector, MarkerCorners, MarkerDetector};
pub use errors::MarkerError;
pub use pose::{estimate_single_pose, solve_square_pose};
