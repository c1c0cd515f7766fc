#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Full estimation pipeline from pose pairs to a frame alignment.
pub mod alignment;

/// Error and warning types.
pub mod error;

/// Linear algebra utilities on fixed-size arrays.
pub mod linalg;

/// Pose value types and batch validation.
pub mod pose;

/// Unit quaternion utilities.
pub mod quat;

/// Chordal-L2 rotation averaging.
pub mod rotation;

/// Similarity transform fitting and assembly.
pub mod similarity;

pub use alignment::{estimate_alignment, FrameAlignment};
pub use error::{AlignError, AlignWarning};
pub use pose::{Pose, PosePair};
pub use similarity::SimilarityTransform;
