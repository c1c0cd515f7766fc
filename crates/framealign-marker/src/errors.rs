/// An error type for the marker pose module.
#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    /// The 3x3 intrinsics matrix is not a valid pinhole calibration.
    #[error("invalid camera intrinsics: {0}")]
    InvalidIntrinsics(String),

    /// The marker side length must be strictly positive.
    #[error("marker side length must be positive, got {0}")]
    InvalidSideLength(f64),

    /// The homography from the canonical square could not be estimated.
    #[error("homography estimation failed: {0}")]
    Homography(String),

    /// The detected quad is too small or self-degenerate for pose solving.
    #[error("degenerate marker quad: {0}")]
    DegenerateQuad(String),
}
