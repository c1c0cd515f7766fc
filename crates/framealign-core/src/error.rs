/// Fatal failures of the alignment pipeline.
///
/// Each failure condition is surfaced as its own variant so that callers
/// can react to them individually; none of them carries a partial result.
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// The batch holds fewer than two pose pairs.
    #[error("alignment requires at least 2 pose pairs, got {actual}")]
    InsufficientSamples {
        /// Number of pairs actually provided.
        actual: usize,
    },

    /// Orientation data is malformed and the averaging eigen-problem
    /// cannot be solved.
    #[error("rotation averaging failed: {0}")]
    RotationAveraging(String),

    /// The rotated and centered source positions carry essentially zero
    /// spread, so no scale can be determined.
    #[error("scale estimation failed: centered position spread {spread:.3e} is below tolerance")]
    DegenerateScale {
        /// The sum of squared centered positions that fell under tolerance.
        spread: f64,
    },
}

/// Non-fatal conditions recorded on a successful alignment result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignWarning {
    /// The batch holds two pairs; the estimate is valid but sensitive to
    /// noise. Three or more pairs are recommended.
    LowSampleCount {
        /// Number of pairs provided.
        actual: usize,
    },

    /// The forward scale is numerically zero, so the inverse transform is
    /// undefined and has been populated with NaN sentinels.
    InverseUndefined,
}
