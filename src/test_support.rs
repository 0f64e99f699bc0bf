//! Helpers shared by unit tests.

/// Whether `actual` lies within `tolerance` of `expected`.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "Tolerance check on float results")]
pub(crate) const fn close_to(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance
}
