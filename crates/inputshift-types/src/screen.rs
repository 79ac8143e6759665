//! Screen geometry.

/// Size of the primary display in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    /// Used when the primary display cannot be queried.
    pub const FALLBACK: Self = Self {
        width: 1920.0,
        height: 1080.0,
    };

    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are usable as normalization divisors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::FALLBACK
    }
}
