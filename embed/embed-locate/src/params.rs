//! Tuning parameters for location search.

/// Parameters controlling element inversion and projection.
///
/// # Example
///
/// ```
/// use embed_locate::ResolverParams;
///
/// let params = ResolverParams::new()
///     .with_tolerance(1e-8)
///     .with_max_iterations(100);
/// assert_eq!(params.max_iterations, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverParams {
    /// Relative tolerance of the exact search: the residual must be below
    /// `tolerance` times the element size, and `xi` may exceed the reference
    /// cell by `tolerance` (default: 1e-6).
    pub tolerance: f64,
    /// Maximum Newton / Gauss-Newton iterations per element (default: 50).
    pub max_iterations: u32,
}

impl Default for ResolverParams {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 50,
        }
    }
}

impl ResolverParams {
    /// Creates parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the exact-search tolerance.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the iteration limit.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}
