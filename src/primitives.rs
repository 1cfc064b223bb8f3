pub type FVal = f64;

/// Generic small positive threshold: capacity clamp and division guard.
pub const EPS: FVal = 1e-6;
