//! Numeric helpers shared by all exported values
//!
//! Every position, normal, rotation and scale component the exporter emits is
//! passed through [`snap_to_zero`] so near-zero noise from the host
//! application never reaches the output files.

/// Default snapping threshold (in export units)
pub const DEFAULT_EPSILON: f32 = 1.0e-4;

/// Snap a value to exactly zero when its magnitude is below `epsilon`
#[inline]
pub fn snap_to_zero(value: f32, epsilon: f32) -> f32 {
    if value.abs() < epsilon { 0.0 } else { value }
}

/// Component-wise [`snap_to_zero`]
#[inline]
pub fn snap3(v: [f32; 3], epsilon: f32) -> [f32; 3] {
    [
        snap_to_zero(v[0], epsilon),
        snap_to_zero(v[1], epsilon),
        snap_to_zero(v[2], epsilon),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_below_epsilon() {
        assert_eq!(snap_to_zero(5.0e-5, DEFAULT_EPSILON), 0.0);
        assert_eq!(snap_to_zero(-9.9e-5, DEFAULT_EPSILON), 0.0);
        // Negative zero must not leak through either
        assert!(snap_to_zero(-1.0e-6, DEFAULT_EPSILON).is_sign_positive());
    }

    #[test]
    fn test_snap_keeps_large_values() {
        assert_eq!(snap_to_zero(1.0e-4, DEFAULT_EPSILON), 1.0e-4);
        assert_eq!(snap_to_zero(-0.5, DEFAULT_EPSILON), -0.5);
    }

    #[test]
    fn test_snap3() {
        assert_eq!(snap3([1.0e-7, 2.0, -3.0e-5], 1.0e-4), [0.0, 2.0, 0.0]);
    }
}
