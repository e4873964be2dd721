pub trait FloatExt: Copy {
    fn approximately_eq(self, other: Self) -> bool;

    /// Blends `self` toward `other`: `self * (1 - t) + other * t`.
    ///
    /// This form (rather than `self + (other - self) * t`) returns `self`
    /// exactly at `t == 0` and `other` exactly at `t == 1`.
    fn lerp(self, other: Self, t: Self) -> Self;
}

impl FloatExt for f32 {
    fn approximately_eq(self, other: Self) -> bool {
        (self - other).abs() < crate::EPSILON as f32
    }

    #[inline]
    fn lerp(self, other: Self, t: Self) -> Self {
        self * (1.0 - t) + other * t
    }
}

impl FloatExt for f64 {
    fn approximately_eq(self, other: Self) -> bool {
        (self - other).abs() < crate::EPSILON
    }

    #[inline]
    fn lerp(self, other: Self, t: Self) -> Self {
        self * (1.0 - t) + other * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_approximately_eq() {
        assert!(1.0_f32.approximately_eq(1.0));
        assert!((0.1_f32 + 0.2_f32).approximately_eq(0.3));
        assert!(!1.0_f32.approximately_eq(1.001));
    }

    #[test]
    fn f32_nan_is_never_equal() {
        assert!(!f32::NAN.approximately_eq(f32::NAN));
        assert!(!f32::NAN.approximately_eq(0.0));
    }

    #[test]
    fn lerp_hits_endpoints_exactly() {
        let a = 0.3_f32;
        let b = 7.1_f32;
        assert_eq!(a.lerp(b, 0.0).to_bits(), a.to_bits());
        assert_eq!(a.lerp(b, 1.0).to_bits(), b.to_bits());
        assert!(a.lerp(b, 0.5).approximately_eq(3.7));

        assert_eq!(2.0_f64.lerp(4.0, 0.25), 2.5);
    }
}
