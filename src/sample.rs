use num_traits::AsPrimitive;

/// Channel element type the engine can read from and write back to.
///
/// Reconstruction runs in `f64`. Integer samples are rounded to the nearest
/// value and saturated to their range on the way back, float samples are
/// written as is.
pub trait Sample: Copy + AsPrimitive<f64> + Send + Sync + 'static {
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_integer_sample {
    ($($ty:ty),*) => {
        $(
            impl Sample for $ty {
                #[inline]
                fn from_f64(value: f64) -> Self {
                    // `as` saturates at the type bounds and maps NaN to zero.
                    value.round() as $ty
                }
            }
        )*
    };
}

macro_rules! impl_float_sample {
    ($($ty:ty),*) => {
        $(
            impl Sample for $ty {
                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_integer_sample!(u8, u16, u32, i8, i16, i32);
impl_float_sample!(f32, f64);

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(127.4, 127)]
    #[case(127.5, 128)]
    #[case(-3.0, 0)]
    #[case(300.0, 255)]
    #[case(f64::NAN, 0)]
    fn test_u8_rounds_and_saturates(#[case] value: f64, #[case] expected: u8) {
        assert_eq!(u8::from_f64(value), expected);
    }

    #[test]
    fn test_float_is_not_rounded() {
        assert_eq!(f32::from_f64(0.25), 0.25);
        assert_eq!(f64::from_f64(-1.75), -1.75);
    }

    #[test]
    fn test_u16_range() {
        assert_eq!(u16::from_f64(70_000.0), u16::MAX);
        assert_eq!(u16::from_f64(1234.49), 1234);
    }
}
