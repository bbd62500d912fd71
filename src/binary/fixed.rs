/// Decode a `long_float` in its default encoding: a signed integer with a
/// fixed point offset of 3 decimal digits
///
/// ```
/// use ck3bin::binary::decode_long_float;
/// assert_eq!(decode_long_float(1500), 1.5);
/// assert_eq!(decode_long_float(-250), -0.25);
/// ```
#[inline]
pub fn decode_long_float(raw: i64) -> f64 {
    raw as f64 / 1000.0
}

/// Decode a `long_float` as Q49.15 and round it to 5 fractional digits
///
/// <https://en.wikipedia.org/wiki/Q_(number_format)>
///
/// ```
/// use ck3bin::binary::decode_q49_15;
/// assert_eq!(decode_q49_15(32768), 1.0);
/// assert_eq!(decode_q49_15(1), 0.00003);
/// ```
#[inline]
pub fn decode_q49_15(raw: i64) -> f64 {
    let val = raw as f64 / 32768.0;
    (val * 100_000.0).round_ties_even() / 100_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(0, 0.0)]
    #[case(1000, 1.0)]
    #[case(1, 0.001)]
    #[case(-12345, -12.345)]
    fn test_long_float(#[case] raw: i64, #[case] expected: f64) {
        assert_eq!(decode_long_float(raw), expected);
    }

    #[rstest]
    #[case(0, 0.0)]
    #[case(32768, 1.0)]
    #[case(-32768, -1.0)]
    #[case(16384, 0.5)]
    #[case(4045371, 123.45493)]
    #[case(-1, -0.00003)]
    fn test_q49_15(#[case] raw: i64, #[case] expected: f64) {
        assert_eq!(decode_q49_15(raw), expected);
    }
}
