use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. Every quantity
/// that accumulates across ticks uses this type so runs are bit-exact.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert Fixed64 to f64. Use only for display and geometry at the edges.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Fraction `num / den` clamped to `[0, 1]`. Returns zero for a zero or
/// negative denominator.
#[inline]
pub fn ratio_clamped(num: Fixed64, den: Fixed64) -> Fixed64 {
    if den <= Fixed64::ZERO {
        return Fixed64::ZERO;
    }
    num.checked_div(den)
        .unwrap_or(Fixed64::ZERO)
        .clamp(Fixed64::ZERO, Fixed64::ONE)
}
