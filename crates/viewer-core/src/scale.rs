pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 2.0;

/// Clamps to `[MIN_SCALE, MAX_SCALE]` and rounds to two decimals.
///
/// Rounding keeps repeated `0.1`/`0.2` steps from drifting (`1.4 + 0.2` lands on
/// `1.6`, not `1.5999999`).
pub fn clamp_scale(value: f32) -> f32 {
    if value.is_nan() {
        return MIN_SCALE;
    }

    round_hundredths(value.clamp(MIN_SCALE, MAX_SCALE))
}

pub fn round_hundredths(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Integer percent used as a cache key for surfaces rendered at `scale`.
pub fn scale_percent(scale: f32) -> u16 {
    (scale * 100.0).round().clamp(1.0, u16::MAX as f32) as u16
}
