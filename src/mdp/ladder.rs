//! The fixed set of temperatures a thermostat state can take.

/// Lowest temperature on the ladder.
pub const LADDER_MIN: f64 = 16.0;
/// Highest temperature on the ladder.
pub const LADDER_MAX: f64 = 25.0;
/// Distance between two neighbouring rungs.
pub const LADDER_STEP: f64 = 0.5;

/// Number of rungs, `LADDER_MIN` and `LADDER_MAX` included.
pub const LADDER_LEN: usize = 19;

/// Returns `true` if `temperature` is one of 16.0, 16.5, ..., 25.0.
///
/// Halves are exact in binary floating point, so membership is an exact check.
pub fn is_on_ladder(temperature: f64) -> bool {
    temperature.is_finite()
        && (LADDER_MIN..=LADDER_MAX).contains(&temperature)
        && ((temperature - LADDER_MIN) / LADDER_STEP).fract() == 0.0
}

/// Iterates over the ladder in ascending order.
///
/// # Examples
///
/// ```
/// use thermostat_mdp::mdp::ladder;
///
/// let rungs: Vec<f64> = ladder::temperatures().collect();
/// assert_eq!(rungs.len(), ladder::LADDER_LEN);
/// assert_eq!(rungs[0], 16.0);
/// assert_eq!(rungs[12], 22.0);
/// ```
pub fn temperatures() -> impl Iterator<Item = f64> {
    (0..LADDER_LEN).map(|i| LADDER_MIN + i as f64 * LADDER_STEP)
}
