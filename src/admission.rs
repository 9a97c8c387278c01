/// Tolerance for float representation noise, well below the two-decimal
/// precision of an OS load average.
const EPSILON: f64 = 1e-9;

/// Decide whether a host with the given sampled load can take a task of the
/// given weight under the configured load ceiling.
///
/// Boundary inclusive: `load + weight == limit` is accepted; any fractional
/// excess beyond the ceiling rejects.
pub fn accepts(load: f64, weight: u32, limit: u32) -> bool {
    load + f64::from(weight) <= f64::from(limit) + EPSILON
}
