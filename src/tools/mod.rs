pub mod sky;

/// Round to a fixed number of decimal places, resolving ties to the even neighbour.
pub fn round_to_decimals(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}
