/// Linear interpolation between two points. Returns the average y value when `x1 == x2`.
#[must_use]
pub fn linear_interpolation(x1: f64, x2: f64, y1: f64, y2: f64, xp: f64) -> f64 {
    // At the tails of a cumulative rate function, we may hit a point where the cumulative rates are
    // the same, but we still need to be able to do interpolation. We just return the average of the
    // y values in this case (x1 == x2 == xp).
    #[allow(clippy::float_cmp)]
    if x1 == x2 {
        return f64::midpoint(y1, y2);
    }
    y1 + (y2 - y1) / (x2 - x1) * (xp - x1)
}

/// Index of the last value in the ascending slice `xs` that is at most `xp`. Points before
/// the start of `xs` map to index 0.
#[must_use]
pub fn get_lower_index(xs: &[f64], xp: f64) -> usize {
    // `partition_point` returns the number of values <= xp, which is one past the index we want.
    usize::max(xs.partition_point(|x| *x <= xp), 1) - 1
}
