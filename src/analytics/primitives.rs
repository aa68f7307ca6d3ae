//! Stateless numeric primitives shared by the analytics consumers.
//!
//! These are pure functions over slices. Missing values are NaN and are
//! skipped by the aggregations.

fn valid(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| !v.is_nan())
}

/// Mean of the non-missing values, NaN when there are none.
pub fn mean(values: &[f64]) -> f64 {
    let (sum, count) = valid(values).fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Sample standard deviation (n - 1 denominator) of the non-missing values.
/// NaN with fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let valid_values: Vec<f64> = valid(values).collect();
    if valid_values.len() < 2 {
        return f64::NAN;
    }

    let n = valid_values.len() as f64;
    let mean = valid_values.iter().sum::<f64>() / n;
    let sum_squared_diff: f64 = valid_values
        .iter()
        .map(|&value| (value - mean).powi(2))
        .sum();

    (sum_squared_diff / (n - 1.0)).sqrt()
}

/// Calculates the population standard deviation of available (non-NaN) values.
pub fn population_std_dev(values: &[f64]) -> f64 {
    let valid_values: Vec<f64> = valid(values).collect();

    if valid_values.is_empty() {
        return f64::NAN;
    }

    let n = valid_values.len() as f64;
    let mean = valid_values.iter().sum::<f64>() / n;
    let sum_squared_diff: f64 = valid_values
        .iter()
        .map(|&value| (value - mean).powi(2))
        .sum();

    (sum_squared_diff / n).sqrt()
}

/// Median of the non-missing values, NaN when there are none.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = valid(values).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Percentile rank of `score` among the non-missing values, 0 to 100.
///
/// Ties are ranked at the average of the strictly-below and at-or-below
/// counts (the "rank" convention), so the maximum of a distinct series
/// scores 100.
pub fn percentile_of_score(values: &[f64], score: f64) -> f64 {
    let (mut below, mut at_or_below, mut n) = (0usize, 0usize, 0usize);
    for value in valid(values) {
        n += 1;
        if value < score {
            below += 1;
        }
        if value <= score {
            at_or_below += 1;
        }
    }
    if n == 0 || score.is_nan() {
        return f64::NAN;
    }
    let bump = if at_or_below > below { 1 } else { 0 };
    (below + at_or_below + bump) as f64 * 50.0 / n as f64
}

/// First difference; the first element is NaN.
pub fn diff(values: &[f64]) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());
    if values.is_empty() {
        return result;
    }
    result.push(f64::NAN);
    result.extend(values.windows(2).map(|pair| pair[1] - pair[0]));
    result
}

/// Simple percentage change, `x[t] / x[t-1] - 1`; the first element is NaN.
/// A zero or missing previous value gives NaN.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());
    if values.is_empty() {
        return result;
    }
    result.push(f64::NAN);
    result.extend(values.windows(2).map(|pair| {
        let change = pair[1] / pair[0] - 1.0;
        if change.is_finite() {
            change
        } else {
            f64::NAN
        }
    }));
    result
}

/// Bounds `value` to `[-limit, limit]`, keeping NaN.
pub fn clip(value: f64, limit: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        value.clamp(-limit, limit)
    }
}
