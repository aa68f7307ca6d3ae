//! Rolling windows that supply slices to primitives.

use super::primitives::{mean, sample_std_dev};

/// Fixed-length trailing window (rolling mean, rolling std dev).
///
/// Each output position sees the `size` values ending at it (fewer at the
/// start of the data). Missing values inside the window are skipped; when
/// fewer than `min_periods` valid values remain the output is NaN.
#[derive(Debug, Clone, Copy)]
pub struct FixedWindow {
    size: usize,
    min_periods: usize,
}

impl FixedWindow {
    /// A window that needs all `size` values to be present.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        FixedWindow {
            size,
            min_periods: size,
        }
    }

    /// Lowers the number of valid values needed to produce output.
    pub fn with_min_periods(mut self, min_periods: usize) -> Self {
        self.min_periods = min_periods.clamp(1, self.size);
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Applies the given primitive to the valid values of every window.
    pub fn apply<F>(&self, data: &[f64], mut primitive: F) -> Vec<f64>
    where
        F: FnMut(&[f64]) -> f64,
    {
        let mut result = Vec::with_capacity(data.len());
        let mut scratch = Vec::with_capacity(self.size);

        for index in 0..data.len() {
            let start = (index + 1).saturating_sub(self.size);
            scratch.clear();
            scratch.extend(data[start..=index].iter().copied().filter(|v| !v.is_nan()));
            if scratch.len() < self.min_periods {
                result.push(f64::NAN);
            } else {
                result.push(primitive(&scratch));
            }
        }

        result
    }

    pub fn rolling_mean(&self, data: &[f64]) -> Vec<f64> {
        self.apply(data, mean)
    }

    pub fn rolling_std(&self, data: &[f64]) -> Vec<f64> {
        self.apply(data, sample_std_dev)
    }

    /// `(x - rolling mean) / rolling std`, NaN where the window is short or
    /// flat.
    pub fn rolling_zscore(&self, data: &[f64]) -> Vec<f64> {
        let means = self.rolling_mean(data);
        let stds = self.rolling_std(data);
        data.iter()
            .zip(means.iter().zip(stds.iter()))
            .map(|(value, (mean, std))| {
                let z = (value - mean) / std;
                if z.is_finite() {
                    z
                } else {
                    f64::NAN
                }
            })
            .collect()
    }
}
