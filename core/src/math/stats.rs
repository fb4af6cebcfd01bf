pub struct StatsHelper;

impl StatsHelper {
    /// Arithmetic mean; NaN for an empty slice.
    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return f64::NAN;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    /// Mean over the non-NaN values only; NaN when none is present.
    pub fn nan_mean<I>(samples: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let (sum, count) = samples
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }

    /// Sample standard deviation (n - 1 denominator); NaN below two samples.
    pub fn sample_std(samples: &[f64]) -> f64 {
        if samples.len() < 2 {
            return f64::NAN;
        }
        let mean = Self::mean(samples);
        let sum_sq: f64 = samples.iter().map(|&v| (v - mean) * (v - mean)).sum();
        (sum_sq / (samples.len() - 1) as f64).sqrt()
    }

    /// Quantile of ascending `sorted` data with linear interpolation between
    /// closest ranks.
    pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
        if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
            return None;
        }
        let position = (sorted.len() - 1) as f64 * q;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let fraction = position - lower as f64;
        Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
    }
}
