//! Statistics Kernel (§4.8): pure, total functions over slices of `f64`.
//! No rounding happens here — callers format for display (§4.8 "No
//! rounding inside the kernel").

/// `mean / median / min / max / count` over one numeric sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Sorts ascending, then takes the arithmetic mean of the two central
/// elements for even `n`, the middle element for odd `n` (§4.8, §8
/// property 4). Returns `0.0` on empty input.
pub fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("NaN in statistics input"));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// `stats(xs)`: empty input yields all zeros with `count=0` (§4.8).
pub fn stats(xs: &[f64]) -> Stats {
    if xs.is_empty() {
        return Stats::default();
    }
    let sum: f64 = xs.iter().sum();
    let mean = sum / xs.len() as f64;
    let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Stats {
        mean,
        median: median(xs),
        min,
        max,
        count: xs.len(),
    }
}

/// `yield_stats` mirrors `stats` over an array of yields (§4.8).
pub fn yield_stats(ys: &[f64]) -> Stats {
    stats(ys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_singleton_is_itself() {
        assert_eq!(median(&[42.0]), 42.0);
    }

    #[test]
    fn median_is_reversal_invariant() {
        let xs = vec![3.0, 1.0, 4.0, 1.0, 5.0];
        let mut reversed = xs.clone();
        reversed.reverse();
        let mut doubled = xs.clone();
        doubled.extend(reversed);
        assert_eq!(median(&doubled), median(&xs));
    }

    #[test]
    fn median_even_length_averages_center_pair() {
        let xs = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(median(&xs), 2.5);
    }

    #[test]
    fn empty_input_is_all_zeros() {
        let s = stats(&[]);
        assert_eq!(s, Stats::default());
        assert_eq!(s.count, 0);
    }

    #[test]
    fn stats_over_known_sample() {
        let s = stats(&[10.0, 20.0, 30.0]);
        assert_eq!(s.mean, 20.0);
        assert_eq!(s.median, 20.0);
        assert_eq!(s.min, 10.0);
        assert_eq!(s.max, 30.0);
        assert_eq!(s.count, 3);
    }
}
