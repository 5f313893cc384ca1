//! Property-based tests for the statistics engine

use super::{percentile, summarize};
use proptest::collection::vec;
use proptest::prelude::*;

mod generators {
    use super::*;

    pub fn positive_floats() -> impl Strategy<Value = f64> {
        0.001f64..1_000_000.0
    }

    pub fn number_vectors() -> impl Strategy<Value = Vec<f64>> {
        vec(positive_floats(), 1..500)
    }
}

proptest! {
    /// Count equals input length exactly
    #[test]
    fn count_matches_input(numbers in generators::number_vectors()) {
        prop_assert_eq!(summarize(&numbers).count, numbers.len());
    }

    /// Median and mean stay within the sample range
    #[test]
    fn central_values_between_min_max(numbers in generators::number_vectors()) {
        let stats = summarize(&numbers);
        prop_assert!(stats.min <= stats.median);
        prop_assert!(stats.median <= stats.max);
        prop_assert!(stats.min <= stats.mean);
        prop_assert!(stats.mean <= stats.max);
    }

    /// Repeated samples summarize to exactly that sample
    #[test]
    fn identical_samples_are_exact(value in generators::positive_floats(), len in 1usize..200) {
        let stats = summarize(&vec![value; len]);
        prop_assert_eq!(stats.mean, value);
        prop_assert_eq!(stats.median, value);
        prop_assert_eq!(stats.min, value);
        prop_assert_eq!(stats.max, value);
    }

    /// Standard deviation is finite and non-negative
    #[test]
    fn std_dev_non_negative(numbers in generators::number_vectors()) {
        let stats = summarize(&numbers);
        prop_assert!(stats.std_dev >= 0.0);
        prop_assert!(!stats.std_dev.is_nan());
    }

    /// Percentiles are always actual samples
    #[test]
    fn percentiles_are_members(numbers in generators::number_vectors()) {
        let stats = summarize(&numbers);
        prop_assert!(numbers.contains(&stats.p95));
        prop_assert!(numbers.contains(&stats.p99));
        prop_assert!(stats.p95 <= stats.p99);
    }

    /// Input order does not matter
    #[test]
    fn order_independent(mut numbers in generators::number_vectors()) {
        let forward = summarize(&numbers);
        numbers.reverse();
        let backward = summarize(&numbers);
        prop_assert_eq!(forward.median, backward.median);
        prop_assert_eq!(forward.p95, backward.p95);
        prop_assert_eq!(forward.min, backward.min);
        prop_assert_eq!(forward.max, backward.max);
    }

    /// The clamped index never runs past the last element
    #[test]
    fn percentile_index_in_bounds(numbers in generators::number_vectors(), p in 0.0f64..=1.0) {
        let mut sorted = numbers.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let value = percentile(&sorted, p);
        prop_assert!(value >= sorted[0]);
        prop_assert!(value <= sorted[sorted.len() - 1]);
    }
}
