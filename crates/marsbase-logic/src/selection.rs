//! Cumulative-weight (roulette-wheel) selection.
//!
//! Candidates keep a fixed registration order. A draw `r` in `[0, W)`
//! selects the first candidate whose cumulative interval
//! `[sum(w1..w(i-1)), sum(w1..wi))` contains `r`, so zero-weight
//! candidates can never be picked and ties resolve by order.
//!
//! ```
//! use marsbase_logic::selection::select_index;
//!
//! let weights = [2.0, 0.0, 3.0];
//! assert_eq!(select_index(&weights, 0.0), Some(0));
//! assert_eq!(select_index(&weights, 1.999), Some(0));
//! assert_eq!(select_index(&weights, 2.0), Some(2));
//! assert_eq!(select_index(&weights, 4.999), Some(2));
//! ```

use serde::{Deserialize, Serialize};

/// Why a raw weight was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightIssue {
    NotANumber,
    Infinite,
    Negative,
}

/// Clamp a raw weight into `[0, cap]`, reporting values that had to be discarded.
///
/// Rejected weights become 0. Finite values above `cap` are capped silently.
pub fn sanitize_weight(raw: f64, cap: f64) -> (f64, Option<WeightIssue>) {
    if raw.is_nan() {
        (0.0, Some(WeightIssue::NotANumber))
    } else if raw.is_infinite() {
        (0.0, Some(WeightIssue::Infinite))
    } else if raw < 0.0 {
        (0.0, Some(WeightIssue::Negative))
    } else {
        (raw.min(cap), None)
    }
}

/// Sum of weights, treating anything non-positive or non-finite as 0.
pub fn total_weight(weights: &[f64]) -> f64 {
    weights
        .iter()
        .filter(|w| w.is_finite() && **w > 0.0)
        .sum()
}

/// Pick the index whose cumulative interval contains `r`.
///
/// Returns `None` when every weight is zero. A draw at or past the total
/// (only possible through floating-point rounding by the caller) selects
/// the last candidate with positive weight.
pub fn select_index(weights: &[f64], r: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        if !(w.is_finite() && w > 0.0) {
            continue;
        }
        cumulative += w;
        last_positive = Some(i);
        if r < cumulative {
            return Some(i);
        }
    }
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference: explicit prefix sums and a linear interval search.
    fn reference_select(weights: &[f64], r: f64) -> Option<usize> {
        let mut prefix = Vec::with_capacity(weights.len() + 1);
        prefix.push(0.0);
        for w in weights {
            let last = *prefix.last().unwrap();
            prefix.push(last + w);
        }
        (0..weights.len()).find(|&i| prefix[i] <= r && r < prefix[i + 1])
    }

    #[test]
    fn test_sanitize_rejects_bad_weights() {
        assert_eq!(sanitize_weight(f64::NAN, 10.0), (0.0, Some(WeightIssue::NotANumber)));
        assert_eq!(
            sanitize_weight(f64::INFINITY, 10.0),
            (0.0, Some(WeightIssue::Infinite))
        );
        assert_eq!(sanitize_weight(-1.0, 10.0), (0.0, Some(WeightIssue::Negative)));
        assert_eq!(sanitize_weight(25.0, 10.0), (10.0, None));
        assert_eq!(sanitize_weight(0.0, 10.0), (0.0, None));
    }

    #[test]
    fn test_all_zero_selects_nothing() {
        assert_eq!(select_index(&[0.0, 0.0], 0.0), None);
        assert_eq!(select_index(&[], 0.5), None);
    }

    #[test]
    fn test_zero_weight_never_selected() {
        let weights = [0.0, 1.0, 0.0, 1.0, 0.0];
        for step in 0..200 {
            let r = step as f64 / 100.0;
            let i = select_index(&weights, r).unwrap();
            assert!(weights[i] > 0.0, "picked zero-weight index {} for r={}", i, r);
        }
    }

    #[test]
    fn test_rounding_overshoot_picks_last_positive() {
        assert_eq!(select_index(&[1.0, 2.0, 0.0], 3.0), Some(1));
    }

    #[test]
    fn test_matches_reference_on_random_vectors() {
        use lcg::Lcg;
        let mut lcg = Lcg(0x5eed);
        for _ in 0..2000 {
            let n = 1 + (lcg.uniform() * 12.0) as usize;
            let weights: Vec<f64> = (0..n)
                .map(|_| {
                    // roughly a quarter of candidates infeasible
                    if lcg.uniform() < 0.25 {
                        0.0
                    } else {
                        lcg.uniform() * 500.0
                    }
                })
                .collect();
            let total = total_weight(&weights);
            if total == 0.0 {
                assert_eq!(select_index(&weights, 0.0), None);
                continue;
            }
            for _ in 0..10 {
                let r = lcg.uniform() * total;
                assert_eq!(
                    select_index(&weights, r),
                    reference_select(&weights, r),
                    "weights {:?} r {}",
                    weights,
                    r
                );
            }
        }
    }

    /// Small deterministic generator; avoids a rand dev-dependency here.
    mod lcg {
        pub struct Lcg(pub u64);

        impl Lcg {
            /// Uniform in [0, 1).
            pub fn uniform(&mut self) -> f64 {
                self.0 = self
                    .0
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (self.0 >> 11) as f64 / (1u64 << 53) as f64
            }
        }
    }
}
