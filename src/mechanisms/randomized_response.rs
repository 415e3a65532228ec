//! k-ary randomized response: the noise model applied by the API, plus the
//! privacy accounting used to pick its flip probability.

use std::collections::{BTreeMap, HashMap};

use rand::{seq::SliceRandom, Rng};
use rand_distr::{Binomial, Distribution};
use serde::{Deserialize, Serialize};

use crate::errors::{NoiseCorrectionError, Result};

/// Iteration cap for the epsilon bisection.
const MAX_BISECTION_STEPS: usize = 200;

/// Returns the flip probability that makes k-RR over `num_states` outputs
/// satisfy `epsilon`-differential privacy.
pub fn flip_probability_dp(num_states: u64, epsilon: f64) -> f64 {
    let k = num_states as f64;
    k / (k + epsilon.exp() - 1.0)
}

pub fn binary_entropy(x: f64) -> f64 {
    if x == 0.0 || x == 1.0 {
        return 0.0;
    }
    -x * x.log2() - (1.0 - x) * (1.0 - x).log2()
}

/// Capacity of the q-ary symmetric channel, which keeps its input with
/// probability `1 - flip_probability` and otherwise moves it to one of the
/// other `q - 1` symbols uniformly.
fn capacity_q_ary_symmetric_channel(log2_q: f64, flip_probability: f64) -> f64 {
    log2_q
        - binary_entropy(flip_probability)
        - flip_probability * (log2_q.exp2() - 1.0).log2()
}

/// Maximum information, in bits, that a single source can leak through k-RR
/// over `num_states` outputs at the given `epsilon`.
pub fn max_information_gain(num_states: u64, epsilon: f64) -> f64 {
    if num_states <= 1 {
        return 0.0;
    }
    let k = num_states as f64;
    let flip_probability = flip_probability_dp(num_states, epsilon);
    // A flip can land on the true output, only (k - 1) / k of flips are seen.
    capacity_q_ary_symmetric_channel(k.log2(), flip_probability * (k - 1.0) / k)
}

/// Largest epsilon (up to `epsilon_upper_bound`, within `tolerance` bits)
/// whose information gain stays below `info_gain_upper_bound`.
pub fn epsilon_to_bound_info_gain(
    num_states: u64,
    info_gain_upper_bound: f64,
    epsilon_upper_bound: f64,
    tolerance: f64,
) -> f64 {
    let mut low = 0.0;
    let mut high = epsilon_upper_bound;

    for _ in 0..MAX_BISECTION_STEPS {
        let epsilon = (low + high) / 2.0;
        let info_gain = max_information_gain(num_states, epsilon);
        if info_gain > info_gain_upper_bound {
            high = epsilon;
        } else if info_gain < info_gain_upper_bound - tolerance && high != low {
            low = epsilon;
        } else {
            return epsilon;
        }
    }
    low
}

/// Per trigger data parameters of the flexible event-level API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerTriggerDataConfig {
    pub num_windows: usize,
    pub num_summary_buckets: usize,
}

/// Number of outputs of the flexible event-level API, where every trigger
/// data value `i` has its own `w_i` windows and `c_i` summary buckets.
///
/// With `A[C, w_1..w_B, c_1..c_B]` the number of outputs for a total report
/// cap `C`:
/// 1. `A = 1` if `B = 0`
/// 2. `A = A[C, w_1..w_{B-1}, c_1..c_{B-1}]` if `w_B = 0`
/// 3. `A = sum_{j=0}^{min(c_B, C)} A[C - j, w_1..w_B - 1, c_1..c_B - j]`
///
/// Saturates at `u64::MAX`.
pub fn num_flexible_states(
    max_reports: usize,
    per_trigger_data: &[PerTriggerDataConfig],
) -> Result<u64> {
    if let Some(config) = per_trigger_data.iter().find(|c| c.num_windows == 0) {
        return Err(NoiseCorrectionError::Configuration(format!(
            "every trigger data needs at least one window, got {config:?}"
        )));
    }
    let Some(last) = per_trigger_data.last() else {
        return Ok(1);
    };
    if max_reports == 0 {
        return Ok(1);
    }

    let mut memo = HashMap::new();
    Ok(count_states(
        per_trigger_data,
        &mut memo,
        max_reports,
        per_trigger_data.len() - 1,
        last.num_windows,
        last.num_summary_buckets,
    ))
}

fn count_states(
    configs: &[PerTriggerDataConfig],
    memo: &mut HashMap<(usize, usize, usize, usize), u64>,
    total_cap: usize,
    index: usize,
    windows: usize,
    buckets: usize,
) -> u64 {
    if index == 0 && windows == 0 {
        return 1;
    }
    let key = (total_cap, index, windows, buckets);
    if let Some(&count) = memo.get(&key) {
        return count;
    }

    let count = if windows == 0 {
        let previous = configs[index - 1];
        count_states(
            configs,
            memo,
            total_cap,
            index - 1,
            previous.num_windows,
            previous.num_summary_buckets,
        )
    } else {
        (0..=buckets.min(total_cap)).fold(0u64, |sum, j| {
            sum.saturating_add(count_states(
                configs,
                memo,
                total_cap - j,
                index,
                windows - 1,
                buckets - j,
            ))
        })
    };
    memo.insert(key, count);
    count
}

/// Applies k-RR to each value: with probability `flip_probability` it is
/// replaced by a uniform draw from `universe` (which may return the value
/// itself).
pub fn randomize<T: Clone, R: Rng + ?Sized>(
    values: &[T],
    universe: &[T],
    flip_probability: f64,
    rng: &mut R,
) -> Vec<T> {
    values
        .iter()
        .map(|value| {
            if rng.gen::<f64>() < flip_probability {
                universe.choose(&mut *rng).unwrap_or(value).clone()
            } else {
                value.clone()
            }
        })
        .collect()
}

/// Applies k-RR to a whole histogram at once. Every key of `true_counts` is
/// part of the universe.
pub fn randomize_histogram<K: Ord + Clone, R: Rng + ?Sized>(
    true_counts: &BTreeMap<K, u64>,
    flip_probability: f64,
    rng: &mut R,
) -> Result<BTreeMap<K, u64>> {
    let binomial = |n: u64, p: f64| {
        Binomial::new(n, p).map_err(|e| {
            NoiseCorrectionError::Configuration(format!(
                "invalid flip probability {flip_probability}: {e}"
            ))
        })
    };

    let mut noisy: BTreeMap<K, u64> = BTreeMap::new();
    let mut flipped_total = 0;
    for (key, &count) in true_counts {
        let flipped = binomial(count, flip_probability)?.sample(rng);
        flipped_total += flipped;
        noisy.insert(key.clone(), count - flipped);
    }

    // Spread the flipped values uniformly, one binomial draw per key.
    let k = noisy.len();
    let mut remaining = flipped_total;
    for (i, count) in noisy.values_mut().enumerate() {
        let landed = if i + 1 == k {
            remaining
        } else {
            binomial(remaining, 1.0 / (k - i) as f64)?.sample(rng)
        };
        *count += landed;
        remaining -= landed;
    }
    Ok(noisy)
}
