use std::{collections::BTreeMap, fmt::Debug};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{NoiseCorrectionError, Result},
    output::Output,
};

/// Observed count for every output of the output space, zeros included.
pub type ObservedHistogram<K = Output> = BTreeMap<K, u64>;

/// Debiased estimate for every output. Values can be negative or fractional
/// and are kept as such, clamping is up to the consumer.
pub type CorrectedHistogram<K = Output> = BTreeMap<K, f64>;

/// Builds the observed histogram over `universe`. Every observation must be
/// part of the universe.
pub fn observe<'a, K: Ord + Clone + Debug + 'a>(
    universe: impl IntoIterator<Item = K>,
    observations: impl IntoIterator<Item = &'a K>,
) -> Result<ObservedHistogram<K>> {
    let mut histogram: ObservedHistogram<K> =
        universe.into_iter().map(|key| (key, 0)).collect();
    for observation in observations {
        let count = histogram.get_mut(observation).ok_or_else(|| {
            NoiseCorrectionError::UnknownOutput(format!("{observation:?}"))
        })?;
        *count += 1;
    }
    Ok(histogram)
}

/// Estimates the true counts behind k-ary randomized response, where each
/// true output is, with probability `flip_probability`, replaced by a
/// uniform draw over all `k` outputs.
///
/// With `n` observations in total and `x` the flip probability:
/// `estimate(v) = (v - (1 - beta) * n * x / k) / (1 - (1 - beta) * x)`.
///
/// `beta = 0` is unbiased: it matches formula 6 of
/// https://arxiv.org/pdf/1602.07387.pdf with `x = k / (k + e^eps - 1)`.
/// Larger `beta` shrinks the correction, trading bias for variance, and
/// `beta = 1` returns the observed counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebiasingEstimator {
    flip_probability: f64,
    beta: f64,
}

impl DebiasingEstimator {
    pub fn new(flip_probability: f64, beta: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&flip_probability) {
            return Err(NoiseCorrectionError::Configuration(format!(
                "flip_probability must be in [0, 1), got {flip_probability}"
            )));
        }
        if !(0.0..=1.0).contains(&beta) {
            return Err(NoiseCorrectionError::Configuration(format!(
                "beta must be in [0, 1], got {beta}"
            )));
        }
        Ok(Self {
            flip_probability,
            beta,
        })
    }

    pub fn unbiased(flip_probability: f64) -> Result<Self> {
        Self::new(flip_probability, 0.0)
    }

    pub fn flip_probability(&self) -> f64 {
        self.flip_probability
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Corrects every bucket of `observed` independently. `observed` must
    /// cover the whole output space, its size is `k`.
    pub fn estimate<K: Ord + Clone>(
        &self,
        observed: &ObservedHistogram<K>,
    ) -> CorrectedHistogram<K> {
        let n: u64 = observed.values().sum();
        let k = observed.len();
        if k == 0 {
            return CorrectedHistogram::new();
        }

        let x = (1.0 - self.beta) * self.flip_probability;
        let noise_per_bucket = n as f64 * x / k as f64;
        let scale = 1.0 - x;
        debug!(
            "Estimating {k} buckets from {n} observations, flip probability {}, beta {}",
            self.flip_probability, self.beta
        );

        observed
            .iter()
            .map(|(key, &v)| (key.clone(), (v as f64 - noise_per_bucket) / scale))
            .collect()
    }
}
