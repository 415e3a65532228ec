use std::{collections::BTreeMap, fmt::Debug};

use log::debug;
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

use super::estimator::CorrectedHistogram;
use crate::errors::{NoiseCorrectionError, Result};

/// Reassigns observations one at a time so that, together, they follow a
/// target distribution, while keeping as many observations unchanged as
/// possible.
///
/// The target mass is split in two pools: keys with at least one unit of
/// mass left (`large`) and keys with less (`small`, negatives clamped to 0).
/// Consuming a unit from a `large` key may move it to `small`; every key of
/// the target is in exactly one of the pools at all times.
#[derive(Debug, Clone)]
pub struct DistributionMatcher<K> {
    large: BTreeMap<K, f64>,
    small: BTreeMap<K, f64>,
    num_keys: usize,
}

impl<K: Ord + Clone + Debug> DistributionMatcher<K> {
    /// Fails with `Configuration` if the target mass is infinite, or too
    /// large to sum up.
    pub fn new(target: &CorrectedHistogram<K>) -> Result<Self> {
        let mut large = BTreeMap::new();
        let mut small = BTreeMap::new();
        for (key, &mass) in target {
            if mass >= 1.0 {
                large.insert(key.clone(), mass);
            } else {
                // Clamping negatives biases the result, but no output can
                // be assigned fewer than 0 times. NaN is clamped as well.
                small.insert(key.clone(), mass.max(0.0));
            }
        }

        // Weighted sampling needs a finite total.
        let total_mass: f64 = large.values().sum();
        if !total_mass.is_finite() {
            return Err(NoiseCorrectionError::Configuration(format!(
                "target mass of {} outputs is not finite",
                target.len()
            )));
        }

        Ok(Self {
            large,
            small,
            num_keys: target.len(),
        })
    }

    /// Remaining mass of keys with at least one unit left.
    pub fn large(&self) -> &BTreeMap<K, f64> {
        &self.large
    }

    /// Remaining mass of keys with less than one unit left.
    pub fn small(&self) -> &BTreeMap<K, f64> {
        &self.small
    }

    /// Whether every key of the target is in exactly one pool.
    pub fn is_consistent(&self) -> bool {
        self.large.len() + self.small.len() == self.num_keys
            && self.large.keys().all(|key| !self.small.contains_key(key))
    }

    fn consume_large(&mut self, key: &K) {
        if let Some(mass) = self.large.get_mut(key) {
            *mass -= 1.0;
            if *mass < 1.0 {
                let mass = *mass;
                self.large.remove(key);
                self.small.insert(key.clone(), mass);
            }
        }
    }

    /// Returns the adjusted value for one observation.
    pub fn adjust<R: Rng + ?Sized>(
        &mut self,
        value: &K,
        fallback: &K,
        rng: &mut R,
    ) -> Result<K> {
        // Keep the observation if the target still has mass for it.
        if self.large.contains_key(value) {
            self.consume_large(value);
            return Ok(value.clone());
        }
        if !self.small.contains_key(value) {
            return Err(NoiseCorrectionError::UnknownOutput(format!("{value:?}")));
        }

        // Otherwise substitute a key that still has enough mass.
        if let Some(key) = sample_weighted(&self.large, rng) {
            self.consume_large(&key);
            return Ok(key);
        }

        // Otherwise sample from the leftover fractional mass, with
        // replacement. Missing mass goes to the fallback, which slightly
        // biases the result towards it.
        let total_mass: f64 = self.small.values().sum();
        if rng.gen::<f64>() < total_mass {
            if let Some(key) = sample_weighted(&self.small, rng) {
                return Ok(key);
            }
        }
        Ok(fallback.clone())
    }
}

fn sample_weighted<K: Clone, R: Rng + ?Sized>(
    weights: &BTreeMap<K, f64>,
    rng: &mut R,
) -> Option<K> {
    // Fails on empty or all-zero weights.
    let index = WeightedIndex::new(weights.values()).ok()?.sample(rng);
    weights.keys().nth(index).cloned()
}

/// Adjusts `values` to match the `target` distribution, one output per
/// input, in order. Every value must be a key of `target`.
///
/// Values are processed in order and later ones see a more depleted target,
/// so callers should shuffle `values` first.
pub fn adjust_to_match_distribution<K: Ord + Clone + Debug, R: Rng + ?Sized>(
    values: &[K],
    target: &CorrectedHistogram<K>,
    fallback: K,
    rng: &mut R,
) -> Result<Vec<K>> {
    let mut matcher = DistributionMatcher::new(target)?;
    let mut adjusted = Vec::with_capacity(values.len());
    for value in values {
        adjusted.push(matcher.adjust(value, &fallback, rng)?);
        debug_assert!(matcher.is_consistent());
    }

    let changed = values
        .iter()
        .zip(&adjusted)
        .filter(|(before, after)| before != after)
        .count();
    debug!("Adjusted {changed} of {} values", values.len());
    Ok(adjusted)
}
