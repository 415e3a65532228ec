//! Combinatorial number system: converts between an integer rank and a
//! k-combination of non-negative integers.

use crate::errors::{NoiseCorrectionError, Result};

/// Binomial coefficient `C(n, k)`, or `None` if it does not fit in a `u64`.
pub fn binomial(n: usize, k: usize) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        // C(n, i) * (n - i) is always divisible by (i + 1).
        result = result * (n - i) as u128 / (i + 1) as u128;
        if result > u64::MAX as u128 {
            return None;
        }
    }
    Some(result as u64)
}

/// Returns the `rank`-th (0-indexed) k-combination of `{0, ..., domain - 1}`,
/// in decreasing order `c_k > ... > c_1`, such that
/// `rank = C(c_k, k) + ... + C(c_1, 1)`.
pub fn unrank(rank: u64, k: usize, domain: usize) -> Result<Vec<usize>> {
    let out_of_range = NoiseCorrectionError::InvalidRange { rank, k, domain };
    match binomial(domain, k) {
        Some(size) if rank >= size => return Err(out_of_range),
        // Too many combinations to count in a u64, every rank is valid.
        _ => {}
    }

    let mut combination = Vec::with_capacity(k);
    let mut target = rank;
    let mut upper = domain;
    for i in (1..=k).rev() {
        // Greedily find the largest c < upper with C(c, i) <= target.
        // C(i - 1, i) = 0, so this stops at i - 1 at the latest.
        let mut c = upper - 1;
        let value = loop {
            match binomial(c, i) {
                Some(value) if value <= target => break value,
                _ => c -= 1,
            }
        };
        combination.push(c);
        target -= value;
        upper = c;
    }

    Ok(combination)
}

/// Inverse of [`unrank`]. The combination may be given in any order.
/// Returns `None` if it contains duplicates or its rank overflows a `u64`.
pub fn rank(combination: &[usize]) -> Option<u64> {
    let mut sorted = combination.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    if sorted.windows(2).any(|pair| pair[0] == pair[1]) {
        return None;
    }

    let k = sorted.len();
    sorted
        .iter()
        .enumerate()
        .try_fold(0u64, |acc, (i, &c)| acc.checked_add(binomial(c, k - i)?))
}
