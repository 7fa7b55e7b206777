//! Empirical Shannon entropy estimators.
//!
//! All estimates are in bits per symbol. The conditional estimator is an
//! entropy-rate estimate: per-context entropies are weighted by how often the
//! context occurs and the total is divided by the full sequence length.
//! No smoothing is applied, so contexts seen once contribute zero and the
//! estimate is biased low for small samples relative to the number of
//! contexts (up to `2^order` for bits).

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{Error, Result};

/// Entropy in bits of a frequency table with `total` observations.
fn entropy_of_counts<'a>(counts: impl IntoIterator<Item = &'a u64>, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let mut h = 0.0;
    for &c in counts {
        if c > 0 {
            let p = c as f64 / total;
            h -= p * p.log2();
        }
    }
    h
}

/// Unconditional Shannon entropy `-Σ p_i log2 p_i` over the observed alphabet.
pub fn shannon_entropy<T: Hash + Eq>(data: &[T]) -> f64 {
    let mut counts: HashMap<&T, u64> = HashMap::new();
    for symbol in data {
        *counts.entry(symbol).or_insert(0) += 1;
    }
    entropy_of_counts(counts.values(), data.len() as u64)
}

/// Order-`k` conditional entropy rate in bits per symbol.
///
/// Order 0 equals [`shannon_entropy`].
pub fn conditional_entropy<T: Hash + Eq>(data: &[T], order: usize) -> Result<f64> {
    if data.is_empty() {
        return Ok(0.0);
    }
    if order > data.len() {
        return Err(Error::invalid(
            "order",
            format!(
                "context order {order} exceeds sequence length {}",
                data.len()
            ),
        ));
    }

    let mut contexts: HashMap<&[T], HashMap<&T, u64>> = HashMap::new();
    for i in order..data.len() {
        *contexts
            .entry(&data[i - order..i])
            .or_default()
            .entry(&data[i])
            .or_insert(0) += 1;
    }

    let weighted: f64 = contexts
        .values()
        .map(|next| {
            let occurrences: u64 = next.values().sum();
            occurrences as f64 * entropy_of_counts(next.values(), occurrences)
        })
        .sum();
    Ok(weighted / data.len() as f64)
}

/// Conditional entropy for every order in `0..=max_order`.
pub fn entropy_profile<T: Hash + Eq>(data: &[T], max_order: usize) -> Result<Vec<(usize, f64)>> {
    (0..=max_order)
        .map(|k| conditional_entropy(data, k).map(|h| (k, h)))
        .collect()
}
