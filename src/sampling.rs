//! Random choice helpers shared by the synthesizer

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Pick a uniformly random element from a slice.
///
/// Panics if `options` is empty.
pub fn pick<'a, T>(rng: &mut ChaCha8Rng, options: &'a [T]) -> &'a T {
    &options[rng.gen_range(0..options.len())]
}

/// Weighted choice via a cumulative-distribution draw over relative
/// weights. Weights need not sum to 1; entries with non-positive weight
/// are never picked.
///
/// Panics if `options` is empty or the total weight is not positive.
pub fn weighted_pick<'a, T>(rng: &mut ChaCha8Rng, options: &'a [(T, f64)]) -> &'a T {
    let total: f64 = options.iter().map(|(_, w)| w.max(0.0)).sum();
    let mut r = rng.gen_range(0.0..total);

    let mut last = &options[0].0;
    for (item, weight) in options {
        if *weight <= 0.0 {
            continue;
        }
        if r < *weight {
            return item;
        }
        r -= *weight;
        last = item;
    }
    // Floating-point rounding can leave a sliver past the last entry
    last
}
