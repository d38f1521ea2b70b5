//! Sampling and seeding helpers shared by the planning phases

use rand::{Rng, distr::StandardUniform};

/// Derive an independent seed for one unit of parallel work.
///
/// SplitMix64 finalizer over the base seed and two stream coordinates, so that
/// neighbouring descents (or iterations) get uncorrelated generators.
///
/// # Examples
///
/// ```
/// use plangraph::utils::mix_seed;
///
/// assert_eq!(mix_seed(7, 1, 2), mix_seed(7, 1, 2));
/// assert_ne!(mix_seed(7, 1, 2), mix_seed(7, 2, 1));
/// ```
pub fn mix_seed(base: u64, stream: u64, index: u64) -> u64 {
    let mut z = base
        ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ index.wrapping_mul(0xD1B5_4A32_D192_ED03);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Weighted random choice over `(item, weight)` pairs.
///
/// Weights need not sum to one; they are renormalized over the slice. Returns
/// `None` for an empty slice or a non-positive total weight.
///
/// # Examples
///
/// ```
/// use rand::{SeedableRng, rngs::StdRng};
/// use plangraph::utils::weighted_sample;
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let successors = [(10_u32, 0.8), (11, 0.2)];
/// assert!(weighted_sample(&mut rng, &successors).is_some());
/// assert_eq!(weighted_sample::<_, u32>(&mut rng, &[]), None);
/// ```
pub fn weighted_sample<R, T>(rng: &mut R, items: &[(T, f64)]) -> Option<T>
where
    R: Rng,
    T: Clone,
{
    let total: f64 = items.iter().map(|(_, w)| *w).sum();
    if items.is_empty() || !total.is_finite() || total <= 0.0 {
        return None;
    }

    let mut threshold = rng.sample::<f64, _>(StandardUniform) * total;
    for (item, weight) in items {
        if threshold < *weight {
            return Some(item.clone());
        }
        threshold -= weight;
    }

    // Rounding can leave a sliver past the last bucket.
    items
        .iter()
        .rev()
        .find(|(_, w)| *w > 0.0)
        .map(|(item, _)| item.clone())
}

/// Index of the highest score, breaking near-ties uniformly at random.
///
/// Scores within `f64::EPSILON` (scaled by magnitude) of the running maximum
/// count as tied; equal infinities tie as well.
pub fn argmax_random_tie<R: Rng>(rng: &mut R, scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    let mut ties = 0u32;

    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            None => {
                best = Some((index, score));
                ties = 1;
            }
            Some((_, best_score)) => {
                if nearly_equal(score, best_score) {
                    ties += 1;
                    if rng.random_range(0..ties) == 0 {
                        best = Some((index, best_score));
                    }
                } else if score > best_score {
                    best = Some((index, score));
                    ties = 1;
                }
            }
        }
    }

    best.map(|(index, _)| index)
}

fn nearly_equal(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= f64::EPSILON * 1.0_f64.max(a.abs()).max(b.abs())
}
