//! Weighted variant selection.
//!
//! [`select_variant`] walks variants in name order, accumulating weights, and picks the first
//! variant whose cumulative weight exceeds a draw in `[0, total_weight)`. Where the draw comes
//! from is decided by a [`DrawSource`]: [`BucketDraw`] for deterministic per-identity assignment,
//! [`RandomDraw`] for independent random assignment.
use std::collections::BTreeMap;

use rand::{rngs::ThreadRng, Rng};

use crate::{bucketer::TOTAL_BUCKETS, flags::VariantConfig};

/// Variant returned when there is nothing to choose from.
pub const CONTROL: &str = "control";

/// Produces a draw in `[0, total_weight)`. `total_weight` is always positive.
pub trait DrawSource {
    fn draw(&mut self, total_weight: u64) -> u64;
}

/// Deterministic draw derived from an identity's bucket, scaled to the total weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketDraw(pub u32);

impl DrawSource for BucketDraw {
    fn draw(&mut self, total_weight: u64) -> u64 {
        let bucket = u128::from(self.0 % TOTAL_BUCKETS);
        (bucket * u128::from(total_weight) / u128::from(TOTAL_BUCKETS)) as u64
    }
}

/// Uniform random draw from the wrapped random number generator.
///
/// Pass a seeded RNG to make selection reproducible in tests.
#[derive(Debug, Clone)]
pub struct RandomDraw<R>(pub R);

impl RandomDraw<ThreadRng> {
    pub fn thread_rng() -> Self {
        RandomDraw(rand::thread_rng())
    }
}

impl<R: Rng> DrawSource for RandomDraw<R> {
    fn draw(&mut self, total_weight: u64) -> u64 {
        self.0.gen_range(0..total_weight)
    }
}

/// Select a variant name proportionally to its weight.
///
/// - An empty map selects [`CONTROL`].
/// - If all weights are zero, the first variant (by name) is selected.
///
/// ```
/// use std::collections::BTreeMap;
/// use setbit::{select_variant, BucketDraw, VariantConfig};
///
/// let variants = BTreeMap::from([
///     ("control".to_owned(), VariantConfig { weight: 50 }),
///     ("variant_a".to_owned(), VariantConfig { weight: 50 }),
/// ]);
/// assert_eq!(select_variant(&variants, &mut BucketDraw(10)), "control");
/// assert_eq!(select_variant(&variants, &mut BucketDraw(90)), "variant_a");
/// ```
pub fn select_variant<'a>(
    variants: &'a BTreeMap<String, VariantConfig>,
    draw_source: &mut impl DrawSource,
) -> &'a str {
    let Some(first) = variants.keys().next() else {
        return CONTROL;
    };

    let total_weight: u64 = variants.values().map(|v| u64::from(v.weight)).sum();
    if total_weight == 0 {
        return first;
    }

    let draw = draw_source.draw(total_weight);

    let mut cumulative = 0u64;
    for (name, config) in variants {
        cumulative += u64::from(config.weight);
        if draw < cumulative {
            return name;
        }
    }

    // Only reachable if a draw source violates its contract.
    log::warn!(target: "setbit", draw, total_weight; "internal: draw out of range, selecting control");
    CONTROL
}
