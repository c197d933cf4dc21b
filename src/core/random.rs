//! Seeded random source shared by every component of a run
//!
//! One `RandomSource` exists per simulation. It is passed explicitly to
//! whatever needs entropy; nothing in the crate touches `thread_rng`, so two
//! runs built from the same seed draw the same sequence.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::error::{Result, SimError};

/// Deterministic pseudo-random generator (ChaCha8)
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    rng: ChaCha8Rng,
}

impl RandomSource {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Resolve an optional configured seed, drawing one from OS entropy when absent.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self::from_seed(seed)
    }

    /// The seed this source was created from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform float in `[0, 1)`
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// True with probability `p`
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.uniform() < p
    }

    /// Uniform integer in `[low, high]`
    pub fn int_inclusive(&mut self, low: i64, high: i64) -> i64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    /// Pick one item with probability proportional to `weight(item)`.
    ///
    /// Fails with `InvalidWeights` for an empty slice, a negative or
    /// non-finite weight, or weights that sum to zero.
    pub fn choose_weighted<'a, T>(
        &mut self,
        items: &'a [T],
        weight: impl Fn(&T) -> f64,
    ) -> Result<&'a T> {
        items
            .choose_weighted(&mut self.rng, weight)
            .map_err(|e| SimError::InvalidWeights(e.to_string()))
    }

    /// In-place Fisher-Yates shuffle
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RandomSource::from_seed(7);
        let mut b = RandomSource::from_seed(7);
        for _ in 0..100 {
            assert_eq!(a.uniform().to_bits(), b.uniform().to_bits());
        }

        let mut xs: Vec<u32> = (0..50).collect();
        let mut ys = xs.clone();
        a.shuffle(&mut xs);
        b.shuffle(&mut ys);
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_uniform_range() {
        let mut rng = RandomSource::from_seed(1);
        for _ in 0..1000 {
            let v = rng.uniform();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_int_inclusive_hits_both_ends() {
        let mut rng = RandomSource::from_seed(3);
        let draws: Vec<i64> = (0..500).map(|_| rng.int_inclusive(1, 5)).collect();
        assert!(draws.iter().all(|d| (1..=5).contains(d)));
        assert!(draws.contains(&1));
        assert!(draws.contains(&5));

        // Degenerate range
        assert_eq!(rng.int_inclusive(4, 4), 4);
    }

    #[test]
    fn test_choose_weighted_reproducible() {
        let items = [1u32, 2, 3, 4];
        let mut a = RandomSource::from_seed(17);
        let mut b = RandomSource::from_seed(17);
        for _ in 0..100 {
            let x = a.choose_weighted(&items, |&i| i as f64).unwrap();
            let y = b.choose_weighted(&items, |&i| i as f64).unwrap();
            assert_eq!(x, y);
        }
    }

    #[test]
    fn test_choose_weighted_skips_zero_weight() {
        let items = ["never", "always", "never"];
        let mut rng = RandomSource::from_seed(2);
        for _ in 0..200 {
            let pick = rng
                .choose_weighted(&items[..], |s| if *s == "always" { 1.0 } else { 0.0 })
                .unwrap();
            assert_eq!(*pick, "always");
        }

        // Roughly proportional: weight 3 against weight 1
        let heavy = (0..2000)
            .filter(|_| *rng.choose_weighted(&[1.0, 3.0], |w| *w).unwrap() == 3.0)
            .count();
        assert!(heavy > 1300 && heavy < 1700, "got {}", heavy);
    }

    #[test]
    fn test_choose_weighted_rejects_bad_weights() {
        let mut rng = RandomSource::from_seed(4);
        let empty: [f64; 0] = [];
        assert!(matches!(
            rng.choose_weighted(&empty, |w| *w),
            Err(SimError::InvalidWeights(_))
        ));
        assert!(matches!(
            rng.choose_weighted(&[0.0, 0.0], |w| *w),
            Err(SimError::InvalidWeights(_))
        ));
        assert!(matches!(
            rng.choose_weighted(&[1.0, -1.0], |w| *w),
            Err(SimError::InvalidWeights(_))
        ));
    }

    #[test]
    fn test_choose_empty() {
        let mut rng = RandomSource::from_seed(5);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
        assert_eq!(rng.choose(&[9]), Some(&9));
    }

    #[test]
    fn test_optional_seed_is_recorded() {
        let rng = RandomSource::from_optional_seed(Some(42));
        assert_eq!(rng.seed(), 42);
    }
}
