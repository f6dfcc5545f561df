// ============================================================
// Layer 4 — Generator Settings and Epoch Ordering
// ============================================================
// Shared machinery behind every batch generator:
//
//   GeneratorConfig → batch size, target dims, class count,
//                     shuffle flag, seed, partial-batch policy
//   EpochOrder      → which sample indices go into which batch
//
// Ordering per epoch:
//   - shuffle on:  the whole index list is permuted once at the
//                  start of each epoch (never per batch)
//   - shuffle off: indices stay in input order
//
//   Input:  N = 10 samples, batch_size = 4
//   Order:  [7, 2, 9, 0, 4, 1, 8, 3, 6, 5]
//   Keep:   [7 2 9 0] [4 1 8 3] [6 5]        → ⌈N/B⌉ = 3 batches
//   Drop:   [7 2 9 0] [4 1 8 3]              → ⌊N/B⌋ = 2 batches
//   Pad:    [7 2 9 0] [4 1 8 3] [6 5 7 2]    → ⌈N/B⌉ = 3 batches
//
// The RNG is a seeded StdRng owned by the generator, so two
// generators built with the same seed walk the same orderings.
//
// Reference: rand crate documentation (SliceRandom, StdRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::error::DataError;

// ─── PartialBatch ─────────────────────────────────────────────────────────────
/// What to do with the leftover samples when N is not a multiple of B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PartialBatch {
    /// Emit a short final batch
    #[default]
    Keep,
    /// Skip the leftovers for this epoch
    Drop,
    /// Fill the final batch by wrapping around to the epoch's first samples
    Pad,
}

// ─── GeneratorConfig ──────────────────────────────────────────────────────────
/// Settings common to the array and image generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// (height, width) every sample is validated or resized to
    pub dims:       (usize, usize),
    pub batch_size: usize,
    pub n_classes:  usize,
    pub shuffle:    bool,
    pub seed:       u64,
    pub partial:    PartialBatch,
}

impl GeneratorConfig {
    pub fn new(dims: (usize, usize), batch_size: usize, n_classes: usize) -> Self {
        Self {
            dims,
            batch_size,
            n_classes,
            shuffle: true,
            seed:    7,
            partial: PartialBatch::Keep,
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_partial(mut self, partial: PartialBatch) -> Self {
        self.partial = partial;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), DataError> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidConfig("batch size must be positive".into()));
        }
        if self.n_classes == 0 {
            return Err(DataError::InvalidConfig("class count must be positive".into()));
        }
        if self.dims.0 == 0 || self.dims.1 == 0 {
            return Err(DataError::InvalidConfig(format!(
                "sample dims {:?} must be positive",
                self.dims
            )));
        }
        Ok(())
    }
}

// ─── EpochOrder ───────────────────────────────────────────────────────────────
/// Cursor over a (possibly shuffled) index permutation.
#[derive(Debug)]
pub struct EpochOrder {
    order:      Vec<usize>,
    cursor:     usize,
    batch_size: usize,
    partial:    PartialBatch,
    shuffle:    bool,
    rng:        StdRng,
}

impl EpochOrder {
    /// Order over `len` samples; the first epoch is shuffled immediately.
    pub fn new(len: usize, cfg: &GeneratorConfig) -> Result<Self, DataError> {
        if len == 0 {
            return Err(DataError::InvalidConfig("generator has no samples".into()));
        }
        if cfg.batch_size == 0 {
            return Err(DataError::InvalidConfig("batch size must be positive".into()));
        }

        let mut order = Self {
            order:      (0..len).collect(),
            cursor:     0,
            batch_size: cfg.batch_size,
            partial:    cfg.partial,
            shuffle:    cfg.shuffle,
            rng:        StdRng::seed_from_u64(cfg.seed),
        };
        order.permute();
        Ok(order)
    }

    fn permute(&mut self) {
        if self.shuffle {
            self.order.shuffle(&mut self.rng);
        }
    }

    /// Batches one epoch yields under the configured policy
    pub fn batches_per_epoch(&self) -> usize {
        let n = self.order.len();
        match self.partial {
            PartialBatch::Drop => n / self.batch_size,
            PartialBatch::Keep | PartialBatch::Pad => n.div_ceil(self.batch_size),
        }
    }

    /// Sample indices for the next batch, or None at the end of the epoch.
    pub fn next_indices(&mut self) -> Option<Vec<usize>> {
        let n         = self.order.len();
        let remaining = n - self.cursor;
        if remaining == 0 {
            return None;
        }

        if remaining >= self.batch_size {
            let start = self.cursor;
            self.cursor += self.batch_size;
            return Some(self.order[start..self.cursor].to_vec());
        }

        let start = self.cursor;
        self.cursor = n;
        match self.partial {
            PartialBatch::Keep => Some(self.order[start..].to_vec()),
            PartialBatch::Drop => None,
            PartialBatch::Pad => {
                let mut idx = self.order[start..].to_vec();
                let missing = self.batch_size - remaining;
                idx.extend((0..missing).map(|i| self.order[i % n]));
                Some(idx)
            }
        }
    }

    /// Start the next epoch: rewind and reshuffle.
    pub fn next_epoch(&mut self) {
        self.cursor = 0;
        self.permute();
    }

    /// The index permutation of the current epoch
    #[cfg(test)]
    pub(crate) fn current(&self) -> &[usize] {
        &self.order
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(batch_size: usize, shuffle: bool, partial: PartialBatch) -> GeneratorConfig {
        GeneratorConfig::new((1, 1), batch_size, 2)
            .with_shuffle(shuffle)
            .with_partial(partial)
    }

    fn drain(order: &mut EpochOrder) -> Vec<Vec<usize>> {
        std::iter::from_fn(|| order.next_indices()).collect()
    }

    #[test]
    fn test_keep_yields_ceil_batches() {
        for n in 1..30 {
            for b in 1..8 {
                let mut o = EpochOrder::new(n, &cfg(b, true, PartialBatch::Keep)).unwrap();
                let batches = drain(&mut o);
                assert_eq!(batches.len(), n.div_ceil(b));
                assert_eq!(batches.len(), o.batches_per_epoch());
                let (last, full) = batches.split_last().unwrap();
                assert!(full.iter().all(|x| x.len() == b));
                assert!(!last.is_empty() && last.len() <= b);
                // Every sample exactly once
                let mut seen: Vec<usize> = batches.concat();
                seen.sort_unstable();
                assert_eq!(seen, (0..n).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_drop_skips_leftovers() {
        let mut o = EpochOrder::new(10, &cfg(4, false, PartialBatch::Drop)).unwrap();
        let batches = drain(&mut o);
        assert_eq!(batches, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);
        assert_eq!(o.batches_per_epoch(), 2);
    }

    #[test]
    fn test_pad_wraps_to_epoch_start() {
        let mut o = EpochOrder::new(10, &cfg(4, false, PartialBatch::Pad)).unwrap();
        let batches = drain(&mut o);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2], vec![8, 9, 0, 1]);
    }

    #[test]
    fn test_pad_with_batch_larger_than_dataset() {
        let mut o = EpochOrder::new(3, &cfg(7, false, PartialBatch::Pad)).unwrap();
        assert_eq!(o.next_indices().unwrap(), vec![0, 1, 2, 0, 1, 2, 0]);
        assert!(o.next_indices().is_none());
    }

    #[test]
    fn test_unshuffled_order_is_input_order() {
        let o = EpochOrder::new(6, &cfg(2, false, PartialBatch::Keep)).unwrap();
        assert_eq!(o.current(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_same_seed_same_first_epoch() {
        let a = EpochOrder::new(100, &cfg(8, true, PartialBatch::Keep)).unwrap();
        let b = EpochOrder::new(100, &cfg(8, true, PartialBatch::Keep)).unwrap();
        assert_eq!(a.current(), b.current());
        assert_ne!(a.current(), (0..100).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn test_reshuffles_once_per_epoch() {
        let mut o = EpochOrder::new(50, &cfg(10, true, PartialBatch::Keep)).unwrap();
        let first = o.current().to_vec();
        // Order must not move while the epoch is being consumed
        let _ = o.next_indices();
        assert_eq!(o.current(), first.as_slice());
        o.next_epoch();
        assert_ne!(o.current(), first.as_slice());
        assert_eq!(drain(&mut o).len(), 5);
    }

    #[test]
    fn test_empty_and_zero_batch_rejected() {
        assert!(EpochOrder::new(0, &cfg(4, true, PartialBatch::Keep)).is_err());
        assert!(EpochOrder::new(4, &cfg(0, true, PartialBatch::Keep)).is_err());
    }
}
