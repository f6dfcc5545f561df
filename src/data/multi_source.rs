// ============================================================
// Layer 4 — Multi-Source Generator
// ============================================================
// Presents several batch sources (one per training fold) as a
// single logical dataset.
//
// Every source is finite per epoch, so composition is a matter
// of interleaving, not of picking which infinite stream wins:
//
//   RoundRobin  (default)
//     fold2 b0, fold3 b0, ..., fold10 b0, fold2 b1, fold3 b1, ...
//     sources that run dry are skipped until the epoch ends
//
//   Sequential
//     fold2 b0..bN, then fold3 b0..bM, ... , then fold10
//
// The epoch ends once every source is exhausted. The epoch hook
// is forwarded to all sources so each reshuffles on its own.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::error::DataError;
use crate::domain::sample::LabeledSample;
use crate::domain::traits::BatchSource;

/// How batches from several sources are interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompositionPolicy {
    #[default]
    RoundRobin,
    Sequential,
}

/// Several batch sources behind one BatchSource.
pub struct MultiSourceGenerator<S: BatchSource> {
    sources:   Vec<S>,
    exhausted: Vec<bool>,
    cursor:    usize,
    policy:    CompositionPolicy,
}

impl<S: BatchSource> MultiSourceGenerator<S> {
    pub fn new(sources: Vec<S>, policy: CompositionPolicy) -> Result<Self, DataError> {
        if sources.is_empty() {
            return Err(DataError::InvalidConfig(
                "multi-source generator needs at least one source".into(),
            ));
        }
        let exhausted = vec![false; sources.len()];
        Ok(Self { sources, exhausted, cursor: 0, policy })
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    fn next_round_robin(&mut self) -> Result<Option<Vec<LabeledSample>>> {
        let n = self.sources.len();
        for _ in 0..n {
            let idx = self.cursor;
            self.cursor = (self.cursor + 1) % n;
            if self.exhausted[idx] {
                continue;
            }
            match self.sources[idx].next_batch()? {
                Some(batch) => return Ok(Some(batch)),
                None        => self.exhausted[idx] = true,
            }
        }
        Ok(None)
    }

    fn next_sequential(&mut self) -> Result<Option<Vec<LabeledSample>>> {
        while self.cursor < self.sources.len() {
            if !self.exhausted[self.cursor] {
                if let Some(batch) = self.sources[self.cursor].next_batch()? {
                    return Ok(Some(batch));
                }
                self.exhausted[self.cursor] = true;
            }
            self.cursor += 1;
        }
        Ok(None)
    }
}

impl<S: BatchSource> BatchSource for MultiSourceGenerator<S> {
    fn batches_per_epoch(&self) -> usize {
        self.sources.iter().map(|s| s.batches_per_epoch()).sum()
    }

    fn sample_count(&self) -> usize {
        self.sources.iter().map(|s| s.sample_count()).sum()
    }

    fn next_batch(&mut self) -> Result<Option<Vec<LabeledSample>>> {
        match self.policy {
            CompositionPolicy::RoundRobin => self.next_round_robin(),
            CompositionPolicy::Sequential => self.next_sequential(),
        }
    }

    fn on_epoch_end(&mut self) {
        for s in &mut self.sources {
            s.on_epoch_end();
        }
        self.exhausted.iter_mut().for_each(|e| *e = false);
        self.cursor = 0;
    }
}
