// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training loop never knows where its data comes from.
// It only asks a BatchSource for the next batch until the
// epoch runs out, then tells the source the epoch ended.
//
// Implementations:
//   - NumpyBatchGenerator     → one .npy file per sample ID
//   - DirectoryBatchGenerator → images under one fold directory
//   - MultiSourceGenerator    → several sources as one dataset
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::sample::LabeledSample;

// ─── BatchSource ──────────────────────────────────────────────────────────────
/// Anything that can hand out labeled batches one epoch at a time.
pub trait BatchSource {
    /// Number of batches one full epoch yields
    fn batches_per_epoch(&self) -> usize;

    /// Number of distinct samples behind this source
    fn sample_count(&self) -> usize;

    /// Produce the next batch of the current epoch, or `None`
    /// once the epoch is exhausted.
    fn next_batch(&mut self) -> Result<Option<Vec<LabeledSample>>>;

    /// Rewind to the start of a new epoch, reshuffling if enabled.
    fn on_epoch_end(&mut self);
}

/// Lets `Box<dyn BatchSource>` be composed like any other source.
impl<S: BatchSource + ?Sized> BatchSource for Box<S> {
    fn batches_per_epoch(&self) -> usize {
        (**self).batches_per_epoch()
    }

    fn sample_count(&self) -> usize {
        (**self).sample_count()
    }

    fn next_batch(&mut self) -> Result<Option<Vec<LabeledSample>>> {
        (**self).next_batch()
    }

    fn on_epoch_end(&mut self) {
        (**self).on_epoch_end()
    }
}
