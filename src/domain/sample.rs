// ============================================================
// Layer 3 — Labeled Sample
// ============================================================
// One decoded training example: pixel (or spectrogram) values
// laid out channel-first, plus the label in both integer and
// one-hot form.
//
// Layout is CHW because Burn's Conv2d expects tensors shaped
// [batch, channels, height, width].

use serde::{Deserialize, Serialize};

/// A single input ready to be stacked into a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    /// Where the sample came from (sample ID or image path)
    pub id: String,

    /// Flattened values in [channels, height, width] order
    pub values: Vec<f32>,

    /// [channels, height, width]
    pub shape: [usize; 3],

    /// Class index in [0, n_classes)
    pub label: usize,

    /// One-hot encoding of `label`, length n_classes
    pub one_hot: Vec<f32>,
}

impl LabeledSample {
    /// Number of classes this sample was encoded against
    pub fn n_classes(&self) -> usize {
        self.one_hot.len()
    }
}
