// ============================================================
// Layer 4 — Classifier Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<LabeledSample>
// into tensors for the convolutional classifier.
//
// How batching works here:
//   Input:  N samples, each with C*H*W values and a one-hot label
//   Output: images  [N, C, H, W]
//           one_hot [N, K]   (categorical cross-entropy target)
//           targets [N]      (class index, for accuracy)
//
// Every sample in a batch comes from the same generator, so all
// shapes agree; we flatten into one Vec and reshape once.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::sample::LabeledSample;

// ─── ClassifierBatch ──────────────────────────────────────────────────────────
/// A batch of samples ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ClassifierBatch<B: Backend> {
    /// Inputs — shape: [batch_size, channels, height, width]
    pub images: Tensor<B, 4>,

    /// One-hot labels — shape: [batch_size, n_classes]
    pub one_hot: Tensor<B, 2>,

    /// Class indices — shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── ClassifierBatcher ────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct ClassifierBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ClassifierBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<LabeledSample, ClassifierBatch<B>> for ClassifierBatcher<B> {
    fn batch(&self, items: Vec<LabeledSample>) -> ClassifierBatch<B> {
        let batch_size = items.len();
        let [c, h, w]  = items[0].shape;
        let n_classes  = items[0].n_classes();
        debug_assert!(items.iter().all(|s| s.shape == [c, h, w]));

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .collect();

        let one_hot: Vec<f32> = items
            .iter()
            .flat_map(|s| s.one_hot.iter().copied())
            .collect();

        let targets: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, c, h, w]),
            &self.device,
        );
        let one_hot = Tensor::<B, 2>::from_data(
            TensorData::new(one_hot, [batch_size, n_classes]),
            &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device);

        ClassifierBatch { images, one_hot, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn sample(label: usize, fill: f32) -> LabeledSample {
        let mut one_hot = vec![0.0; 3];
        one_hot[label] = 1.0;
        LabeledSample {
            id: format!("{label}"),
            values: vec![fill; 2 * 2 * 2],
            shape: [2, 2, 2],
            label,
            one_hot,
        }
    }

    #[test]
    fn test_batch_shapes_and_values() {
        let batcher = ClassifierBatcher::<NdArray>::new(Default::default());
        let batch = batcher.batch(vec![sample(0, 0.5), sample(2, 1.0)]);

        assert_eq!(batch.images.dims(), [2, 2, 2, 2]);
        assert_eq!(batch.one_hot.dims(), [2, 3]);
        assert_eq!(batch.targets.dims(), [2]);

        let one_hot: Vec<f32> = batch.one_hot.into_data().to_vec().unwrap();
        assert_eq!(one_hot, vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);

        let targets: Vec<i64> = batch.targets.into_data().iter::<i64>().collect();
        assert_eq!(targets, vec![0, 2]);

        let pixels: Vec<f32> = batch.images.into_data().to_vec().unwrap();
        assert_eq!(pixels[..8], [0.5; 8]);
        assert_eq!(pixels[8..], [1.0; 8]);
    }
}
