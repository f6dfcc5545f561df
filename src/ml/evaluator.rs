// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores a trained model on a held-out source:
//
//   1. predict_classes() runs every batch through the model and
//      takes the arg-max of the logits per sample
//   2. ConfusionMatrix::from_labels() lines predictions up with
//      the true labels (rows = truth, columns = prediction)
//
// The source must be unshuffled with PartialBatch::Keep so the
// prediction order matches the label order one to one.

use anyhow::{Context, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use std::fmt;
use thiserror::Error;

use crate::data::batcher::ClassifierBatcher;
use crate::domain::traits::BatchSource;
use crate::ml::model::Classifier;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("model produced {predicted} predictions for {expected} labels")]
    ShortPredictions { predicted: usize, expected: usize },

    #[error("class {class} is outside 0..{n_classes}")]
    ClassOutOfRange { class: usize, n_classes: usize },
}

/// Predicted class index for every sample `source` yields in one epoch.
pub fn predict_classes<B: Backend, M: Classifier<B>>(
    model:  &M,
    source: &mut dyn BatchSource,
    device: &B::Device,
) -> Result<Vec<usize>> {
    let batcher = ClassifierBatcher::<B>::new(device.clone());
    let mut predictions = Vec::with_capacity(source.sample_count());

    while let Some(items) = source.next_batch().context("Failed to load an evaluation batch")? {
        if items.is_empty() {
            continue;
        }
        let batch  = batcher.batch(items);
        let logits = model.logits(batch.images);
        let [n, _] = logits.dims();

        let classes: Tensor<B, 1, Int> = logits.argmax(1).reshape([n]);
        predictions.extend(classes.into_data().iter::<i64>().map(|c| c as usize));
    }
    source.on_epoch_end();

    tracing::debug!("Predicted {} samples", predictions.len());
    Ok(predictions)
}

// ─── ConfusionMatrix ──────────────────────────────────────────────────────────
/// `n_classes × n_classes` counts, rows = true class, columns = predicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    n_classes: usize,
    cells:     Vec<usize>,
}

impl ConfusionMatrix {
    /// Extra predictions past the end of `truth` are ignored;
    /// fewer predictions than labels is an error.
    pub fn from_labels(
        truth:     &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, EvalError> {
        if predicted.len() < truth.len() {
            return Err(EvalError::ShortPredictions {
                predicted: predicted.len(),
                expected:  truth.len(),
            });
        }
        if predicted.len() > truth.len() {
            tracing::warn!(
                "Truncating {} predictions to {} labels",
                predicted.len(),
                truth.len()
            );
        }

        let mut cells = vec![0usize; n_classes * n_classes];
        for (&t, &p) in truth.iter().zip(predicted) {
            for class in [t, p] {
                if class >= n_classes {
                    return Err(EvalError::ClassOutOfRange { class, n_classes });
                }
            }
            cells[t * n_classes + p] += 1;
        }
        Ok(Self { n_classes, cells })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Count of samples with true class `truth` predicted as `predicted`.
    pub fn get(&self, truth: usize, predicted: usize) -> usize {
        self.cells[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> usize {
        self.cells.iter().sum()
    }

    /// Trace over total; 0.0 for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let hits: usize = (0..self.n_classes).map(|c| self.get(c, c)).sum();
        hits as f64 / total as f64
    }

    /// Samples per true class (row sums).
    pub fn truth_counts(&self) -> Vec<usize> {
        self.cells.chunks(self.n_classes).map(|row| row.iter().sum()).collect()
    }

    /// Samples per predicted class (column sums).
    pub fn predicted_counts(&self) -> Vec<usize> {
        (0..self.n_classes)
            .map(|p| (0..self.n_classes).map(|t| self.get(t, p)).sum())
            .collect()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .cells
            .iter()
            .max()
            .map_or(1, |m| m.to_string().len())
            .max(self.n_classes.to_string().len());

        write!(f, "{:>6}", "t\\p")?;
        for p in 0..self.n_classes {
            write!(f, " {p:>width$}")?;
        }
        writeln!(f)?;

        for t in 0..self.n_classes {
            write!(f, "{t:>6}")?;
            for p in 0..self.n_classes {
                write!(f, " {:>width$}", self.get(t, p))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_counts() {
        let truth     = [0, 0, 1, 2, 2, 2];
        let predicted = [0, 1, 1, 2, 0, 2];
        let cm = ConfusionMatrix::from_labels(&truth, &predicted, 3).unwrap();

        assert_eq!(cm.get(0, 0), 1);
        assert_eq!(cm.get(0, 1), 1);
        assert_eq!(cm.get(2, 0), 1);
        assert_eq!(cm.get(2, 2), 2);
        assert_eq!(cm.total(), 6);
        assert!((cm.accuracy() - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(cm.truth_counts(), vec![2, 1, 3]);
        assert_eq!(cm.predicted_counts(), vec![2, 2, 2]);
    }

    #[test]
    fn test_extra_predictions_truncated() {
        let cm = ConfusionMatrix::from_labels(&[1, 0], &[1, 0, 1, 1], 2).unwrap();
        assert_eq!(cm.total(), 2);
        assert_eq!(cm.accuracy(), 1.0);
    }

    #[test]
    fn test_short_predictions_rejected() {
        let err = ConfusionMatrix::from_labels(&[0, 1, 1], &[0], 2).unwrap_err();
        assert_eq!(err, EvalError::ShortPredictions { predicted: 1, expected: 3 });
    }

    #[test]
    fn test_class_out_of_range() {
        let err = ConfusionMatrix::from_labels(&[0, 3], &[0, 0], 2).unwrap_err();
        assert_eq!(err, EvalError::ClassOutOfRange { class: 3, n_classes: 2 });
    }

    #[test]
    fn test_display_layout() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 0], 2).unwrap();
        let text = cm.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "     0 1 0");
        assert_eq!(lines[2], "     1 1 0");
    }

    #[test]
    fn test_empty_matrix_accuracy() {
        let cm = ConfusionMatrix::from_labels(&[], &[], 4).unwrap();
        assert_eq!(cm.accuracy(), 0.0);
    }
}
