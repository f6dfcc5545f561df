// ============================================================
// Layer 4 — One-Hot Encoding
// ============================================================
// Categorical cross-entropy compares the softmax output with a
// vector holding a single 1.0 at the true class:
//
//   label 3, 5 classes → [0, 0, 0, 1, 0]

use crate::data::error::DataError;

/// Expand `label` into a vector of length `n_classes`.
pub fn one_hot(label: usize, n_classes: usize) -> Result<Vec<f32>, DataError> {
    if label >= n_classes {
        return Err(DataError::LabelOutOfRange { label, n_classes });
    }
    let mut v = vec![0.0f32; n_classes];
    v[label] = 1.0;
    Ok(v)
}
