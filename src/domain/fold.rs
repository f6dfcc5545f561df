// ============================================================
// Layer 3 — Fold Split
// ============================================================
// The result of holding one or more folds out for validation.
//
// A split is a true set partition of its input: nothing is
// resampled, nothing appears on both sides. Rows whose fold was
// named in neither list are only counted, so callers can log
// how much of the dataset a run ignores.

/// A disjoint (train, validation) partition.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldSplit<T> {
    pub train:      Vec<T>,
    pub validation: Vec<T>,
    /// Items assigned to neither side
    pub excluded:   usize,
}

impl<T> FoldSplit<T> {
    pub fn new(train: Vec<T>, validation: Vec<T>, excluded: usize) -> Self {
        Self { train, validation, excluded }
    }

    /// Total number of items the split was built from
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len() + self.excluded
    }
}
