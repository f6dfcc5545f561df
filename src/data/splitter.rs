// ============================================================
// Layer 4 — Fold Holdout Splitter
// ============================================================
// Splits data into training and validation sets along the
// dataset's pre-made cross-validation folds:
//   - Training set:   every fold except the held-out one(s)
//   - Validation set: the held-out fold(s)
//
// Why folds instead of a random split?
//   Samples cut from the same recording end up in the same
//   fold. A random split would leak near-duplicates across
//   the train/validation boundary and inflate accuracy.
//
// Two flavours:
//   holdout_fold       → pick the k-th item (1-based) of a list,
//                        e.g. fold1..fold10 directories
//   partition_by_folds → route manifest rows by fold number
//
// Neither resamples: order on each side is the input order.

use std::collections::BTreeSet;

use crate::data::error::DataError;
use crate::domain::fold::FoldSplit;
use crate::domain::manifest::ManifestRecord;

/// Hold out the `k`-th item (1-based) and train on the rest.
///
/// # Example
/// ```ignore
/// let split = holdout_fold(dirs, 1)?;
/// // split.validation == [fold1], split.train == [fold2..fold10]
/// ```
pub fn holdout_fold<T>(items: Vec<T>, k: usize) -> Result<FoldSplit<T>, DataError> {
    if k == 0 || k > items.len() {
        return Err(DataError::InvalidFolds(format!(
            "validation fold {k} is outside 1..={}",
            items.len()
        )));
    }

    let mut train      = Vec::with_capacity(items.len() - 1);
    let mut validation = Vec::with_capacity(1);
    for (i, item) in items.into_iter().enumerate() {
        if i + 1 == k {
            validation.push(item);
        } else {
            train.push(item);
        }
    }

    Ok(FoldSplit::new(train, validation, 0))
}

/// Route manifest rows to training or validation by their fold.
///
/// Rows whose fold is in neither list are dropped and counted in
/// `excluded`. A fold may not be listed on both sides.
pub fn partition_by_folds(
    records:          Vec<ManifestRecord>,
    training_folds:   &[u32],
    validation_folds: &[u32],
) -> Result<FoldSplit<ManifestRecord>, DataError> {
    if validation_folds.is_empty() {
        return Err(DataError::InvalidFolds(
            "at least one validation fold is required".to_string(),
        ));
    }

    let train_set: BTreeSet<u32> = training_folds.iter().copied().collect();
    let val_set:   BTreeSet<u32> = validation_folds.iter().copied().collect();

    let overlap: Vec<u32> = train_set.intersection(&val_set).copied().collect();
    if !overlap.is_empty() {
        return Err(DataError::InvalidFolds(format!(
            "folds {overlap:?} are listed for both training and validation"
        )));
    }

    let mut train      = Vec::new();
    let mut validation = Vec::new();
    let mut excluded   = 0usize;
    for r in records {
        if val_set.contains(&r.fold) {
            validation.push(r);
        } else if train_set.contains(&r.fold) {
            train.push(r);
        } else {
            excluded += 1;
        }
    }

    tracing::debug!(
        "Fold split: {} training, {} validation, {} excluded",
        train.len(),
        validation.len(),
        excluded,
    );

    Ok(FoldSplit::new(train, validation, excluded))
}

/// Every fold in `available` that is not a validation fold.
pub fn complement_folds(available: &BTreeSet<u32>, validation_folds: &[u32]) -> Vec<u32> {
    available
        .iter()
        .copied()
        .filter(|f| !validation_folds.contains(f))
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn fold_names() -> Vec<String> {
        (1..=10).map(|i| format!("fold{i}")).collect()
    }

    fn rows(folds: &[u32]) -> Vec<ManifestRecord> {
        folds
            .iter()
            .enumerate()
            .map(|(i, &f)| ManifestRecord::new(i.to_string(), format!("{i}.npy"), i % 10, f))
            .collect()
    }

    #[test]
    fn test_holdout_is_a_partition_for_every_fold() {
        for k in 1..=10 {
            let split = holdout_fold(fold_names(), k).unwrap();
            let train: HashSet<_> = split.train.iter().cloned().collect();
            let val:   HashSet<_> = split.validation.iter().cloned().collect();
            let all:   HashSet<_> = fold_names().into_iter().collect();

            assert!(train.is_disjoint(&val));
            assert_eq!(&train | &val, all);
            assert_eq!(split.validation, vec![format!("fold{k}")]);
            assert_eq!(split.train.len(), 9);
        }
    }

    #[test]
    fn test_holdout_preserves_order() {
        let split = holdout_fold(fold_names(), 3).unwrap();
        assert_eq!(split.train[0], "fold1");
        assert_eq!(split.train[2], "fold4");
    }

    #[test]
    fn test_holdout_rejects_out_of_range() {
        assert!(holdout_fold(fold_names(), 0).is_err());
        assert!(holdout_fold(fold_names(), 11).is_err());
    }

    #[test]
    fn test_partition_routes_rows_by_fold() {
        let folds: Vec<u32> = (0..20).map(|i| (i % 10) as u32 + 1).collect();
        let split = partition_by_folds(rows(&folds), &[1, 2, 3, 4, 5, 6, 7, 8], &[9]).unwrap();

        assert_eq!(split.train.len(), 16);
        assert_eq!(split.validation.len(), 2);
        assert_eq!(split.excluded, 2); // fold 10
        assert_eq!(split.total(), 20);
        assert!(split.validation.iter().all(|r| r.fold == 9));
        assert!(split.train.iter().all(|r| (1..=8).contains(&r.fold)));
    }

    #[test]
    fn test_partition_sides_are_disjoint() {
        let folds: Vec<u32> = (0..30).map(|i| (i % 10) as u32 + 1).collect();
        let split = partition_by_folds(rows(&folds), &[1, 2, 3], &[4, 5]).unwrap();
        let train: HashSet<_> = split.train.iter().map(|r| r.fs_id.clone()).collect();
        let val:   HashSet<_> = split.validation.iter().map(|r| r.fs_id.clone()).collect();
        assert!(train.is_disjoint(&val));
    }

    #[test]
    fn test_partition_rejects_overlapping_folds() {
        let err = partition_by_folds(rows(&[1, 2]), &[1, 2], &[2]).unwrap_err();
        assert!(matches!(err, DataError::InvalidFolds(_)));
    }

    #[test]
    fn test_partition_requires_validation_fold() {
        assert!(partition_by_folds(rows(&[1]), &[1], &[]).is_err());
    }

    #[test]
    fn test_complement_folds() {
        let available: BTreeSet<u32> = (1..=10).collect();
        assert_eq!(
            complement_folds(&available, &[9]),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 10]
        );
    }
}
