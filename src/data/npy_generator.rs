// ============================================================
// Layer 4 — Numpy Batch Generator
// ============================================================
// Turns a list of sample IDs into labeled batches by loading
// one serialized array per ID:
//
//   id ──► location[id] ──► base_dir/location ──► .npy ──► [1, H, W]
//   id ──► label[id]    ──► one_hot(label, n_classes)
//
// Everything that can be checked without touching the disk is
// checked at construction: every ID must have a label and a
// location, and every label must fit n_classes. A generator
// that was built successfully can only fail on file I/O or on
// an array with the wrong shape, and those failures are not
// retried.
//
// Arrays may be stored as float32 or float64; float64 is
// narrowed on load. Unit axes are ignored when checking shape,
// so (H, W), (H, W, 1) and (1, H, W) are all accepted.
//
// Reference: ndarray-npy crate documentation (read_npy)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use ndarray::ArrayD;
use ndarray_npy::read_npy;

use crate::data::encoding::one_hot;
use crate::data::error::DataError;
use crate::data::generator::{EpochOrder, GeneratorConfig};
use crate::domain::sample::LabeledSample;
use crate::domain::traits::BatchSource;

#[derive(Debug, Clone)]
struct NpyEntry {
    id:    String,
    path:  PathBuf,
    label: usize,
}

/// Batch source over `.npy` files addressed by sample ID.
#[derive(Debug)]
pub struct NumpyBatchGenerator {
    entries: Vec<NpyEntry>,
    order:   EpochOrder,
    cfg:     GeneratorConfig,
}

impl NumpyBatchGenerator {
    /// Resolve every ID against the label and location maps.
    ///
    /// Fails before any file is read if an ID lacks a mapping.
    pub fn new<S: AsRef<str>>(
        ids:       &[S],
        labels:    &HashMap<String, usize>,
        locations: &HashMap<String, String>,
        base_dir:  impl AsRef<Path>,
        cfg:       GeneratorConfig,
    ) -> Result<Self, DataError> {
        cfg.validate()?;
        let base_dir = base_dir.as_ref();

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            let label = *labels
                .get(id)
                .ok_or_else(|| DataError::MissingLabel(id.to_string()))?;
            let location = locations
                .get(id)
                .ok_or_else(|| DataError::MissingLocation(id.to_string()))?;
            if label >= cfg.n_classes {
                return Err(DataError::LabelOutOfRange { label, n_classes: cfg.n_classes });
            }
            entries.push(NpyEntry {
                id:   id.to_string(),
                path: base_dir.join(location),
                label,
            });
        }

        let order = EpochOrder::new(entries.len(), &cfg)?;
        tracing::debug!(
            "Numpy generator: {} samples, {} batches/epoch",
            entries.len(),
            order.batches_per_epoch()
        );

        Ok(Self { entries, order, cfg })
    }

    fn load_sample(&self, entry: &NpyEntry) -> Result<LabeledSample, DataError> {
        let (h, w) = self.cfg.dims;
        let values = load_array(&entry.path, (h, w))?;
        Ok(LabeledSample {
            id:      entry.id.clone(),
            values,
            shape:   [1, h, w],
            label:   entry.label,
            one_hot: one_hot(entry.label, self.cfg.n_classes)?,
        })
    }
}

impl BatchSource for NumpyBatchGenerator {
    fn batches_per_epoch(&self) -> usize {
        self.order.batches_per_epoch()
    }

    fn sample_count(&self) -> usize {
        self.entries.len()
    }

    fn next_batch(&mut self) -> Result<Option<Vec<LabeledSample>>> {
        let Some(indices) = self.order.next_indices() else {
            return Ok(None);
        };
        let batch = indices
            .iter()
            .map(|&i| self.load_sample(&self.entries[i]))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(batch))
    }

    fn on_epoch_end(&mut self) {
        self.order.next_epoch();
    }
}

/// Read one array and flatten it in logical (row-major) order.
pub fn load_array(path: &Path, dims: (usize, usize)) -> Result<Vec<f32>, DataError> {
    let array: ArrayD<f32> = match read_npy::<_, ArrayD<f32>>(path) {
        Ok(a) => a,
        Err(f32_err) => match read_npy::<_, ArrayD<f64>>(path) {
            Ok(a) => a.mapv(|v| v as f32),
            Err(_) => {
                return Err(DataError::Npy {
                    path:   path.to_path_buf(),
                    source: f32_err,
                })
            }
        },
    };

    let expected = [dims.0, dims.1];
    let squeeze = |shape: &[usize]| -> Vec<usize> {
        shape.iter().copied().filter(|&d| d != 1).collect()
    };
    if squeeze(array.shape()) != squeeze(&expected) {
        return Err(DataError::ShapeMismatch {
            path:     path.to_path_buf(),
            expected: expected.to_vec(),
            actual:   array.shape().to_vec(),
        });
    }

    Ok(array.iter().copied().collect())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generator::PartialBatch;
    use crate::data::splitter::partition_by_folds;
    use crate::domain::manifest::ManifestRecord;
    use ndarray::{Array2, Array3};
    use ndarray_npy::write_npy;

    /// Writes `n` 2x3 arrays filled with their index, returns the maps.
    fn fixture(
        dir: &Path,
        n:   usize,
    ) -> (Vec<String>, HashMap<String, usize>, HashMap<String, String>) {
        let mut ids       = Vec::new();
        let mut labels    = HashMap::new();
        let mut locations = HashMap::new();
        for i in 0..n {
            let id  = format!("s{i}");
            let rel = format!("s{i}.npy");
            write_npy(dir.join(&rel), &Array2::<f32>::from_elem((2, 3), i as f32)).unwrap();
            labels.insert(id.clone(), i % 4);
            locations.insert(id.clone(), rel);
            ids.push(id);
        }
        (ids, labels, locations)
    }

    fn cfg(batch_size: usize, shuffle: bool) -> GeneratorConfig {
        GeneratorConfig::new((2, 3), batch_size, 4)
            .with_shuffle(shuffle)
            .with_seed(42)
    }

    fn ids_of(batch: &[LabeledSample]) -> Vec<String> {
        batch.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn test_batches_per_epoch_and_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let (ids, labels, locs) = fixture(dir.path(), 10);
        let mut gen = NumpyBatchGenerator::new(&ids, &labels, &locs, dir.path(), cfg(4, true)).unwrap();

        assert_eq!(gen.batches_per_epoch(), 3);
        let mut sizes = Vec::new();
        while let Some(batch) = gen.next_batch().unwrap() {
            sizes.push(batch.len());
        }
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_sample_contents_and_labels() {
        let dir = tempfile::tempdir().unwrap();
        let (ids, labels, locs) = fixture(dir.path(), 5);
        let mut gen = NumpyBatchGenerator::new(&ids, &labels, &locs, dir.path(), cfg(5, false)).unwrap();

        let batch = gen.next_batch().unwrap().unwrap();
        let s3 = &batch[3];
        assert_eq!(s3.id, "s3");
        assert_eq!(s3.shape, [1, 2, 3]);
        assert_eq!(s3.values, vec![3.0; 6]);
        assert_eq!(s3.label, 3);
        assert_eq!(s3.one_hot, vec![0.0, 0.0, 0.0, 1.0]);
        assert!(gen.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_same_seed_same_first_epoch_batches() {
        let dir = tempfile::tempdir().unwrap();
        let (ids, labels, locs) = fixture(dir.path(), 12);
        let mut a = NumpyBatchGenerator::new(&ids, &labels, &locs, dir.path(), cfg(5, true)).unwrap();
        let mut b = NumpyBatchGenerator::new(&ids, &labels, &locs, dir.path(), cfg(5, true)).unwrap();

        while let Some(ba) = a.next_batch().unwrap() {
            let bb = b.next_batch().unwrap().unwrap();
            assert_eq!(ids_of(&ba), ids_of(&bb));
        }
        assert!(b.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_epoch_end_reshuffles_and_rewinds() {
        let dir = tempfile::tempdir().unwrap();
        let (ids, labels, locs) = fixture(dir.path(), 40);
        let mut gen = NumpyBatchGenerator::new(&ids, &labels, &locs, dir.path(), cfg(40, true)).unwrap();

        let first = ids_of(&gen.next_batch().unwrap().unwrap());
        assert!(gen.next_batch().unwrap().is_none());
        gen.on_epoch_end();
        let second = ids_of(&gen.next_batch().unwrap().unwrap());
        assert_ne!(first, second);

        let mut sorted_first  = first.clone();
        let mut sorted_second = second.clone();
        sorted_first.sort();
        sorted_second.sort();
        assert_eq!(sorted_first, sorted_second);
    }

    #[test]
    fn test_missing_label_fails_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ids, labels, mut locs) = fixture(dir.path(), 3);
        ids.push("ghost".into());
        locs.insert("ghost".into(), "ghost.npy".into());
        let err = NumpyBatchGenerator::new(&ids, &labels, &locs, dir.path(), cfg(2, true)).unwrap_err();
        assert!(matches!(err, DataError::MissingLabel(id) if id == "ghost"));
    }

    #[test]
    fn test_missing_location_fails_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ids, mut labels, locs) = fixture(dir.path(), 3);
        ids.push("ghost".into());
        labels.insert("ghost".into(), 1);
        let err = NumpyBatchGenerator::new(&ids, &labels, &locs, dir.path(), cfg(2, true)).unwrap_err();
        assert!(matches!(err, DataError::MissingLocation(id) if id == "ghost"));
    }

    #[test]
    fn test_label_out_of_range_fails_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let (ids, mut labels, locs) = fixture(dir.path(), 3);
        labels.insert("s0".into(), 9);
        let err = NumpyBatchGenerator::new(&ids, &labels, &locs, dir.path(), cfg(2, true)).unwrap_err();
        assert!(matches!(err, DataError::LabelOutOfRange { label: 9, n_classes: 4 }));
    }

    #[test]
    fn test_missing_file_fails_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let (ids, labels, locs) = fixture(dir.path(), 4);
        std::fs::remove_file(dir.path().join("s2.npy")).unwrap();
        let mut gen = NumpyBatchGenerator::new(&ids, &labels, &locs, dir.path(), cfg(4, false)).unwrap();
        assert!(gen.next_batch().is_err());
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.npy");
        write_npy(&path, &Array2::<f32>::zeros((3, 3))).unwrap();
        let err = load_array(&path, (2, 3)).unwrap_err();
        assert!(matches!(err, DataError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_unit_axes_and_f64_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chan.npy");
        let arr = Array3::<f64>::from_shape_fn((2, 3, 1), |(y, x, _)| (y * 3 + x) as f64);
        write_npy(&path, &arr).unwrap();
        let values = load_array(&path, (2, 3)).unwrap();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_manifest_scenario_batch_count() {
        // 20 rows: 15 in folds 1..=8, 3 in fold 9, 2 in fold 10
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<ManifestRecord> = (0..20)
            .map(|i| {
                let fold = match i {
                    0..=14  => (i % 8) as u32 + 1,
                    15..=17 => 9,
                    _       => 10,
                };
                let rel = format!("{i}.npy");
                write_npy(dir.path().join(&rel), &Array2::<f32>::zeros((2, 3))).unwrap();
                ManifestRecord::new(i.to_string(), rel, i % 4, fold)
            })
            .collect();
        let labels: HashMap<String, usize> =
            records.iter().map(|r| (r.fs_id.clone(), r.class_id)).collect();
        let locs: HashMap<String, String> =
            records.iter().map(|r| (r.fs_id.clone(), r.location.clone())).collect();

        let split = partition_by_folds(records, &[1, 2, 3, 4, 5, 6, 7, 8], &[9]).unwrap();
        let train_ids: Vec<String> = split.train.iter().map(|r| r.fs_id.clone()).collect();
        assert_eq!(train_ids.len(), 15);

        let mut gen = NumpyBatchGenerator::new(&train_ids, &labels, &locs, dir.path(), cfg(4, true)).unwrap();
        assert_eq!(gen.batches_per_epoch(), 4);

        let mut count = 0;
        while gen.next_batch().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn test_drop_policy_reduces_batch_count() {
        let dir = tempfile::tempdir().unwrap();
        let (ids, labels, locs) = fixture(dir.path(), 10);
        let cfg = cfg(4, false).with_partial(PartialBatch::Drop);
        let gen = NumpyBatchGenerator::new(&ids, &labels, &locs, dir.path(), cfg).unwrap();
        assert_eq!(gen.batches_per_epoch(), 2);
    }
}
