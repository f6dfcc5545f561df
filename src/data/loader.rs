// ============================================================
// Layer 4 — Manifest Loader
// ============================================================
// Reads the metadata CSV that drives the array pipeline using
// the csv crate's serde integration.
//
// Each row deserialises straight into a ManifestRecord; columns
// we don't model are skipped. After loading we enforce the one
// invariant the rest of the pipeline relies on: every fsID is
// unique, so the ID → label and ID → location maps are total
// functions over the manifest.
//
// Reference: csv crate documentation (Reader::deserialize)
//            Rust Book §9 (Error Handling)

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::error::DataError;
use crate::domain::manifest::ManifestRecord;

/// All rows of one manifest, in file order (or shuffled order).
#[derive(Debug, Clone)]
pub struct Manifest {
    records: Vec<ManifestRecord>,
}

impl Manifest {
    /// Build a manifest from records, rejecting duplicate IDs.
    pub fn new(records: Vec<ManifestRecord>) -> Result<Self, DataError> {
        let mut seen = HashSet::with_capacity(records.len());
        for r in &records {
            if !seen.insert(r.fs_id.as_str()) {
                return Err(DataError::DuplicateId(r.fs_id.clone()));
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[ManifestRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ManifestRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Permute the rows with a seeded RNG (same seed, same order).
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.records.shuffle(&mut rng);
    }

    /// fsID → classID
    pub fn labels(&self) -> HashMap<String, usize> {
        self.records
            .iter()
            .map(|r| (r.fs_id.clone(), r.class_id))
            .collect()
    }

    /// fsID → relative file location
    pub fn locations(&self) -> HashMap<String, String> {
        self.records
            .iter()
            .map(|r| (r.fs_id.clone(), r.location.clone()))
            .collect()
    }

    /// Distinct fold numbers, ascending
    pub fn folds(&self) -> BTreeSet<u32> {
        self.records.iter().map(|r| r.fold).collect()
    }
}

/// Loads a manifest CSV from disk.
pub struct ManifestLoader {
    path: PathBuf,
}

impl ManifestLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read and validate every row of the CSV.
    pub fn load(&self) -> Result<Manifest, DataError> {
        let file = std::fs::File::open(&self.path).map_err(|source| DataError::Io {
            path: self.path.clone(),
            source,
        })?;
        let manifest = parse_manifest(file, &self.path)?;

        tracing::info!(
            "Loaded manifest '{}' with {} rows across folds {:?}",
            self.path.display(),
            manifest.len(),
            manifest.folds(),
        );
        Ok(manifest)
    }
}

/// Parse manifest rows from any reader. `source` is only used in errors.
pub fn parse_manifest<R: Read>(reader: R, source: &Path) -> Result<Manifest, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in rdr.deserialize::<ManifestRecord>() {
        let record = row.map_err(|e| DataError::Manifest {
            path:   source.to_path_buf(),
            source: e,
        })?;
        records.push(record);
    }

    Manifest::new(records)
}
