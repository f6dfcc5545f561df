// ============================================================
// Layer 3 — Manifest Record
// ============================================================
// One row of the metadata CSV used by the array pipeline.
//
// Only four columns matter to us; any other columns in the
// file (slice names, timestamps, salience...) are ignored by
// the CSV reader because serde only asks for these fields.
//
//   fsID,location,classID,fold
//   100032,fold5/100032-3-0-0.npy,3,5

use serde::{Deserialize, Serialize};

/// A single sample described by the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Sample identifier, unique within one manifest
    #[serde(rename = "fsID")]
    pub fs_id: String,

    /// Path of the serialized array, relative to the base directory
    pub location: String,

    /// Integer class label in [0, n_classes)
    #[serde(rename = "classID")]
    pub class_id: usize,

    /// Cross-validation fold this sample belongs to
    pub fold: u32,
}

impl ManifestRecord {
    pub fn new(
        fs_id:    impl Into<String>,
        location: impl Into<String>,
        class_id: usize,
        fold:     u32,
    ) -> Self {
        Self {
            fs_id:    fs_id.into(),
            location: location.into(),
            class_id,
            fold,
        }
    }
}
