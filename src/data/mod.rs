// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from files on disk to tensor batches.
//
// Array pipeline (npy):
//
//   metadata.csv
//       │
//       ▼
//   ManifestLoader       → reads rows, rejects duplicate IDs
//       │
//       ▼
//   partition_by_folds   → training rows / validation rows
//       │
//       ▼
//   NumpyBatchGenerator  → one .npy per ID, one-hot labels
//
// Directory pipeline (png):
//
//   base/fold1..fold10
//       │
//       ▼
//   holdout_fold         → training folds / validation fold
//       │
//       ▼
//   DirectoryBatchGenerator (one per fold)
//       │
//       ▼
//   MultiSourceGenerator → training folds as one dataset
//
// Both end in:
//
//   ClassifierBatcher    → stacks samples into tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Typed failures of the data layer
pub mod error;

/// One-hot label expansion
pub mod encoding;

/// Reads the metadata CSV into a validated Manifest
pub mod loader;

/// Holds folds out for validation
pub mod splitter;

/// Batch sizing, shuffling and partial-batch policy shared by generators
pub mod generator;

/// Batch source over .npy files addressed by sample ID
pub mod npy_generator;

/// Batch source over the images in one fold directory
pub mod image_generator;

/// Composes several batch sources into one
pub mod multi_source;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
