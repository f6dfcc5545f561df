// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one training run, for either input format.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing of results here (that's Layer 1)
//   - No direct file parsing (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Serialisable run configuration
pub mod train_config;

// Manifest + .npy arrays, fold lists, confusion matrix
pub mod npy_use_case;

// fold1..foldN image directories, one held-out fold
pub mod png_use_case;
