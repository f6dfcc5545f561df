// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns shared by both pipelines:
//
//   checkpoint.rs — improvement-only weight snapshots via Burn's
//                   CompactRecorder, plus the run config as JSON
//
//   metrics.rs    — per-epoch loss/accuracy appended to a CSV
//
//   device.rs     — explicit backend selection and seeding
//
// Reference: Burn Book §5 (Checkpointing)
//            Rust Book §9 (Error Handling with anyhow)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Backend choice and device initialisation
pub mod device;
