// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing the concepts the
// rest of the system is built around: manifest rows, labeled
// samples, fold partitions and the batch-source abstraction.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Data loading (Layer 4) produces these types, the training
// loop (Layer 5) consumes them.

// One row of the .npy manifest CSV
pub mod manifest;

// A decoded input plus its one-hot label
pub mod sample;

// Train/validation partitions over folds
pub mod fold;

// Core abstractions (traits) that other layers implement
pub mod traits;
