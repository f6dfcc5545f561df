// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `npy` and `png`, their flags,
// and the options shared by both.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums, lists)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_config::{NpyPipelineConfig, PngPipelineConfig, TrainConfig};
use crate::data::{generator::PartialBatch, multi_source::CompositionPolicy};
use crate::infra::device::{BackendKind, DeviceConfig};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train on .npy arrays listed in a metadata CSV
    Npy(NpyArgs),

    /// Train on images in fold1..foldN class directories
    Png(PngArgs),
}

// ─── Value enums ──────────────────────────────────────────────────────────────
// Mirrors of the library enums so the lower layers stay clap-free.

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum BackendArg {
    #[default]
    Wgpu,
    NdArray,
}

impl From<BackendArg> for BackendKind {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Wgpu    => BackendKind::Wgpu,
            BackendArg::NdArray => BackendKind::NdArray,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum PartialBatchArg {
    #[default]
    Keep,
    Drop,
    Pad,
}

impl From<PartialBatchArg> for PartialBatch {
    fn from(p: PartialBatchArg) -> Self {
        match p {
            PartialBatchArg::Keep => PartialBatch::Keep,
            PartialBatchArg::Drop => PartialBatch::Drop,
            PartialBatchArg::Pad  => PartialBatch::Pad,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum MultiSourceArg {
    #[default]
    RoundRobin,
    Sequential,
}

impl From<MultiSourceArg> for CompositionPolicy {
    fn from(m: MultiSourceArg) -> Self {
        match m {
            MultiSourceArg::RoundRobin => CompositionPolicy::RoundRobin,
            MultiSourceArg::Sequential => CompositionPolicy::Sequential,
        }
    }
}

// ─── Shared options ───────────────────────────────────────────────────────────
/// Flags accepted before the subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Compute backend
    #[arg(long, value_enum, default_value_t = BackendArg::Wgpu, global = true)]
    pub backend: BackendArg,

    /// Seed for shuffling and weight initialisation
    #[arg(long, default_value_t = 7, global = true)]
    pub seed: u64,

    /// Directory to save checkpoints, metrics and the run config
    #[arg(long, default_value = "checkpoints", global = true)]
    pub checkpoint_dir: String,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 1, global = true)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 0.01, global = true)]
    pub lr: f64,

    /// Keep the manifest and epoch order as given
    #[arg(long, global = true)]
    pub no_shuffle: bool,
}

impl GlobalArgs {
    /// Combine with the per-pipeline sample settings.
    fn train_config(
        &self,
        batch_size: usize,
        n_classes:  usize,
        height:     usize,
        width:      usize,
        partial:    PartialBatchArg,
    ) -> TrainConfig {
        TrainConfig {
            checkpoint_dir: self.checkpoint_dir.clone(),
            epochs:         self.epochs,
            lr:             self.lr,
            batch_size,
            n_classes,
            height,
            width,
            shuffle:        !self.no_shuffle,
            seed:           self.seed,
            partial:        partial.into(),
            device:         DeviceConfig { backend: self.backend.into(), seed: self.seed },
            ..TrainConfig::default()
        }
    }
}

/// All arguments for the `npy` command.
#[derive(Args, Debug)]
pub struct NpyArgs {
    /// Metadata CSV with fsID, location, classID and fold columns
    pub metadata_csv: PathBuf,

    /// Directory the manifest locations are relative to
    pub base_dir: PathBuf,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Array height in rows
    #[arg(long, default_value_t = 128)]
    pub height: usize,

    /// Array width in columns
    #[arg(long, default_value_t = 128)]
    pub width: usize,

    #[arg(long, default_value_t = 10)]
    pub n_classes: usize,

    /// Folds to train on (default: every fold not used for validation)
    #[arg(long, value_delimiter = ',')]
    pub training_folds: Option<Vec<u32>>,

    /// Folds to validate on
    #[arg(long, value_delimiter = ',', default_value = "9")]
    pub validation_folds: Vec<u32>,

    /// What to do with the last batch when it is short
    #[arg(long, value_enum, default_value_t = PartialBatchArg::Keep)]
    pub partial_batch: PartialBatchArg,
}

impl NpyArgs {
    pub fn into_config(self, global: &GlobalArgs) -> NpyPipelineConfig {
        let train = global.train_config(
            self.batch_size, self.n_classes, self.height, self.width, self.partial_batch,
        );
        NpyPipelineConfig {
            metadata_csv:     self.metadata_csv,
            base_dir:         self.base_dir,
            training_folds:   self.training_folds,
            validation_folds: self.validation_folds,
            train,
        }
    }
}

/// All arguments for the `png` command.
#[derive(Args, Debug)]
pub struct PngArgs {
    /// Directory holding fold1..foldN
    pub base_dir: PathBuf,

    /// Fold to hold out for validation (1-based)
    #[arg(long, default_value_t = 1)]
    pub validation_fold: usize,

    /// Number of fold directories
    #[arg(long, default_value_t = 10)]
    pub fold_count: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Images are resized to this height
    #[arg(long, default_value_t = 128)]
    pub height: usize,

    /// Images are resized to this width
    #[arg(long, default_value_t = 128)]
    pub width: usize,

    #[arg(long, default_value_t = 10)]
    pub n_classes: usize,

    /// How batches from the training folds are interleaved
    #[arg(long, value_enum, default_value_t = MultiSourceArg::RoundRobin)]
    pub multi_source: MultiSourceArg,

    /// What to do with the last batch when it is short
    #[arg(long, value_enum, default_value_t = PartialBatchArg::Keep)]
    pub partial_batch: PartialBatchArg,
}

impl PngArgs {
    pub fn into_config(self, global: &GlobalArgs) -> PngPipelineConfig {
        let train = global.train_config(
            self.batch_size, self.n_classes, self.height, self.width, self.partial_batch,
        );
        PngPipelineConfig {
            base_dir:        self.base_dir,
            validation_fold: self.validation_fold,
            fold_count:      self.fold_count,
            multi_source:    self.multi_source.into(),
            train,
        }
    }
}
