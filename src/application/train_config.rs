// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// Plain serde structs the CLI converts its arguments into.
// The application layer never sees clap types, and the whole
// config is written to train_config.json next to the weights.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::generator::{GeneratorConfig, PartialBatch};
use crate::data::multi_source::CompositionPolicy;
use crate::infra::device::DeviceConfig;
use crate::ml::model::ConvClassifierConfig;
use crate::ml::trainer::TrainOptions;

// ─── Training Configuration ──────────────────────────────────────────────────
// Hyperparameters shared by both pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub checkpoint_dir: String,
    pub epochs:         usize,
    pub lr:             f64,
    /// Weight of the L2 penalty on the dense kernels
    pub l2:             f64,
    pub batch_size:     usize,
    pub n_classes:      usize,
    pub height:         usize,
    pub width:          usize,
    pub shuffle:        bool,
    pub seed:           u64,
    pub partial:        PartialBatch,
    pub device:         DeviceConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: "checkpoints".to_string(),
            epochs:         1,
            lr:             0.01,
            l2:             0.001,
            batch_size:     64,
            n_classes:      10,
            height:         128,
            width:          128,
            shuffle:        true,
            seed:           7,
            partial:        PartialBatch::Keep,
            device:         DeviceConfig::default(),
        }
    }
}

impl TrainConfig {
    /// Generator settings for the training source.
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig::new((self.height, self.width), self.batch_size, self.n_classes)
            .with_shuffle(self.shuffle)
            .with_seed(self.seed)
            .with_partial(self.partial)
    }

    /// Generator settings for held-out sources: fixed order and every
    /// sample scored exactly once, whatever the training policy is.
    pub fn validation_generator_config(&self) -> GeneratorConfig {
        self.generator_config()
            .with_shuffle(false)
            .with_partial(PartialBatch::Keep)
    }

    /// Reject a model whose input or output does not match the samples
    /// the generators will produce.
    pub fn check_architecture(&self, model_cfg: &ConvClassifierConfig, channels: usize) -> Result<()> {
        if model_cfg.input_channels != channels
            || model_cfg.input_height != self.height
            || model_cfg.input_width != self.width
        {
            bail!(
                "Model expects input ({}, {}, {}) but samples are ({}, {}, {})",
                model_cfg.input_channels, model_cfg.input_height, model_cfg.input_width,
                channels, self.height, self.width,
            );
        }
        if model_cfg.num_classes != self.n_classes {
            bail!(
                "Model has {} output classes but labels are one-hot over {} classes",
                model_cfg.num_classes,
                self.n_classes
            );
        }
        model_cfg.validate()
    }

    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            epochs: self.epochs,
            lr:     self.lr,
            l2:     self.l2,
        }
    }
}

/// Array pipeline: manifest CSV + one `.npy` file per sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpyPipelineConfig {
    pub metadata_csv:     PathBuf,
    pub base_dir:         PathBuf,
    /// None → every manifest fold that is not a validation fold
    pub training_folds:   Option<Vec<u32>>,
    pub validation_folds: Vec<u32>,
    pub train:            TrainConfig,
}

/// Directory pipeline: `<base>/fold{1..N}/<class>/<images>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PngPipelineConfig {
    pub base_dir:        PathBuf,
    /// 1-based
    pub validation_fold: usize,
    pub fold_count:      usize,
    pub multi_source:    CompositionPolicy,
    pub train:           TrainConfig,
}
