// ============================================================
// Layer 2 — NpyTrainUseCase
// ============================================================
// Orchestrates the array pipeline in order:
//
//   Step 1: Load the manifest CSV        (Layer 4 - data)
//   Step 2: Shuffle rows (seeded)        (Layer 4 - data)
//   Step 3: Partition rows by fold       (Layer 4 - data)
//   Step 4: Build the batch generators   (Layer 4 - data)
//   Step 5: Build the model config       (Layer 5 - ml)
//   Step 6: Save config                  (Layer 6 - infra)
//   Step 7: Run training loop            (Layer 5 - ml)
//   Step 8: Score the validation folds   (Layer 5 - ml)

use anyhow::{bail, Context, Result};
use burn::{
    backend::{Autodiff, NdArray, Wgpu},
    module::AutodiffModule,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_config::NpyPipelineConfig;
use crate::data::{
    loader::ManifestLoader,
    npy_generator::NumpyBatchGenerator,
    splitter::{complement_folds, partition_by_folds},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    device::{init_device, BackendKind},
    metrics::MetricsLogger,
};
use crate::ml::{
    evaluator::{predict_classes, ConfusionMatrix},
    model::ConvClassifierConfig,
    trainer::{self, TrainReport},
};

/// Outcome of an array-pipeline run.
#[derive(Debug)]
pub struct NpyReport {
    pub training:         TrainReport,
    pub training_folds:   Vec<u32>,
    pub validation_folds: Vec<u32>,
    pub confusion:        ConfusionMatrix,
}

/// Everything the backend-generic part of the run needs.
struct Prepared {
    train_gen: NumpyBatchGenerator,
    val_gen:   NumpyBatchGenerator,
    eval_gen:  NumpyBatchGenerator,
    truth:     Vec<usize>,
    model_cfg: ConvClassifierConfig,
}

pub struct NpyTrainUseCase {
    config:       NpyPipelineConfig,
    architecture: Option<ConvClassifierConfig>,
}

impl NpyTrainUseCase {
    pub fn new(config: NpyPipelineConfig) -> Self {
        Self { config, architecture: None }
    }

    /// Replace the default architecture. Input shape must be (1, H, W).
    pub fn with_architecture(mut self, model_cfg: ConvClassifierConfig) -> Self {
        self.architecture = Some(model_cfg);
        self
    }

    /// Execute the full pipeline end to end
    pub fn execute(&self) -> Result<NpyReport> {
        let cfg   = &self.config;
        let train = &cfg.train;

        // ── Step 1: Load the manifest ─────────────────────────────────────────
        tracing::info!("Loading manifest '{}'", cfg.metadata_csv.display());
        let mut manifest = ManifestLoader::new(&cfg.metadata_csv)
            .load()
            .with_context(|| format!("Cannot load manifest '{}'", cfg.metadata_csv.display()))?;
        tracing::info!("Loaded {} manifest rows", manifest.len());

        // ── Step 2: Shuffle rows ──────────────────────────────────────────────
        if train.shuffle {
            manifest.shuffle(train.seed);
        }

        let labels    = manifest.labels();
        let locations = manifest.locations();

        // ── Step 3: Partition by fold ─────────────────────────────────────────
        let training_folds = cfg
            .training_folds
            .clone()
            .unwrap_or_else(|| complement_folds(&manifest.folds(), &cfg.validation_folds));
        tracing::info!(
            "Training folds {:?}, validation folds {:?}",
            training_folds,
            cfg.validation_folds
        );

        let split = partition_by_folds(
            manifest.into_records(),
            &training_folds,
            &cfg.validation_folds,
        )?;
        if split.excluded > 0 {
            tracing::warn!("{} manifest rows belong to neither fold list", split.excluded);
        }
        tracing::info!(
            "Split: {} train, {} validation",
            split.train.len(),
            split.validation.len()
        );

        let train_ids: Vec<&str> = split.train.iter().map(|r| r.fs_id.as_str()).collect();
        let val_ids:   Vec<&str> = split.validation.iter().map(|r| r.fs_id.as_str()).collect();
        let truth:     Vec<usize> = split.validation.iter().map(|r| r.class_id).collect();

        // ── Step 4: Build generators ──────────────────────────────────────────
        let gen_cfg = train.generator_config();
        let train_gen = NumpyBatchGenerator::new(
            &train_ids, &labels, &locations, &cfg.base_dir, gen_cfg,
        ).context("Cannot build the training generator")?;

        // Validation and evaluation score every held-out row exactly once,
        // in label order, whatever --partial-batch says for training
        let val_cfg = train.validation_generator_config();
        let val_gen = NumpyBatchGenerator::new(
            &val_ids, &labels, &locations, &cfg.base_dir, val_cfg.clone(),
        ).context("Cannot build the validation generator")?;
        let eval_gen = NumpyBatchGenerator::new(
            &val_ids, &labels, &locations, &cfg.base_dir, val_cfg,
        ).context("Cannot build the evaluation generator")?;

        // ── Step 5: Model config ──────────────────────────────────────────────
        let model_cfg = self.architecture.clone().unwrap_or_else(|| {
            ConvClassifierConfig::new(1, train.height, train.width, train.n_classes)
        });
        train.check_architecture(&model_cfg, 1)?;
        tracing::info!("Model summary:\n{}", model_cfg.summary());

        // ── Step 6: Save config ───────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&train.checkpoint_dir, "")?;
        ckpt.save_config(cfg)?;

        // ── Step 7 + 8: Train and evaluate on the chosen backend ─────────────
        let prepared = Prepared { train_gen, val_gen, eval_gen, truth, model_cfg };
        let (training, confusion) = match train.device.backend {
            BackendKind::Wgpu    => self.run::<Autodiff<Wgpu>>(prepared, ckpt)?,
            BackendKind::NdArray => self.run::<Autodiff<NdArray>>(prepared, ckpt)?,
        };

        Ok(NpyReport {
            training,
            training_folds,
            validation_folds: cfg.validation_folds.clone(),
            confusion,
        })
    }

    fn run<B: AutodiffBackend>(
        &self,
        mut prepared: Prepared,
        mut ckpt:     CheckpointManager,
    ) -> Result<(TrainReport, ConfusionMatrix)> {
        let train   = &self.config.train;
        let device  = init_device::<B>(&train.device);
        let metrics = MetricsLogger::new(&train.checkpoint_dir)?;

        let model = prepared.model_cfg.init::<B>(&device);
        let (model, report) = trainer::train::<B, _>(
            model,
            &mut prepared.train_gen,
            &mut prepared.val_gen,
            &train.train_options(),
            &mut ckpt,
            Some(&metrics),
            &device,
        )?;

        let model_valid = model.valid();
        let predictions = predict_classes::<B::InnerBackend, _>(
            &model_valid,
            &mut prepared.eval_gen,
            &device,
        )?;
        let confusion = ConfusionMatrix::from_labels(&prepared.truth, &predictions, train.n_classes)?;
        tracing::info!("Validation accuracy: {:.4}", confusion.accuracy());

        Ok((report, confusion))
    }
}
