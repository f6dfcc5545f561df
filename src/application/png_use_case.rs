// ============================================================
// Layer 2 — PngTrainUseCase
// ============================================================
// Orchestrates the directory pipeline in order:
//
//   Step 1: Locate fold1..foldN directories   (Layer 4 - data)
//   Step 2: Discover class names               (Layer 4 - data)
//   Step 3: Hold out the validation fold       (Layer 4 - data)
//   Step 4: One generator per fold, composed   (Layer 4 - data)
//   Step 5: Build the model config             (Layer 5 - ml)
//   Step 6: Save config                        (Layer 6 - infra)
//   Step 7: Run training loop                  (Layer 5 - ml)
//
// Checkpoints are prefixed "png-fold{k}-" so runs for different
// held-out folds can share one checkpoint directory.

use anyhow::{bail, Context, Result};
use burn::{
    backend::{Autodiff, NdArray, Wgpu},
    tensor::backend::AutodiffBackend,
};
use std::path::PathBuf;

use crate::application::train_config::PngPipelineConfig;
use crate::data::{
    image_generator::{discover_classes, DirectoryBatchGenerator},
    multi_source::MultiSourceGenerator,
    splitter::holdout_fold,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    device::{init_device, BackendKind},
    metrics::MetricsLogger,
};
use crate::ml::{
    model::ConvClassifierConfig,
    trainer::{self, TrainReport},
};

/// Outcome of a directory-pipeline run.
#[derive(Debug)]
pub struct PngReport {
    pub training:        TrainReport,
    pub classes:         Vec<String>,
    pub validation_dir:  PathBuf,
    pub training_dirs:   Vec<PathBuf>,
}

pub struct PngTrainUseCase {
    config:       PngPipelineConfig,
    architecture: Option<ConvClassifierConfig>,
}

impl PngTrainUseCase {
    pub fn new(config: PngPipelineConfig) -> Self {
        Self { config, architecture: None }
    }

    /// Replace the default architecture. Input shape must be (3, H, W).
    pub fn with_architecture(mut self, model_cfg: ConvClassifierConfig) -> Self {
        self.architecture = Some(model_cfg);
        self
    }

    /// Checkpoint file prefix for this run's held-out fold.
    pub fn checkpoint_prefix(&self) -> String {
        format!("png-fold{}-", self.config.validation_fold)
    }

    /// Execute the full pipeline end to end
    pub fn execute(&self) -> Result<PngReport> {
        let cfg = &self.config;
        let tc  = &cfg.train;

        // ── Step 1: Fold directories ──────────────────────────────────────────
        let fold_dirs: Vec<PathBuf> = (1..=cfg.fold_count)
            .map(|i| cfg.base_dir.join(format!("fold{i}")))
            .collect();
        for dir in &fold_dirs {
            if !dir.is_dir() {
                bail!("Missing fold directory '{}'", dir.display());
            }
        }

        // ── Step 2: Class names ───────────────────────────────────────────────
        // Discovered across every fold so indices agree between generators
        let classes = discover_classes(&fold_dirs)?;
        if classes.len() > tc.n_classes {
            bail!(
                "Found {} class directories but the model has {} classes",
                classes.len(),
                tc.n_classes
            );
        }
        if classes.len() < tc.n_classes {
            tracing::warn!(
                "Only {} of {} classes have a directory",
                classes.len(),
                tc.n_classes
            );
        }
        tracing::info!("Classes: {:?}", classes);

        // ── Step 3: Hold out one fold ─────────────────────────────────────────
        let split = holdout_fold(fold_dirs, cfg.validation_fold)?;
        let validation_dir = split
            .validation
            .into_iter()
            .next()
            .context("Validation fold selection came back empty")?;
        tracing::info!(
            "Validation fold: '{}', {} training folds",
            validation_dir.display(),
            split.train.len()
        );

        // ── Step 4: Generators ────────────────────────────────────────────────
        let gen_cfg = tc.generator_config();
        let sources = split
            .train
            .iter()
            .map(|dir| {
                DirectoryBatchGenerator::new(dir, &classes, gen_cfg.clone())
                    .with_context(|| format!("Cannot build a generator for '{}'", dir.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut train_gen = MultiSourceGenerator::new(sources, cfg.multi_source)?;
        tracing::info!(
            "Training on {} fold sources, {:?} composition",
            train_gen.source_count(),
            cfg.multi_source
        );

        // Every held-out image is scored exactly once per epoch
        let mut val_gen = DirectoryBatchGenerator::new(
            &validation_dir,
            &classes,
            tc.validation_generator_config(),
        ).with_context(|| format!("Cannot build a generator for '{}'", validation_dir.display()))?;

        // ── Step 5: Model config ──────────────────────────────────────────────
        let model_cfg = self.architecture.clone().unwrap_or_else(|| {
            ConvClassifierConfig::new(3, tc.height, tc.width, tc.n_classes)
        });
        tc.check_architecture(&model_cfg, 3)?;
        tracing::info!("Model summary:\n{}", model_cfg.summary());

        // ── Step 6: Save config ───────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&tc.checkpoint_dir, self.checkpoint_prefix())?;
        ckpt.save_config(cfg)?;

        // ── Step 7: Train on the chosen backend ──────────────────────────────
        let training = match tc.device.backend {
            BackendKind::Wgpu    => self.run::<Autodiff<Wgpu>>(&model_cfg, &mut train_gen, &mut val_gen, ckpt)?,
            BackendKind::NdArray => self.run::<Autodiff<NdArray>>(&model_cfg, &mut train_gen, &mut val_gen, ckpt)?,
        };

        Ok(PngReport {
            training,
            classes,
            validation_dir,
            training_dirs: split.train,
        })
    }

    fn run<B: AutodiffBackend>(
        &self,
        model_cfg: &ConvClassifierConfig,
        train_gen: &mut MultiSourceGenerator<DirectoryBatchGenerator>,
        val_gen:   &mut DirectoryBatchGenerator,
        mut ckpt:  CheckpointManager,
    ) -> Result<TrainReport> {
        let tc      = &self.config.train;
        let device  = init_device::<B>(&tc.device);
        let metrics = MetricsLogger::new(&tc.checkpoint_dir)?;

        let model = model_cfg.init::<B>(&device);
        let (_model, report) = trainer::train::<B, _>(
            model,
            train_gen,
            val_gen,
            &tc.train_options(),
            &mut ckpt,
            Some(&metrics),
            &device,
        )?;
        Ok(report)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_config::TrainConfig;
    use crate::data::multi_source::CompositionPolicy;
    use crate::infra::device::DeviceConfig;
    use image::{Rgb, RgbImage};
    use std::{fs, path::Path};

    const SIDE: usize = 28;

    /// fold1..fold3, classes "dog_bark" and "siren", two images each.
    fn write_folds(base: &Path) {
        for fold in 1..=3 {
            for (c, class) in ["dog_bark", "siren"].iter().enumerate() {
                let dir = base.join(format!("fold{fold}")).join(class);
                fs::create_dir_all(&dir).unwrap();
                for i in 0..2 {
                    let px = if c == 0 { [20, 20, 20] } else { [230, 230, 230] };
                    RgbImage::from_pixel(32, 32, Rgb(px))
                        .save(dir.join(format!("img{i}.png")))
                        .unwrap();
                }
            }
        }
    }

    fn config(base: &Path, validation_fold: usize, fold_count: usize) -> PngPipelineConfig {
        PngPipelineConfig {
            base_dir:        base.to_path_buf(),
            validation_fold,
            fold_count,
            multi_source:    CompositionPolicy::RoundRobin,
            train: TrainConfig {
                checkpoint_dir: base.join("ckpt").display().to_string(),
                batch_size:     3,
                n_classes:      2,
                height:         SIDE,
                width:          SIDE,
                device:         DeviceConfig { backend: BackendKind::NdArray, seed: 7 },
                ..TrainConfig::default()
            },
        }
    }

    fn tiny_arch() -> ConvClassifierConfig {
        ConvClassifierConfig::new(3, SIDE, SIDE, 2)
            .with_kernel_size(3)
            .with_conv_channels([2, 2, 2])
            .with_hidden_size(4)
    }

    #[test]
    fn test_png_pipeline_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_folds(dir.path());

        let report = PngTrainUseCase::new(config(dir.path(), 2, 3))
            .with_architecture(tiny_arch())
            .execute()
            .unwrap();

        assert_eq!(report.classes, vec!["dog_bark".to_string(), "siren".to_string()]);
        assert!(report.validation_dir.ends_with("fold2"));
        assert_eq!(report.training_dirs.len(), 2);
        assert!(report.training_dirs[0].ends_with("fold1"));
        assert!(report.training_dirs[1].ends_with("fold3"));

        let best = report.training.best_checkpoint.unwrap();
        assert!(best.file_name().unwrap().to_string_lossy().starts_with("png-fold2-weights-improvement-01-"));
        assert!(best.exists());
        // Validation fold holds 4 images
        assert_eq!(report.training.val_samples, 4);
    }

    #[test]
    fn test_architecture_class_count_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_folds(dir.path());

        let five_way = ConvClassifierConfig::new(3, SIDE, SIDE, 5).with_kernel_size(3);
        let err = PngTrainUseCase::new(config(dir.path(), 1, 3))
            .with_architecture(five_way)
            .execute()
            .unwrap_err();
        assert!(err.to_string().contains("5 output classes"));
    }

    #[test]
    fn test_missing_fold_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_folds(dir.path());

        let err = PngTrainUseCase::new(config(dir.path(), 1, 4))
            .with_architecture(tiny_arch())
            .execute()
            .unwrap_err();
        assert!(err.to_string().contains("Missing fold directory"));
    }

    #[test]
    fn test_validation_fold_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        write_folds(dir.path());

        let err = PngTrainUseCase::new(config(dir.path(), 5, 3))
            .with_architecture(tiny_arch())
            .execute()
            .unwrap_err();
        assert!(err.to_string().contains("invalid fold selection"));
    }

    #[test]
    fn test_checkpoint_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = PngTrainUseCase::new(config(dir.path(), 7, 10));
        assert_eq!(use_case.checkpoint_prefix(), "png-fold7-");
    }
}
