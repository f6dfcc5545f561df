// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// Only improvements are kept: after each epoch the trainer
// reports the validation accuracy, and weights are written only
// when it is strictly higher than the best seen so far in this
// run. The first epoch always counts as an improvement.
//
// File naming convention (epoch is 1-based):
//   checkpoints/
//     weights-improvement-01-0.41.mpk          ← npy pipeline
//     png-fold3-weights-improvement-01-0.38.mpk ← png pipeline, fold 3
//     best_checkpoint.json   ← epoch, accuracy and file of the best save
//     train_config.json      ← configuration of the run
//
// Burn's CompactRecorder:
//   - Serialises model parameters to named MessagePack
//   - Stores floats at half precision for smaller files
//   - Replaces the path's last extension with its own ("mpk"),
//     so the path we report is built with that same extension
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const CONFIG_FILE: &str = "train_config.json";
const BEST_FILE:   &str = "best_checkpoint.json";

/// Pointer to the best checkpoint written so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestCheckpoint {
    pub epoch:   usize,
    pub val_acc: f64,
    pub file:    PathBuf,
}

/// Writes improvement-only checkpoints into one directory.
pub struct CheckpointManager {
    dir:    PathBuf,
    /// Prepended to every checkpoint file name
    prefix: String,
    best:   Option<BestCheckpoint>,
}

impl CheckpointManager {
    /// Create the manager and its directory (like `mkdir -p`).
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir, prefix: prefix.into(), best: None })
    }

    pub fn best(&self) -> Option<&BestCheckpoint> {
        self.best.as_ref()
    }

    /// Final on-disk path for a checkpoint of `epoch` with `val_acc`.
    pub fn checkpoint_path<B: Backend>(&self, epoch: usize, val_acc: f64) -> PathBuf {
        let ext = <CompactRecorder as FileRecorder<B>>::file_extension();
        self.dir.join(format!(
            "{}weights-improvement-{epoch:02}-{val_acc:.2}.{ext}",
            self.prefix
        ))
    }

    /// True when `val_acc` beats every accuracy saved so far.
    pub fn is_improvement(&self, val_acc: f64) -> bool {
        self.best.as_ref().map_or(true, |b| val_acc > b.val_acc)
    }

    /// Save `model` if `val_acc` strictly improves on the best so far.
    /// Returns the path written, or None when nothing was saved.
    pub fn save_if_improved<B: Backend, M: Module<B>>(
        &mut self,
        model:   &M,
        epoch:   usize,
        val_acc: f64,
    ) -> Result<Option<PathBuf>> {
        if !self.is_improvement(val_acc) {
            tracing::info!(
                "Epoch {epoch:05}: val_acc did not improve from {:.5}",
                self.best.as_ref().map_or(f64::NEG_INFINITY, |b| b.val_acc)
            );
            return Ok(None);
        }

        let path = self.checkpoint_path::<B>(epoch, val_acc);
        tracing::info!(
            "Epoch {epoch:05}: val_acc improved from {:.5} to {val_acc:.5}, saving model to {}",
            self.best.as_ref().map_or(f64::NEG_INFINITY, |b| b.val_acc),
            path.display()
        );

        model
            .clone()
            .save_file(path.clone(), &CompactRecorder::new())
            .map_err(|e| anyhow::anyhow!("Failed to save checkpoint to '{}': {e}", path.display()))?;

        let best = BestCheckpoint { epoch, val_acc, file: path.clone() };
        let pointer = self.dir.join(BEST_FILE);
        fs::write(&pointer, serde_json::to_string_pretty(&best)?)
            .with_context(|| format!("Failed to write '{}'", pointer.display()))?;

        self.best = Some(best);
        Ok(Some(path))
    }

    /// Restore weights from a checkpoint file into `model`.
    ///
    /// The model must have the same architecture as the one saved.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        path:   &Path,
        device: &B::Device,
    ) -> Result<M> {
        tracing::info!("Loading checkpoint '{}'", path.display());
        model
            .load_file(path.to_path_buf(), &CompactRecorder::new(), device)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load checkpoint '{}'. Have you trained the model first? ({e})",
                path.display()
            ))
    }

    /// Read best_checkpoint.json from a previous run.
    pub fn load_best(&self) -> Result<BestCheckpoint> {
        let path = self.dir.join(BEST_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save the run configuration as pretty JSON.
    pub fn save_config<C: Serialize>(&self, cfg: &C) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config<C: DeserializeOwned>(&self) -> Result<C> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}
