// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop over two BatchSources with Adam and categorical
// cross-entropy, shared by the npy and png pipelines.
//
// Key Burn insight:
//   - Training uses B (an AutodiffBackend) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - Validation batcher must also use B::InnerBackend
//   - argmax(1) returns [batch,1] so we reshape before .equal()
//
// Data does not go through Burn's DataLoader: the sources decide
// ordering, partial batches and reshuffling themselves, and the
// loop just pulls batches until next_batch() returns None.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{Context, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{activation::log_softmax, backend::AutodiffBackend},
};
use std::path::PathBuf;

use crate::data::batcher::{ClassifierBatch, ClassifierBatcher};
use crate::domain::traits::BatchSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::Classifier;

/// Optimiser and loop settings.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub lr:     f64,
    /// Weight of the model's weight penalty in the loss (0 disables it)
    pub l2:     f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self { epochs: 1, lr: 0.01, l2: 0.001 }
    }
}

/// What a finished run looked like.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub epochs:          Vec<EpochMetrics>,
    pub best_val_acc:    Option<f64>,
    pub best_checkpoint: Option<PathBuf>,
    /// Samples scored in the last validation pass
    pub val_samples:     usize,
}

/// Mean categorical cross-entropy of `logits` against one-hot targets.
///
///   loss = -mean_i Σ_c y_ic · log softmax(z_i)_c
pub fn categorical_cross_entropy<B: Backend>(
    logits:  Tensor<B, 2>,
    one_hot: Tensor<B, 2>,
) -> Tensor<B, 1> {
    (one_hot * log_softmax(logits, 1))
        .sum_dim(1)
        .mean()
        .neg()
}

/// Cross-entropy of one batch plus `l2` times the model's weight penalty.
/// Returns the loss and the logits it was computed from.
pub fn batch_loss<B: Backend, M: Classifier<B>>(
    model: &M,
    batch: ClassifierBatch<B>,
    l2:    f64,
) -> (Tensor<B, 1>, Tensor<B, 2>) {
    let logits = model.logits(batch.images);
    let mut loss = categorical_cross_entropy(logits.clone(), batch.one_hot);
    if l2 > 0.0 {
        if let Some(penalty) = model.weight_penalty() {
            loss = loss + penalty.mul_scalar(l2);
        }
    }
    (loss, logits)
}

/// Number of rows whose arg-max matches the target class.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let [n, _] = logits.dims();
    let predicted: Tensor<B, 1, Int> = logits.argmax(1).reshape([n]);
    let correct: i64 = predicted
        .equal(targets)
        .int().sum().into_scalar().elem::<i64>();
    correct as usize
}

/// Train `model` for `opts.epochs` epochs and return the final weights.
///
/// After every epoch the validation source is scored with the
/// non-autodiff model, metrics are logged, both sources get their
/// epoch-end hook, and `ckpt` saves the weights if val_acc improved.
#[allow(clippy::too_many_arguments)]
pub fn train<B, M>(
    mut model: M,
    train_src: &mut dyn BatchSource,
    val_src:   &mut dyn BatchSource,
    opts:      &TrainOptions,
    ckpt:      &mut CheckpointManager,
    metrics:   Option<&MetricsLogger>,
    device:    &B::Device,
) -> Result<(M, TrainReport)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Classifier<B>,
    M::InnerModule: Classifier<B::InnerBackend>,
{
    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-7).init::<B, M>();

    let train_batcher = ClassifierBatcher::<B>::new(device.clone());
    let val_batcher   = ClassifierBatcher::<B::InnerBackend>::new(device.clone());

    tracing::info!(
        "Training on {} samples ({} batches/epoch), validating on {} samples ({} batches)",
        train_src.sample_count(), train_src.batches_per_epoch(),
        val_src.sample_count(),   val_src.batches_per_epoch(),
    );

    let mut history     = Vec::with_capacity(opts.epochs);
    let mut val_samples = 0usize;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=opts.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;
        let mut train_correct  = 0usize;
        let mut train_seen     = 0usize;

        while let Some(items) = train_src
            .next_batch()
            .with_context(|| format!("Failed to load a training batch in epoch {epoch}"))?
        {
            if items.is_empty() {
                continue;
            }
            let batch   = train_batcher.batch(items);
            let targets = batch.targets.clone();
            let (loss, logits) = batch_loss(&model, batch, opts.l2);

            train_seen    += targets.dims()[0];
            train_correct += count_correct(logits.detach(), targets);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(opts.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 { train_loss_sum / train_batches as f64 } else { f64::NAN };
        let train_acc      = if train_seen    > 0 { train_correct as f64 / train_seen as f64 } else { 0.0 };

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → M::InnerModule on B::InnerBackend, dropout disabled
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;
        let mut val_correct  = 0usize;
        let mut val_seen     = 0usize;

        while let Some(items) = val_src
            .next_batch()
            .with_context(|| format!("Failed to load a validation batch in epoch {epoch}"))?
        {
            if items.is_empty() {
                continue;
            }
            let batch  = val_batcher.batch(items);
            let logits = model_valid.logits(batch.images);

            let loss = categorical_cross_entropy(logits.clone(), batch.one_hot);
            val_loss_sum += loss.into_scalar().elem::<f64>();
            val_batches  += 1;

            val_seen    += batch.targets.dims()[0];
            val_correct += count_correct(logits, batch.targets);
        }

        let avg_val_loss = if val_batches > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };
        let val_acc      = if val_seen    > 0 { val_correct as f64 / val_seen as f64 } else { 0.0 };
        val_samples = val_seen;

        println!(
            "Epoch {:>3}/{} | loss={:.4} | acc={:.4} | val_loss={:.4} | val_acc={:.4}",
            epoch, opts.epochs, avg_train_loss, train_acc, avg_val_loss, val_acc,
        );

        let row = EpochMetrics::new(epoch, avg_train_loss, train_acc, avg_val_loss, val_acc);
        if let Some(logger) = metrics {
            logger.log(&row)?;
        }
        history.push(row);

        train_src.on_epoch_end();
        val_src.on_epoch_end();

        ckpt.save_if_improved::<B, M>(&model, epoch, val_acc)?;
    }

    tracing::info!("Training complete!");

    let report = TrainReport {
        epochs:          history,
        best_val_acc:    ckpt.best().map(|b| b.val_acc),
        best_checkpoint: ckpt.best().map(|b| b.file.clone()),
        val_samples,
    };
    Ok((model, report))
}
