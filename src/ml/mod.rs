// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer holds the Burn-specific model and training code.
// The data layer only touches Burn through its Batcher impl.
//
// What's in this layer:
//
//   model.rs     — The convolutional classifier
//                  • 3 × (Conv2d → ReLU → MaxPool 2×2)
//                  • Dropout → Dense + ReLU → Dense (logits)
//                  • Classifier trait the trainer is generic over
//
//   trainer.rs   — The training loop
//                  Forward pass, cross-entropy + L2 loss,
//                  backward pass, Adam step, validation,
//                  metrics and improvement-only checkpoints
//
//   evaluator.rs — Post-training scoring
//                  Arg-max predictions and a confusion matrix
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Convolutional classifier architecture
pub mod model;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Predictions and confusion matrix for a held-out source
pub mod evaluator;
