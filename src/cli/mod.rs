// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `npy` — train on .npy arrays listed in a metadata CSV,
//              then print a confusion matrix for the held-out folds
//   2. `png` — train on fold1..foldN image directories with one
//              fold held out
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, GlobalArgs, NpyArgs, PngArgs};

use crate::ml::trainer::TrainReport;

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "fold-classifier",
    version = "0.1.0",
    about = "Train a CNN classifier with fold-based cross-validation on .npy arrays or image folds."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The subcommand to run (npy or png)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Npy(args) => run_npy(&self.global, args),
            Commands::Png(args) => run_png(&self.global, args),
        }
    }
}

/// Handles the `npy` subcommand.
fn run_npy(global: &GlobalArgs, args: NpyArgs) -> Result<()> {
    use crate::application::npy_use_case::NpyTrainUseCase;

    tracing::info!("Starting npy training from manifest: {}", args.metadata_csv.display());

    // Convert CLI args → application config (separates presentation from domain)
    let report = NpyTrainUseCase::new(args.into_config(global)).execute()?;

    print_training(&report.training);

    let cm = &report.confusion;
    println!("\nConfusion matrix (rows = true class, columns = predicted):");
    print!("{cm}");
    println!("Accuracy: {:.4} on {} samples", cm.accuracy(), cm.total());
    println!("Predicted class counts: {:?}", cm.predicted_counts());
    println!("True class counts:      {:?}", cm.truth_counts());
    Ok(())
}

/// Handles the `png` subcommand.
fn run_png(global: &GlobalArgs, args: PngArgs) -> Result<()> {
    use crate::application::png_use_case::PngTrainUseCase;

    tracing::info!("Starting png training from: {}", args.base_dir.display());

    let report = PngTrainUseCase::new(args.into_config(global)).execute()?;

    println!(
        "Validation fold: {} | classes: {}",
        report.validation_dir.display(),
        report.classes.join(", ")
    );
    print_training(&report.training);
    Ok(())
}

fn print_training(report: &TrainReport) {
    match (&report.best_checkpoint, report.best_val_acc) {
        (Some(path), Some(acc)) => {
            println!(
                "Training complete. Best val_acc={acc:.4} over {} validation samples, saved to {}",
                report.val_samples,
                path.display()
            );
        }
        _ => println!("Training complete. No checkpoint saved."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{generator::PartialBatch, multi_source::CompositionPolicy};
    use crate::infra::device::BackendKind;

    #[test]
    fn test_npy_defaults() {
        let cli = Cli::try_parse_from(["fold-classifier", "npy", "meta.csv", "data"]).unwrap();
        let Commands::Npy(args) = cli.command else { panic!("expected npy") };
        let cfg = args.into_config(&cli.global);

        assert_eq!(cfg.training_folds, None);
        assert_eq!(cfg.validation_folds, vec![9]);
        assert_eq!(cfg.train.batch_size, 64);
        assert_eq!(cfg.train.epochs, 1);
        assert!(cfg.train.shuffle);
        assert_eq!(cfg.train.device.backend, BackendKind::Wgpu);
    }

    #[test]
    fn test_npy_fold_lists_and_globals() {
        let cli = Cli::try_parse_from([
            "fold-classifier", "--backend", "nd-array", "--no-shuffle",
            "npy", "meta.csv", "data",
            "--training-folds", "1,2,3", "--validation-folds", "9,10",
            "--partial-batch", "pad",
        ]).unwrap();
        let Commands::Npy(args) = cli.command else { panic!("expected npy") };
        let cfg = args.into_config(&cli.global);

        assert_eq!(cfg.training_folds, Some(vec![1, 2, 3]));
        assert_eq!(cfg.validation_folds, vec![9, 10]);
        assert_eq!(cfg.train.partial, PartialBatch::Pad);
        assert!(!cfg.train.shuffle);
        assert_eq!(cfg.train.device.backend, BackendKind::NdArray);
    }

    #[test]
    fn test_png_defaults() {
        let cli = Cli::try_parse_from([
            "fold-classifier", "png", "folds", "--multi-source", "sequential", "--epochs", "3",
        ]).unwrap();
        let Commands::Png(args) = cli.command else { panic!("expected png") };
        let cfg = args.into_config(&cli.global);

        assert_eq!(cfg.validation_fold, 1);
        assert_eq!(cfg.fold_count, 10);
        assert_eq!(cfg.train.batch_size, 32);
        assert_eq!(cfg.train.epochs, 3);
        assert_eq!(cfg.multi_source, CompositionPolicy::Sequential);
    }
}
