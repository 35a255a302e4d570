// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. All business logic is
// delegated to Layer 2 (application).
//
//   (no command) - train with the reference configuration
//   `train`      - train with overrides
//   `eval`       - score the latest checkpoint on the test split
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "qmnist-classifier",
    version = "0.1.0",
    about = "Train a two-layer MLP on QMNIST digits, then evaluate checkpoints."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Route to the matching use case; a bare invocation trains.
    pub fn run(self) -> Result<()> {
        match self.command {
            None                        => Self::run_train(TrainArgs::default()),
            Some(Commands::Train(args)) => Self::run_train(args),
            Some(Commands::Eval(args))  => Self::run_eval(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Training on QMNIST cached under: {}", args.data_dir);

        let use_case = TrainUseCase::new(args.into());
        let summary  = use_case.execute()?;

        println!(
            "Training complete: {} epochs, {} steps, {} validation passes.",
            summary.epochs_completed, summary.global_step, summary.validation_runs,
        );
        if let Some(val) = summary.last_validation {
            println!(
                "Final validation: loss {:.4} | acc {:.4} | prec {:.4} | rec {:.4}",
                val.loss, val.accuracy, val.precision, val.recall,
            );
        }
        Ok(())
    }

    fn run_eval(args: EvalArgs) -> Result<()> {
        use crate::application::eval_use_case::EvalUseCase;

        let use_case = EvalUseCase::new(args.log_dir, args.data_dir, args.batch_size);
        let metrics  = use_case.execute()?;

        println!(
            "Test: loss {:.4} | acc {:.4} | prec {:.4} | rec {:.4}",
            metrics.loss, metrics.accuracy, metrics.precision, metrics.recall,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;

    #[test]
    fn test_no_command_means_reference_training() {
        let cli = Cli::parse_from(["qmnist-classifier"]);
        assert!(cli.command.is_none());
        assert_eq!(TrainConfig::from(TrainArgs::default()), TrainConfig::default());
    }

    #[test]
    fn test_train_flag_defaults_match_config_defaults() {
        let cli = Cli::parse_from(["qmnist-classifier", "train"]);
        match cli.command {
            Some(Commands::Train(args)) => assert_eq!(TrainConfig::from(args), TrainConfig::default()),
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_train_overrides() {
        let cli = Cli::parse_from([
            "qmnist-classifier", "train", "--lr", "0.01", "--epochs", "2", "--seed", "42",
        ]);
        let Some(Commands::Train(args)) = cli.command else { panic!("expected train") };
        let cfg = TrainConfig::from(args);
        assert_eq!(cfg.lr, 0.01);
        assert_eq!(cfg.max_epochs, 2);
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.batch_size, 64);
    }

    #[test]
    fn test_eval_overrides_are_optional() {
        let cli = Cli::parse_from(["qmnist-classifier", "eval"]);
        let Some(Commands::Eval(args)) = cli.command else { panic!("expected eval") };
        assert_eq!(args.log_dir, "qmnist/logs");
        assert!(args.data_dir.is_none());
        assert!(args.batch_size.is_none());
    }
}
