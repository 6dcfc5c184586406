use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod batch;
mod config;
mod panel;
mod run;

/// dopscreen - LC-MS anti-doping screening against fortified controls
#[derive(Parser)]
#[command(name = "dopscreen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen one sample against its controls
    Run {
        /// Sample mzML acquisition
        #[arg(value_name = "SAMPLE")]
        sample: PathBuf,

        /// Fortified positive control
        #[arg(value_name = "CONTROL")]
        control: PathBuf,

        /// Re-injection of the positive control
        #[arg(value_name = "CONTROL_REINJ")]
        control_reinj: PathBuf,

        /// Negative control
        #[arg(value_name = "CONTROL_NEGATIVE")]
        control_negative: PathBuf,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Directory for comparison figures
        #[arg(short = 'o', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Panel CSV replacing the embedded panel
        #[arg(long, value_name = "FILE")]
        panel: Option<PathBuf>,

        /// Directory of PubChem `<cid>.json` records
        #[arg(long, value_name = "DIR")]
        compound_dir: Option<PathBuf>,

        /// Score and classify without drawing figures
        #[arg(long)]
        no_figures: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Screen many samples against shared controls, one subprocess each
    Batch {
        /// Fortified positive control
        #[arg(long, value_name = "FILE")]
        control: PathBuf,

        /// Re-injection of the positive control
        #[arg(long, value_name = "FILE")]
        control_reinj: PathBuf,

        /// Negative control
        #[arg(long, value_name = "FILE")]
        control_negative: PathBuf,

        /// Sample mzML acquisitions
        #[arg(value_name = "SAMPLES", required = true)]
        samples: Vec<PathBuf>,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Copy all inputs here under sanitized names before screening
        #[arg(long, value_name = "DIR")]
        stage_dir: Option<PathBuf>,

        /// Write the per-sample results as JSON
        #[arg(long, value_name = "FILE")]
        summary: Option<PathBuf>,

        /// Directory for comparison figures
        #[arg(short = 'o', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Panel CSV replacing the embedded panel
        #[arg(long, value_name = "FILE")]
        panel: Option<PathBuf>,

        /// Directory of PubChem `<cid>.json` records
        #[arg(long, value_name = "DIR")]
        compound_dir: Option<PathBuf>,

        /// Score and classify without drawing figures
        #[arg(long)]
        no_figures: bool,
    },

    /// Print the substance panel
    Panel {
        /// Panel CSV replacing the embedded panel
        #[arg(long, value_name = "FILE")]
        panel: Option<PathBuf>,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            sample,
            control,
            control_reinj,
            control_negative,
            config,
            output_dir,
            panel,
            compound_dir,
            no_figures,
            json,
        } => run::run(run::RunArgs {
            sample,
            control,
            control_reinj,
            control_negative,
            config,
            output_dir,
            panel,
            compound_dir,
            no_figures,
            json,
        }),
        Commands::Batch {
            control,
            control_reinj,
            control_negative,
            samples,
            config,
            stage_dir,
            summary,
            output_dir,
            panel,
            compound_dir,
            no_figures,
        } => batch::run(batch::BatchArgs {
            control,
            control_reinj,
            control_negative,
            samples,
            config,
            stage_dir,
            summary,
            output_dir,
            panel,
            compound_dir,
            no_figures,
        }),
        Commands::Panel { panel, config } => panel::run(panel, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_requires_four_paths() {
        assert!(Cli::try_parse_from(["dopscreen", "run", "a.mzML", "b.mzML", "c.mzML"]).is_err());
        assert!(Cli::try_parse_from([
            "dopscreen", "run", "a.mzML", "b.mzML", "c.mzML", "d.mzML", "e.mzML"
        ])
        .is_err());
        let cli = Cli::try_parse_from([
            "dopscreen", "-vv", "run", "a.mzML", "b.mzML", "c.mzML", "d.mzML", "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbosity(), 2);
        assert!(matches!(cli.command, Commands::Run { json: true, .. }));
    }

    #[test]
    fn test_batch_arguments() {
        let cli = Cli::try_parse_from([
            "dopscreen",
            "batch",
            "--control",
            "c.mzML",
            "--control-reinj",
            "r.mzML",
            "--control-negative",
            "n.mzML",
            "s1.mzML",
            "s2.mzML",
        ])
        .unwrap();
        match cli.command {
            Commands::Batch { samples, .. } => assert_eq!(samples.len(), 2),
            _ => panic!("expected batch"),
        }
    }
}
