//! # dopscreen
//!
//! Command-line front end for LC-MS anti-doping screening.
//!
//! ## Usage
//!
//! ```bash
//! # Screen one sample against its controls
//! dopscreen run A123.mzML control.mzML control_reinj.mzML control_negative.mzML
//!
//! # Screen a batch, one subprocess per sample
//! dopscreen batch --control control.mzML --control-reinj reinj.mzML \
//!     --control-negative negative.mzML A123.mzML A124.mzML --summary batch.json
//!
//! # Inspect the substance panel
//! dopscreen panel
//! ```

use clap::Parser;

mod cli;

fn main() {
    // Usage errors exit with 1; help and version exit with 0
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    cli::init_logging(cli.verbosity());

    if let Err(e) = cli::dispatch(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
