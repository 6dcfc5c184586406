//! # dopscreen - LC-MS Anti-Doping Screening
//!
//! `dopscreen` screens a urine sample acquisition for a panel of prohibited
//! substances by comparing extracted-ion traces against a fortified positive
//! control, a re-injection of that control and a negative control.
//!
//! ## Key Features
//!
//! - **Streaming mzML input**: acquisitions are pulled spectrum by spectrum
//!   with `quick-xml`; only MS1 scans in the instrument's full-scan mode are
//!   kept.
//!
//! - **Extracted-ion traces**: for every substance the summed intensity inside
//!   its mass window is traced over its retention window and smoothed with a
//!   short Gaussian kernel.
//!
//! - **R² similarity**: the control trace is scored as a predictor of the
//!   sample trace.
//!
//! - **Fuzzy confidence**: scores are mapped to a 0-5 confidence level with a
//!   Mamdani inference (triangular and trapezoidal sets, min/max, centroid)
//!   and bucketed into a conclusion.
//!
//! - **Internal-standard gate**: if any internal standard has shifted, the
//!   sample is not screened.
//!
//! - **Comparison figures**: presumed positives are drawn to SVG with the four
//!   traces and an identity card.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dopscreen::prelude::*;
//!
//! let panel = Panel::embedded()?;
//! let sink = SvgFigureRenderer::new("figures");
//! let mut context = PipelineContext::new(panel, Box::new(sink));
//!
//! let set = SampleSet::open(
//!     "A123.mzML",
//!     "control.mzML",
//!     "control_reinj.mzML",
//!     "control_negative.mzML",
//! )?;
//! let report = context.screen_sample(&set)?;
//! println!("{}", report);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`mzml`]: streaming mzML reader and binary array decoding
//! - [`acquisition`]: in-memory MS1 scan list of one acquisition
//! - [`extract`]: retention/mass windows, scan filters and trace extraction
//! - [`similarity`]: R² scoring
//! - [`fuzzy`]: membership functions, inference and confidence buckets
//! - [`panel`]: substance panel table
//! - [`compound`]: PubChem identity cards
//! - [`render`]: comparison figures
//! - [`pipeline`]: per-sample screening driver and report

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
// Allow some patterns common in scientific code
#![allow(clippy::too_many_arguments)]

pub mod acquisition;
pub mod compound;
pub mod extract;
pub mod fuzzy;
pub mod mzml;
pub mod panel;
pub mod pipeline;
pub mod render;
pub mod similarity;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::acquisition::{AcquisitionError, AcquisitionRun, Polarity, Scan, ScanSource};
    pub use crate::compound::{
        describe, CompoundInfo, CompoundLookup, LookupError, NoLookup, PubChemDirectory,
    };
    pub use crate::extract::{
        extract, gaussian_smooth, ChromatogramSlice, ExtractError, MassWindow, RetentionWindow,
        ScanFilter, TraceRequest,
    };
    pub use crate::fuzzy::{ConfidenceBucket, FuzzyClassifier, GATE_FLOOR};
    pub use crate::mzml::{MzMLError, MzMLSpectrum, MzMLStreamer};
    pub use crate::panel::{Panel, PanelError, SubstanceSpec, INTERNAL_STANDARD_PREFIX};
    pub use crate::pipeline::{
        ComparisonResult, GateState, PipelineContext, PipelineError, SampleReport, SampleSet,
        ScreeningOptions, Stage, SubstanceOutcome, SubstanceTraces,
    };
    pub use crate::render::{should_render, FigureSink, RenderError, SvgFigureRenderer};
    pub use crate::similarity::{r_squared, score};
}
