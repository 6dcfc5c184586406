//! Screening driver
//!
//! One sample is screened against three reference acquisitions in fixed
//! stages:
//!
//! ```text
//! Init -> ExtractStandards -> GateCheck -+-> ExtractPanel -> CompareAndRender
//!                                        +-> Abort
//! ```
//!
//! The internal standards are compared first. If any of them scores at or
//! below the gate floor its retention time has shifted, no target can be
//! trusted, and the panel is not extracted at all. Otherwise every target is
//! extracted from all four acquisitions, scored, classified and, when it
//! qualifies, drawn.
//!
//! All state lives in an explicit [`PipelineContext`]; nothing is global.

mod report;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

use crate::acquisition::{AcquisitionError, AcquisitionRun, ScanSource};
use crate::compound::{CompoundLookup, NoLookup};
use crate::extract::{extract, ChromatogramSlice, ExtractError};
use crate::fuzzy::{ConfidenceBucket, FuzzyClassifier, GATE_FLOOR};
use crate::panel::{Panel, SubstanceSpec};
use crate::render::{render, should_render, FigureSink};
use crate::similarity::score;

pub use report::{SampleReport, SubstanceOutcome, GATE_FAILURE_MESSAGE};

/// Errors that stop a sample from being screened
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An acquisition could not be loaded
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    /// An internal standard could not be extracted
    #[error("Cannot extract internal standard {substance} from {source_name}: {source}")]
    StandardExtraction {
        /// Standard name
        substance: String,
        /// Acquisition that failed
        source_name: String,
        /// Extraction error
        #[source]
        source: ExtractError,
    },
}

/// Screening stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    /// Acquisitions opened
    Init,
    /// Extracting internal standards
    ExtractStandards,
    /// Checking internal standard scores
    GateCheck,
    /// Extracting target substances
    ExtractPanel,
    /// Scoring, classifying and drawing targets
    CompareAndRender,
    /// Gate failed; targets were not screened
    Abort,
}

impl Stage {
    fn can_advance_to(self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Stage::Init, Stage::ExtractStandards)
                | (Stage::ExtractStandards, Stage::GateCheck)
                | (Stage::GateCheck, Stage::ExtractPanel)
                | (Stage::GateCheck, Stage::Abort)
                | (Stage::ExtractPanel, Stage::CompareAndRender)
        )
    }

    /// Whether no stage follows this one
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::CompareAndRender | Stage::Abort)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::ExtractStandards => "extract standards",
            Stage::GateCheck => "gate check",
            Stage::ExtractPanel => "extract panel",
            Stage::CompareAndRender => "compare and render",
            Stage::Abort => "abort",
        };
        f.write_str(name)
    }
}

/// Four traces of one substance
#[derive(Debug, Clone, Default)]
pub struct SubstanceTraces {
    /// Sample
    pub sample: ChromatogramSlice,
    /// Positive control
    pub control: ChromatogramSlice,
    /// Re-injected positive control
    pub control_reinj: ChromatogramSlice,
    /// Negative control
    pub control_negative: ChromatogramSlice,
}

/// Score and conclusion for one substance in one sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// Panel name
    pub substance_name: String,
    /// R² of control against sample; NaN (null in JSON) when undefined
    pub r2: f64,
    /// Fuzzy confidence level in `[0, 5]`
    pub confidence_level: f64,
    /// Bucketed conclusion
    pub bucket: ConfidenceBucket,
}

impl ComparisonResult {
    /// Score the sample against the positive control and classify
    pub fn compare(name: &str, traces: &SubstanceTraces, classifier: &FuzzyClassifier) -> Self {
        let r2 = score(&traces.sample, &traces.control);
        let (confidence_level, bucket) = classifier.classify_bucket(r2);
        Self {
            substance_name: name.to_string(),
            r2,
            confidence_level,
            bucket,
        }
    }
}

/// Outcome of the internal-standard gate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GateState {
    /// Every standard scored above the floor
    Passed,
    /// Standards at or below the floor
    Failed {
        /// Names of the shifted standards
        shifted: Vec<String>,
    },
}

impl GateState {
    /// Gate a set of standard comparisons.
    ///
    /// An undefined (NaN) score does not fail the gate; only a score at or
    /// below the floor does.
    pub fn evaluate(standards: &[ComparisonResult]) -> Self {
        let shifted: Vec<String> = standards
            .iter()
            .filter(|r| r.r2 <= GATE_FLOOR)
            .map(|r| r.substance_name.clone())
            .collect();
        if shifted.is_empty() {
            GateState::Passed
        } else {
            GateState::Failed { shifted }
        }
    }

    /// True when targets may be screened
    pub fn passed(&self) -> bool {
        matches!(self, GateState::Passed)
    }
}

/// The sample and its three reference acquisitions
#[derive(Debug, Clone)]
pub struct SampleSet<S: ScanSource = AcquisitionRun> {
    /// Sample under test
    pub sample: S,
    /// Positive control
    pub control: S,
    /// Re-injected positive control
    pub control_reinj: S,
    /// Negative control
    pub control_negative: S,
}

impl SampleSet<AcquisitionRun> {
    /// Load four mzML acquisitions
    pub fn open(
        sample: impl AsRef<Path>,
        control: impl AsRef<Path>,
        control_reinj: impl AsRef<Path>,
        control_negative: impl AsRef<Path>,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            sample: AcquisitionRun::from_mzml(sample)?,
            control: AcquisitionRun::from_mzml(control)?,
            control_reinj: AcquisitionRun::from_mzml(control_reinj)?,
            control_negative: AcquisitionRun::from_mzml(control_negative)?,
        })
    }
}

impl<S: ScanSource> SampleSet<S> {
    /// Extract one substance from all four acquisitions.
    ///
    /// On failure returns the name of the acquisition that failed with the error.
    pub fn extract(&self, spec: &SubstanceSpec) -> Result<SubstanceTraces, (String, ExtractError)> {
        let request = spec.trace_request();
        let pull = |source: &S| {
            extract(source, &request).map_err(|e| (source.name().to_string(), e))
        };
        Ok(SubstanceTraces {
            sample: pull(&self.sample)?,
            control: pull(&self.control)?,
            control_reinj: pull(&self.control_reinj)?,
            control_negative: pull(&self.control_negative)?,
        })
    }
}

/// Switches for one screening run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreeningOptions {
    /// Draw figures for qualifying targets
    pub render_figures: bool,
}

impl Default for ScreeningOptions {
    fn default() -> Self {
        Self {
            render_figures: true,
        }
    }
}

/// Everything a screening run needs besides the acquisitions
pub struct PipelineContext {
    panel: Panel,
    classifier: FuzzyClassifier,
    lookup: Box<dyn CompoundLookup>,
    sink: Box<dyn FigureSink>,
    options: ScreeningOptions,
}

impl PipelineContext {
    /// Context drawing into `sink` with no compound lookup
    pub fn new(panel: Panel, sink: Box<dyn FigureSink>) -> Self {
        Self {
            panel,
            classifier: FuzzyClassifier::new(),
            lookup: Box::new(NoLookup),
            sink,
            options: ScreeningOptions::default(),
        }
    }

    /// Use `lookup` for figure identity cards
    pub fn with_lookup(mut self, lookup: Box<dyn CompoundLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// Replace the run options
    pub fn with_options(mut self, options: ScreeningOptions) -> Self {
        self.options = options;
        self
    }

    /// Loaded panel
    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    fn advance(stage: &mut Stage, next: Stage, sample: &str) {
        debug_assert!(stage.can_advance_to(next), "{} -> {}", stage, next);
        info!("{}: {} -> {}", sample, stage, next);
        *stage = next;
    }

    /// Screen one sample against its references
    pub fn screen_sample<S: ScanSource>(
        &mut self,
        set: &SampleSet<S>,
    ) -> Result<SampleReport, PipelineError> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let sample_name = set.sample.name().to_string();
        let mut stage = Stage::Init;
        let Self {
            panel,
            classifier,
            lookup,
            sink,
            options,
        } = self;

        Self::advance(&mut stage, Stage::ExtractStandards, &sample_name);
        let mut standards = Vec::with_capacity(panel.standards().len());
        for spec in panel.standards() {
            let traces = set.extract(spec).map_err(|(source_name, source)| {
                PipelineError::StandardExtraction {
                    substance: spec.name.clone(),
                    source_name,
                    source,
                }
            })?;
            let result = ComparisonResult::compare(&spec.name, &traces, classifier);
            debug!("{}: r2 = {}, {}", spec.name, result.r2, result.bucket);
            standards.push(result);
        }

        Self::advance(&mut stage, Stage::GateCheck, &sample_name);
        let gate = GateState::evaluate(&standards);

        let mut outcomes = Vec::new();
        let mut figures = Vec::new();

        if let GateState::Failed { shifted } = &gate {
            Self::advance(&mut stage, Stage::Abort, &sample_name);
            warn!(
                "{}: {} ({})",
                sample_name,
                GATE_FAILURE_MESSAGE,
                shifted.join(", ")
            );
        } else {
            Self::advance(&mut stage, Stage::ExtractPanel, &sample_name);
            let extracted: Vec<_> = panel
                .targets()
                .iter()
                .map(|spec| (spec, set.extract(spec)))
                .collect();

            Self::advance(&mut stage, Stage::CompareAndRender, &sample_name);
            let mut figure_target = FigureTarget {
                sink: &mut **sink,
                lookup: &**lookup,
                enabled: options.render_figures,
            };
            for (spec, traces) in extracted {
                let outcome = match traces {
                    Ok(traces) => {
                        let result = ComparisonResult::compare(&spec.name, &traces, classifier);
                        debug!("{}: r2 = {}, {}", spec.name, result.r2, result.bucket);
                        figure_target.outcome(&sample_name, spec, &traces, result)
                    }
                    Err((source_name, e)) => {
                        warn!("{}: skipping {} ({}: {})", sample_name, spec.name, source_name, e);
                        SubstanceOutcome::Skipped {
                            substance_name: spec.name.clone(),
                            reason: format!("{source_name}: {e}"),
                        }
                    }
                };
                if let SubstanceOutcome::Compared {
                    figure: Some(path), ..
                } = &outcome
                {
                    figures.push(path.clone());
                }
                outcomes.push(outcome);
            }
        }

        let elapsed = timer.elapsed();
        info!(
            "{}: screened in {:.2} s ({} figures)",
            sample_name,
            elapsed.as_secs_f64(),
            figures.len()
        );

        Ok(SampleReport {
            sample: sample_name,
            started_at,
            elapsed_secs: elapsed.as_secs_f64(),
            stage,
            standards,
            gate,
            outcomes,
            figures,
        })
    }
}

/// Where and whether qualifying targets are drawn
struct FigureTarget<'a> {
    sink: &'a mut dyn FigureSink,
    lookup: &'a dyn CompoundLookup,
    enabled: bool,
}

impl FigureTarget<'_> {
    fn outcome(
        &mut self,
        sample_name: &str,
        spec: &SubstanceSpec,
        traces: &SubstanceTraces,
        result: ComparisonResult,
    ) -> SubstanceOutcome {
        let qualifies = should_render(&spec.name, &result);
        let mut figure: Option<PathBuf> = None;
        let mut render_error = None;
        if qualifies && self.enabled {
            match render(
                &mut *self.sink,
                self.lookup,
                sample_name,
                spec,
                traces,
                &result,
            ) {
                Ok(path) => figure = path,
                Err(e) => {
                    warn!("{}: figure for {} failed: {}", sample_name, spec.name, e);
                    render_error = Some(e.to_string());
                }
            }
        }

        SubstanceOutcome::Compared {
            result,
            qualifies,
            figure,
            render_error,
        }
    }
}
