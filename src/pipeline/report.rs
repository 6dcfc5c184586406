use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
#[cfg(feature = "colorized_output")]
use console::style;
use serde::Serialize;

use super::{ComparisonResult, GateState, Stage};
use crate::fuzzy::ConfidenceBucket;

/// Message reported when the internal-standard gate fails
pub const GATE_FAILURE_MESSAGE: &str = "standard retention time shifted";

/// What happened to one target substance
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubstanceOutcome {
    /// Extracted, scored and classified
    Compared {
        /// Score and conclusion
        result: ComparisonResult,
        /// Whether the result qualifies for a figure
        qualifies: bool,
        /// Figure written, if any
        figure: Option<PathBuf>,
        /// Drawing error, if drawing was attempted and failed
        render_error: Option<String>,
    },
    /// Could not be extracted from one of the acquisitions
    Skipped {
        /// Panel name
        substance_name: String,
        /// Extraction error
        reason: String,
    },
}

impl SubstanceOutcome {
    /// Panel name
    pub fn substance_name(&self) -> &str {
        match self {
            SubstanceOutcome::Compared { result, .. } => &result.substance_name,
            SubstanceOutcome::Skipped { substance_name, .. } => substance_name,
        }
    }

    /// Result, if the target was compared
    pub fn result(&self) -> Option<&ComparisonResult> {
        match self {
            SubstanceOutcome::Compared { result, .. } => Some(result),
            SubstanceOutcome::Skipped { .. } => None,
        }
    }
}

/// Screening report for one sample
#[derive(Debug, Clone, Serialize)]
pub struct SampleReport {
    /// Sample acquisition name
    pub sample: String,
    /// When screening started
    pub started_at: DateTime<Utc>,
    /// Wall-clock screening time
    pub elapsed_secs: f64,
    /// Terminal stage
    pub stage: Stage,
    /// Internal standard comparisons, in panel order
    pub standards: Vec<ComparisonResult>,
    /// Gate outcome
    pub gate: GateState,
    /// Target outcomes, in panel order; empty when the gate failed
    pub outcomes: Vec<SubstanceOutcome>,
    /// Figures written
    pub figures: Vec<PathBuf>,
}

impl SampleReport {
    /// Whether the targets were screened
    pub fn screened(&self) -> bool {
        self.gate.passed()
    }

    /// Number of targets compared
    pub fn compared_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result().is_some()).count()
    }

    /// Number of targets skipped
    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.compared_count()
    }

    /// Compared targets with a conclusion other than negative
    pub fn presumed_positive(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.outcomes
            .iter()
            .filter_map(SubstanceOutcome::result)
            .filter(|r| r.bucket != ConfidenceBucket::Negative)
    }

    fn shifted(&self) -> &[String] {
        match &self.gate {
            GateState::Passed => &[],
            GateState::Failed { shifted } => shifted,
        }
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
            static HIT: Emoji<'_, '_> = Emoji("●", "[HIT]");
            static SKIP: Emoji<'_, '_> = Emoji("⚠", "[SKIP]");
            static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");

            let mut output = String::new();
            output.push_str(&format!("{}\n", style("Screening Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("================").cyan()));
            output.push_str(&format!("{}: {}\n", style("Sample").bold(), self.sample));
            output.push_str(&format!(
                "{}: {} ({:.2} s)\n\n",
                style("Started").bold(),
                self.started_at.to_rfc3339(),
                self.elapsed_secs
            ));

            output.push_str(&format!("{}\n", style("Internal standards").bold()));
            for r in &self.standards {
                let symbol = if self.shifted().contains(&r.substance_name) {
                    FAIL
                } else {
                    OK
                };
                output.push_str(&format!(
                    "[{}] {:<24} r2 = {:>12.6}\n",
                    symbol, r.substance_name, r.r2
                ));
            }
            output.push('\n');

            if !self.screened() {
                output.push_str(&format!(
                    "{}: {} ({})\n",
                    style("Screening ABORTED").red().bold(),
                    GATE_FAILURE_MESSAGE,
                    self.shifted().join(", ")
                ));
                return output;
            }

            for outcome in &self.outcomes {
                match outcome {
                    SubstanceOutcome::Compared {
                        result,
                        figure,
                        render_error,
                        ..
                    } if result.bucket != ConfidenceBucket::Negative => {
                        output.push_str(&format!(
                            "[{}] {:<24} r2 = {:>12.6}  {:.2}  {}",
                            HIT,
                            style(&result.substance_name).yellow(),
                            result.r2,
                            result.confidence_level,
                            style(result.bucket).yellow().bold()
                        ));
                        if let Some(path) = figure {
                            output.push_str(&format!("  -> {}", path.display()));
                        }
                        if let Some(e) = render_error {
                            output.push_str(&format!("  {}: {}", style("figure failed").red(), e));
                        }
                        output.push('\n');
                    }
                    SubstanceOutcome::Skipped {
                        substance_name,
                        reason,
                    } => {
                        output.push_str(&format!(
                            "[{}] {:<24} {}\n",
                            SKIP,
                            style(substance_name).dim(),
                            reason
                        ));
                    }
                    SubstanceOutcome::Compared { .. } => {}
                }
            }

            output.push('\n');
            output.push_str(&format!(
                "{}: {} compared, {} presumed positive, {} skipped, {} figures\n",
                style("Summary").bold(),
                style(self.compared_count()).green(),
                style(self.presumed_positive().count()).yellow(),
                style(self.skipped_count()).red(),
                self.figures.len()
            ));
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for SampleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Screening Report")?;
        writeln!(f, "================")?;
        writeln!(f, "Sample: {}", self.sample)?;
        writeln!(
            f,
            "Started: {} ({:.2} s)",
            self.started_at.to_rfc3339(),
            self.elapsed_secs
        )?;
        writeln!(f)?;

        writeln!(f, "Internal standards")?;
        for r in &self.standards {
            let symbol = if self.shifted().contains(&r.substance_name) {
                "✗"
            } else {
                "✓"
            };
            writeln!(f, "[{}] {:<24} r2 = {:>12.6}", symbol, r.substance_name, r.r2)?;
        }
        writeln!(f)?;

        if !self.screened() {
            return writeln!(
                f,
                "Screening ABORTED: {} ({})",
                GATE_FAILURE_MESSAGE,
                self.shifted().join(", ")
            );
        }

        for outcome in &self.outcomes {
            match outcome {
                SubstanceOutcome::Compared {
                    result,
                    figure,
                    render_error,
                    ..
                } if result.bucket != ConfidenceBucket::Negative => {
                    write!(
                        f,
                        "[●] {:<24} r2 = {:>12.6}  {:.2}  {}",
                        result.substance_name, result.r2, result.confidence_level, result.bucket
                    )?;
                    if let Some(path) = figure {
                        write!(f, "  -> {}", path.display())?;
                    }
                    if let Some(e) = render_error {
                        write!(f, "  figure failed: {}", e)?;
                    }
                    writeln!(f)?;
                }
                SubstanceOutcome::Skipped {
                    substance_name,
                    reason,
                } => writeln!(f, "[⚠] {:<24} {}", substance_name, reason)?,
                SubstanceOutcome::Compared { .. } => {}
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} compared, {} presumed positive, {} skipped, {} figures",
            self.compared_count(),
            self.presumed_positive().count(),
            self.skipped_count(),
            self.figures.len()
        )
    }
}
