//! Substance panel
//!
//! The screening panel is a table of internal standards and target
//! substances, each with a retention window, mass window, ion mode and an
//! optional PubChem compound id. The validated method panel is compiled into
//! the binary from `data/panel.csv`; laboratories can point at their own CSV
//! with the same columns:
//!
//! ```text
//! name,label,rt_start,rt_end,mz_low,mz_high,polarity,cid
//! IS_Propil,IS. 7-Propilteofilina_>5.0e6,5.88,6.48,223.1176112863,223.1202887137,+,847168
//! ```
//!
//! `polarity` is `+`/`-` or a full vendor filter string. Rows whose name
//! starts with [`INTERNAL_STANDARD_PREFIX`] are internal standards.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::acquisition::Polarity;
use crate::extract::{ExtractError, MassWindow, RetentionWindow, ScanFilter, TraceRequest};

/// Name prefix marking an internal standard
pub const INTERNAL_STANDARD_PREFIX: &str = "IS_";

const EMBEDDED_PANEL: &str = include_str!("../data/panel.csv");

/// Errors raised while loading a panel table
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// I/O error opening the table
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV syntax or type error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row has values that do not describe a usable trace
    #[error("Invalid panel row {row} ({name}): {reason}")]
    InvalidRow {
        /// 1-based data row number
        row: usize,
        /// Substance name on that row
        name: String,
        /// What is wrong
        reason: String,
    },

    /// Two rows share a name
    #[error("Duplicate substance name: {0}")]
    DuplicateName(String),

    /// The table has no internal standards to gate on
    #[error("Panel has no internal standards (names starting with 'IS_')")]
    NoStandards,
}

#[derive(Debug, Deserialize)]
struct PanelRow {
    name: String,
    label: String,
    rt_start: f64,
    rt_end: f64,
    mz_low: f64,
    mz_high: f64,
    polarity: String,
    cid: Option<u64>,
}

/// One panel entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubstanceSpec {
    /// Identifier, also used in figure file names
    pub name: String,
    /// Label printed on reports
    pub display_label: String,
    /// Retention window (minutes)
    pub retention_window: RetentionWindow,
    /// Mass window
    pub mass_window: MassWindow,
    /// Scan filter
    pub scan_filter: ScanFilter,
    /// PubChem CID for the report panel
    pub reference_compound_id: Option<u64>,
}

impl SubstanceSpec {
    /// Whether this entry gates the panel rather than being screened
    pub fn is_internal_standard(&self) -> bool {
        self.name.starts_with(INTERNAL_STANDARD_PREFIX)
    }

    /// Extraction request for this entry
    pub fn trace_request(&self) -> TraceRequest {
        TraceRequest {
            window: self.retention_window,
            mass: self.mass_window,
            filter: self.scan_filter,
        }
    }

    fn from_row(row: PanelRow, index: usize) -> Result<Self, PanelError> {
        let invalid = |reason: String| PanelError::InvalidRow {
            row: index + 1,
            name: row.name.clone(),
            reason,
        };
        let describe = |e: ExtractError| e.to_string();

        let retention_window =
            RetentionWindow::new(row.rt_start, row.rt_end).map_err(|e| invalid(describe(e)))?;
        let mass_window =
            MassWindow::new(row.mz_low, row.mz_high).map_err(|e| invalid(describe(e)))?;
        let scan_filter = match Polarity::from_symbol(&row.polarity) {
            Some(polarity) => ScanFilter::full_ms(polarity),
            None => row
                .polarity
                .parse::<ScanFilter>()
                .map_err(|e| invalid(describe(e)))?,
        };

        let name = row.name.trim().to_string();
        if name.is_empty() {
            return Err(invalid("empty name".to_string()));
        }

        Ok(Self {
            name,
            display_label: row.label.trim().to_string(),
            retention_window,
            mass_window,
            scan_filter,
            reference_compound_id: row.cid,
        })
    }
}

/// Internal standards plus target substances, in table order
#[derive(Debug, Clone)]
pub struct Panel {
    standards: Vec<SubstanceSpec>,
    targets: Vec<SubstanceSpec>,
}

impl Panel {
    /// The method panel shipped with the binary
    pub fn embedded() -> Result<Self, PanelError> {
        Self::from_reader(EMBEDDED_PANEL.as_bytes())
    }

    /// Load a panel CSV from disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PanelError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a panel CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PanelError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut seen = HashSet::new();
        let mut standards = Vec::new();
        let mut targets = Vec::new();

        for (index, row) in csv_reader.deserialize::<PanelRow>().enumerate() {
            let spec = SubstanceSpec::from_row(row?, index)?;
            if !seen.insert(spec.name.clone()) {
                return Err(PanelError::DuplicateName(spec.name));
            }
            if spec.is_internal_standard() {
                standards.push(spec);
            } else {
                targets.push(spec);
            }
        }

        if standards.is_empty() {
            return Err(PanelError::NoStandards);
        }
        Ok(Self { standards, targets })
    }

    /// Internal standards
    pub fn standards(&self) -> &[SubstanceSpec] {
        &self.standards
    }

    /// Target substances
    pub fn targets(&self) -> &[SubstanceSpec] {
        &self.targets
    }

    /// All entries, standards first
    pub fn iter(&self) -> impl Iterator<Item = &SubstanceSpec> {
        self.standards.iter().chain(&self.targets)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.standards.len() + self.targets.len()
    }

    /// True when the panel has no entries (never the case for a loaded panel)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look an entry up by name
    pub fn find(&self, name: &str) -> Option<&SubstanceSpec> {
        self.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<28} {:>6} {:>6}  {:<36} {:>3} {:>10}",
            "name", "rt_lo", "rt_hi", "mass window", "pol", "cid"
        )?;
        for spec in self.iter() {
            writeln!(
                f,
                "{:<28} {:>6.2} {:>6.2}  {:<36} {:>3} {:>10}",
                spec.name,
                spec.retention_window.start(),
                spec.retention_window.end(),
                spec.mass_window.to_string(),
                spec.scan_filter.polarity.to_string(),
                spec.reference_compound_id
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            )?;
        }
        write!(
            f,
            "{} internal standards, {} targets",
            self.standards.len(),
            self.targets.len()
        )
    }
}
