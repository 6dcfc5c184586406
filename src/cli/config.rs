//! TOML configuration file support.
//!
//! Settings shared by every run of a laboratory can live in a config file
//! instead of being repeated on the command line:
//!
//! ```toml
//! # dopscreen.toml
//! [screening]
//! output_dir = "figures"
//! panel = "panel.csv"
//! figures = true
//!
//! [lookup]
//! compound_dir = "pubchem"
//!
//! [render]
//! width = 1600
//! height = 800
//!
//! [batch]
//! allowed_extensions = ["mzML"]
//! stage_dir = "staged"
//! ```
//!
//! Command-line flags override the file; the file overrides built-in defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use dopscreen::render::DEFAULT_FIGURE_SIZE;

/// Directory figures go to when nothing else is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "figures";

/// Acquisition extension accepted by `batch` when nothing else is configured.
pub const DEFAULT_EXTENSION: &str = "mzML";

/// Root configuration structure for dopscreen.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Screening settings.
    #[serde(default)]
    pub screening: ScreeningConfig,

    /// Compound metadata settings.
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Figure settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Batch front-end settings.
    #[serde(default)]
    pub batch: BatchConfig,
}

/// `[screening]`
#[derive(Debug, Default, Deserialize)]
pub struct ScreeningConfig {
    /// Figure output directory.
    pub output_dir: Option<PathBuf>,
    /// Panel CSV replacing the embedded panel.
    pub panel: Option<PathBuf>,
    /// Draw figures for presumed positives.
    pub figures: Option<bool>,
}

/// `[lookup]`
#[derive(Debug, Default, Deserialize)]
pub struct LookupConfig {
    /// Directory of `<cid>.json` PubChem records.
    pub compound_dir: Option<PathBuf>,
}

/// `[render]`
#[derive(Debug, Default, Deserialize)]
pub struct RenderConfig {
    /// Figure width in pixels.
    pub width: Option<u32>,
    /// Figure height in pixels.
    pub height: Option<u32>,
}

/// `[batch]`
#[derive(Debug, Default, Deserialize)]
pub struct BatchConfig {
    /// Accepted acquisition extensions (compared case-insensitively).
    pub allowed_extensions: Option<Vec<String>>,
    /// Directory acquisitions are copied to before screening.
    pub stage_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Figure output directory, flag first.
    pub fn output_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.screening.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    /// Panel CSV, flag first; `None` means the embedded panel.
    pub fn panel(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.screening.panel.clone())
    }

    /// PubChem record directory, flag first.
    pub fn compound_dir(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.lookup.compound_dir.clone())
    }

    /// Whether figures are drawn; `--no-figures` always wins.
    pub fn figures(&self, no_figures: bool) -> bool {
        !no_figures && self.screening.figures.unwrap_or(true)
    }

    /// Figure size in pixels.
    pub fn figure_size(&self) -> (u32, u32) {
        (
            self.render.width.unwrap_or(DEFAULT_FIGURE_SIZE.0),
            self.render.height.unwrap_or(DEFAULT_FIGURE_SIZE.1),
        )
    }

    /// Accepted acquisition extensions.
    pub fn allowed_extensions(&self) -> Vec<String> {
        self.batch
            .allowed_extensions
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_EXTENSION.to_string()])
    }

    /// Staging directory, flag first.
    pub fn stage_dir(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.batch.stage_dir.clone())
    }
}
