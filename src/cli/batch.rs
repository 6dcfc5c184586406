//! Batch front end.
//!
//! Checks every acquisition before anything runs, optionally stages copies
//! under sanitized names, then screens each sample in its own `dopscreen run`
//! subprocess against the shared references.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use dopscreen::render::sanitize_file_name;

use super::config::Config;

/// Arguments of `dopscreen batch`
pub struct BatchArgs {
    pub control: PathBuf,
    pub control_reinj: PathBuf,
    pub control_negative: PathBuf,
    pub samples: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub stage_dir: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub panel: Option<PathBuf>,
    pub compound_dir: Option<PathBuf>,
    pub no_figures: bool,
}

/// Result of one `dopscreen run` subprocess
#[derive(Debug, Serialize)]
pub struct SampleRun {
    /// Sample acquisition as screened
    pub sample: PathBuf,
    /// Exit code; `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Whether the subprocess exited with status 0
    pub success: bool,
    /// Wall-clock time of the subprocess
    pub elapsed_secs: f64,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Parsed JSON report, when the subprocess produced one
    pub report: Option<Value>,
}

impl SampleRun {
    /// One-line description of the outcome
    pub fn describe(&self) -> String {
        if !self.success {
            let reason = self
                .stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("no output");
            return match self.exit_code {
                Some(code) => format!("FAILED (exit {code}): {reason}"),
                None => format!("FAILED (terminated): {reason}"),
            };
        }

        let Some(report) = &self.report else {
            return "ok".to_string();
        };
        if report["gate"]["status"] != "passed" {
            let shifted: Vec<&str> = report["gate"]["shifted"]
                .as_array()
                .map(|a| a.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            return format!(
                "ABORTED: {} ({})",
                dopscreen::pipeline::GATE_FAILURE_MESSAGE,
                shifted.join(", ")
            );
        }

        let hits = presumed_positives(report);
        if hits.is_empty() {
            "no presumed positives".to_string()
        } else {
            format!("presumed positive: {}", hits.join(", "))
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchSummary<'a> {
    started_at: DateTime<Utc>,
    elapsed_secs: f64,
    control: &'a Path,
    control_reinj: &'a Path,
    control_negative: &'a Path,
    samples: &'a [SampleRun],
}

fn presumed_positives(report: &Value) -> Vec<String> {
    report["outcomes"]
        .as_array()
        .map(|outcomes| {
            outcomes
                .iter()
                .filter(|o| o["status"] == "compared")
                .map(|o| &o["result"])
                .filter(|r| r["bucket"] != "NEGATIVE")
                .filter_map(|r| {
                    Some(format!(
                        "{} [{}]",
                        r["substance_name"].as_str()?,
                        r["bucket"].as_str()?
                    ))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Reject files whose extension is not in `allowed` (case-insensitive)
pub fn check_extension(path: &Path, allowed: &[String]) -> Result<()> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if ext.is_empty() || !allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)) {
        bail!(
            "File type not allowed: {} (accepted extensions: {})",
            path.display(),
            allowed.join(", ")
        );
    }
    Ok(())
}

/// Copy `files` into `dir` under sanitized names
fn stage(files: &[PathBuf], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create stage directory: {}", dir.display()))?;

    let mut names = HashSet::new();
    let mut staged = Vec::with_capacity(files.len());
    for file in files {
        let original = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = sanitize_file_name(&original);
        if !names.insert(name.clone()) {
            bail!("Two inputs stage to the same name: {}", name);
        }
        let target = dir.join(&name);
        fs::copy(file, &target).with_context(|| {
            format!("Failed to stage {} as {}", file.display(), target.display())
        })?;
        info!("Staged {} -> {}", file.display(), target.display());
        staged.push(target);
    }
    Ok(staged)
}

fn screen(exe: &Path, args: &BatchArgs, sample: &Path, references: &[PathBuf]) -> Result<SampleRun> {
    let mut command = Command::new(exe);
    command.arg("run").arg(sample).args(references).arg("--json");
    if let Some(config) = &args.config {
        command.arg("--config").arg(config);
    }
    if let Some(dir) = &args.output_dir {
        command.arg("--output-dir").arg(dir);
    }
    if let Some(panel) = &args.panel {
        command.arg("--panel").arg(panel);
    }
    if let Some(dir) = &args.compound_dir {
        command.arg("--compound-dir").arg(dir);
    }
    if args.no_figures {
        command.arg("--no-figures");
    }

    let timer = Instant::now();
    let output = command
        .output()
        .with_context(|| format!("Failed to start screening of {}", sample.display()))?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

    Ok(SampleRun {
        sample: sample.to_path_buf(),
        exit_code: output.status.code(),
        success: output.status.success(),
        elapsed_secs: timer.elapsed().as_secs_f64(),
        report: serde_json::from_str(&stdout).ok(),
        stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Screen every sample against the shared references
pub fn run(args: BatchArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let allowed = config.allowed_extensions();

    let mut files = vec![
        args.control.clone(),
        args.control_reinj.clone(),
        args.control_negative.clone(),
    ];
    files.extend(args.samples.iter().cloned());

    for file in &files {
        check_extension(file, &allowed)?;
        if !file.is_file() {
            bail!("File not found: {}", file.display());
        }
    }

    let files = match config.stage_dir(args.stage_dir.clone()) {
        Some(dir) => stage(&files, &dir)?,
        None => files,
    };
    let (references, samples) = files.split_at(3);

    let exe = std::env::current_exe().context("Cannot locate the dopscreen executable")?;
    let started_at = Utc::now();
    let timer = Instant::now();

    let mut runs = Vec::with_capacity(samples.len());
    for sample in samples {
        info!("Screening {}", sample.display());
        match screen(&exe, &args, sample, references) {
            Ok(run) => {
                if run.success {
                    info!("{}: done in {:.2} s", sample.display(), run.elapsed_secs);
                } else {
                    error!(
                        "{}: screening failed ({:?})",
                        sample.display(),
                        run.exit_code
                    );
                }
                runs.push(run);
            }
            Err(e) => {
                error!("{:#}", e);
                runs.push(SampleRun {
                    sample: sample.clone(),
                    exit_code: None,
                    success: false,
                    elapsed_secs: 0.0,
                    stdout: String::new(),
                    stderr: format!("{e:#}"),
                    report: None,
                });
            }
        }
    }
    let elapsed = timer.elapsed().as_secs_f64();

    for run in &runs {
        println!(
            "{}  {:.2} s  {}",
            run.sample.display(),
            run.elapsed_secs,
            run.describe()
        );
    }
    let failed = runs.iter().filter(|r| !r.success).count();
    println!(
        "{} samples, {} failed, total {:.2} s",
        runs.len(),
        failed,
        elapsed
    );
    if failed > 0 {
        warn!("{} of {} samples failed", failed, runs.len());
    }

    if let Some(path) = &args.summary {
        let summary = BatchSummary {
            started_at,
            elapsed_secs: elapsed,
            control: &references[0],
            control_reinj: &references[1],
            control_negative: &references[2],
            samples: &runs,
        };
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write summary: {}", path.display()))?;
        info!("Summary written to {}", path.display());
    }

    Ok(())
}
