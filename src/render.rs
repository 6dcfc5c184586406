//! Comparison figures
//!
//! A qualifying substance gets one two-panel figure: the four extracted
//! traces overlaid on the left, an identity card for the reference compound
//! on the right. Figures are handed to a [`FigureSink`]; the shipped sink
//! writes SVG with `plotters`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use plotters::prelude::*;

use crate::compound::{describe, CompoundInfo, CompoundLookup};
use crate::extract::ChromatogramSlice;
use crate::fuzzy::{ConfidenceBucket, GATE_FLOOR};
use crate::panel::{SubstanceSpec, INTERNAL_STANDARD_PREFIX};
use crate::pipeline::{ComparisonResult, SubstanceTraces};

/// Column at which the identity card wraps long values
pub const WRAP_WIDTH: usize = 80;

/// Default figure size in pixels
pub const DEFAULT_FIGURE_SIZE: (u32, u32) = (1600, 800);

const SAMPLE_COLOR: RGBColor = RGBColor(255, 165, 0);
const CONTROL_COLOR: RGBColor = RGBColor(128, 0, 128);
const NEGATIVE_COLOR: RGBColor = RGBColor(0, 128, 0);
const REINJECTION_COLOR: RGBColor = RGBColor(0, 0, 128);

/// Errors raised while writing a figure
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Output directory or file could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The drawing backend failed
    #[error("Drawing error in {path}: {message}")]
    Drawing {
        /// Figure being drawn
        path: PathBuf,
        /// Backend message
        message: String,
    },
}

/// Whether a comparison earns a figure.
///
/// Internal standards, no-match scores (at or below the gate floor),
/// degenerate fits (exactly 0 or 1), undefined scores and negative
/// conclusions are never drawn.
pub fn should_render(substance_name: &str, result: &ComparisonResult) -> bool {
    let r2 = result.r2;
    !substance_name.starts_with(INTERNAL_STANDARD_PREFIX)
        && !r2.is_nan()
        && r2 > GATE_FLOOR
        && r2 != 0.0
        && r2 != 1.0
        && result.bucket != ConfidenceBucket::Negative
}

/// Everything drawn on one figure
#[derive(Debug, Clone)]
pub struct ComparisonFigure<'a> {
    /// Sample file name
    pub sample_name: &'a str,
    /// Panel entry
    pub substance: &'a SubstanceSpec,
    /// Score and conclusion
    pub result: &'a ComparisonResult,
    /// Sample trace, cut to the control length
    pub sample: ChromatogramSlice,
    /// Positive control trace, cut to the sample length
    pub control: ChromatogramSlice,
    /// Negative control trace, cut to the re-injection length
    pub negative: ChromatogramSlice,
    /// Re-injected control trace, cut to the negative control length
    pub reinjection: ChromatogramSlice,
    /// Reference compound card
    pub compound: CompoundInfo,
}

impl<'a> ComparisonFigure<'a> {
    /// Assemble a figure, cutting each trace pair to its common length
    pub fn new(
        sample_name: &'a str,
        substance: &'a SubstanceSpec,
        result: &'a ComparisonResult,
        traces: &SubstanceTraces,
        compound: CompoundInfo,
    ) -> Self {
        let (sample, control) = crate::similarity::truncate_pair(&traces.sample, &traces.control);
        let (negative, reinjection) =
            crate::similarity::truncate_pair(&traces.control_negative, &traces.control_reinj);
        Self {
            sample_name,
            substance,
            result,
            sample,
            control,
            negative,
            reinjection,
            compound,
        }
    }

    /// Lines of the identity card
    pub fn card_lines(&self) -> Vec<String> {
        let info = &self.compound;
        let mut lines = vec![
            format!("Conclusion: {}", self.result.bucket),
            format!("Sample: {}", self.sample_name),
            format!("Lab substance: {}", self.substance.display_label),
            String::new(),
            format!("PubChem substance: {}", info.substance_name()),
        ];
        lines.extend(wrap_text(&format!("IUPAC: {}", info.iupac_name()), WRAP_WIDTH));
        lines.push(format!("CAS: {}", info.cas()));
        lines.push(format!("Mass: {}", info.exact_mass()));
        lines.push(format!("Weight: {}", info.molecular_weight()));
        lines.push(format!("Formula: {}", info.formula()));
        lines.extend(wrap_text(
            &format!("Synonyms: {}", info.synonyms_text()),
            WRAP_WIDTH,
        ));
        lines.extend(wrap_text(&format!("Structure: {}", info.smiles()), WRAP_WIDTH));
        lines
    }

    /// File name of the figure: `<sample-stem>__<substance-name>.svg`
    pub fn file_name(&self) -> String {
        let stem = Path::new(self.sample_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.sample_name.to_string());
        format!(
            "{}__{}.svg",
            sanitize_file_name(&stem),
            sanitize_file_name(&self.substance.name)
        )
    }
}

/// Destination for comparison figures
pub trait FigureSink {
    /// Write one figure, returning where it went
    fn draw(&mut self, figure: &ComparisonFigure<'_>) -> Result<PathBuf, RenderError>;
}

/// Gate, look up and draw one comparison.
///
/// Returns `Ok(None)` without touching the lookup or the sink when the
/// comparison does not qualify.
pub fn render(
    sink: &mut dyn FigureSink,
    lookup: &dyn CompoundLookup,
    sample_name: &str,
    substance: &SubstanceSpec,
    traces: &SubstanceTraces,
    result: &ComparisonResult,
) -> Result<Option<PathBuf>, RenderError> {
    if !should_render(&substance.name, result) {
        debug!("{}: no figure (r2 = {}, {})", substance.name, result.r2, result.bucket);
        return Ok(None);
    }
    let compound = describe(lookup, substance.reference_compound_id);
    let figure = ComparisonFigure::new(sample_name, substance, result, traces, compound);
    sink.draw(&figure).map(Some)
}

/// Writes figures as SVG files into one directory
#[derive(Debug, Clone)]
pub struct SvgFigureRenderer {
    output_dir: PathBuf,
    size: (u32, u32),
}

impl SvgFigureRenderer {
    /// Write into `output_dir` at the default size
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            size: DEFAULT_FIGURE_SIZE,
        }
    }

    /// Override the figure size in pixels
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width.max(200), height.max(100));
        self
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl FigureSink for SvgFigureRenderer {
    fn draw(&mut self, figure: &ComparisonFigure<'_>) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(figure.file_name());

        draw_svg(&path, self.size, figure).map_err(|e| RenderError::Drawing {
            path: path.clone(),
            message: e.to_string(),
        })?;

        info!("Wrote {}", path.display());
        Ok(path)
    }
}

fn draw_svg(
    path: &Path,
    size: (u32, u32),
    figure: &ComparisonFigure<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let panels = root.split_evenly((1, 2));
    draw_traces(&panels[0], figure)?;
    draw_card(&panels[1], figure)?;

    root.present()?;
    Ok(())
}

fn trace_bounds(traces: &[&ChromatogramSlice]) -> ((f64, f64), f64) {
    let mut rt_min = f64::INFINITY;
    let mut rt_max = f64::NEG_INFINITY;
    let mut max_intensity: f64 = 0.0;
    for trace in traces {
        for (rt, intensity) in trace.points() {
            rt_min = rt_min.min(rt);
            rt_max = rt_max.max(rt);
            max_intensity = max_intensity.max(intensity);
        }
    }
    if !rt_min.is_finite() || rt_min >= rt_max {
        let centre = if rt_min.is_finite() { rt_min } else { 0.0 };
        rt_min = centre - 0.5;
        rt_max = centre + 0.5;
    }
    if max_intensity <= 0.0 {
        max_intensity = 1.0;
    }
    ((rt_min, rt_max), max_intensity * 1.05)
}

fn draw_traces<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    figure: &ComparisonFigure<'_>,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB::ErrorType: 'static,
{
    let ((rt_min, rt_max), y_max) = trace_bounds(&[
        &figure.sample,
        &figure.control,
        &figure.negative,
        &figure.reinjection,
    ]);

    let mut chart = ChartBuilder::on(area)
        .caption(&figure.substance.display_label, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(rt_min..rt_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Retention time (min)")
        .y_desc("Intensity")
        .draw()?;

    chart
        .draw_series(LineSeries::new(figure.sample.points().collect::<Vec<_>>(), SAMPLE_COLOR))?
        .label("Sample")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SAMPLE_COLOR));
    chart
        .draw_series(DashedLineSeries::new(
            figure.control.points().collect::<Vec<_>>(),
            6,
            4,
            CONTROL_COLOR.into(),
        ))?
        .label("Positive control")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], CONTROL_COLOR));
    chart
        .draw_series(LineSeries::new(figure.negative.points().collect::<Vec<_>>(), NEGATIVE_COLOR))?
        .label("Negative control")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], NEGATIVE_COLOR));
    chart
        .draw_series(DashedLineSeries::new(
            figure.reinjection.points().collect::<Vec<_>>(),
            6,
            4,
            REINJECTION_COLOR.into(),
        ))?
        .label("Positive control (reinjection)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], REINJECTION_COLOR));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_card<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    figure: &ComparisonFigure<'_>,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB::ErrorType: 'static,
{
    let (width, height) = area.dim_in_pixel();
    let (width, height) = (width as i32, height as i32);
    let margin = 20;
    let line_height = 24;

    area.draw(&Rectangle::new(
        [(margin, margin), (width - margin, height - margin)],
        ShapeStyle::from(&RGBColor(128, 128, 128)).stroke_width(1),
    ))?;

    let style = ("sans-serif", 15).into_font().color(&BLACK);
    for (i, line) in figure.card_lines().iter().enumerate() {
        let y = 2 * margin + i as i32 * line_height;
        if y > height - 2 * margin {
            break;
        }
        area.draw(&Text::new(line.as_str(), (2 * margin, y), style.clone()))?;
    }
    Ok(())
}

/// Greedy word wrap at `width` columns; words longer than a line are split
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let current_len = current.chars().count();
        if current.is_empty() {
            current = word.into_iter().collect();
        } else if current_len + 1 + word.len() <= width {
            current.push(' ');
            current.extend(word);
        } else {
            lines.push(std::mem::replace(&mut current, word.into_iter().collect()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Reduce a name to `[A-Za-z0-9._-]`, replacing anything else with `_`
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::Panel;

    fn result(name: &str, r2: f64, bucket: ConfidenceBucket) -> ComparisonResult {
        ComparisonResult {
            substance_name: name.to_string(),
            r2,
            confidence_level: 3.0,
            bucket,
        }
    }

    fn slice(values: &[f64]) -> ChromatogramSlice {
        let rts = (0..values.len()).map(|i| 4.0 + i as f64 * 0.05).collect();
        ChromatogramSlice::new(rts, values.to_vec()).unwrap()
    }

    #[test]
    fn test_should_render_gating() {
        let high = ConfidenceBucket::PresumedHigh;
        assert!(should_render("Fentanil", &result("Fentanil", 0.42, high)));
        assert!(!should_render("IS_Testo", &result("IS_Testo", 0.42, high)));
        assert!(!should_render("Fentanil", &result("Fentanil", 0.0, high)));
        assert!(!should_render("Fentanil", &result("Fentanil", 1.0, high)));
        assert!(!should_render("Fentanil", &result("Fentanil", -12.0, high)));
        assert!(!should_render("Fentanil", &result("Fentanil", f64::NAN, high)));
        assert!(!should_render(
            "Fentanil",
            &result("Fentanil", 0.42, ConfidenceBucket::Negative)
        ));
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("a bb ccc", 4), vec!["a bb", "ccc"]);
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert!(wrap_text("", 80).is_empty());
        let long = "word ".repeat(40);
        assert!(wrap_text(&long, WRAP_WIDTH).iter().all(|l| l.chars().count() <= WRAP_WIDTH));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("sample 01.mzML"), "sample_01.mzML");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name("..."), "unnamed");
    }

    #[test]
    fn test_figure_truncates_pairs_and_names_file() {
        let panel = Panel::embedded().unwrap();
        let spec = panel.find("Fentanil").unwrap();
        let res = result("Fentanil", 0.5, ConfidenceBucket::PresumedVeryHigh);
        let traces = SubstanceTraces {
            sample: slice(&[1.0, 2.0, 3.0, 4.0]),
            control: slice(&[1.0, 2.0]),
            control_reinj: slice(&[1.0, 2.0, 3.0]),
            control_negative: slice(&[0.0, 0.0, 0.0, 0.0, 0.0]),
        };
        let figure = ComparisonFigure::new(
            "runs/A123.mzML",
            spec,
            &res,
            &traces,
            CompoundInfo::default(),
        );

        assert_eq!(figure.sample.len(), 2);
        assert_eq!(figure.control.len(), 2);
        assert_eq!(figure.negative.len(), 3);
        assert_eq!(figure.reinjection.len(), 3);
        assert_eq!(figure.file_name(), "A123__Fentanil.svg");

        let lines = figure.card_lines();
        assert_eq!(lines[0], "Conclusion: PRESUMED_VERY_HIGH");
        assert!(lines.iter().any(|l| l == "CAS: N/A"));
    }

    #[test]
    fn test_svg_renderer_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let panel = Panel::embedded().unwrap();
        let spec = panel.find("Fentanil").unwrap();
        let res = result("Fentanil", 0.5, ConfidenceBucket::PresumedVeryHigh);
        let traces = SubstanceTraces {
            sample: slice(&[1.0, 5.0, 3.0]),
            control: slice(&[1.0, 4.0, 3.0]),
            control_reinj: slice(&[1.0, 4.5, 3.0]),
            control_negative: slice(&[0.0, 0.1, 0.0]),
        };

        let mut sink = SvgFigureRenderer::new(dir.path().join("figures"));
        let written = render(
            &mut sink,
            &crate::compound::NoLookup,
            "A123.mzML",
            spec,
            &traces,
            &res,
        )
        .unwrap()
        .unwrap();

        assert!(written.exists());
        let svg = std::fs::read_to_string(&written).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_render_skips_without_drawing() {
        struct Panicking;
        impl FigureSink for Panicking {
            fn draw(&mut self, _: &ComparisonFigure<'_>) -> Result<PathBuf, RenderError> {
                panic!("should not draw");
            }
        }
        let panel = Panel::embedded().unwrap();
        let spec = panel.find("Fentanil").unwrap();
        let res = result("Fentanil", 1.0, ConfidenceBucket::PresumedVeryHigh);
        let traces = SubstanceTraces::default();
        let out = render(
            &mut Panicking,
            &crate::compound::NoLookup,
            "A.mzML",
            spec,
            &traces,
            &res,
        )
        .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_render_without_cid_skips_lookup() {
        struct NeverAsked;
        impl CompoundLookup for NeverAsked {
            fn lookup(&self, cid: u64) -> Result<CompoundInfo, crate::compound::LookupError> {
                panic!("unexpected lookup of {cid}");
            }
        }
        struct Cards(Vec<String>);
        impl FigureSink for Cards {
            fn draw(&mut self, figure: &ComparisonFigure<'_>) -> Result<PathBuf, RenderError> {
                self.0 = figure.card_lines();
                Ok(PathBuf::from(figure.file_name()))
            }
        }

        let panel = Panel::embedded().unwrap();
        let spec = panel.find("ASR9009m6").unwrap();
        let res = result("ASR9009m6", 0.5, ConfidenceBucket::PresumedVeryHigh);
        let traces = SubstanceTraces {
            sample: slice(&[1.0, 5.0, 3.0]),
            control: slice(&[1.0, 4.0, 3.0]),
            control_reinj: slice(&[1.0, 4.5, 3.0]),
            control_negative: slice(&[0.0, 0.1, 0.0]),
        };

        let mut sink = Cards(Vec::new());
        let written = render(&mut sink, &NeverAsked, "A123.mzML", spec, &traces, &res)
            .unwrap()
            .unwrap();

        assert_eq!(written, PathBuf::from("A123__ASR9009m6.svg"));
        assert!(sink.0.iter().any(|l| l == "Lab substance: S4. SR9009 M6*"));
        for line in ["PubChem substance: N/A", "IUPAC: N/A", "CAS: N/A", "Formula: N/A"] {
            assert!(sink.0.iter().any(|l| l == line), "missing {line}");
        }
    }
}
