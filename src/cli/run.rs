use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

use dopscreen::compound::{CompoundLookup, NoLookup, PubChemDirectory};
use dopscreen::panel::Panel;
use dopscreen::pipeline::{PipelineContext, SampleSet, ScreeningOptions};
use dopscreen::render::SvgFigureRenderer;

use super::config::Config;

/// Arguments of `dopscreen run`
pub struct RunArgs {
    pub sample: PathBuf,
    pub control: PathBuf,
    pub control_reinj: PathBuf,
    pub control_negative: PathBuf,
    pub config: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub panel: Option<PathBuf>,
    pub compound_dir: Option<PathBuf>,
    pub no_figures: bool,
    pub json: bool,
}

/// Load the panel from `path`, or the embedded one
pub fn load_panel(path: Option<&Path>) -> Result<Panel> {
    match path {
        Some(path) => Panel::from_path(path)
            .with_context(|| format!("Failed to load panel: {}", path.display())),
        None => Panel::embedded().context("Failed to load embedded panel"),
    }
}

/// Screen one sample and print its report
pub fn run(args: RunArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    let panel = load_panel(config.panel(args.panel).as_deref())?;
    info!(
        "Panel: {} internal standards, {} targets",
        panel.standards().len(),
        panel.targets().len()
    );

    let output_dir = config.output_dir(args.output_dir);
    let (width, height) = config.figure_size();
    let sink = SvgFigureRenderer::new(&output_dir).with_size(width, height);

    let lookup: Box<dyn CompoundLookup> = match config.compound_dir(args.compound_dir) {
        Some(dir) => {
            info!("Compound records: {}", dir.display());
            Box::new(PubChemDirectory::new(dir))
        }
        None => Box::new(NoLookup),
    };

    let mut context = PipelineContext::new(panel, Box::new(sink))
        .with_lookup(lookup)
        .with_options(ScreeningOptions {
            render_figures: config.figures(args.no_figures),
        });

    let set = SampleSet::open(
        &args.sample,
        &args.control,
        &args.control_reinj,
        &args.control_negative,
    )
    .with_context(|| format!("Failed to load acquisitions for {}", args.sample.display()))?;

    let report = context
        .screen_sample(&set)
        .with_context(|| format!("Screening failed for {}", args.sample.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        #[cfg(feature = "colorized_output")]
        {
            println!("{}", report.format_colored());
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            println!("{}", report);
        }
    }

    if report.figures.is_empty() {
        info!("No figures written");
    } else {
        info!(
            "{} figures written to {}",
            report.figures.len(),
            output_dir.display()
        );
    }

    Ok(())
}
