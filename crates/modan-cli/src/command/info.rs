//! Landmark file summary
//!
//! Prints format, object and landmark counts, variables, missing landmarks and
//! centroid size statistics as plain text.

use std::fmt::Write as _;

use clap::Args;
use modan_analysis::AnalysisSettings;
use modan_shape::Dataset;
use modan_stats::descriptive::DescriptiveStats;

use crate::{command::InputArg, util};

#[derive(Debug, Clone, Args)]
pub(crate) struct InfoArg {
    #[clap(flatten)]
    input: InputArg,
}

pub(crate) fn run(arg: &InfoArg, settings: &mut AnalysisSettings) -> anyhow::Result<()> {
    arg.input.apply(settings);
    let imported = util::read_landmark_file(arg.input.path(), settings)?;
    let format = imported.format;
    let description = imported.description.clone();
    let dataset = Dataset::from_imported(imported)?;

    let precision = settings.decimal_places;
    let mut text = String::new();
    writeln!(text, "File:        {}", arg.input.path().display())?;
    writeln!(text, "Format:      {format}")?;
    writeln!(text, "Dataset:     {}", dataset.name())?;
    if let Some(description) = description {
        writeln!(text, "Description: {description}")?;
    }
    writeln!(text, "Dimension:   {}", dataset.dimension())?;
    writeln!(text, "Objects:     {}", dataset.len())?;
    writeln!(text, "Landmarks:   {}", dataset.landmark_count())?;
    writeln!(text, "Missing:     {}", dataset.missing_landmark_count())?;
    if dataset.variable_names().is_empty() {
        writeln!(text, "Variables:   (none)")?;
    } else {
        writeln!(text, "Variables:   {}", dataset.variable_names().join(", "))?;
    }
    if !dataset.edges().is_empty() {
        writeln!(text, "Wireframe:   {} edges", dataset.edges().len())?;
    }

    if let Some(stats) = DescriptiveStats::new(dataset.centroid_sizes()) {
        writeln!(text, "Centroid size:")?;
        writeln!(text, "  min     {:.precision$}", stats.min)?;
        writeln!(text, "  max     {:.precision$}", stats.max)?;
        writeln!(text, "  mean    {:.precision$}", stats.mean)?;
        writeln!(text, "  median  {:.precision$}", stats.median)?;
        writeln!(text, "  std dev {:.precision$}", stats.std_dev)?;
    }
    util::Output::save_text(&text, None)
}
