use std::path::PathBuf;

use clap::{Args, ValueEnum};
use modan_analysis::AnalysisSettings;
use modan_formats::FileFormat;

use crate::{
    command::{InputArg, superimpose::MethodOverrideArg},
    util::Output,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ExportFormat {
    Tps,
    X1y1,
    Morphologika,
}

impl From<ExportFormat> for FileFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Tps => FileFormat::Tps,
            ExportFormat::X1y1 => FileFormat::X1y1,
            ExportFormat::Morphologika => FileFormat::Morphologika,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct ConvertArg {
    #[clap(flatten)]
    input: InputArg,
    /// Target format
    #[arg(long)]
    to: ExportFormat,
    /// Export superimposed instead of raw coordinates
    #[arg(long)]
    superimpose: bool,
    #[clap(flatten)]
    method: MethodOverrideArg,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ConvertArg, settings: &mut AnalysisSettings) -> anyhow::Result<()> {
    arg.input.apply(settings);
    arg.method.apply(settings)?;
    let mut dataset = arg.input.load(settings)?;
    if arg.superimpose {
        let set = modan_shape::superimpose(&dataset, &settings.method()?)?;
        dataset = set.to_dataset(&dataset)?;
    }

    let format = FileFormat::from(arg.to);
    let exported = dataset.to_imported(format);
    let precision = Some(settings.decimal_places);
    let text = match format {
        FileFormat::Tps => modan_formats::tps::write(&exported, precision),
        FileFormat::X1y1 => modan_formats::x1y1::write(&exported, precision),
        FileFormat::Morphologika | FileFormat::Nts => {
            modan_formats::morphologika::write(&exported, precision)
        }
    };
    log::info!(
        "exporting {} objects of {:?} as {format}",
        dataset.len(),
        dataset.name()
    );
    Output::save_text(&text, arg.output.clone())
}
