use std::path::PathBuf;

use clap::Args;
use modan_analysis::{AnalysisRequest, AnalysisSettings};

use crate::{
    command::{InputArg, superimpose::MethodOverrideArg},
    util::{Output, Stamped},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct AnalyzeArg {
    #[clap(flatten)]
    input: InputArg,
    #[clap(flatten)]
    method: MethodOverrideArg,
    /// Analysis name (default: "<dataset> analysis")
    #[arg(long)]
    name: Option<String>,
    /// CVA grouping variable, by name or 1-based index
    #[arg(long)]
    cva_group_by: Option<String>,
    /// MANOVA grouping variable, by name or 1-based index
    #[arg(long)]
    manova_group_by: Option<String>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &AnalyzeArg, settings: &mut AnalysisSettings) -> anyhow::Result<()> {
    arg.input.apply(settings);
    arg.method.apply(settings)?;
    let dataset = arg.input.load(settings)?;

    let request = AnalysisRequest {
        name: arg
            .name
            .clone()
            .unwrap_or_else(|| format!("{} analysis", dataset.name())),
        cva_group_by: arg
            .cva_group_by
            .as_deref()
            .map(|v| dataset.variable_index(v))
            .transpose()?,
        manova_group_by: arg
            .manova_group_by
            .as_deref()
            .map(|v| dataset.variable_index(v))
            .transpose()?,
    };
    let result = modan_analysis::run_analysis(&dataset, &request, settings)?;
    Output::save_json(&Stamped::new(arg.input.path(), result), arg.output.clone())
}
