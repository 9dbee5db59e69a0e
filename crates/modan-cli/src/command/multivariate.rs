//! PCA, CVA and MANOVA commands
//!
//! Each command superimposes the dataset according to the settings and runs
//! PCA on the aligned coordinates. CVA and MANOVA then work on the PCA
//! scores, the same way the `analyze` pipeline does.

use std::path::PathBuf;

use clap::Args;
use modan_analysis::{
    AnalysisSettings, pca::PrincipalComponents, pipeline, report::{CvaReport, PcaReport},
};
use modan_shape::Dataset;

use crate::{
    command::{InputArg, superimpose::MethodOverrideArg},
    util::{Output, Stamped},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct PcaArg {
    #[clap(flatten)]
    input: InputArg,
    #[clap(flatten)]
    method: MethodOverrideArg,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct CvaArg {
    #[clap(flatten)]
    input: InputArg,
    #[clap(flatten)]
    method: MethodOverrideArg,
    /// Grouping variable, by name or 1-based index
    #[arg(long)]
    group_by: String,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct ManovaArg {
    #[clap(flatten)]
    input: InputArg,
    #[clap(flatten)]
    method: MethodOverrideArg,
    /// Grouping variable, by name or 1-based index
    #[arg(long)]
    group_by: String,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Loads, superimposes and runs PCA.
fn principal_components(
    input: &InputArg,
    method: &MethodOverrideArg,
    settings: &mut AnalysisSettings,
) -> anyhow::Result<(Dataset, PrincipalComponents)> {
    input.apply(settings);
    method.apply(settings)?;
    let dataset = input.load(settings)?;
    let set = modan_shape::superimpose(&dataset, &settings.method()?)?;
    let pca = PrincipalComponents::fit(&set.data_matrix())?;
    Ok((dataset, pca))
}

pub(crate) fn run_pca(arg: &PcaArg, settings: &mut AnalysisSettings) -> anyhow::Result<()> {
    let (_, pca) = principal_components(&arg.input, &arg.method, settings)?;
    let report = PcaReport::new(&pca, settings.effective_eigenvalue_ratio);
    Output::save_json(&Stamped::new(arg.input.path(), report), arg.output.clone())
}

pub(crate) fn run_cva(arg: &CvaArg, settings: &mut AnalysisSettings) -> anyhow::Result<()> {
    let (dataset, pca) = principal_components(&arg.input, &arg.method, settings)?;
    let index = dataset.variable_index(&arg.group_by)?;
    let labels = dataset.group_labels(index);
    let cva = pipeline::run_cva(&pca, &labels, settings)?;
    let report = CvaReport::new(dataset.variable_names()[index].clone(), &cva);
    Output::save_json(&Stamped::new(arg.input.path(), report), arg.output.clone())
}

pub(crate) fn run_manova(arg: &ManovaArg, settings: &mut AnalysisSettings) -> anyhow::Result<()> {
    let (dataset, pca) = principal_components(&arg.input, &arg.method, settings)?;
    let index = dataset.variable_index(&arg.group_by)?;
    let labels = dataset.group_labels(index);
    let report = pipeline::run_manova(
        &pca,
        &labels,
        settings,
        dataset.variable_names()[index].clone(),
    )?;
    Output::save_json(&Stamped::new(arg.input.path(), report), arg.output.clone())
}
