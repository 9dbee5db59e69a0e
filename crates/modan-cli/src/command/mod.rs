use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use modan_analysis::AnalysisSettings;
use modan_shape::Dataset;

use self::{
    analyze::AnalyzeArg,
    convert::ConvertArg,
    info::InfoArg,
    multivariate::{CvaArg, ManovaArg, PcaArg},
    superimpose::SuperimposeArg,
};

mod analyze;
mod convert;
mod info;
mod multivariate;
mod superimpose;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Analysis settings JSON file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug messages
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Summarize a landmark file
    Info(#[clap(flatten)] InfoArg),
    /// Superimpose the configurations of a landmark file
    Superimpose(#[clap(flatten)] SuperimposeArg),
    /// Principal component analysis of the superimposed coordinates
    Pca(#[clap(flatten)] PcaArg),
    /// Canonical variate analysis grouped by a variable
    Cva(#[clap(flatten)] CvaArg),
    /// MANOVA grouped by a variable
    Manova(#[clap(flatten)] ManovaArg),
    /// Run superimposition, PCA, CVA and MANOVA in one go
    Analyze(#[clap(flatten)] AnalyzeArg),
    /// Export a landmark file to another format
    Convert(#[clap(flatten)] ConvertArg),
}

/// Landmark file to read.
#[derive(Debug, Clone, Args)]
pub(crate) struct InputArg {
    /// Landmark file (.tps, .nts, .x1y1 or Morphologika .txt)
    pub file: PathBuf,
    /// Negate y coordinates of 2D data
    #[arg(long)]
    pub invert_y: bool,
}

impl InputArg {
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Applies the input flags on top of the loaded settings.
    pub fn apply(&self, settings: &mut AnalysisSettings) {
        settings.invert_y |= self.invert_y;
    }

    pub fn load(&self, settings: &AnalysisSettings) -> anyhow::Result<Dataset> {
        crate::util::load_dataset(&self.file, settings)
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut settings = crate::util::load_settings(args.config.as_deref())?;
    match &args.mode {
        Mode::Info(arg) => info::run(arg, &mut settings)?,
        Mode::Superimpose(arg) => superimpose::run(arg, &mut settings)?,
        Mode::Pca(arg) => multivariate::run_pca(arg, &mut settings)?,
        Mode::Cva(arg) => multivariate::run_cva(arg, &mut settings)?,
        Mode::Manova(arg) => multivariate::run_manova(arg, &mut settings)?,
        Mode::Analyze(arg) => analyze::run(arg, &mut settings)?,
        Mode::Convert(arg) => convert::run(arg, &mut settings)?,
    }
    Ok(())
}
