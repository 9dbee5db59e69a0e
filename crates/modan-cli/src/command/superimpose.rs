use std::path::PathBuf;

use clap::{Args, ValueEnum};
use modan_analysis::{AnalysisSettings, SuperimpositionSetting, report::SuperimpositionReport};

use crate::{
    command::InputArg,
    util::{Output, Stamped},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum MethodArg {
    Procrustes,
    Bookstein,
    ResistantFit,
}

/// Superimposition flags shared by every command that superimposes.
#[derive(Debug, Clone, Args)]
pub(crate) struct MethodOverrideArg {
    /// Superimposition method (default: from settings)
    #[arg(long)]
    method: Option<MethodArg>,
    /// Bookstein baseline landmarks, 1-based
    #[arg(long, value_delimiter = ',')]
    baseline: Option<Vec<usize>>,
    /// Keep configurations at their original size
    #[arg(long)]
    no_scaling: bool,
}

impl MethodOverrideArg {
    pub fn apply(&self, settings: &mut AnalysisSettings) -> anyhow::Result<()> {
        let baseline = match self.baseline.as_deref() {
            Some(&[a, b]) => Some([a, b]),
            Some(other) => anyhow::bail!("--baseline takes two landmarks, got {}", other.len()),
            None => None,
        };
        match self.method {
            Some(MethodArg::Procrustes) => {
                settings.superimposition = SuperimpositionSetting::Procrustes;
            }
            Some(MethodArg::Bookstein) => {
                settings.superimposition = SuperimpositionSetting::Bookstein {
                    baseline: baseline.unwrap_or([1, 2]),
                };
            }
            Some(MethodArg::ResistantFit) => {
                settings.superimposition = SuperimpositionSetting::ResistantFit;
            }
            // A baseline alone selects Bookstein registration.
            None => {
                if let Some(baseline) = baseline {
                    settings.superimposition = SuperimpositionSetting::Bookstein { baseline };
                }
            }
        }
        if self.no_scaling {
            settings.procrustes.scaling = false;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct SuperimposeArg {
    #[clap(flatten)]
    input: InputArg,
    #[clap(flatten)]
    method: MethodOverrideArg,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &SuperimposeArg, settings: &mut AnalysisSettings) -> anyhow::Result<()> {
    arg.input.apply(settings);
    arg.method.apply(settings)?;
    let dataset = arg.input.load(settings)?;
    let set = modan_shape::superimpose(&dataset, &settings.method()?)?;
    let report = SuperimpositionReport::new(&set, &dataset);
    Output::save_json(&Stamped::new(arg.input.path(), report), arg.output.clone())
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use clap::Parser as _;

    use super::*;
    use crate::command::{CommandArgs, Mode};

    fn parse(args: &[&str]) -> anyhow::Result<(CommandArgs, SuperimposeArg)> {
        let command_line = ["modan", "superimpose", "wings.tps"].iter().chain(args).copied();
        let args = CommandArgs::try_parse_from(command_line)?;
        match &args.mode {
            Mode::Superimpose(arg) => {
                let arg = arg.clone();
                Ok((args, arg))
            }
            mode => anyhow::bail!("unexpected mode {mode:?}"),
        }
    }

    fn applied(args: &[&str]) -> anyhow::Result<AnalysisSettings> {
        let (_, arg) = parse(args)?;
        let mut settings = AnalysisSettings::default();
        arg.input.apply(&mut settings);
        arg.method.apply(&mut settings)?;
        Ok(settings)
    }

    #[test]
    fn test_no_flags_keep_settings() {
        let (args, arg) = parse(&[]).unwrap();
        assert_eq!(arg.input.path(), Path::new("wings.tps"));
        assert!(args.config.is_none());
        assert!(!args.verbose);
        assert_eq!(applied(&[]).unwrap(), AnalysisSettings::default());
    }

    #[test]
    fn test_baseline_list_is_comma_separated() {
        let (_, arg) = parse(&["--baseline", "1,4"]).unwrap();
        assert_eq!(arg.method.baseline, Some(vec![1, 4]));
    }

    #[test]
    fn test_baseline_alone_selects_bookstein() {
        let settings = applied(&["--baseline", "1,4"]).unwrap();
        assert_eq!(
            settings.superimposition,
            SuperimpositionSetting::Bookstein { baseline: [1, 4] }
        );

        let settings = applied(&["--method", "bookstein"]).unwrap();
        assert_eq!(
            settings.superimposition,
            SuperimpositionSetting::Bookstein { baseline: [1, 2] }
        );
    }

    #[test]
    fn test_baseline_needs_two_landmarks() {
        assert!(applied(&["--baseline", "1,2,3"]).is_err());
        assert!(applied(&["--baseline", "1"]).is_err());
        assert!(applied(&["--method", "bookstein", "--baseline", "3"]).is_err());
    }

    #[test]
    fn test_no_scaling_and_invert_y() {
        let settings = applied(&["--no-scaling"]).unwrap();
        assert!(!settings.procrustes.scaling);
        assert!(!settings.invert_y);

        let settings = applied(&["--invert-y"]).unwrap();
        assert!(settings.invert_y);
        assert!(settings.procrustes.scaling);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        assert!(parse(&["--method", "thin-plate"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let path =
            std::env::temp_dir().join(format!("modan-cli-settings-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{ "superimposition": { "bookstein": { "baseline": [2, 3] } }, "decimal_places": 3 }"#,
        )
        .unwrap();
        let path_arg = path.to_str().unwrap();

        let (args, arg) = parse(&[
            "--method",
            "resistant-fit",
            "--invert-y",
            "-v",
            "--config",
            path_arg,
        ])
        .unwrap();
        assert!(args.verbose);
        assert_eq!(args.config.as_deref(), Some(path.as_path()));

        let mut settings = crate::util::load_settings(args.config.as_deref()).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(
            settings.superimposition,
            SuperimpositionSetting::Bookstein { baseline: [2, 3] }
        );

        arg.input.apply(&mut settings);
        arg.method.apply(&mut settings).unwrap();
        assert_eq!(settings.superimposition, SuperimpositionSetting::ResistantFit);
        assert!(settings.invert_y);
        assert_eq!(settings.decimal_places, 3);
    }
}
