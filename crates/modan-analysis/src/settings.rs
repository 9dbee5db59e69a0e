//! Analysis settings
//!
//! Settings are plain serde data so that the command-line front-end can load
//! them from a JSON file. Every field has a default, and a partial file only
//! overrides the fields it names:
//!
//! ```
//! use modan_analysis::{AnalysisSettings, SuperimpositionSetting};
//!
//! let settings: AnalysisSettings = serde_json::from_str(
//!     r#"{ "superimposition": { "bookstein": { "baseline": [1, 3] } }, "decimal_places": 4 }"#,
//! )?;
//! assert_eq!(
//!     settings.superimposition,
//!     SuperimpositionSetting::Bookstein { baseline: [1, 3] }
//! );
//! assert_eq!(settings.decimal_places, 4);
//! assert!(settings.procrustes.scaling);
//! # Ok::<(), serde_json::Error>(())
//! ```

use modan_shape::{ProcrustesOptions, SuperimpositionMethod};
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// Superimposition method as written in a settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuperimpositionSetting {
    #[default]
    Procrustes,
    Bookstein {
        /// 1-based landmark numbers.
        #[serde(default = "default_baseline")]
        baseline: [usize; 2],
    },
    ResistantFit,
}

fn default_baseline() -> [usize; 2] {
    [1, 2]
}

/// Settings shared by every analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub procrustes: ProcrustesOptions,
    pub superimposition: SuperimpositionSetting,
    /// Cumulative explained variance of the PCA components fed to MANOVA.
    pub manova_cumulative_variance: f64,
    /// Minimum explained-variance ratio of a PCA component to count as non-null.
    pub effective_eigenvalue_ratio: f64,
    /// Flip the y axis of 2D data when reading files.
    pub invert_y: bool,
    /// Digits after the decimal point in text output and exported files.
    pub decimal_places: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            procrustes: ProcrustesOptions::default(),
            superimposition: SuperimpositionSetting::default(),
            manova_cumulative_variance: 0.9,
            effective_eigenvalue_ratio: 1e-5,
            invert_y: false,
            decimal_places: 6,
        }
    }
}

impl AnalysisSettings {
    /// The superimposition method these settings select.
    pub fn method(&self) -> Result<SuperimpositionMethod, AnalysisError> {
        Ok(match self.superimposition {
            SuperimpositionSetting::Procrustes => SuperimpositionMethod::Procrustes(self.procrustes),
            SuperimpositionSetting::Bookstein {
                baseline: [first, second],
            } => {
                let zero_based = first.checked_sub(1).zip(second.checked_sub(1));
                let baseline =
                    zero_based.ok_or(AnalysisError::InvalidBaseline { first, second })?;
                SuperimpositionMethod::Bookstein { baseline }
            }
            SuperimpositionSetting::ResistantFit => SuperimpositionMethod::ResistantFit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AnalysisSettings::default();
        assert_eq!(settings.procrustes, ProcrustesOptions::default());
        assert!(!settings.procrustes.allow_reflection);
        assert!((settings.manova_cumulative_variance - 0.9).abs() < f64::EPSILON);
        assert!((settings.effective_eigenvalue_ratio - 1e-5).abs() < f64::EPSILON);
        assert_eq!(settings.decimal_places, 6);
        assert_eq!(
            settings.method().unwrap(),
            SuperimpositionMethod::Procrustes(ProcrustesOptions::default())
        );
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let settings: AnalysisSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, AnalysisSettings::default());
    }

    #[test]
    fn test_method_from_json() {
        let settings: AnalysisSettings =
            serde_json::from_str(r#"{ "superimposition": "resistant_fit" }"#).unwrap();
        assert_eq!(settings.method().unwrap(), SuperimpositionMethod::ResistantFit);

        let settings: AnalysisSettings =
            serde_json::from_str(r#"{ "superimposition": { "bookstein": {} } }"#).unwrap();
        assert_eq!(
            settings.method().unwrap(),
            SuperimpositionMethod::Bookstein { baseline: (0, 1) }
        );

        let settings: AnalysisSettings = serde_json::from_str(
            r#"{ "procrustes": { "scaling": false }, "superimposition": "procrustes" }"#,
        )
        .unwrap();
        let SuperimpositionMethod::Procrustes(options) = settings.method().unwrap() else {
            panic!("expected Procrustes");
        };
        assert!(!options.scaling);
        assert_eq!(options.max_iterations, 100);
    }

    #[test]
    fn test_zero_baseline_is_rejected() {
        let settings = AnalysisSettings {
            superimposition: SuperimpositionSetting::Bookstein { baseline: [0, 2] },
            ..AnalysisSettings::default()
        };
        assert_eq!(
            settings.method().unwrap_err(),
            AnalysisError::InvalidBaseline {
                first: 0,
                second: 2
            }
        );
    }
}
