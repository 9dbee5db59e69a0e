//! Full analysis pipeline
//!
//! Runs the steps of one analysis in order:
//!
//! 1. Superimpose the dataset with the method selected by the settings.
//! 2. PCA on the aligned coordinates.
//! 3. CVA on the effective PCA components, grouped by the requested variable.
//! 4. MANOVA on the PCA components that reach the cumulative-variance
//!    threshold, grouped by the requested variable.
//!
//! Raw aligned coordinates always carry a singular within-group covariance
//! (superimposition removes 4 degrees of freedom in 2D and 7 in 3D), so CVA
//! and MANOVA work on PCA scores instead. The number of components is capped
//! at `N − G` so that the within-group matrix can be of full rank.

use std::collections::BTreeSet;

use modan_shape::{Dataset, Dimension, superimpose};
use serde::{Deserialize, Serialize};

use crate::{
    AnalysisError, AnalysisSettings,
    cva::CanonicalVariates,
    manova::Manova,
    pca::PrincipalComponents,
    report::{CvaReport, ManovaReport, PcaReport, SuperimpositionReport},
};

/// What to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub name: String,
    /// 0-based index of the grouping variable for CVA; `None` skips CVA.
    pub cva_group_by: Option<usize>,
    /// 0-based index of the grouping variable for MANOVA; `None` skips MANOVA.
    pub manova_group_by: Option<usize>,
}

/// Per-object summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub name: String,
    pub centroid_size: f64,
    pub variables: Vec<String>,
}

/// Everything one analysis produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub name: String,
    pub dataset_name: String,
    pub dimension: Dimension,
    pub variable_names: Vec<String>,
    pub objects: Vec<ObjectInfo>,
    /// Landmarks as read, `None` for missing coordinates.
    pub raw_landmarks: Vec<Vec<Vec<Option<f64>>>>,
    pub superimposition: SuperimpositionReport,
    pub pca: PcaReport,
    pub cva: Option<CvaReport>,
    pub manova: Option<ManovaReport>,
}

/// Runs the full pipeline on `dataset`.
///
/// # Examples
///
/// ```
/// use modan_analysis::{AnalysisRequest, AnalysisSettings, run_analysis};
/// use modan_formats::{FileFormat, ImportOptions};
/// use modan_shape::Dataset;
///
/// let text = "\
/// LM=3\n0 0\n2 0\n0 1\nID=a\n\
/// LM=3\n1 1\n1 3\n0 1\nID=b\n\
/// LM=3\n0 0\n4 0\n0 2.2\nID=c\n";
/// let imported = modan_formats::parse(FileFormat::Tps, text, &ImportOptions::named("tri"))?;
/// let dataset = Dataset::from_imported(imported)?;
///
/// let request = AnalysisRequest { name: "first".into(), ..AnalysisRequest::default() };
/// let result = run_analysis(&dataset, &request, &AnalysisSettings::default())?;
/// assert_eq!(result.objects.len(), 3);
/// assert!(result.cva.is_none());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn run_analysis(
    dataset: &Dataset,
    request: &AnalysisRequest,
    settings: &AnalysisSettings,
) -> Result<AnalysisResult, AnalysisError> {
    log::info!("analysis {:?} on dataset {:?}", request.name, dataset.name());
    let method = settings.method()?;
    let set = superimpose(dataset, &method)?;
    let pca = PrincipalComponents::fit(&set.data_matrix())?;
    log::info!(
        "PCA: {} components, {} significant",
        pca.n_components(),
        pca.n_significant()
    );

    let cva = request
        .cva_group_by
        .map(|index| {
            let labels = dataset.group_labels(index);
            let cva = run_cva(&pca, &labels, settings)?;
            Ok::<_, AnalysisError>(CvaReport::new(variable_name(dataset, index), &cva))
        })
        .transpose()?;

    let manova = request
        .manova_group_by
        .map(|index| {
            let labels = dataset.group_labels(index);
            run_manova(&pca, &labels, settings, variable_name(dataset, index))
        })
        .transpose()?;

    let objects = dataset
        .specimens()
        .iter()
        .zip(&set.centroid_sizes)
        .map(|(s, &centroid_size)| ObjectInfo {
            name: s.name.clone(),
            centroid_size,
            variables: s.variables.clone(),
        })
        .collect();

    log::info!("analysis {:?} done", request.name);
    Ok(AnalysisResult {
        name: request.name.clone(),
        dataset_name: dataset.name().to_owned(),
        dimension: dataset.dimension(),
        variable_names: dataset.variable_names().to_vec(),
        objects,
        raw_landmarks: dataset
            .specimens()
            .iter()
            .map(|s| s.configuration.to_raw())
            .collect(),
        superimposition: SuperimpositionReport::new(&set, dataset),
        pca: PcaReport::new(&pca, settings.effective_eigenvalue_ratio),
        cva,
        manova,
    })
}

/// CVA on the effective PCA components, at most `N − G` of them.
pub fn run_cva(
    pca: &PrincipalComponents,
    labels: &[String],
    settings: &AnalysisSettings,
) -> Result<CanonicalVariates, AnalysisError> {
    let effective = pca.n_effective(settings.effective_eigenvalue_ratio);
    let components = capped_components(effective, pca.scores.nrows(), labels, "CVA");
    CanonicalVariates::fit(&pca.leading_scores(components), labels)
}

/// MANOVA on the leading PCA components reaching the cumulative-variance threshold.
pub fn run_manova(
    pca: &PrincipalComponents,
    labels: &[String],
    settings: &AnalysisSettings,
    group_variable: String,
) -> Result<ManovaReport, AnalysisError> {
    let wanted = pca.components_for_cumulative(settings.manova_cumulative_variance);
    let n_components = capped_components(wanted, pca.scores.nrows(), labels, "MANOVA");
    let result = Manova::fit(&pca.leading_scores(n_components), labels)?;
    Ok(ManovaReport {
        group_variable,
        n_components,
        result,
    })
}

fn capped_components(wanted: usize, observations: usize, labels: &[String], analysis: &str) -> usize {
    let groups = labels.iter().collect::<BTreeSet<_>>().len();
    let cap = observations.saturating_sub(groups);
    if wanted > cap {
        log::warn!("{analysis}: using {cap} of {wanted} PCA components ({observations} objects, {groups} groups)");
        cap
    } else {
        log::debug!("{analysis}: using {wanted} PCA components");
        wanted
    }
}

fn variable_name(dataset: &Dataset, index: usize) -> String {
    dataset
        .variable_names()
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("variable {}", index + 1))
}

#[cfg(test)]
mod tests {
    use modan_shape::{LandmarkConfiguration, Specimen};
    use rand::SeedableRng as _;
    use rand_distr::{Distribution as _, Normal};
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::manova::StatisticKind;

    /// Squares and elongated rectangles with small random perturbations,
    /// randomly rotated and scaled.
    fn two_shape_dataset(per_group: usize, seed: u64) -> Dataset {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let noise = Normal::new(0.0, 0.02).unwrap();
        let angle = Normal::new(0.0, 1.0).unwrap();
        let mut specimens = Vec::new();
        for (group, width) in [("square", 1.0), ("rectangle", 2.0)] {
            for i in 0..per_group {
                let theta: f64 = angle.sample(&mut rng);
                let scale = 1.0 + 0.1 * i as f64;
                let base = [[0.0, 0.0], [width, 0.0], [width, 1.0], [0.0, 1.0], [width / 2.0, 1.5]];
                let points = base
                    .iter()
                    .map(|[x, y]| {
                        let x = x + noise.sample(&mut rng);
                        let y = y + noise.sample(&mut rng);
                        let (sin, cos) = theta.sin_cos();
                        Some([scale * (x * cos - y * sin), scale * (x * sin + y * cos), 0.0])
                    })
                    .collect();
                let config = LandmarkConfiguration::new(Dimension::Two, points);
                specimens.push(
                    Specimen::new(format!("{group}{i}"), config)
                        .with_variables(vec![group.to_owned(), format!("{}", i % 2)]),
                );
            }
        }
        Dataset::new("shapes", Dimension::Two, specimens)
            .unwrap()
            .with_variable_names(vec!["shape".into(), "parity".into()])
    }

    #[test]
    fn test_full_pipeline() {
        let dataset = two_shape_dataset(8, 3);
        let request = AnalysisRequest {
            name: "shapes".into(),
            cva_group_by: Some(0),
            manova_group_by: Some(0),
        };
        let result = run_analysis(&dataset, &request, &AnalysisSettings::default()).unwrap();

        assert_eq!(result.dataset_name, "shapes");
        assert_eq!(result.objects.len(), 16);
        assert_eq!(result.raw_landmarks.len(), 16);
        assert_eq!(result.superimposition.method, "procrustes");
        assert_eq!(result.superimposition.mean_shape.len(), 5);
        assert_eq!(result.pca.eigenvalues.len(), 10);

        let cva = result.cva.unwrap();
        assert_eq!(cva.group_variable, "shape");
        assert_eq!(cva.group_names, ["rectangle", "square"]);
        assert!((cva.accuracy - 100.0).abs() < 1e-12);
        assert!(cva.n_components <= 14);

        let manova = result.manova.unwrap();
        assert!(manova.n_components >= 1);
        let wilks = manova.result.statistic(StatisticKind::WilksLambda).unwrap();
        assert!(wilks.p_value.unwrap() < 1e-3);
    }

    #[test]
    fn test_skipped_analyses_and_bookstein() {
        let dataset = two_shape_dataset(4, 5);
        let settings: AnalysisSettings =
            serde_json::from_str(r#"{ "superimposition": { "bookstein": { "baseline": [1, 2] } } }"#)
                .unwrap();
        let result = run_analysis(&dataset, &AnalysisRequest::default(), &settings).unwrap();
        assert_eq!(result.superimposition.method, "bookstein(1, 2)");
        assert!(result.cva.is_none());
        assert!(result.manova.is_none());
        for aligned in &result.superimposition.aligned {
            assert!((aligned[0][0] + 0.5).abs() < 1e-12);
            assert!((aligned[1][0] - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_components_are_capped() {
        let labels = ["a", "a", "b", "b", "c"].map(String::from);
        assert_eq!(capped_components(10, 5, &labels, "test"), 2);
        assert_eq!(capped_components(1, 5, &labels, "test"), 1);
    }

    #[test]
    fn test_result_serializes() {
        let dataset = two_shape_dataset(3, 6);
        let request = AnalysisRequest {
            name: "json".into(),
            cva_group_by: None,
            manova_group_by: Some(0),
        };
        let result = run_analysis(&dataset, &request, &AnalysisSettings::default()).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["dimension"], 2);
        assert_eq!(json["manova"]["group_variable"], "shape");
        assert_eq!(json["manova"]["statistics"].as_array().unwrap().len(), 4);
        assert!(json["cva"].is_null());
    }
}
