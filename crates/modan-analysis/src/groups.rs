use std::collections::{BTreeMap, BTreeSet};

use nalgebra::{DMatrix, RowDVector};

use crate::AnalysisError;

/// Group membership of the observations, with groups in sorted name order.
#[derive(Debug, Clone)]
pub(crate) struct Groups {
    pub names: Vec<String>,
    pub sizes: Vec<usize>,
    /// Group index of each observation.
    pub membership: Vec<usize>,
}

impl Groups {
    pub fn new(labels: &[String], observations: usize) -> Result<Self, AnalysisError> {
        if labels.len() != observations {
            return Err(AnalysisError::LengthMismatch {
                observations,
                labels: labels.len(),
            });
        }
        let index = labels
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect::<BTreeMap<_, _>>();
        if index.len() < 2 {
            return Err(AnalysisError::TooFewGroups { found: index.len() });
        }

        let membership = labels.iter().map(|l| index[l.as_str()]).collect::<Vec<_>>();
        let mut sizes = vec![0; index.len()];
        for &g in &membership {
            sizes[g] += 1;
        }
        Ok(Self {
            names: index.into_keys().map(str::to_owned).collect(),
            sizes,
            membership,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Per-group column means, one group per row.
    #[expect(clippy::cast_precision_loss)]
    pub fn means(&self, data: &DMatrix<f64>) -> DMatrix<f64> {
        let mut means = DMatrix::zeros(self.len(), data.ncols());
        for (row, &g) in data.row_iter().zip(&self.membership) {
            let mut target = means.row_mut(g);
            target += row;
        }
        for (g, &size) in self.sizes.iter().enumerate() {
            let mut target = means.row_mut(g);
            target /= size as f64;
        }
        means
    }

    /// Within-group and between-group sums of squares and cross-products.
    ///
    /// Returns `(E, H)` with `E = Σ (x − x̄_g)ᵀ(x − x̄_g)` and
    /// `H = Σ_g n_g (x̄_g − x̄)ᵀ(x̄_g − x̄)`.
    #[expect(clippy::cast_precision_loss)]
    pub fn sscp(
        &self,
        data: &DMatrix<f64>,
        group_means: &DMatrix<f64>,
        grand_mean: &RowDVector<f64>,
    ) -> (DMatrix<f64>, DMatrix<f64>) {
        let p = data.ncols();
        let mut within = DMatrix::zeros(p, p);
        for (row, &g) in data.row_iter().zip(&self.membership) {
            let diff = row - group_means.row(g);
            within += diff.transpose() * &diff;
        }
        let mut between = DMatrix::zeros(p, p);
        for (g, &size) in self.sizes.iter().enumerate() {
            let diff = group_means.row(g) - grand_mean;
            between += diff.transpose() * &diff * size as f64;
        }
        (within, between)
    }
}
