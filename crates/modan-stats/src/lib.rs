//! Scalar statistics used by the Modan morphometrics crates.
//!
//! This crate has no dependencies and provides:
//!
//! - **Descriptive statistics**: min, max, mean, median, variance and standard deviation
//! - **Special functions**: log-gamma, log-beta and the regularized incomplete beta function
//! - **F distribution**: cumulative and survival functions for multivariate test p-values
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing samples (e.g. centroid sizes)
//! - [`special`]: Special functions backing the continuous distributions
//! - [`f_distribution`]: Fisher-Snedecor distribution
//!
//! # Examples
//!
//! ## Summarizing centroid sizes
//!
//! ```
//! use modan_stats::descriptive::DescriptiveStats;
//!
//! let sizes = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(sizes).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! assert_eq!(stats.median, 3.0);
//! ```
//!
//! ## Computing an F-test p-value
//!
//! ```
//! use modan_stats::f_distribution::FDistribution;
//!
//! let f = FDistribution::new(3.0, 20.0).unwrap();
//! let p_value = f.sf(3.5);
//! assert!(p_value > 0.0 && p_value < 0.05);
//! ```

pub mod descriptive;
pub mod f_distribution;
pub mod special;
