use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::AnalysisError;
use crate::dataset::{Column, ColumnKind};

/// Score at or above which a column counts as drifted.
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Floor applied to empty bins so log ratios stay finite.
const EMPTY_BIN_SHARE: f64 = 0.0001;

/// Floor for the reference standard deviation when norming distances.
const MIN_NORM: f64 = 0.001;

/// Distance test used to score drift on one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatTest {
    /// Wasserstein (earth mover's) distance normed by the reference standard
    /// deviation. Numeric columns only.
    Wasserstein,
    /// Jensen-Shannon distance between binned distributions.
    JensenShannon,
    /// Population stability index between binned distributions.
    Psi,
}

impl StatTest {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wasserstein => "wasserstein",
            Self::JensenShannon => "jensenshannon",
            Self::Psi => "psi",
        }
    }

    pub fn default_for(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Numeric => Self::Wasserstein,
            ColumnKind::Categorical => Self::JensenShannon,
        }
    }

    pub fn threshold(&self) -> f64 {
        DEFAULT_THRESHOLD
    }

    /// Drift score of `current` against `reference`.
    ///
    /// Either side having no present values scores 0.
    pub fn score(&self, reference: &Column, current: &Column) -> Result<f64, AnalysisError> {
        if reference.kind() != current.kind() {
            return Err(AnalysisError::ColumnTypeMismatch {
                column: reference.name.clone(),
                reference: reference.kind(),
                current: current.kind(),
            });
        }

        match self {
            Self::Wasserstein => {
                if reference.kind() != ColumnKind::Numeric {
                    return Err(AnalysisError::UnsupportedStatTest {
                        test: self.as_str(),
                        column: reference.name.clone(),
                        kind: reference.kind(),
                    });
                }
                let r = reference.present_numbers();
                let c = current.present_numbers();
                if r.is_empty() || c.is_empty() {
                    return Ok(0.0);
                }
                let norm = population_std(&r).max(MIN_NORM);
                Ok(wasserstein_distance(&r, &c) / norm)
            }
            Self::JensenShannon => Ok(binned(reference, current)
                .map(|(r, c)| jensen_shannon_distance(&r, &c))
                .unwrap_or(0.0)),
            Self::Psi => Ok(binned(reference, current)
                .map(|(r, c)| psi(&r, &c))
                .unwrap_or(0.0)),
        }
    }
}

pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// First Wasserstein distance between two empirical distributions.
///
/// Integrates the absolute difference of the two step CDFs over the merged
/// support.
pub(crate) fn wasserstein_distance(u: &[f64], v: &[f64]) -> f64 {
    let mut u = u.to_vec();
    let mut v = v.to_vec();
    u.sort_by(f64::total_cmp);
    v.sort_by(f64::total_cmp);

    let mut all: Vec<f64> = u.iter().chain(v.iter()).copied().collect();
    all.sort_by(f64::total_cmp);

    let (nu, nv) = (u.len() as f64, v.len() as f64);
    all.windows(2)
        .map(|w| {
            let (x0, x1) = (w[0], w[1]);
            let cdf_u = u.partition_point(|&x| x <= x0) as f64 / nu;
            let cdf_v = v.partition_point(|&x| x <= x0) as f64 / nv;
            (cdf_u - cdf_v).abs() * (x1 - x0)
        })
        .sum()
}

/// Share of present values per bin for both columns, over a common binning.
///
/// Numeric columns use equal-width bins over the combined range (Sturges'
/// rule for the bin count); categorical columns use one bin per label seen
/// on either side. `None` when either side has no present values.
fn binned(reference: &Column, current: &Column) -> Option<(Vec<f64>, Vec<f64>)> {
    match reference.kind() {
        ColumnKind::Numeric => {
            let r = reference.present_numbers();
            let c = current.present_numbers();
            if r.is_empty() || c.is_empty() {
                return None;
            }
            let (min, max) = r
                .iter()
                .chain(c.iter())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                    (lo.min(x), hi.max(x))
                });
            let n = (r.len() + c.len()) as f64;
            let bins = if max > min {
                (n.log2().ceil() as usize + 1).max(1)
            } else {
                1
            };
            let width = (max - min) / bins as f64;
            let shares = |values: &[f64]| {
                let mut counts = vec![0usize; bins];
                for &x in values {
                    let idx = if width > 0.0 {
                        (((x - min) / width).floor() as usize).min(bins - 1)
                    } else {
                        0
                    };
                    counts[idx] += 1;
                }
                counts
                    .into_iter()
                    .map(|k| k as f64 / values.len() as f64)
                    .collect::<Vec<_>>()
            };
            Some((shares(&r), shares(&c)))
        }
        ColumnKind::Categorical => {
            let r = reference.present_labels();
            let c = current.present_labels();
            if r.is_empty() || c.is_empty() {
                return None;
            }
            let labels: BTreeSet<&str> = r.iter().chain(c.iter()).map(String::as_str).collect();
            let shares = |values: &[String]| {
                let mut counts: BTreeMap<&str, usize> = labels.iter().map(|l| (*l, 0)).collect();
                for v in values {
                    if let Some(k) = counts.get_mut(v.as_str()) {
                        *k += 1;
                    }
                }
                counts
                    .into_values()
                    .map(|k| k as f64 / values.len() as f64)
                    .collect::<Vec<_>>()
            };
            Some((shares(&r), shares(&c)))
        }
    }
}

/// Jensen-Shannon distance (natural log), in `[0, sqrt(ln 2)]`.
pub(crate) fn jensen_shannon_distance(p: &[f64], q: &[f64]) -> f64 {
    let kl = |a: &[f64], m: &[f64]| -> f64 {
        a.iter()
            .zip(m)
            .filter(|(x, _)| **x > 0.0)
            .map(|(x, y)| x * (x / y).ln())
            .sum()
    };
    let m: Vec<f64> = p.iter().zip(q).map(|(a, b)| (a + b) / 2.0).collect();
    let divergence = 0.5 * kl(p, &m) + 0.5 * kl(q, &m);
    divergence.max(0.0).sqrt()
}

pub(crate) fn psi(reference: &[f64], current: &[f64]) -> f64 {
    reference
        .iter()
        .zip(current)
        .map(|(r, c)| {
            let r = r.max(EMPTY_BIN_SHARE);
            let c = c.max(EMPTY_BIN_SHARE);
            (r - c) * (r / c).ln()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(values: &[f64]) -> Column {
        Column::numeric("x", values.iter().map(|v| Some(*v)).collect())
    }

    fn labels(values: &[&str]) -> Column {
        Column::categorical("x", values.iter().map(|v| Some(v.to_string())).collect())
    }

    #[test]
    fn wasserstein_of_shifted_samples_is_the_shift() {
        let d = wasserstein_distance(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0]);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wasserstein_of_identical_samples_is_zero() {
        let d = wasserstein_distance(&[3.0, 1.0, 2.0], &[1.0, 2.0, 3.0]);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn wasserstein_with_unequal_sizes() {
        // CDF gap of 0.5 over [0, 1].
        let d = wasserstein_distance(&[0.0, 1.0], &[1.0]);
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn normed_wasserstein_detects_large_shift() {
        let reference = numeric(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let current = numeric(&[11.0, 12.0, 13.0, 14.0, 15.0]);
        let score = StatTest::Wasserstein.score(&reference, &current).unwrap();
        assert!(score > DEFAULT_THRESHOLD);
    }

    #[test]
    fn wasserstein_rejects_categorical_columns() {
        let result = StatTest::Wasserstein.score(&labels(&["a"]), &labels(&["b"]));
        assert!(matches!(
            result,
            Err(AnalysisError::UnsupportedStatTest { .. })
        ));
    }

    #[test]
    fn jensen_shannon_bounds() {
        let same = jensen_shannon_distance(&[0.5, 0.5], &[0.5, 0.5]);
        assert!(same.abs() < 1e-12);

        let disjoint = jensen_shannon_distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((disjoint - 2f64.ln().sqrt()).abs() < 1e-12);
    }

    #[test]
    fn categorical_drift_uses_label_union() {
        let score = StatTest::JensenShannon
            .score(&labels(&["a", "a", "b"]), &labels(&["c", "c"]))
            .unwrap();
        assert!(score > DEFAULT_THRESHOLD);
    }

    #[test]
    fn psi_is_zero_for_equal_distributions() {
        assert!(psi(&[0.2, 0.8], &[0.2, 0.8]).abs() < 1e-12);
        assert!(psi(&[0.9, 0.1], &[0.1, 0.9]) > 0.0);
    }

    #[test]
    fn empty_current_scores_zero() {
        let empty = Column::numeric("x", vec![]);
        for test in [StatTest::Wasserstein, StatTest::JensenShannon, StatTest::Psi] {
            assert_eq!(test.score(&numeric(&[1.0, 2.0]), &empty).unwrap(), 0.0);
        }
    }

    #[test]
    fn mismatched_kinds_fail() {
        let result = StatTest::JensenShannon.score(&numeric(&[1.0]), &labels(&["a"]));
        assert!(matches!(
            result,
            Err(AnalysisError::ColumnTypeMismatch { .. })
        ));
    }
}
