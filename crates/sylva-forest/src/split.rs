use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Relative tolerance below which an impurity decrease counts as no improvement.
const MIN_RELATIVE_DECREASE: f64 = 1e-12;

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its weighted class mass.
    ///
    /// `mass` is `[negative, positive]`. Returns [`Impurity::new(0.0)`]
    /// when the node carries no mass.
    #[must_use]
    pub fn impurity(&self, mass: [f64; 2]) -> Impurity {
        let total = mass[0] + mass[1];
        if total <= 0.0 {
            return Impurity::new(0.0);
        }
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = mass.iter().map(|&m| (m / total) * (m / total)).sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => -mass
                .iter()
                .filter(|&&m| m > 0.0)
                .map(|&m| {
                    let p = m / total;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        Impurity::new(value)
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value.
    pub(crate) threshold: f64,
    /// Example indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Example indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Weighted `[negative, positive]` mass of a set of examples.
pub(crate) fn class_mass(labels: &[usize], weights: &[f64], indices: &[usize]) -> [f64; 2] {
    let mut mass = [0.0f64; 2];
    for &i in indices {
        mass[labels[i]] += weights[i];
    }
    mass
}

/// Find the best split among a random subset of features.
///
/// When `max_features` is smaller than the feature count, a partial
/// Fisher-Yates shuffle picks the candidates and consumes one draw per
/// candidate from `rng`; otherwise every feature is scanned in order and
/// `rng` is left untouched.
///
/// For each candidate feature, sorts the examples by value and scans
/// left-to-right moving weighted class mass from the right child to the
/// left. Thresholds sit midway between consecutive distinct values.
///
/// Returns `None` when no split strictly decreases weighted impurity.
///
/// `rows` is row-major: `rows[example_idx][feature_idx]`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_best_split(
    rows: &[Vec<f64>],
    labels: &[usize],
    weights: &[f64],
    sample_indices: &[usize],
    n_features: usize,
    criterion: &SplitCriterion,
    max_features: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_samples = sample_indices.len();
    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let parent_mass = class_mass(labels, weights, sample_indices);
    let parent_total = parent_mass[0] + parent_mass[1];
    let parent_impurity = criterion.impurity(parent_mass);

    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.clamp(1, n_features);
    if take < n_features {
        for i in 0..take {
            let j = rng.gen_range(i..n_features);
            feature_order.swap(i, j);
        }
    }
    let selected_features = &feature_order[..take];

    let mut best_decrease = MIN_RELATIVE_DECREASE * parent_total;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in selected_features {
        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (rows[si][feat_idx], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_mass = [0.0f64; 2];
        let mut right_mass = parent_mass;

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            let w = weights[si];
            left_mass[labels[si]] += w;
            right_mass[labels[si]] -= w;

            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            let left_total = left_mass[0] + left_mass[1];
            let right_total = (parent_total - left_total).max(0.0);
            let decrease = parent_total * parent_impurity.value()
                - left_total * criterion.impurity(left_mass).value()
                - right_total * criterion.impurity(right_mass).value();

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((FeatureIndex::new(feat_idx), (val_i + val_next) / 2.0));
            }
        }
    }

    let (feature, threshold) = best?;

    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| rows[si][feature.index()] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        left_indices,
        right_indices,
    })
}
