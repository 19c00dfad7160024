//! Labelled binary-classification examples with per-round training state.

use crate::error::ForestError;

/// A binary-classification dataset.
///
/// Labels are immutable. Weights and cumulative out-of-bag votes are
/// rewritten by the trainer every round: weights hold resampling mass
/// (bagging) or boosting mass, and each vote moves by exactly one in
/// rounds where the example was left out of the bootstrap sample.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Vec<Vec<f64>>,
    pub(crate) labels: Vec<usize>,
    pub(crate) weights: Vec<f64>,
    pub(crate) oob_votes: Vec<i32>,
    n_features: usize,
}

impl Dataset {
    /// Build a dataset from row-major features and 0/1 labels.
    ///
    /// `features[example_idx][feature_idx]` — row-major layout.
    ///
    /// # Errors
    ///
    /// | Variant                                | When                                  |
    /// |----------------------------------------|---------------------------------------|
    /// | [`ForestError::EmptyDataset`]          | `features` is empty                   |
    /// | [`ForestError::ZeroFeatures`]          | rows have zero feature columns        |
    /// | [`ForestError::LabelCountMismatch`]    | `labels.len() != features.len()`      |
    /// | [`ForestError::FeatureCountMismatch`]  | rows have inconsistent lengths        |
    /// | [`ForestError::NonFiniteValue`]        | any value is NaN or infinite          |
    /// | [`ForestError::InvalidLabel`]          | a label is not 0 or 1                 |
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<Self, ForestError> {
        if features.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let n_features = features[0].len();
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }
        if labels.len() != features.len() {
            return Err(ForestError::LabelCountMismatch {
                n_examples: features.len(),
                n_labels: labels.len(),
            });
        }
        for (example_index, row) in features.iter().enumerate() {
            if row.len() != n_features {
                return Err(ForestError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    example_index,
                });
            }
            if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
                return Err(ForestError::NonFiniteValue {
                    example_index,
                    feature_index,
                });
            }
        }
        if let Some((example_index, &label)) = labels.iter().enumerate().find(|(_, l)| **l > 1) {
            return Err(ForestError::InvalidLabel {
                example_index,
                label,
            });
        }

        let n_examples = features.len();
        Ok(Self {
            features,
            labels,
            weights: vec![0.0; n_examples],
            oob_votes: vec![0; n_examples],
            n_features,
        })
    }

    /// Number of examples.
    #[must_use]
    pub fn n_examples(&self) -> usize {
        self.labels.len()
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Row-major feature values.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Feature values of one example.
    #[must_use]
    pub fn example(&self, index: usize) -> &[f64] {
        &self.features[index]
    }

    /// 0/1 labels.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Current per-example weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Current cumulative OOB votes.
    #[must_use]
    pub fn oob_votes(&self) -> &[i32] {
        &self.oob_votes
    }

    /// Number of negative and positive examples, in that order.
    #[must_use]
    pub fn class_counts(&self) -> [usize; 2] {
        let positives = self.labels.iter().filter(|&&l| l == 1).count();
        [self.labels.len() - positives, positives]
    }

    /// Base weight of one example of each class.
    ///
    /// With `c0`, `c1` the class counts and `m` the negative multiplier,
    /// returns `[m / (m*c0 + c1), 1 / (m*c0 + c1)]`, so the base weights
    /// of all examples sum to one.
    #[must_use]
    pub fn class_weights(&self, negative_weight: f64) -> [f64; 2] {
        let [c0, c1] = self.class_counts();
        let total = negative_weight * c0 as f64 + c1 as f64;
        [negative_weight / total, 1.0 / total]
    }

    pub(crate) fn reset_oob_votes(&mut self) {
        self.oob_votes.iter_mut().for_each(|v| *v = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Dataset {
        Dataset::new(
            vec![vec![0.0, 1.0], vec![1.0, 1.0], vec![2.0, 0.0], vec![3.0, 0.0]],
            vec![0, 0, 0, 1],
        )
        .unwrap()
    }

    #[test]
    fn starts_with_zero_state() {
        let d = small();
        assert_eq!(d.n_examples(), 4);
        assert_eq!(d.n_features(), 2);
        assert!(d.weights().iter().all(|&w| w == 0.0));
        assert!(d.oob_votes().iter().all(|&v| v == 0));
    }

    #[test]
    fn class_weights_sum_to_one() {
        let d = small();
        assert_eq!(d.class_counts(), [3, 1]);
        let [w0, w1] = d.class_weights(1.0);
        assert!((w0 - 0.25).abs() < 1e-12);
        assert!((w1 - 0.25).abs() < 1e-12);

        // Negatives weighted twice: total = 2*3 + 1 = 7.
        let [w0, w1] = d.class_weights(2.0);
        assert!((w0 - 2.0 / 7.0).abs() < 1e-12);
        assert!((w1 - 1.0 / 7.0).abs() < 1e-12);
        assert!((3.0 * w0 + w1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_dataset_error() {
        let err = Dataset::new(vec![], vec![]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn zero_features_error() {
        let err = Dataset::new(vec![vec![]], vec![0]).unwrap_err();
        assert!(matches!(err, ForestError::ZeroFeatures));
    }

    #[test]
    fn inconsistent_rows_error() {
        let err = Dataset::new(vec![vec![1.0, 2.0], vec![3.0]], vec![0, 1]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::FeatureCountMismatch { expected: 2, got: 1, example_index: 1 }
        ));
    }

    #[test]
    fn non_finite_error() {
        let err = Dataset::new(vec![vec![1.0], vec![f64::INFINITY]], vec![0, 1]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::NonFiniteValue { example_index: 1, feature_index: 0 }
        ));
    }

    #[test]
    fn non_binary_label_error() {
        let err = Dataset::new(vec![vec![1.0], vec![2.0]], vec![0, 2]).unwrap_err();
        assert!(matches!(err, ForestError::InvalidLabel { example_index: 1, label: 2 }));
    }

    #[test]
    fn label_count_mismatch_error() {
        let err = Dataset::new(vec![vec![1.0], vec![2.0]], vec![0]).unwrap_err();
        assert!(matches!(err, ForestError::LabelCountMismatch { .. }));
    }
}
