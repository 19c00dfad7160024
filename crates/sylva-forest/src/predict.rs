//! Scoring examples with a grown committee.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::Committee;
use crate::error::ForestError;
use crate::forest::Forest;

impl Forest {
    /// Score one example.
    ///
    /// Boosting averages the trees' signed margins; bagging and random
    /// forests average the trees' leaf probabilities.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyEnsemble`] | the forest holds no trees |
    /// | [`ForestError::PredictionFeatureMismatch`] | `example.len() != n_features` |
    pub fn classify(&self, example: &[f64]) -> Result<f64, ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::EmptyEnsemble);
        }
        if example.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: example.len(),
            });
        }

        let total: f64 = match self.config.committee {
            Committee::Boosting => self.trees.iter().map(|t| t.boost_score(example)).sum(),
            Committee::Bagging | Committee::RandomForest => {
                self.trees.iter().map(|t| t.bag_score(example)).sum()
            }
        };
        Ok(total / self.trees.len() as f64)
    }

    /// Score many examples in parallel.
    ///
    /// # Errors
    ///
    /// Returns the first error [`Forest::classify`] reports.
    pub fn classify_batch(&self, examples: &[Vec<f64>]) -> Result<Vec<f64>, ForestError> {
        examples
            .into_par_iter()
            .map(|example| self.classify(example))
            .collect()
    }

    /// Score above which an example is called positive.
    ///
    /// Zero for boosting margins, one half for averaged probabilities.
    #[must_use]
    pub fn decision_threshold(&self) -> f64 {
        match self.config.committee {
            Committee::Boosting => 0.0,
            Committee::Bagging | Committee::RandomForest => 0.5,
        }
    }

    /// Predict a 0/1 label for one example.
    ///
    /// # Errors
    ///
    /// Same as [`Forest::classify`].
    pub fn predict(&self, example: &[f64]) -> Result<usize, ForestError> {
        Ok(usize::from(self.classify(example)? > self.decision_threshold()))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::{Committee, Dataset, Forest, ForestConfig, ForestError};

    fn separable() -> Dataset {
        Dataset::new(
            vec![
                vec![1.0, 0.3],
                vec![2.0, 0.1],
                vec![3.0, 0.2],
                vec![10.0, 0.4],
                vec![11.0, 0.5],
                vec![12.0, 0.6],
            ],
            vec![0, 0, 0, 1, 1, 1],
        )
        .unwrap()
    }

    fn grown(committee: Committee, n_trees: usize) -> Forest {
        let mut d = separable();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut forest = Forest::new(ForestConfig::new(committee).with_n_trees(n_trees));
        forest.grow(&mut d, &mut rng).unwrap();
        forest
    }

    #[test]
    fn empty_ensemble_error() {
        let forest = Forest::new(ForestConfig::new(Committee::Bagging));
        assert!(matches!(forest.classify(&[1.0, 0.0]), Err(ForestError::EmptyEnsemble)));
    }

    #[test]
    fn width_mismatch_error() {
        let forest = grown(Committee::Bagging, 3);
        let err = forest.classify(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn single_boosting_tree_equals_its_margin() {
        let forest = grown(Committee::Boosting, 1);
        let x = [2.5, 0.2];
        assert_eq!(
            forest.classify(&x).unwrap(),
            forest.trees()[0].classify_boost(&x).unwrap()
        );
    }

    #[test]
    fn bagging_score_is_mean_probability() {
        let forest = grown(Committee::Bagging, 5);
        let x = [6.0, 0.3];
        let mean = forest
            .trees()
            .iter()
            .map(|t| t.classify_bag(&x).unwrap())
            .sum::<f64>()
            / 5.0;
        let score = forest.classify(&x).unwrap();
        assert!((score - mean).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn boosting_separates_classes() {
        let forest = grown(Committee::Boosting, 5);
        assert_eq!(forest.decision_threshold(), 0.0);
        assert_eq!(forest.predict(&[1.5, 0.2]).unwrap(), 0);
        assert_eq!(forest.predict(&[11.5, 0.5]).unwrap(), 1);
    }

    #[test]
    fn batch_matches_single() {
        let forest = grown(Committee::RandomForest, 10);
        let d = separable();
        let batch = forest.classify_batch(d.features()).unwrap();
        for (x, score) in d.features().iter().zip(&batch) {
            assert_eq!(forest.classify(x).unwrap(), *score);
        }
    }
}
