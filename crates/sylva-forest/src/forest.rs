//! Committee growth: bagging, boosting and random forests.

use std::io::{self, Write};

use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::config::{Committee, ForestConfig, OobMode};
use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::oob::{OobReport, report_oob_error, tabulate_oob_votes, write_oob_votes};
use crate::tree::{DecisionTree, TreeGrowth};

/// A committee of decision trees.
///
/// Holds its configuration, the feature count it was grown on (or read
/// with), and its trees in growth order. A new forest has no trees until
/// [`Forest::grow`] runs.
#[derive(Debug, Clone)]
pub struct Forest {
    pub(crate) config: ForestConfig,
    pub(crate) n_features: usize,
    pub(crate) trees: Vec<DecisionTree>,
}

/// Reset the dataset weights and inclusion flags, then draw `n` examples
/// with replacement, adding the class weight to each draw.
fn bootstrap_sample(
    request: &mut TreeGrowth,
    dataset: &mut Dataset,
    class_weights: &[f64; 2],
    rng: &mut impl Rng,
) {
    let n_examples = dataset.n_examples();
    request.included.fill(false);
    dataset.weights.fill(0.0);
    for _ in 0..n_examples {
        let idx = rng.gen_range(0..n_examples);
        let label = dataset.labels()[idx];
        request.included[idx] = true;
        dataset.weights[idx] += class_weights[label];
    }
}

/// Reweight examples after a boosting round and renormalize to unit sum.
///
/// `margins` are the new tree's signed scores; a correctly classified
/// example (sign matching its label) loses weight.
fn reweight(dataset: &mut Dataset, margins: &[f64]) -> f64 {
    for ((w, &label), &margin) in dataset
        .weights
        .iter_mut()
        .zip(&dataset.labels)
        .zip(margins)
    {
        let sign = if label == 1 { 1.0 } else { -1.0 };
        *w *= (-sign * margin).exp();
    }
    let total: f64 = dataset.weights.iter().sum();
    dataset.weights.iter_mut().for_each(|w| *w /= total);
    total
}

impl Forest {
    /// Create an empty forest for `config`.
    #[must_use]
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    /// Grow `n_trees` trees on `dataset`.
    ///
    /// Overwrites the dataset's weights and resets its OOB votes. With OOB
    /// evaluation enabled on a resampling committee, returns one report per
    /// round; otherwise the returned list is empty.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::AlreadyGrown`] | the forest already holds trees |
    /// | [`ForestError::EmptyDataset`] | the dataset has no examples |
    pub fn grow(
        &mut self,
        dataset: &mut Dataset,
        rng: &mut impl Rng,
    ) -> Result<Vec<OobReport>, ForestError> {
        self.grow_observed(dataset, rng, None::<&mut io::Sink>, |_| {})
    }

    /// Like [`Forest::grow`], also writing each round's raw OOB outcomes to `sink`.
    ///
    /// Nothing is written unless OOB evaluation is in effect.
    ///
    /// # Errors
    ///
    /// As [`Forest::grow`], plus [`ForestError::WriteOobVotes`] when the sink fails.
    pub fn grow_with_oob_sink<W: Write>(
        &mut self,
        dataset: &mut Dataset,
        rng: &mut impl Rng,
        sink: &mut W,
    ) -> Result<Vec<OobReport>, ForestError> {
        self.grow_observed(dataset, rng, Some(sink), |_| {})
    }

    /// Grow the forest, handing each OOB report to `on_round` as its round completes.
    ///
    /// The raw outcomes of a round reach `sink` (when given) before its
    /// report reaches `on_round`. Rounds finished before an error have
    /// already been observed.
    ///
    /// # Errors
    ///
    /// As [`Forest::grow_with_oob_sink`].
    #[instrument(
        skip_all,
        fields(committee = %self.config.committee, n_trees = self.config.n_trees)
    )]
    pub fn grow_observed<W: Write>(
        &mut self,
        dataset: &mut Dataset,
        rng: &mut impl Rng,
        mut sink: Option<&mut W>,
        mut on_round: impl FnMut(&OobReport),
    ) -> Result<Vec<OobReport>, ForestError> {
        if !self.trees.is_empty() {
            return Err(ForestError::AlreadyGrown {
                n_grown: self.trees.len(),
            });
        }
        let n_examples = dataset.n_examples();
        if n_examples == 0 {
            return Err(ForestError::EmptyDataset);
        }

        let committee = self.config.committee;
        self.n_features = dataset.n_features();
        let class_weights = dataset.class_weights(self.config.negative_weight);
        let features_per_split = self.config.features_per_split(self.n_features);
        let oob = self.config.reports_oob();
        if self.config.oob_mode == OobMode::Enabled && !oob {
            warn!(%committee, "OOB evaluation needs resampling; ignoring it");
        }

        info!(
            %committee,
            n_trees = self.config.n_trees,
            n_examples,
            n_features = self.n_features,
            features_per_split,
            max_depth = self.config.max_depth,
            "growing committee"
        );

        let mut request = TreeGrowth::new(
            n_examples,
            self.config.max_depth,
            features_per_split,
            committee,
            self.config.criterion,
        );
        dataset.reset_oob_votes();

        if committee == Committee::Boosting {
            request.include_all();
            for (w, &label) in dataset.weights.iter_mut().zip(&dataset.labels) {
                *w = class_weights[label];
            }
        }

        let mut reports = Vec::new();
        for iter in 0..self.config.n_trees {
            if committee.resamples() {
                bootstrap_sample(&mut request, dataset, &class_weights, rng);
            }

            let tree = request.grow(dataset, rng);

            if committee == Committee::Boosting {
                let margins = tree.classify_dataset(dataset, Committee::Boosting);
                let mass = reweight(dataset, &margins);
                debug!(tree = iter + 1, mass, "boosting weights renormalized");
            } else if oob {
                let predictions = tabulate_oob_votes(&tree, dataset);
                let report = report_oob_error(dataset, iter)?;
                info!(
                    tree = report.tree,
                    error = report.error,
                    negative_error = report.negative_error,
                    positive_error = report.positive_error,
                    auc = report.auc,
                    "OOB round"
                );
                if let Some(sink) = sink.as_deref_mut() {
                    write_oob_votes(&predictions, dataset, sink)?;
                }
                on_round(&report);
                reports.push(report);
            }

            debug!(
                tree = iter + 1,
                n_nodes = tree.n_nodes(),
                depth = tree.depth(),
                "tree grown"
            );
            self.trees.push(tree);
        }

        info!(n_trees = self.trees.len(), "committee grown");
        Ok(reports)
    }

    /// Return the configuration this forest was grown (or read) with.
    #[must_use]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Return the committee kind.
    #[must_use]
    pub fn committee(&self) -> Committee {
        self.config.committee
    }

    /// Return the number of trees held.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the number of features examples must have.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the depth budget.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.config.max_depth
    }

    /// Return the random-forest feature factor.
    #[must_use]
    pub fn feature_factor(&self) -> f64 {
        self.config.feature_factor
    }

    /// Return the trees in growth order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}
