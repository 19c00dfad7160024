//! Configuration builder for committee training.

use std::fmt;
use std::io::Write;

use rand::Rng;

use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::forest::Forest;
use crate::oob::OobReport;
use crate::result::TrainingResult;
use crate::split::SplitCriterion;

/// Ensemble-construction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Committee {
    /// Bootstrap-resampled trees using every feature at each split.
    Bagging,
    /// Exponential-loss boosting over reweighted examples.
    Boosting,
    /// Bootstrap-resampled trees with per-split feature subsampling.
    RandomForest,
}

impl Committee {
    /// Numeric id used on the command line and in model files.
    #[must_use]
    pub fn id(self) -> u8 {
        match self {
            Committee::Bagging => 1,
            Committee::Boosting => 2,
            Committee::RandomForest => 3,
        }
    }

    /// Human-readable name written next to the id in model files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Committee::Bagging => "Bagging",
            Committee::Boosting => "Boosting",
            Committee::RandomForest => "RandomForest",
        }
    }

    /// Look up a committee by its numeric id.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::UnknownCommittee`] for ids other than 1, 2 and 3.
    pub fn from_id(id: i64) -> Result<Self, ForestError> {
        match id {
            1 => Ok(Committee::Bagging),
            2 => Ok(Committee::Boosting),
            3 => Ok(Committee::RandomForest),
            _ => Err(ForestError::UnknownCommittee { id }),
        }
    }

    /// Whether rounds resample examples with replacement.
    #[must_use]
    pub fn resamples(self) -> bool {
        !matches!(self, Committee::Boosting)
    }
}

impl fmt::Display for Committee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether to evaluate out-of-bag votes after each resampled round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobMode {
    /// Tabulate votes and report error rates and AUC every round.
    Enabled,
    /// Skip OOB evaluation.
    Disabled,
}

/// Configuration for growing a committee of trees.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter         | Default    |
/// |-------------------|------------|
/// | `max_depth`       | 1000       |
/// | `feature_factor`  | 1.0        |
/// | `n_trees`         | 100        |
/// | `negative_weight` | 1.0        |
/// | `oob_mode`        | `Disabled` |
/// | `criterion`       | `Gini`     |
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub(crate) committee: Committee,
    pub(crate) max_depth: usize,
    pub(crate) feature_factor: f64,
    pub(crate) n_trees: usize,
    pub(crate) negative_weight: f64,
    pub(crate) oob_mode: OobMode,
    pub(crate) criterion: SplitCriterion,
}

impl ForestConfig {
    /// Create a config for the given committee with default hyperparameters.
    #[must_use]
    pub fn new(committee: Committee) -> Self {
        Self {
            committee,
            max_depth: 1000,
            feature_factor: 1.0,
            n_trees: 100,
            negative_weight: 1.0,
            oob_mode: OobMode::Disabled,
            criterion: SplitCriterion::Gini,
        }
    }

    // --- Setters ---

    /// Set the maximum tree depth (a depth of 1 grows stumps).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the random-forest feature factor.
    ///
    /// Random forests consider `floor(factor * sqrt(n_features))` candidate
    /// features per split, raised to 1 when a small factor floors to 0.
    /// Ignored by the other committees.
    #[must_use]
    pub fn with_feature_factor(mut self, feature_factor: f64) -> Self {
        self.feature_factor = feature_factor;
        self
    }

    /// Set the number of rounds (trees) to grow.
    #[must_use]
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Set the weight multiplier applied to negative examples.
    #[must_use]
    pub fn with_negative_weight(mut self, negative_weight: f64) -> Self {
        self.negative_weight = negative_weight;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    // --- Getters ---

    /// Return the committee strategy.
    #[must_use]
    pub fn committee(&self) -> Committee {
        self.committee
    }

    /// Return the maximum tree depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the random-forest feature factor.
    #[must_use]
    pub fn feature_factor(&self) -> f64 {
        self.feature_factor
    }

    /// Return the number of trees to grow.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the negative-class weight multiplier.
    #[must_use]
    pub fn negative_weight(&self) -> f64 {
        self.negative_weight
    }

    /// Return the OOB evaluation mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Number of candidate features considered per split.
    ///
    /// Random forests use `floor(factor * sqrt(n_features))`, clamped to
    /// `[1, n_features]`; the other committees use every feature.
    #[must_use]
    pub fn features_per_split(&self, n_features: usize) -> usize {
        match self.committee {
            Committee::RandomForest => {
                let fpn = (self.feature_factor * (n_features as f64).sqrt()) as usize;
                fpn.clamp(1, n_features.max(1))
            }
            Committee::Bagging | Committee::Boosting => n_features,
        }
    }

    /// Check the hyperparameters.
    ///
    /// [`Forest::new`] does not call this; front ends validate before training.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                          |
    /// |---------------------------------------|-------------------------------|
    /// | [`ForestError::InvalidTreeCount`]     | `n_trees` is zero             |
    /// | [`ForestError::InvalidMaxDepth`]      | `max_depth` is zero           |
    /// | [`ForestError::InvalidFeatureFactor`] | factor is not positive/finite |
    /// | [`ForestError::InvalidNegativeWeight`]| weight is not positive/finite |
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees: 0 });
        }
        if self.max_depth == 0 {
            return Err(ForestError::InvalidMaxDepth { max_depth: 0 });
        }
        if !(self.feature_factor.is_finite() && self.feature_factor > 0.0) {
            return Err(ForestError::InvalidFeatureFactor {
                factor: self.feature_factor,
            });
        }
        if !(self.negative_weight.is_finite() && self.negative_weight > 0.0) {
            return Err(ForestError::InvalidNegativeWeight {
                weight: self.negative_weight,
            });
        }
        Ok(())
    }

    /// Grow a forest on `dataset`, drawing resamples from `rng`.
    ///
    /// Mutates the dataset's weights and OOB votes.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Forest::grow`].
    pub fn fit(
        &self,
        dataset: &mut Dataset,
        rng: &mut impl Rng,
    ) -> Result<TrainingResult, ForestError> {
        let mut forest = Forest::new(self.clone());
        let oob_reports = forest.grow(dataset, rng)?;
        Ok(TrainingResult::new(forest, oob_reports, dataset))
    }

    /// Like [`ForestConfig::fit`], also streaming raw per-tree OOB outcomes to `sink`.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Forest::grow_with_oob_sink`].
    pub fn fit_with_oob_sink<W: Write>(
        &self,
        dataset: &mut Dataset,
        rng: &mut impl Rng,
        sink: &mut W,
    ) -> Result<TrainingResult, ForestError> {
        let mut forest = Forest::new(self.clone());
        let oob_reports = forest.grow_with_oob_sink(dataset, rng, sink)?;
        Ok(TrainingResult::new(forest, oob_reports, dataset))
    }

    /// Like [`ForestConfig::fit`], handing each OOB report to `on_round` as
    /// its round completes and streaming raw outcomes to `sink` when given.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Forest::grow_observed`].
    pub fn fit_observed<W: Write>(
        &self,
        dataset: &mut Dataset,
        rng: &mut impl Rng,
        sink: Option<&mut W>,
        on_round: impl FnMut(&OobReport),
    ) -> Result<TrainingResult, ForestError> {
        let mut forest = Forest::new(self.clone());
        let oob_reports = forest.grow_observed(dataset, rng, sink, on_round)?;
        Ok(TrainingResult::new(forest, oob_reports, dataset))
    }

    /// Whether growing with this configuration produces OOB reports.
    #[must_use]
    pub fn reports_oob(&self) -> bool {
        self.oob_mode == OobMode::Enabled && self.committee.resamples()
    }
}
