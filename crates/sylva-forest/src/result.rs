//! Training result types.

use crate::dataset::Dataset;
use crate::forest::Forest;
use crate::oob::OobReport;

/// Metadata about the training run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingMetadata {
    /// Number of trees grown.
    pub n_trees: usize,
    /// Number of features in the dataset.
    pub n_features: usize,
    /// Number of training examples.
    pub n_examples: usize,
    /// Negative and positive example counts.
    pub class_counts: [usize; 2],
    /// Candidate features examined per split.
    pub features_per_split: usize,
}

/// Result of growing a committee.
///
/// Contains the grown forest, the per-round OOB reports (empty unless OOB
/// evaluation ran), and training metadata.
#[derive(Debug)]
pub struct TrainingResult {
    forest: Forest,
    oob_reports: Vec<OobReport>,
    metadata: TrainingMetadata,
}

impl TrainingResult {
    pub(crate) fn new(forest: Forest, oob_reports: Vec<OobReport>, dataset: &Dataset) -> Self {
        let metadata = TrainingMetadata {
            n_trees: forest.n_trees(),
            n_features: dataset.n_features(),
            n_examples: dataset.n_examples(),
            class_counts: dataset.class_counts(),
            features_per_split: forest.config().features_per_split(dataset.n_features()),
        };
        Self {
            forest,
            oob_reports,
            metadata,
        }
    }

    /// Borrow the grown forest.
    #[must_use]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Consume the result and return the grown forest.
    #[must_use]
    pub fn into_forest(self) -> Forest {
        self.forest
    }

    /// Return the OOB report of every round, in order.
    #[must_use]
    pub fn oob_reports(&self) -> &[OobReport] {
        &self.oob_reports
    }

    /// Return the report of the last round, if OOB evaluation ran.
    #[must_use]
    pub fn final_oob_report(&self) -> Option<&OobReport> {
        self.oob_reports.last()
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
