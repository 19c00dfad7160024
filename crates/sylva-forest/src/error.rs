use std::path::PathBuf;

/// Errors from committee training, scoring, and model persistence.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when the configured tree count is zero.
    #[error("number of trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid tree count.
        n_trees: usize,
    },

    /// Returned when the configured maximum depth is zero.
    #[error("maximum tree depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid depth.
        max_depth: usize,
    },

    /// Returned when the random-forest feature factor is not a positive finite number.
    #[error("feature factor must be positive, got {factor}")]
    InvalidFeatureFactor {
        /// The invalid factor.
        factor: f64,
    },

    /// Returned when the negative-class weight multiplier is not a positive finite number.
    #[error("negative-class weight must be positive, got {weight}")]
    InvalidNegativeWeight {
        /// The invalid multiplier.
        weight: f64,
    },

    /// Returned when the dataset has zero examples.
    #[error("dataset has zero examples")]
    EmptyDataset,

    /// Returned when the dataset has zero feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when an example has a different number of features than the first one.
    #[error("example {example_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features.
        got: usize,
        /// Zero-based index of the offending example.
        example_index: usize,
    },

    /// Returned when the label vector and feature rows disagree in length.
    #[error("{n_labels} labels for {n_examples} examples")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_examples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at example {example_index}, feature {feature_index}")]
    NonFiniteValue {
        /// Zero-based index of the offending example.
        example_index: usize,
        /// Zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a label is neither 0 nor 1.
    #[error("example {example_index} has label {label}, expected 0 or 1")]
    InvalidLabel {
        /// Zero-based index of the offending example.
        example_index: usize,
        /// The label found.
        label: usize,
    },

    /// Returned when a scored example has the wrong number of features.
    #[error("example has {got} features, model expects {expected}")]
    PredictionFeatureMismatch {
        /// Feature count of the model.
        expected: usize,
        /// Feature count of the example.
        got: usize,
    },

    /// Returned when scoring with a forest that has no grown trees.
    #[error("cannot classify with an empty ensemble")]
    EmptyEnsemble,

    /// Returned when growing a forest that already holds trees.
    #[error("forest already holds {n_grown} trees")]
    AlreadyGrown {
        /// Number of trees already in the forest.
        n_grown: usize,
    },

    /// Returned when a committee id in a model file is not 1, 2 or 3.
    #[error("unknown committee id {id}")]
    UnknownCommittee {
        /// The id found.
        id: i64,
    },

    /// Returned when a cumulative OOB vote exceeds the number of rounds voted.
    #[error("example {example_index} has OOB vote {vote}, outside ±{trees_so_far}")]
    OobVoteOutOfRange {
        /// Zero-based index of the offending example.
        example_index: usize,
        /// The vote found.
        vote: i32,
        /// Rounds tabulated so far.
        trees_so_far: usize,
    },

    /// Returned when writing raw OOB votes to the sink fails.
    #[error("failed to write out-of-bag votes")]
    WriteOobVotes {
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a model file does not follow the expected layout.
    #[error("malformed model {source_name} at line {line}: {reason}")]
    MalformedModel {
        /// File name or other description of the model source.
        source_name: String,
        /// One-based line number where parsing failed.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// Returned when combining zero models.
    #[error("no models to combine")]
    NoModels,

    /// Returned when combined models disagree on committee or feature count.
    #[error("cannot combine models: {reason}")]
    IncompatibleModels {
        /// Description of the mismatch.
        reason: String,
    },
}
