//! Binary classification with committees of decision trees.
//!
//! Grows bagged trees, boosted trees, or random forests over weighted
//! binary-labelled examples, tracks out-of-bag (OOB) votes and AUC while
//! growing, scores new examples, and reads and writes models in a
//! line-oriented text format.
//!
//! ```no_run
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use sylva_forest::{Committee, Dataset, ForestConfig, OobMode};
//!
//! # fn main() -> Result<(), sylva_forest::ForestError> {
//! let mut data = Dataset::new(vec![vec![0.0], vec![1.0]], vec![0, 1])?;
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let result = ForestConfig::new(Committee::RandomForest)
//!     .with_n_trees(50)
//!     .with_oob_mode(OobMode::Enabled)
//!     .fit(&mut data, &mut rng)?;
//! let score = result.forest().classify(&[0.4])?;
//! # let _ = score;
//! # Ok(())
//! # }
//! ```

mod config;
mod confusion;
mod dataset;
mod error;
mod forest;
mod node;
mod oob;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::{Committee, ForestConfig, OobMode};
pub use confusion::ConfusionMatrix;
pub use dataset::Dataset;
pub use error::ForestError;
pub use forest::Forest;
pub use node::Impurity;
pub use oob::{OobReport, compute_oob_auc, report_oob_error, tabulate_oob_votes, write_oob_votes};
pub use result::{TrainingMetadata, TrainingResult};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, TreeGrowth};
