//! Out-of-bag (OOB) evaluation for resampling committees.
//!
//! Every example left out of a round's bootstrap sample receives that
//! round's tree vote: +1 when the tree's probability exceeds 0.5, -1
//! otherwise. After `T` rounds each cumulative vote lies in `[-T, T]`,
//! and thresholding it at every integer level traces a ROC curve.

use std::fmt;
use std::io::Write;

use crate::confusion::{ConfusionMatrix, ratio};
use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::tree::DecisionTree;

/// Error rates and AUC of the cumulative OOB vote after one round.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OobReport {
    /// One-based round (tree) number.
    pub tree: usize,
    /// `1 - accuracy` over examples with a nonzero vote.
    pub error: f64,
    /// `1 - specificity`, the error rate on negative examples.
    pub negative_error: f64,
    /// `1 - sensitivity`, the error rate on positive examples.
    pub positive_error: f64,
    /// Area under the ROC curve of the cumulative votes.
    pub auc: f64,
    /// Number of examples with a nonzero vote.
    pub n_decided: usize,
}

impl OobReport {
    /// Column header printed above a run of report rows.
    #[must_use]
    pub fn header() -> String {
        format!(
            "Error rate (1-acc), on neg examples (1-spec), and on pos examples (1-sens)\n\
             {:>5}  {:>6}  {:>6}  {:>6}   {:>6}",
            "tree", "err", "negerr", "poserr", "auc"
        )
    }

    /// Whether any metric is NaN because a confusion-matrix row was empty.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        [self.error, self.negative_error, self.positive_error, self.auc]
            .iter()
            .any(|v| v.is_nan())
    }
}

impl fmt::Display for OobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:5}  {:5.2}%  {:5.2}%  {:5.2}%   {:5.2}%",
            self.tree,
            100.0 * self.error,
            100.0 * self.negative_error,
            100.0 * self.positive_error,
            100.0 * self.auc
        )
    }
}

/// Classify every example with `tree` and update the votes of this round's OOB examples.
///
/// An example is out of bag when its weight is zero. Returns the tree's
/// per-example probabilities so callers can stream them.
pub fn tabulate_oob_votes(tree: &DecisionTree, dataset: &mut Dataset) -> Vec<f64> {
    let predictions: Vec<f64> = dataset
        .features()
        .iter()
        .map(|x| tree.bag_score(x))
        .collect();
    for ((vote, &weight), &p) in dataset
        .oob_votes
        .iter_mut()
        .zip(&dataset.weights)
        .zip(&predictions)
    {
        if weight == 0.0 {
            *vote += if p > 0.5 { 1 } else { -1 };
        }
    }
    predictions
}

/// Write one line of this round's raw OOB outcomes.
///
/// Per example: `0` when it was trained on (nonzero weight), otherwise
/// `1` or `-1` from this single tree's prediction at 0.5. Values are
/// space-separated and the line is newline-terminated.
///
/// # Errors
///
/// Returns [`ForestError::WriteOobVotes`] when the sink fails.
pub fn write_oob_votes<W: Write>(
    predictions: &[f64],
    dataset: &Dataset,
    sink: &mut W,
) -> Result<(), ForestError> {
    let line = dataset
        .weights()
        .iter()
        .zip(predictions)
        .map(|(&w, &p)| match (w != 0.0, p > 0.5) {
            (true, _) => "0",
            (false, true) => "1",
            (false, false) => "-1",
        })
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(sink, "{line}").map_err(|source| ForestError::WriteOobVotes { source })
}

/// Area under the ROC curve of cumulative votes after `trees_so_far` rounds.
///
/// Examples are histogrammed by `(label, vote)`. For each integer threshold
/// `v` from `-trees_so_far` to `trees_so_far`, examples with vote `>= v` are
/// called positive; a final always-negative point (sensitivity 0,
/// specificity 1) closes the curve. The area is the trapezoidal sum over
/// consecutive points in (specificity, sensitivity) space. When a class is
/// absent its rates are NaN and so is the result.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ForestError::OobVoteOutOfRange`] | a vote lies outside `[-trees_so_far, trees_so_far]` |
/// | [`ForestError::InvalidLabel`] | a label is neither 0 nor 1 |
pub fn compute_oob_auc(
    labels: &[usize],
    votes: &[i32],
    trees_so_far: usize,
) -> Result<f64, ForestError> {
    let row = 2 * trees_so_far + 1;
    let mut counts = [vec![0usize; row], vec![0usize; row]];
    for (example_index, (&label, &vote)) in labels.iter().zip(votes).enumerate() {
        let slot = i64::try_from(trees_so_far)
            .ok()
            .and_then(|t| usize::try_from(i64::from(vote) + t).ok())
            .filter(|&s| s < row)
            .ok_or(ForestError::OobVoteOutOfRange {
                example_index,
                vote,
                trees_so_far,
            })?;
        let class = counts
            .get_mut(label)
            .ok_or(ForestError::InvalidLabel {
                example_index,
                label,
            })?;
        class[slot] += 1;
    }

    let [n_neg, n_pos] = [counts[0].iter().sum::<usize>(), counts[1].iter().sum::<usize>()];
    let mut sensitivity = Vec::with_capacity(row + 1);
    let mut specificity = Vec::with_capacity(row + 1);
    // Running counts of examples strictly below the current threshold.
    let (mut tn, mut fn_) = (0usize, 0usize);
    for slot in 0..row {
        let tp = n_pos - fn_;
        let fp = n_neg - tn;
        sensitivity.push(ratio(tp, tp + fn_));
        specificity.push(ratio(tn, tn + fp));
        tn += counts[0][slot];
        fn_ += counts[1][slot];
    }
    sensitivity.push(0.0);
    specificity.push(1.0);

    Ok((0..row)
        .map(|i| {
            (specificity[i + 1] - specificity[i]) * (sensitivity[i] + sensitivity[i + 1]) / 2.0
        })
        .sum())
}

/// Summarize the cumulative OOB votes after zero-based round `iter`.
///
/// # Errors
///
/// Propagates the errors of [`compute_oob_auc`].
pub fn report_oob_error(dataset: &Dataset, iter: usize) -> Result<OobReport, ForestError> {
    let cm = ConfusionMatrix::from_oob_votes(dataset.labels(), dataset.oob_votes());
    Ok(OobReport {
        tree: iter + 1,
        error: 1.0 - cm.accuracy(),
        negative_error: 1.0 - cm.specificity(),
        positive_error: 1.0 - cm.sensitivity(),
        auc: compute_oob_auc(dataset.labels(), dataset.oob_votes(), iter + 1)?,
        n_decided: cm.total(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_separation_auc_is_one() {
        let labels = [0, 0, 1, 1, 1];
        let votes = [-3, -1, 1, 2, 3];
        assert!((compute_oob_auc(&labels, &votes, 3).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_separation_auc_is_zero() {
        let labels = [1, 1, 0, 0];
        let votes = [-2, -1, 1, 2];
        assert!(compute_oob_auc(&labels, &votes, 2).unwrap().abs() < 1e-12);
    }

    #[test]
    fn matched_distributions_auc_is_half() {
        // Same count of positives and negatives at every vote level.
        let labels = [0, 1, 0, 1, 0, 1, 0, 1];
        let votes = [-2, -2, 0, 0, 1, 1, 1, 1];
        assert!((compute_oob_auc(&labels, &votes, 2).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn partial_overlap_matches_pair_count() {
        // Pairs (pos, neg) with pos > neg count 1, ties count 1/2:
        // pos votes {1, 0}, neg votes {0, -1} -> (1 + 1 + 0.5 + 1) / 4.
        let labels = [1, 1, 0, 0];
        let votes = [1, 0, 0, -1];
        assert!((compute_oob_auc(&labels, &votes, 1).unwrap() - 0.875).abs() < 1e-12);
    }

    #[test]
    fn missing_class_auc_is_nan() {
        let labels = [0, 0];
        let votes = [-1, 1];
        assert!(compute_oob_auc(&labels, &votes, 1).unwrap().is_nan());
    }

    #[test]
    fn out_of_range_vote_is_an_error() {
        let err = compute_oob_auc(&[0, 1], &[5, -5], 2).unwrap_err();
        assert!(matches!(
            err,
            ForestError::OobVoteOutOfRange {
                example_index: 0,
                vote: 5,
                trees_so_far: 2
            }
        ));
        let err = compute_oob_auc(&[0, 1], &[0, -3], 2).unwrap_err();
        assert!(matches!(err, ForestError::OobVoteOutOfRange { example_index: 1, .. }));
    }

    #[test]
    fn label_above_one_is_an_error() {
        let err = compute_oob_auc(&[2], &[0], 1).unwrap_err();
        assert!(matches!(
            err,
            ForestError::InvalidLabel {
                example_index: 0,
                label: 2
            }
        ));
    }

    #[test]
    fn report_skips_undecided_examples() {
        let mut d = Dataset::new(
            vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0], vec![4.0]],
            vec![0, 0, 1, 1, 1],
        )
        .unwrap();
        d.oob_votes = vec![-1, 1, 1, 0, -1];
        let report = report_oob_error(&d, 0).unwrap();
        assert_eq!(report.tree, 1);
        assert_eq!(report.n_decided, 4);
        assert!((report.error - 0.5).abs() < 1e-12);
        assert!((report.negative_error - 0.5).abs() < 1e-12);
        assert!((report.positive_error - 0.5).abs() < 1e-12);
        assert!(!report.is_degenerate());
    }

    #[test]
    fn report_flags_degenerate_metrics() {
        let mut d = Dataset::new(vec![vec![0.0], vec![1.0]], vec![0, 1]).unwrap();
        d.oob_votes = vec![-1, 0];
        let report = report_oob_error(&d, 0).unwrap();
        assert!(report.positive_error.is_nan());
        assert!(report.is_degenerate());
    }

    #[test]
    fn report_row_format() {
        let report = OobReport {
            tree: 7,
            error: 0.125,
            negative_error: 0.1,
            positive_error: 0.15,
            auc: 0.9375,
            n_decided: 8,
        };
        assert_eq!(report.to_string(), "    7  12.50%  10.00%  15.00%   93.75%");
        assert!(OobReport::header().ends_with(" tree     err  negerr  poserr      auc"));
    }

    #[test]
    fn vote_line_marks_trained_examples() {
        let mut d = Dataset::new(vec![vec![0.0], vec![1.0], vec![2.0]], vec![0, 1, 1]).unwrap();
        d.weights = vec![0.0, 0.5, 0.0];
        let mut sink = Vec::new();
        write_oob_votes(&[0.2, 0.9, 0.7], &d, &mut sink).unwrap();
        assert_eq!(String::from_utf8(sink).unwrap(), "-1 0 1\n");
    }
}
