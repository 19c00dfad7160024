//! Binary confusion matrix and derived rates.

use std::fmt;

/// A 2×2 confusion matrix.
///
/// Entry `matrix[true_label][predicted_label]` counts examples with that
/// outcome. Rates are plain ratios: an empty row yields NaN, which is
/// passed through rather than replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted 0/1 labels.
    #[must_use]
    pub fn from_labels(true_labels: &[usize], predicted: &[usize]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in true_labels.iter().zip(predicted) {
            cm.record(t, p);
        }
        cm
    }

    /// Build a confusion matrix from cumulative OOB votes.
    ///
    /// Examples whose vote is exactly zero have no OOB decision yet and are
    /// skipped; positive votes predict label 1.
    #[must_use]
    pub fn from_oob_votes(labels: &[usize], votes: &[i32]) -> Self {
        let mut cm = Self::default();
        for (&label, &vote) in labels.iter().zip(votes) {
            if vote != 0 {
                cm.record(label, usize::from(vote > 0));
            }
        }
        cm
    }

    /// Count one outcome.
    pub fn record(&mut self, true_label: usize, predicted: usize) {
        self.matrix[true_label][predicted] += 1;
    }

    /// Positives predicted positive.
    #[must_use]
    pub fn true_positives(&self) -> usize {
        self.matrix[1][1]
    }

    /// Negatives predicted positive.
    #[must_use]
    pub fn false_positives(&self) -> usize {
        self.matrix[0][1]
    }

    /// Negatives predicted negative.
    #[must_use]
    pub fn true_negatives(&self) -> usize {
        self.matrix[0][0]
    }

    /// Positives predicted negative.
    #[must_use]
    pub fn false_negatives(&self) -> usize {
        self.matrix[1][0]
    }

    /// Total number of counted examples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// `(tp + tn) / total`; NaN when nothing was counted.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives() + self.true_negatives(), self.total())
    }

    /// `tp / (tp + fn)`, the accuracy on positive examples.
    #[must_use]
    pub fn sensitivity(&self) -> f64 {
        ratio(
            self.true_positives(),
            self.true_positives() + self.false_negatives(),
        )
    }

    /// `tn / (tn + fp)`, the accuracy on negative examples.
    #[must_use]
    pub fn specificity(&self) -> f64 {
        ratio(
            self.true_negatives(),
            self.true_negatives() + self.false_positives(),
        )
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[[usize; 2]; 2] {
        &self.matrix
    }
}

pub(crate) fn ratio(numerator: usize, denominator: usize) -> f64 {
    numerator as f64 / denominator as f64
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8} {:>8} {:>8}", "", "pred_0", "pred_1")?;
        for (i, row) in self.matrix.iter().enumerate() {
            writeln!(f, "{:>8} {:>8} {:>8}", format!("true_{i}"), row[0], row[1])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_counts() {
        // true:  0 0 0 1 1 1 1
        // pred:  0 0 1 1 1 1 0
        let cm = ConfusionMatrix::from_labels(&[0, 0, 0, 1, 1, 1, 1], &[0, 0, 1, 1, 1, 1, 0]);
        assert_eq!(cm.true_negatives(), 2);
        assert_eq!(cm.false_positives(), 1);
        assert_eq!(cm.true_positives(), 3);
        assert_eq!(cm.false_negatives(), 1);
        assert!((cm.accuracy() - 5.0 / 7.0).abs() < 1e-12);
        assert!((cm.sensitivity() - 0.75).abs() < 1e-12);
        assert!((cm.specificity() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_votes_are_skipped() {
        let cm = ConfusionMatrix::from_oob_votes(&[0, 1, 1, 0], &[-2, 0, 3, 1]);
        assert_eq!(cm.total(), 3);
        assert_eq!(cm.as_rows(), &[[1, 1], [0, 1]]);
    }

    #[test]
    fn empty_class_rate_is_nan() {
        let cm = ConfusionMatrix::from_labels(&[0, 0], &[0, 1]);
        assert!(cm.sensitivity().is_nan());
        assert!((cm.specificity() - 0.5).abs() < 1e-12);
        assert!(ConfusionMatrix::default().accuracy().is_nan());
    }

    #[test]
    fn display_formatting() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1]);
        let output = format!("{cm}");
        assert!(output.contains("pred_1"));
        assert!(output.contains("true_0"));
    }
}
