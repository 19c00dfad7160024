use std::io::{self, Write};

use rand::Rng;
use tracing::{debug, instrument};

use crate::{
    Committee, Dataset, ForestError,
    node::{FeatureIndex, Node, NodeIndex},
    serialize::ModelLines,
    split::{SplitCriterion, class_mass, find_best_split},
};

/// One round's request to grow a tree.
///
/// Carries the per-example inclusion flags for the round alongside the
/// growth budget. Example weights are read from the [`Dataset`].
#[derive(Debug, Clone)]
pub struct TreeGrowth {
    pub(crate) included: Vec<bool>,
    pub(crate) max_depth: usize,
    pub(crate) features_per_split: usize,
    pub(crate) committee: Committee,
    pub(crate) criterion: SplitCriterion,
}

impl TreeGrowth {
    /// Create a request with every example excluded.
    #[must_use]
    pub fn new(
        n_examples: usize,
        max_depth: usize,
        features_per_split: usize,
        committee: Committee,
        criterion: SplitCriterion,
    ) -> Self {
        Self {
            included: vec![false; n_examples],
            max_depth,
            features_per_split,
            committee,
            criterion,
        }
    }

    /// Mark one example as part of (or absent from) this round's training set.
    pub fn set_included(&mut self, index: usize, included: bool) {
        self.included[index] = included;
    }

    /// Mark every example as part of this round's training set.
    pub fn include_all(&mut self) {
        self.included.iter_mut().for_each(|v| *v = true);
    }

    /// Per-example inclusion flags.
    #[must_use]
    pub fn included(&self) -> &[bool] {
        &self.included
    }

    /// Number of examples included in this round.
    #[must_use]
    pub fn n_included(&self) -> usize {
        self.included.iter().filter(|&&v| v).count()
    }

    /// Grow a tree on the included examples using the dataset's current weights.
    ///
    /// Draws from `rng` only when `features_per_split` is smaller than the
    /// feature count.
    #[instrument(skip_all, fields(committee = %self.committee, n_included = self.n_included()))]
    pub fn grow(&self, dataset: &Dataset, rng: &mut impl Rng) -> DecisionTree {
        let sample_indices: Vec<usize> = self
            .included
            .iter()
            .enumerate()
            .filter_map(|(i, &inc)| inc.then_some(i))
            .collect();

        let builder = Builder {
            rows: dataset.features(),
            labels: dataset.labels(),
            weights: dataset.weights(),
            n_features: dataset.n_features(),
            request: self,
            smoothing: 1.0 / (2.0 * dataset.n_examples() as f64),
        };
        let mut arena: Vec<Node> = Vec::new();
        let root = builder.build(&sample_indices, 0, rng, &mut arena);

        debug!(root_index = root.index(), n_nodes = arena.len(), "decision tree grown");

        DecisionTree {
            nodes: arena,
            n_features: dataset.n_features(),
        }
    }
}

struct Builder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [usize],
    weights: &'a [f64],
    n_features: usize,
    request: &'a TreeGrowth,
    smoothing: f64,
}

impl Builder<'_> {
    fn leaf(&self, mass: [f64; 2]) -> Node {
        let total = mass[0] + mass[1];
        let probability = if total > 0.0 { mass[1] / total } else { 0.5 };
        let margin = 0.5 * ((mass[1] + self.smoothing) / (mass[0] + self.smoothing)).ln();
        Node::Leaf {
            probability,
            margin,
        }
    }

    /// Recursively build the arena, returning the index of the node just created.
    fn build(
        &self,
        sample_indices: &[usize],
        depth: usize,
        rng: &mut impl Rng,
        arena: &mut Vec<Node>,
    ) -> NodeIndex {
        let mass = class_mass(self.labels, self.weights, sample_indices);
        let pure = mass[0] <= 0.0 || mass[1] <= 0.0;

        if pure || depth >= self.request.max_depth || sample_indices.len() < 2 {
            arena.push(self.leaf(mass));
            return NodeIndex::new(arena.len() - 1);
        }

        let split = find_best_split(
            self.rows,
            self.labels,
            self.weights,
            sample_indices,
            self.n_features,
            &self.request.criterion,
            self.request.features_per_split,
            rng,
        );
        let Some(split) = split else {
            arena.push(self.leaf(mass));
            return NodeIndex::new(arena.len() - 1);
        };

        // Reserve the slot so the root stays at index 0, then overwrite.
        let node_idx = arena.len();
        arena.push(self.leaf(mass));

        let left = self.build(&split.left_indices, depth + 1, rng, arena);
        let right = self.build(&split.right_indices, depth + 1, rng, arena);

        arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        NodeIndex::new(node_idx)
    }
}

/// A grown decision tree.
///
/// Stored as an arena-based `Vec<Node>` with the root at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Bagged probability that `example` is positive.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `example.len() != n_features`.
    pub fn classify_bag(&self, example: &[f64]) -> Result<f64, ForestError> {
        self.check_width(example)?;
        Ok(self.bag_score(example))
    }

    /// Signed boosting margin of `example` (positive leans to label 1).
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `example.len() != n_features`.
    pub fn classify_boost(&self, example: &[f64]) -> Result<f64, ForestError> {
        self.check_width(example)?;
        Ok(self.boost_score(example))
    }

    /// Score every example of `dataset` the way `committee` reads this tree.
    ///
    /// Boosting yields margins; the resampling committees yield probabilities.
    #[must_use]
    pub fn classify_dataset(&self, dataset: &Dataset, committee: Committee) -> Vec<f64> {
        dataset
            .features()
            .iter()
            .map(|x| match committee {
                Committee::Boosting => self.boost_score(x),
                Committee::Bagging | Committee::RandomForest => self.bag_score(x),
            })
            .collect()
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the number of features the tree reads.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    /// Write the tree in the line-oriented model format.
    ///
    /// ```text
    /// nodes: <count>
    /// split <feature> <threshold> <left> <right>
    /// leaf <probability> <margin>
    /// ```
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "nodes: {}", self.nodes.len())?;
        for node in &self.nodes {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => writeln!(out, "split {feature} {threshold} {left} {right}")?,
                Node::Leaf {
                    probability,
                    margin,
                } => writeln!(out, "leaf {probability} {margin}")?,
            }
        }
        Ok(())
    }

    /// Read one tree written by [`DecisionTree::write_to`].
    pub(crate) fn read_from(
        lines: &mut ModelLines<'_>,
        n_features: usize,
    ) -> Result<Self, ForestError> {
        let n_nodes: usize = lines.labelled("nodes")?;
        if n_nodes == 0 {
            return Err(lines.malformed("tree has zero nodes"));
        }

        let mut nodes = Vec::new();
        for idx in 0..n_nodes {
            let mut fields = lines.fields()?;
            let node = match fields.next_token()? {
                "split" => {
                    let feature: usize = fields.parse()?;
                    let threshold: f64 = fields.parse()?;
                    let left: usize = fields.parse()?;
                    let right: usize = fields.parse()?;
                    if feature >= n_features {
                        return Err(lines.malformed(format!(
                            "split on feature {feature}, model has {n_features} features"
                        )));
                    }
                    // Children must come later in the arena, so traversal always terminates.
                    for child in [left, right] {
                        if child <= idx || child >= n_nodes {
                            return Err(lines.malformed(format!(
                                "node {idx} has child {child} outside {}..{n_nodes}",
                                idx + 1
                            )));
                        }
                    }
                    Node::Split {
                        feature: FeatureIndex::new(feature),
                        threshold,
                        left: NodeIndex::new(left),
                        right: NodeIndex::new(right),
                    }
                }
                "leaf" => Node::Leaf {
                    probability: fields.parse()?,
                    margin: fields.parse()?,
                },
                other => {
                    return Err(
                        lines.malformed(format!("expected `split` or `leaf`, found `{other}`"))
                    );
                }
            };
            fields.finish()?;
            nodes.push(node);
        }

        Ok(Self { nodes, n_features })
    }

    fn check_width(&self, example: &[f64]) -> Result<(), ForestError> {
        if example.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: example.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn bag_score(&self, example: &[f64]) -> f64 {
        match &self.nodes[self.traverse(example)] {
            Node::Leaf { probability, .. } => *probability,
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    pub(crate) fn boost_score(&self, example: &[f64]) -> f64 {
        match &self.nodes[self.traverse(example)] {
            Node::Leaf { margin, .. } => *margin,
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Traverse the tree from the root and return the arena index of the leaf.
    fn traverse(&self, example: &[f64]) -> usize {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if example[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn separable() -> Dataset {
        let mut d = Dataset::new(
            vec![
                vec![1.0, 0.0],
                vec![2.0, 0.0],
                vec![3.0, 0.0],
                vec![10.0, 0.0],
                vec![11.0, 0.0],
                vec![12.0, 0.0],
            ],
            vec![0, 0, 0, 1, 1, 1],
        )
        .unwrap();
        d.weights.iter_mut().for_each(|w| *w = 1.0 / 6.0);
        d
    }

    fn request(d: &Dataset, committee: Committee, max_depth: usize) -> TreeGrowth {
        let mut req = TreeGrowth::new(
            d.n_examples(),
            max_depth,
            d.n_features(),
            committee,
            SplitCriterion::Gini,
        );
        req.include_all();
        req
    }

    #[test]
    fn separable_tree_scores() {
        let d = separable();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let tree = request(&d, Committee::Bagging, 10).grow(&d, &mut rng);
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.classify_bag(&[2.0, 0.0]).unwrap(), 0.0);
        assert_eq!(tree.classify_bag(&[11.0, 0.0]).unwrap(), 1.0);
        assert!(tree.classify_boost(&[2.0, 0.0]).unwrap() < 0.0);
        assert!(tree.classify_boost(&[11.0, 0.0]).unwrap() > 0.0);
    }

    #[test]
    fn boosting_margin_is_smoothed_half_log_odds() {
        let d = separable();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = request(&d, Committee::Boosting, 1).grow(&d, &mut rng);
        // Positive leaf: W+ = 0.5, W- = 0, smoothing 1/12.
        let eps: f64 = 1.0 / 12.0;
        let expected = 0.5 * ((0.5 + eps) / eps).ln();
        assert!((tree.classify_boost(&[11.0, 0.0]).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn excluded_examples_are_ignored() {
        let mut d = separable();
        d.weights[0] = 0.0;
        d.weights[5] = 0.0;
        let mut req = request(&d, Committee::Bagging, 10);
        req.set_included(0, false);
        req.set_included(5, false);
        assert_eq!(req.n_included(), 4);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let tree = req.grow(&d, &mut rng);
        assert_eq!(tree.classify_bag(&[12.0, 0.0]).unwrap(), 1.0);
    }

    #[test]
    fn depth_budget_limits_tree() {
        let mut d = Dataset::new(
            vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
            vec![0, 1, 1, 0],
        )
        .unwrap();
        d.weights.iter_mut().for_each(|w| *w = 0.25);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let tree = request(&d, Committee::Bagging, 1).grow(&d, &mut rng);
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn pure_node_is_single_leaf() {
        let mut d = Dataset::new(vec![vec![1.0], vec![2.0]], vec![1, 1]).unwrap();
        d.weights.iter_mut().for_each(|w| *w = 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = request(&d, Committee::Bagging, 5).grow(&d, &mut rng);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.classify_bag(&[0.0]).unwrap(), 1.0);
    }

    #[test]
    fn feature_mismatch_error() {
        let d = separable();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = request(&d, Committee::Bagging, 5).grow(&d, &mut rng);
        let err = tree.classify_bag(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn classify_dataset_follows_committee() {
        let d = separable();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = request(&d, Committee::Boosting, 5).grow(&d, &mut rng);
        let margins = tree.classify_dataset(&d, Committee::Boosting);
        let probs = tree.classify_dataset(&d, Committee::Bagging);
        for (i, x) in d.features().iter().enumerate() {
            assert_eq!(margins[i], tree.classify_boost(x).unwrap());
            assert_eq!(probs[i], tree.classify_bag(x).unwrap());
        }
    }

    #[test]
    fn text_round_trip() {
        let d = separable();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let tree = request(&d, Committee::Boosting, 4).grow(&d, &mut rng);
        let mut buf = Vec::new();
        tree.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("nodes: 3\nsplit 0 6.5 1 2\n"));

        let mut lines = ModelLines::new(&text, "tree");
        let restored = DecisionTree::read_from(&mut lines, 2).unwrap();
        assert_eq!(restored, tree);
    }

    #[test]
    fn backward_child_rejected() {
        let text = "nodes: 2\nsplit 0 1.5 0 1\nleaf 0.5 0\n";
        let mut lines = ModelLines::new(text, "tree");
        let err = DecisionTree::read_from(&mut lines, 1).unwrap_err();
        assert!(matches!(err, ForestError::MalformedModel { line: 2, .. }));
    }

    #[test]
    fn unknown_node_kind_rejected() {
        let text = "nodes: 1\nbranch 0.5 0\n";
        let mut lines = ModelLines::new(text, "tree");
        let err = DecisionTree::read_from(&mut lines, 1).unwrap_err();
        assert!(matches!(err, ForestError::MalformedModel { line: 2, .. }));
    }
}
