//! Bagged decision-tree ensembles for the churn classifier and the
//! CLTV regressor.
//!
//! Trees are CART: binary splits on one feature at a midpoint threshold,
//! Gini impurity for classification, squared error for regression.
//! Each tree is grown on a bootstrap sample drawn from its own RNG stream,
//! so a forest is a pure function of (rows, targets, params, seed).
//!
//! Trees are stored as flat node lists; traversal goes left on `<=`.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    features::FEATURE_COUNT,
    rng::{RngBank, StreamRng},
};
use serde::{Deserialize, Serialize};

const IMPURITY_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForestTask {
    /// Targets are 0/1; predictions are the positive-class probability.
    Classification,
    Regression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators:      usize,
    pub max_depth:         usize,
    pub min_samples_split: usize,
    pub min_samples_leaf:  usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators:      100,
            max_depth:         10,
            min_samples_split: 2,
            min_samples_leaf:  1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature:   usize,
        threshold: f64,
        left:      usize,
        right:     usize,
    },
    Leaf {
        value:   f64,
        samples: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn predict(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Split { feature, threshold, left, right }) => {
                    let Some(x) = row.get(*feature) else {
                        return 0.0;
                    };
                    id = if *x <= *threshold { *left } else { *right };
                }
                Some(Node::Leaf { value, .. }) => return *value,
                None => return 0.0,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes.get(id) {
                Some(Node::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub task:       ForestTask,
    pub params:     ForestParams,
    pub n_features: usize,
    pub trees:      Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(
        rows: &[[f64; FEATURE_COUNT]],
        targets: &[f64],
        task: ForestTask,
        params: &ForestParams,
        bank: &RngBank,
    ) -> AnalyticsResult<Self> {
        if rows.is_empty() {
            return Err(AnalyticsError::Fit("no training rows".into()));
        }
        if rows.len() != targets.len() {
            return Err(AnalyticsError::Fit(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if params.n_estimators == 0 || params.max_depth == 0 {
            return Err(AnalyticsError::Fit(
                "n_estimators and max_depth must both be at least 1".into(),
            ));
        }
        if let Some(bad) = targets.iter().find(|t| !t.is_finite()) {
            return Err(AnalyticsError::Fit(format!("non-finite target {bad}")));
        }
        if task == ForestTask::Classification && targets.iter().any(|&t| t != 0.0 && t != 1.0) {
            return Err(AnalyticsError::Fit("classification targets must be 0 or 1".into()));
        }

        // sqrt(n_features) candidates per split for classification,
        // every feature for regression.
        let max_features = match task {
            ForestTask::Classification => ((FEATURE_COUNT as f64).sqrt() as usize).max(1),
            ForestTask::Regression     => FEATURE_COUNT,
        };

        let n = rows.len();
        let trees = (0..params.n_estimators)
            .map(|t| {
                let mut rng = bank.for_tree(t);
                let sample: Vec<usize> = (0..n).map(|_| rng.index_below(n)).collect();
                TreeBuilder {
                    rows,
                    targets,
                    task,
                    params,
                    max_features,
                    rng,
                    nodes: Vec::new(),
                }
                .grow(sample)
            })
            .collect();

        Ok(Self {
            task,
            params: params.clone(),
            n_features: FEATURE_COUNT,
            trees,
        })
    }

    /// Mean of the tree outputs: the positive-class probability for a
    /// classifier, the point estimate for a regressor.
    pub fn predict(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Majority decision of a classifier; ties go to the negative class.
    pub fn predict_positive(&self, row: &[f64; FEATURE_COUNT]) -> bool {
        self.predict(row) > 0.5
    }

    /// Structural check for a forest read back from disk. Children must
    /// sit after their parent, which rules out cycles in traversal.
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.n_features != FEATURE_COUNT {
            return Err(AnalyticsError::Fit(format!(
                "forest was fit on {} features, engine produces {FEATURE_COUNT}",
                self.n_features
            )));
        }
        if self.trees.is_empty() {
            return Err(AnalyticsError::Fit("forest has no trees".into()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(AnalyticsError::Fit(format!("tree {t} has no nodes")));
            }
            for (id, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Split { feature, threshold, left, right } => {
                        if *feature >= FEATURE_COUNT {
                            return Err(AnalyticsError::Fit(format!(
                                "tree {t} node {id} splits on feature {feature}"
                            )));
                        }
                        if threshold.is_nan() {
                            return Err(AnalyticsError::Fit(format!(
                                "tree {t} node {id} has a NaN threshold"
                            )));
                        }
                        for child in [*left, *right] {
                            if child <= id || child >= tree.nodes.len() {
                                return Err(AnalyticsError::Fit(format!(
                                    "tree {t} node {id} points to child {child}"
                                )));
                            }
                        }
                    }
                    Node::Leaf { value, .. } => {
                        if !value.is_finite() {
                            return Err(AnalyticsError::Fit(format!(
                                "tree {t} leaf {id} holds {value}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

// ── Tree growth ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature:   usize,
    threshold: f64,
    score:     f64,
}

struct TreeBuilder<'a> {
    rows:         &'a [[f64; FEATURE_COUNT]],
    targets:      &'a [f64],
    task:         ForestTask,
    params:       &'a ForestParams,
    max_features: usize,
    rng:          StreamRng,
    nodes:        Vec<Node>,
}

impl TreeBuilder<'_> {
    fn grow(mut self, sample: Vec<usize>) -> DecisionTree {
        self.split_node(sample, 0);
        DecisionTree { nodes: self.nodes }
    }

    /// Total (sample-weighted) impurity of a node from running sums.
    fn impurity(&self, sum: f64, sum_sq: f64, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        match self.task {
            ForestTask::Classification => {
                let p = sum / n;
                n * 2.0 * p * (1.0 - p)
            }
            ForestTask::Regression => (sum_sq - sum * sum / n).max(0.0),
        }
    }

    fn sums(&self, sample: &[usize]) -> (f64, f64) {
        sample.iter().fold((0.0, 0.0), |(s, sq), &i| {
            let y = self.targets[i];
            (s + y, sq + y * y)
        })
    }

    fn split_node(&mut self, mut sample: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        let n = sample.len();
        let (sum, sum_sq) = self.sums(&sample);
        let value = if n > 0 { sum / n as f64 } else { 0.0 };
        self.nodes.push(Node::Leaf { value, samples: n });

        let impurity = self.impurity(sum, sum_sq, n);
        if depth >= self.params.max_depth
            || n < self.params.min_samples_split.max(2)
            || impurity <= IMPURITY_EPSILON
        {
            return id;
        }

        let Some(best) = self.best_split(&mut sample, sum, sum_sq, impurity) else {
            return id;
        };

        let rows = self.rows;
        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| rows[i][best.feature] <= best.threshold);

        let left_id = self.split_node(left, depth + 1);
        let right_id = self.split_node(right, depth + 1);
        self.nodes[id] = Node::Split {
            feature:   best.feature,
            threshold: best.threshold,
            left:      left_id,
            right:     right_id,
        };
        id
    }

    fn best_split(
        &mut self,
        sample: &mut [usize],
        total_sum: f64,
        total_sq: f64,
        parent: f64,
    ) -> Option<SplitCandidate> {
        let rows = self.rows;
        let n = sample.len();
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut features: Vec<usize> = (0..FEATURE_COUNT).collect();
        self.rng.shuffle(&mut features);

        let mut best: Option<SplitCandidate> = None;
        for &feature in features.iter().take(self.max_features) {
            sample.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n - 1 {
                let y = self.targets[sample[k]];
                left_sum += y;
                left_sq += y * y;

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let here = rows[sample[k]][feature];
                let next = rows[sample[k + 1]][feature];
                if next <= here {
                    continue;
                }

                let score = self.impurity(left_sum, left_sq, n_left)
                    + self.impurity(total_sum - left_sum, total_sq - left_sq, n_right);
                if score < parent - IMPURITY_EPSILON && best.map_or(true, |b| score < b.score) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        score,
                    });
                }
            }
        }
        best
    }
}
