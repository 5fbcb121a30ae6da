//! A random forest of CART classification trees over two classes.
//!
//! Each tree is grown on a bootstrap sample of the training rows, choosing at every node the
//! threshold split that minimises weighted Gini impurity among a random subset of the features. Class
//! probabilities are averaged across the trees.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tinyrand::{Rand, Seeded, StdRand};
use tracing::debug;

pub const CLASSES: usize = 2;

/// How many features are considered at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    All,
    Sqrt,
    Count(usize),
}
impl MaxFeatures {
    pub fn resolve(&self, features: usize) -> usize {
        let count = match self {
            MaxFeatures::All => features,
            MaxFeatures::Sqrt => (features as f64).sqrt() as usize,
            MaxFeatures::Count(count) => *count,
        };
        count.clamp(1, features.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestOptions {
    pub trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Weight each class inversely to its frequency.
    pub balanced: bool,
    pub seed: u64,
}
impl ForestOptions {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.trees == 0 {
            bail!("at least one tree must be grown");
        }
        if self.min_samples_split < 2 {
            bail!("min_samples_split must be at least 2");
        }
        if self.min_samples_leaf == 0 {
            bail!("min_samples_leaf must be positive");
        }
        if self.max_depth == Some(0) {
            bail!("max_depth must be positive");
        }
        if self.max_features == MaxFeatures::Count(0) {
            bail!("max_features must be positive");
        }
        Ok(())
    }
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            balanced: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Rows with `row[feature] <= threshold` descend to `left`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        proba: [f64; CLASSES],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}
impl DecisionTree {
    pub fn predict_proba(&self, row: &[f64]) -> [f64; CLASSES] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { proba } => return *proba,
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        fn descend(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Split { left, right, .. } => 1 + usize::max(descend(nodes, *left), descend(nodes, *right)),
                Node::Leaf { .. } => 0,
            }
        }
        descend(&self.nodes, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    features: usize,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}
impl RandomForest {
    /// Fits a forest to `rows`, where `labels[i]` is true when row `i` belongs to the positive class.
    pub fn fit(rows: &[Vec<f64>], labels: &[bool], options: &ForestOptions) -> Result<Self, anyhow::Error> {
        options.validate()?;
        if rows.is_empty() {
            bail!("cannot fit a forest to an empty sample");
        }
        if rows.len() != labels.len() {
            bail!("{} rows but {} labels", rows.len(), labels.len());
        }
        let features = rows[0].len();
        if features == 0 || rows.iter().any(|row| row.len() != features) {
            bail!("all rows must have the same non-zero number of features");
        }
        let mut class_counts = [0_usize; CLASSES];
        for &label in labels {
            class_counts[label as usize] += 1;
        }
        if class_counts.contains(&0) {
            bail!("both classes must be present, got {class_counts:?}");
        }
        let class_weights = if options.balanced {
            let samples = rows.len() as f64;
            class_counts.map(|count| samples / (CLASSES as f64 * count as f64))
        } else {
            [1.; CLASSES]
        };
        debug!("fitting {} trees to {} rows, class weights {class_weights:?}", options.trees, rows.len());

        let mut rand = StdRand::seed(options.seed);
        let max_features = options.max_features.resolve(features);
        let mut trees = Vec::with_capacity(options.trees);
        let mut importances = vec![0.; features];
        for _ in 0..options.trees {
            let mut draws = vec![0_usize; rows.len()];
            for _ in 0..rows.len() {
                draws[random_index(&mut rand, rows.len())] += 1;
            }
            let weights: Vec<_> = draws
                .iter()
                .zip(labels)
                .map(|(&count, &label)| count as f64 * class_weights[label as usize])
                .collect();
            let samples: Vec<_> = (0..rows.len()).filter(|&index| draws[index] > 0).collect();
            let mut grower = TreeGrower {
                rows,
                labels,
                weights: &weights,
                options,
                max_features,
                rand: &mut rand,
                nodes: vec![],
                importances: vec![0.; features],
            };
            grower.grow(samples, 0);
            let TreeGrower {
                nodes,
                importances: tree_importances,
                ..
            } = grower;
            for (total, tree) in importances.iter_mut().zip(normalise(tree_importances)) {
                *total += tree;
            }
            trees.push(DecisionTree { nodes });
        }
        for importance in &mut importances {
            *importance /= options.trees as f64;
        }

        Ok(Self {
            features,
            trees,
            importances: normalise(importances),
        })
    }

    /// Mean of the per-tree leaf class distributions.
    pub fn predict_proba(&self, row: &[f64]) -> [f64; CLASSES] {
        let mut proba = [0.; CLASSES];
        for tree in &self.trees {
            for (sum, p) in proba.iter_mut().zip(tree.predict_proba(row)) {
                *sum += p;
            }
        }
        proba.map(|sum| sum / self.trees.len() as f64)
    }

    pub fn predict(&self, row: &[f64]) -> bool {
        let [p0, p1] = self.predict_proba(row);
        p1 > p0
    }

    /// Weighted impurity decrease attributable to each feature, summing to 1 unless no tree split.
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn features(&self) -> usize {
        self.features
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

fn random_index(rand: &mut impl Rand, len: usize) -> usize {
    (rand.next_u64() % len as u64) as usize
}

fn normalise(mut values: Vec<f64>) -> Vec<f64> {
    let sum: f64 = values.iter().sum();
    if sum > 0. {
        for value in &mut values {
            *value /= sum;
        }
    }
    values
}

fn gini(class_weights: &[f64; CLASSES]) -> f64 {
    let total: f64 = class_weights.iter().sum();
    if total <= 0. {
        return 0.;
    }
    1. - class_weights.iter().map(|weight| (weight / total).powi(2)).sum::<f64>()
}

struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
    split_at: usize,
    sorted: Vec<usize>,
}

struct TreeGrower<'a, R: Rand> {
    rows: &'a [Vec<f64>],
    labels: &'a [bool],
    weights: &'a [f64],
    options: &'a ForestOptions,
    max_features: usize,
    rand: &'a mut R,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}
impl<'a, R: Rand> TreeGrower<'a, R> {
    fn class_weights(&self, samples: &[usize]) -> [f64; CLASSES] {
        let mut totals = [0.; CLASSES];
        for &sample in samples {
            totals[self.labels[sample] as usize] += self.weights[sample];
        }
        totals
    }

    /// Grows the subtree over `samples`, returning the index of its root node.
    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let class_weights = self.class_weights(&samples);
        let total: f64 = class_weights.iter().sum();
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            proba: class_weights.map(|weight| weight / total),
        });

        let impurity = gini(&class_weights);
        let splittable = impurity > 0.
            && samples.len() >= self.options.min_samples_split
            && samples.len() >= 2 * self.options.min_samples_leaf
            && self.options.max_depth.map_or(true, |max_depth| depth < max_depth);
        if !splittable {
            return index;
        }
        let Some(candidate) = self.best_split(&samples) else {
            return index;
        };
        let decrease = impurity * total - candidate.impurity;
        if decrease <= 0. {
            return index;
        }
        self.importances[candidate.feature] += decrease;

        let mut sorted = candidate.sorted;
        let right_samples = sorted.split_off(candidate.split_at);
        let left = self.grow(sorted, depth + 1);
        let right = self.grow(right_samples, depth + 1);
        self.nodes[index] = Node::Split {
            feature: candidate.feature,
            threshold: candidate.threshold,
            left,
            right,
        };
        index
    }

    /// Evaluates up to `max_features` randomly chosen non-constant features, returning the split with
    /// the lowest weighted child impurity.
    fn best_split(&mut self, samples: &[usize]) -> Option<Candidate> {
        let features = self.importances.len();
        let mut order: Vec<_> = (0..features).collect();
        for i in (1..features).rev() {
            let j = random_index(&mut *self.rand, i + 1);
            order.swap(i, j);
        }

        let min_leaf = self.options.min_samples_leaf;
        let mut best: Option<Candidate> = None;
        let mut evaluated = 0;
        for feature in order {
            if evaluated == self.max_features {
                break;
            }
            let mut sorted = samples.to_vec();
            sorted.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));
            let (lowest, highest) = (
                self.rows[sorted[0]][feature],
                self.rows[sorted[sorted.len() - 1]][feature],
            );
            if highest <= lowest {
                continue;
            }
            evaluated += 1;

            let mut right = self.class_weights(&sorted);
            let mut left = [0.; CLASSES];
            let mut feature_best: Option<(f64, usize)> = None;
            for position in 0..sorted.len() - 1 {
                let sample = sorted[position];
                let class = self.labels[sample] as usize;
                left[class] += self.weights[sample];
                right[class] -= self.weights[sample];
                let (value, next) = (self.rows[sample][feature], self.rows[sorted[position + 1]][feature]);
                if next <= value {
                    continue;
                }
                let split_at = position + 1;
                if split_at < min_leaf || sorted.len() - split_at < min_leaf {
                    continue;
                }
                let child_impurity =
                    gini(&left) * left.iter().sum::<f64>() + gini(&right) * right.iter().sum::<f64>();
                if feature_best.map_or(true, |(impurity, _)| child_impurity < impurity) {
                    feature_best = Some((child_impurity, split_at));
                }
            }

            if let Some((impurity, split_at)) = feature_best {
                if best.as_ref().map_or(true, |best| impurity < best.impurity) {
                    let (below, above) = (
                        self.rows[sorted[split_at - 1]][feature],
                        self.rows[sorted[split_at]][feature],
                    );
                    let mut threshold = below / 2. + above / 2.;
                    if threshold >= above {
                        threshold = below;
                    }
                    best = Some(Candidate {
                        feature,
                        threshold,
                        impurity,
                        split_at,
                        sorted,
                    });
                }
            }
        }
        best
    }
}
