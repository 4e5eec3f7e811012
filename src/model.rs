//! Training: feature standardization, stratified splitting, minority-class
//! oversampling and a deterministic gradient-boosted tree classifier with a
//! logistic objective. Every stochastic step draws from one seeded RNG, so a
//! fixed seed reproduces the run bit for bit.

use log::{info, warn};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::PipelineError;
use crate::features::FEATURE_NAMES;

/// Per-feature standardization parameters. Fit once on the full eligible
/// population and reused verbatim at prediction time; refitting would move the
/// decision boundary of every model trained against it.
#[derive(Debug, Clone)]
pub struct Scaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl Scaler {
    pub fn fit(x: &Array2<f64>) -> Self {
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let mut std = Array1::zeros(x.ncols());
        for (j, col) in x.columns().into_iter().enumerate() {
            let n = col.len().max(1) as f64;
            let var = col.iter().map(|v| (v - mean[j]).powi(2)).sum::<f64>() / n;
            let sd = var.sqrt();
            // constant columns pass through unscaled
            std[j] = if sd > 0.0 { sd } else { 1.0 };
        }
        Scaler { mean, std }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for mut row in out.rows_mut() {
            for j in 0..row.len() {
                row[j] = (row[j] - self.mean[j]) / self.std[j];
            }
        }
        out
    }
}

/// Fixed hyperparameters for the boosted ensemble, tuned for precision on a
/// rare positive class.
#[derive(Debug, Clone)]
pub struct GbdtParams {
    pub n_trees: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of training rows drawn (without replacement) per tree.
    pub subsample: f64,
    pub min_leaf: usize,
    /// L2 regularization on leaf weights.
    pub lambda: f64,
    pub train_fraction: f64,
    pub smote_neighbors: usize,
    pub seed: u64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            n_trees: 300,
            learning_rate: 0.03,
            max_depth: 5,
            subsample: 0.85,
            min_leaf: 1,
            lambda: 1.0,
            train_fraction: 0.8,
            smote_neighbors: 5,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, row: ArrayView1<f64>) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a GbdtParams,
    nodes: Vec<Node>,
    gain: &'a mut [f64],
    rng: &'a mut StdRng,
}

impl TreeBuilder<'_> {
    fn leaf(&mut self, rows: &[usize]) -> usize {
        let g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| self.hess[i]).sum();
        self.nodes.push(Node::Leaf {
            value: g / (h + self.params.lambda),
        });
        self.nodes.len() - 1
    }

    fn build(&mut self, rows: &[usize], depth: usize) -> usize {
        if depth >= self.params.max_depth || rows.len() < 2 * self.params.min_leaf.max(1) {
            return self.leaf(rows);
        }
        let Some((feature, threshold, split_gain)) = self.best_split(rows) else {
            return self.leaf(rows);
        };
        self.gain[feature] += split_gain;

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&i| self.x[(i, feature)] <= threshold);

        // reserve the split slot, then recurse
        let at = self.nodes.len();
        self.nodes.push(Node::Leaf { value: 0.0 });
        let left = self.build(&left_rows, depth + 1);
        let right = self.build(&right_rows, depth + 1);
        self.nodes[at] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        at
    }

    /// Second-order split search over a square-root-sized random feature
    /// subset. Returns None when no split improves on the parent.
    fn best_split(&mut self, rows: &[usize]) -> Option<(usize, f64, f64)> {
        let n_features = self.x.ncols();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(self.rng);
        let take = ((n_features as f64).sqrt().ceil() as usize).clamp(1, n_features);
        features.truncate(take);

        let lambda = self.params.lambda;
        let min_leaf = self.params.min_leaf.max(1);
        let total_g: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let total_h: f64 = rows.iter().map(|&i| self.hess[i]).sum();
        let parent = total_g * total_g / (total_h + lambda);

        let mut best: Option<(usize, f64, f64)> = None;
        for &feature in &features {
            let mut ordered: Vec<usize> = rows.to_vec();
            ordered.sort_by(|&a, &b| self.x[(a, feature)].total_cmp(&self.x[(b, feature)]));

            let mut left_g = 0.0;
            let mut left_h = 0.0;
            for split_at in 1..ordered.len() {
                let prev = ordered[split_at - 1];
                left_g += self.grad[prev];
                left_h += self.hess[prev];

                let lo = self.x[(prev, feature)];
                let hi = self.x[(ordered[split_at], feature)];
                if lo == hi || split_at < min_leaf || ordered.len() - split_at < min_leaf {
                    continue;
                }
                let right_g = total_g - left_g;
                let right_h = total_h - left_h;
                let gain = left_g * left_g / (left_h + lambda)
                    + right_g * right_g / (right_h + lambda)
                    - parent;
                if gain > best.map_or(1e-12, |(_, _, g)| g) {
                    best = Some((feature, (lo + hi) / 2.0, gain));
                }
            }
        }
        best
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Gradient-boosted regression trees on the logistic objective.
#[derive(Debug)]
pub struct GbdtClassifier {
    trees: Vec<Tree>,
    base_margin: f64,
    learning_rate: f64,
    gain: Vec<f64>,
}

impl GbdtClassifier {
    fn fit(x: &Array2<f64>, y: &[bool], params: &GbdtParams, rng: &mut StdRng) -> Self {
        let n = x.nrows();
        let positives = y.iter().filter(|&&b| b).count() as f64;
        let rate = (positives / n as f64).clamp(1e-6, 1.0 - 1e-6);
        let base_margin = (rate / (1.0 - rate)).ln();

        let mut margins = vec![base_margin; n];
        let mut gain = vec![0.0; x.ncols()];
        let mut trees = Vec::with_capacity(params.n_trees);
        let mut all_rows: Vec<usize> = (0..n).collect();
        let sample = (((n as f64) * params.subsample).round() as usize).clamp(1, n);

        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        for _ in 0..params.n_trees {
            for i in 0..n {
                let p = sigmoid(margins[i]);
                grad[i] = f64::from(u8::from(y[i])) - p;
                hess[i] = p * (1.0 - p);
            }
            all_rows.shuffle(rng);
            let rows = all_rows[..sample].to_vec();

            let mut builder = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                params,
                nodes: Vec::new(),
                gain: &mut gain,
                rng,
            };
            builder.build(&rows, 0);
            let tree = Tree {
                nodes: builder.nodes,
            };

            for i in 0..n {
                margins[i] += params.learning_rate * tree.predict(x.row(i));
            }
            trees.push(tree);
        }

        GbdtClassifier {
            trees,
            base_margin,
            learning_rate: params.learning_rate,
            gain,
        }
    }

    /// Positive-class probability per row of an already-scaled matrix.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                let boost: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
                sigmoid(self.base_margin + self.learning_rate * boost)
            })
            .collect()
    }

    /// Total split gain per feature, normalized to sum to 1.
    pub fn importances(&self) -> Vec<f64> {
        let total: f64 = self.gain.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.gain.len()];
        }
        self.gain.iter().map(|g| g / total).collect()
    }
}

/// The fitted model together with the exact scaler it was trained against.
/// Probabilities are only reachable through the pair, so a scaler can never be
/// mismatched with a model from a different fitting run.
#[derive(Debug)]
pub struct ModelBundle {
    scaler: Scaler,
    model: GbdtClassifier,
}

impl ModelBundle {
    /// Applies the training-time scaling and scores each raw feature row.
    pub fn probabilities(&self, x_raw: &Array2<f64>) -> Vec<f64> {
        self.model.predict_proba(&self.scaler.transform(x_raw))
    }
}

/// Diagnostic output of a training run; nothing downstream consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub importances: Vec<(String, f64)>,
}

/// Stratified index split preserving the class ratio on both sides. Classes
/// with a single member stay entirely in the training partition.
fn stratified_split(y: &[bool], train_fraction: f64, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let mut train = Vec::new();
    let mut test = Vec::new();
    for class in [true, false] {
        let mut idx: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        idx.shuffle(rng);
        let cut = if idx.len() < 2 {
            idx.len()
        } else {
            (((idx.len() as f64) * train_fraction).round() as usize).clamp(1, idx.len() - 1)
        };
        train.extend_from_slice(&idx[..cut]);
        test.extend_from_slice(&idx[cut..]);
    }
    (train, test)
}

/// SMOTE-style oversampling: interpolates synthetic positives between minority
/// rows and their nearest minority neighbors until the classes balance.
/// Returns None when fewer than two minority rows exist to interpolate.
fn smote_oversample(
    x: &Array2<f64>,
    y: &[bool],
    neighbors: usize,
    rng: &mut StdRng,
) -> Option<(Array2<f64>, Vec<bool>)> {
    let minority: Vec<usize> = (0..y.len()).filter(|&i| y[i]).collect();
    let majority = y.len() - minority.len();
    if minority.len() < 2 {
        return None;
    }
    let needed = majority.saturating_sub(minority.len());

    // k nearest minority neighbors per minority row, by Euclidean distance
    let k = neighbors.clamp(1, minority.len() - 1);
    let neighbor_lists: Vec<Vec<usize>> = minority
        .iter()
        .map(|&i| {
            let mut others: Vec<(f64, usize)> = minority
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| {
                    let d: f64 = x
                        .row(i)
                        .iter()
                        .zip(x.row(j).iter())
                        .map(|(a, b)| (a - b).powi(2))
                        .sum();
                    (d, j)
                })
                .collect();
            others.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            others.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect();

    let p = x.ncols();
    let mut data: Vec<f64> = Vec::with_capacity((y.len() + needed) * p);
    for row in x.rows() {
        data.extend(row.iter());
    }
    for _ in 0..needed {
        let pick = rng.random_range(0..minority.len());
        let i = minority[pick];
        let j = neighbor_lists[pick][rng.random_range(0..neighbor_lists[pick].len())];
        let u: f64 = rng.random();
        for c in 0..p {
            let a = x[(i, c)];
            data.push(a + u * (x[(j, c)] - a));
        }
    }

    let mut labels = y.to_vec();
    labels.extend(std::iter::repeat(true).take(needed));
    let augmented = Array2::from_shape_vec((y.len() + needed, p), data).ok()?;
    Some((augmented, labels))
}

fn accuracy(probs: &[f64], y: &[bool]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let hits = probs
        .iter()
        .zip(y)
        .filter(|(p, &t)| (**p >= 0.5) == t)
        .count();
    hits as f64 / y.len() as f64
}

/// Precision, recall and F1 on the positive class.
fn positive_class_metrics(probs: &[f64], y: &[bool]) -> (f64, f64, f64) {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut missed = 0usize;
    for (p, &t) in probs.iter().zip(y) {
        match (*p >= 0.5, t) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => missed += 1,
            (false, false) => {}
        }
    }
    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        0.0
    };
    let recall = if tp + missed > 0 {
        tp as f64 / (tp + missed) as f64
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    (precision, recall, f1)
}

/// Fits the scaler on the full population, splits, rebalances the training
/// partition and trains the classifier. Returns the scaler/model bundle plus
/// the evaluation report.
pub fn train(
    x_raw: &Array2<f64>,
    y: &[bool],
    params: &GbdtParams,
) -> Result<(ModelBundle, TrainReport), PipelineError> {
    if x_raw.nrows() == 0 || y.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }
    let positives = y.iter().filter(|&&b| b).count();
    if positives == 0 || positives == y.len() {
        return Err(PipelineError::DegenerateLabels);
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let scaler = Scaler::fit(x_raw);
    let x = scaler.transform(x_raw);

    let (train_idx, test_idx) = stratified_split(y, params.train_fraction, &mut rng);
    let x_train = x.select(Axis(0), &train_idx);
    let y_train: Vec<bool> = train_idx.iter().map(|&i| y[i]).collect();
    let x_test = x.select(Axis(0), &test_idx);
    let y_test: Vec<bool> = test_idx.iter().map(|&i| y[i]).collect();

    // the test partition is never oversampled
    let model = match smote_oversample(&x_train, &y_train, params.smote_neighbors, &mut rng) {
        Some((x_fit, y_fit)) => {
            info!(
                "oversampled training partition from {} to {} rows",
                y_train.len(),
                y_fit.len()
            );
            GbdtClassifier::fit(&x_fit, &y_fit, params, &mut rng)
        }
        None => {
            warn!("too few minority rows for synthetic oversampling; training unbalanced");
            GbdtClassifier::fit(&x_train, &y_train, params, &mut rng)
        }
    };

    let train_probs = model.predict_proba(&x_train);
    let test_probs = model.predict_proba(&x_test);
    let (precision, recall, f1) = positive_class_metrics(&test_probs, &y_test);

    let mut importances: Vec<(String, f64)> = model
        .importances()
        .into_iter()
        .enumerate()
        .map(|(j, g)| {
            let name = FEATURE_NAMES
                .get(j)
                .map_or_else(|| format!("f{j}"), |s| (*s).to_string());
            (name, g)
        })
        .collect();
    importances.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let report = TrainReport {
        train_accuracy: accuracy(&train_probs, &y_train),
        test_accuracy: accuracy(&test_probs, &y_test),
        precision,
        recall,
        f1,
        importances,
    };
    Ok((ModelBundle { scaler, model }, report))
}
