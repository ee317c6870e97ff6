//! Random forest of CART trees.
//!
//! Each tree is grown on a bootstrap sample with Gini impurity, trying
//! `max(1, floor(sqrt(p)))` random features per split and splitting at the
//! midpoint between consecutive distinct values. Trees are grown until the
//! leaves are pure. Tree `t` is seeded with `random_state + t`, so a fit is
//! reproducible whatever the thread count. Prediction averages the leaf
//! class frequencies over trees.
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::{invalid, Result};

use super::classifier::{argmax, check_fit_input, not_fitted, Classifier};

#[derive(Debug, Clone)]
enum Node {
    Split { feature: usize, threshold: f64, left: usize, right: usize },
    Leaf { proba: Vec<f64> },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn proba(&self, row: &[f64]) -> &[f64] {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Split { feature, threshold, left, right } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { proba } => return proba,
            }
        }
    }
}

fn class_counts(y: &[usize], rows: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &i in rows {
        counts[y[i]] += 1;
    }
    counts
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / t).powi(2)).sum::<f64>()
}

struct Best {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn best_split(
    x: &ArrayView2<f64>,
    y: &[usize],
    rows: &[usize],
    features: &[usize],
    n_classes: usize,
) -> Option<Best> {
    let mut best: Option<Best> = None;
    let n = rows.len();
    for &f in features {
        let mut sorted: Vec<usize> = rows.to_vec();
        sorted.sort_by(|&a, &b| x[[a, f]].total_cmp(&x[[b, f]]));

        let mut left = vec![0usize; n_classes];
        let mut right = class_counts(y, rows, n_classes);
        for k in 0..n - 1 {
            let i = sorted[k];
            left[y[i]] += 1;
            right[y[i]] -= 1;
            let (lo, hi) = (x[[i, f]], x[[sorted[k + 1], f]]);
            if lo == hi {
                continue;
            }
            let n_left = k + 1;
            let impurity = (n_left as f64 * gini(&left, n_left)
                + (n - n_left) as f64 * gini(&right, n - n_left))
                / n as f64;
            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                best = Some(Best { feature: f, threshold: 0.5 * (lo + hi), impurity });
            }
        }
    }
    best
}

fn grow(x: &ArrayView2<f64>, y: &[usize], n_classes: usize, max_features: usize, seed: u64) -> Tree {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = y.len();
    let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
    let mut all_features: Vec<usize> = (0..x.ncols()).collect();

    let mut nodes: Vec<Node> = Vec::new();
    // (node slot, rows reaching it)
    let mut stack = vec![(0usize, bootstrap)];
    nodes.push(Node::Leaf { proba: Vec::new() });

    while let Some((slot, rows)) = stack.pop() {
        let counts = class_counts(y, &rows, n_classes);
        let leaf = Node::Leaf {
            proba: counts.iter().map(|&c| c as f64 / rows.len() as f64).collect(),
        };
        if gini(&counts, rows.len()) == 0.0 {
            nodes[slot] = leaf;
            continue;
        }
        all_features.shuffle(&mut rng);
        let split = best_split(x, y, &rows, &all_features[..max_features], n_classes)
            .or_else(|| best_split(x, y, &rows, &all_features, n_classes));
        let Some(split) = split else {
            nodes[slot] = leaf;
            continue;
        };
        let (l, r): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&i| x[[i, split.feature]] <= split.threshold);

        let left = nodes.len();
        nodes.push(Node::Leaf { proba: Vec::new() });
        let right = nodes.len();
        nodes.push(Node::Leaf { proba: Vec::new() });
        nodes[slot] = Node::Split { feature: split.feature, threshold: split.threshold, left, right };
        stack.push((left, l));
        stack.push((right, r));
    }
    Tree { nodes }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    n_tree: usize,
    random_state: u64,
    n_classes: usize,
    trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(n_tree: usize, random_state: u64) -> Self {
        Self { n_tree, random_state, n_classes: 0, trees: Vec::new() }
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        check_fit_input(&x, y)?;
        if self.n_tree == 0 {
            invalid!("random forest needs at least one tree");
        }
        let n_classes = y.iter().max().map_or(0, |m| m + 1);
        let max_features = ((x.ncols() as f64).sqrt().floor() as usize).max(1);
        let seed = self.random_state;
        self.trees = (0..self.n_tree)
            .into_par_iter()
            .map(|t| grow(&x, y, n_classes, max_features, seed.wrapping_add(t as u64)))
            .collect();
        self.n_classes = n_classes;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        if self.trees.is_empty() {
            return Err(not_fitted());
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                let mut mean = vec![0.0; self.n_classes];
                for tree in &self.trees {
                    for (m, p) in mean.iter_mut().zip(tree.proba(&row)) {
                        *m += p;
                    }
                }
                argmax(&mean)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy() -> (ndarray::Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 1.0],
            [0.3, 0.8],
            [0.1, 1.2],
            [0.2, 0.9],
            [4.0, 1.1],
            [4.2, 0.7],
            [3.9, 1.0],
            [4.1, 1.3]
        ];
        (x, vec![0, 0, 0, 0, 1, 1, 1, 1])
    }

    #[test]
    fn separates_on_the_informative_feature() {
        let (x, y) = toy();
        let mut rf = RandomForest::new(25, 0);
        rf.fit(x.view(), &y).unwrap();
        assert_eq!(rf.predict(array![[0.1, 1.0], [4.0, 1.0]].view()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = toy();
        let q = array![[2.0, 1.0], [2.1, 0.8], [1.9, 1.2]];
        let mut a = RandomForest::new(10, 7);
        let mut b = RandomForest::new(10, 7);
        a.fit(x.view(), &y).unwrap();
        b.fit(x.view(), &y).unwrap();
        assert_eq!(a.predict(q.view()).unwrap(), b.predict(q.view()).unwrap());
    }

    #[test]
    fn pure_tree_is_a_single_leaf() {
        let x = array![[0.0], [1.0]];
        let tree = grow(&x.view(), &[1, 1], 2, 1, 0);
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.proba(&[0.5]), &[0.0, 1.0]);
    }
}
