//! Linear SVM with squared hinge loss, solved by dual coordinate descent.
//!
//! The bias is learned as an extra constant feature. The coordinate order is
//! reshuffled every epoch from a seeded generator. More than two classes are
//! handled one-vs-rest.
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{invalid, Error, Result};

use super::classifier::{argmax, check_fit_input, group_by_class, not_fitted, Classifier};

const MAX_EPOCH: usize = 1000;
const TOL: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct LinearSvm {
    c: f64,
    random_state: u64,
    classes: Vec<usize>,
    /// One `(n_features + 1)` weight vector per model, bias last.
    weights: Vec<Array1<f64>>,
}

impl LinearSvm {
    pub fn new(c: f64, random_state: u64) -> Self {
        Self { c, random_state, classes: Vec::new(), weights: Vec::new() }
    }
}

fn augment(x: &ArrayView2<f64>) -> Array2<f64> {
    let mut a = Array2::ones((x.nrows(), x.ncols() + 1));
    a.slice_mut(ndarray::s![.., ..x.ncols()]).assign(x);
    a
}

/// Dual coordinate descent for `min_w 1/2 |w|^2 + C sum max(0, 1 - y w.x)^2`.
fn fit_binary(a: &Array2<f64>, sign: &[f64], c: f64, seed: u64) -> Array1<f64> {
    let n = a.nrows();
    let diag = 0.5 / c;
    let q: Vec<f64> = a.axis_iter(Axis(0)).map(|r| r.dot(&r) + diag).collect();
    let mut alpha = vec![0.0; n];
    let mut w = Array1::zeros(a.ncols());
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..MAX_EPOCH {
        order.shuffle(&mut rng);
        let (mut pg_max, mut pg_min) = (f64::NEG_INFINITY, f64::INFINITY);
        for &i in &order {
            let xi = a.row(i);
            let g = sign[i] * w.dot(&xi) - 1.0 + diag * alpha[i];
            let pg = if alpha[i] == 0.0 { g.min(0.0) } else { g };
            pg_max = pg_max.max(pg);
            pg_min = pg_min.min(pg);
            if pg != 0.0 {
                let old = alpha[i];
                alpha[i] = (old - g / q[i]).max(0.0);
                w.scaled_add((alpha[i] - old) * sign[i], &xi);
            }
        }
        if pg_max - pg_min < TOL {
            break;
        }
    }
    w
}

impl Classifier for LinearSvm {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        check_fit_input(&x, y)?;
        if !(self.c > 0.0) {
            invalid!("C must be positive, got {}", self.c);
        }
        let groups = group_by_class(y);
        if groups.len() < 2 {
            return Err(Error::Numerical("linear SVM needs 2 classes".into()));
        }
        self.classes = groups.iter().map(|(c, _)| *c).collect();
        let a = augment(&x);
        let positives: Vec<usize> = if self.classes.len() == 2 {
            vec![self.classes[1]]
        } else {
            self.classes.clone()
        };
        self.weights = positives
            .iter()
            .map(|&pos| {
                let sign: Vec<f64> = y.iter().map(|&l| if l == pos { 1.0 } else { -1.0 }).collect();
                fit_binary(&a, &sign, self.c, self.random_state)
            })
            .collect();
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        if self.weights.is_empty() {
            return Err(not_fitted());
        }
        let a = augment(&x);
        Ok(a.axis_iter(Axis(0))
            .map(|row| {
                let scores: Vec<f64> = self.weights.iter().map(|w| w.dot(&row)).collect();
                if self.weights.len() == 1 {
                    if scores[0] > 0.0 { self.classes[1] } else { self.classes[0] }
                } else {
                    self.classes[argmax(&scores)]
                }
            })
            .collect())
    }
}
