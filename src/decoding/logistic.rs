//! L2-regularised logistic regression fitted by Newton's method (IRLS).
//!
//! Binary problems use one model; more classes use one-vs-rest and pick the
//! highest decision value. The intercept is not penalised.
use nalgebra::{DMatrix, DVector};
use ndarray::ArrayView2;

use crate::error::{Error, Result};

use super::classifier::{argmax, check_fit_input, group_by_class, not_fitted, Classifier};

const MAX_ITER: usize = 100;
const TOL: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    c: f64,
    classes: Vec<usize>,
    /// One weight vector per model, intercept last.
    weights: Vec<DVector<f64>>,
}

impl LogisticRegression {
    pub fn new(c: f64) -> Self {
        Self { c, classes: Vec::new(), weights: Vec::new() }
    }
}

/// `[x | 1]` design matrix.
fn design(x: &ArrayView2<f64>) -> DMatrix<f64> {
    let (n, p) = x.dim();
    DMatrix::from_fn(n, p + 1, |i, j| if j < p { x[[i, j]] } else { 1.0 })
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Newton iterations on `sum log(1 + exp(-y f)) + lambda/2 |w|^2`, `t ∈ {0, 1}`.
fn fit_binary(a: &DMatrix<f64>, t: &[f64], lambda: f64) -> Result<DVector<f64>> {
    let (n, d) = a.shape();
    let mut w = DVector::zeros(d);
    let mut penalty = DMatrix::identity(d, d) * lambda;
    penalty[(d - 1, d - 1)] = 1e-10;

    for _ in 0..MAX_ITER {
        let f = a * &w;
        let mut grad_scale = DVector::zeros(n);
        let mut weighted = a.clone();
        for i in 0..n {
            let p = sigmoid(f[i]);
            grad_scale[i] = p - t[i];
            let wi = (p * (1.0 - p)).max(1e-12);
            weighted.row_mut(i).scale_mut(wi);
        }
        let mut grad = a.transpose() * grad_scale;
        let mut pen_w = &penalty * &w;
        pen_w[d - 1] = 0.0;
        grad += pen_w;
        let hessian = a.transpose() * weighted + &penalty;

        let step = hessian
            .lu()
            .solve(&grad)
            .ok_or_else(|| Error::Numerical("singular logistic Hessian".into()))?;
        w -= &step;
        if step.amax() < TOL {
            break;
        }
    }
    Ok(w)
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        check_fit_input(&x, y)?;
        let groups = group_by_class(y);
        if groups.len() < 2 {
            return Err(Error::Numerical("logistic regression needs 2 classes".into()));
        }
        let a = design(&x);
        let lambda = 1.0 / self.c;
        self.classes = groups.iter().map(|(c, _)| *c).collect();

        let positives: Vec<usize> = if self.classes.len() == 2 {
            vec![self.classes[1]]
        } else {
            self.classes.clone()
        };
        self.weights = positives
            .iter()
            .map(|&pos| {
                let t: Vec<f64> = y.iter().map(|&l| if l == pos { 1.0 } else { 0.0 }).collect();
                fit_binary(&a, &t, lambda)
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        if self.weights.is_empty() {
            return Err(not_fitted());
        }
        let a = design(&x);
        Ok((0..a.nrows())
            .map(|i| {
                let scores: Vec<f64> = self.weights.iter().map(|w| a.row(i).dot(&w.transpose())).collect();
                if self.weights.len() == 1 {
                    if scores[0] > 0.0 { self.classes[1] } else { self.classes[0] }
                } else {
                    self.classes[argmax(&scores)]
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn binary_threshold() {
        let x = array![[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]];
        let mut lr = LogisticRegression::new(1.0);
        lr.fit(x.view(), &[0, 0, 0, 1, 1, 1]).unwrap();
        assert_eq!(lr.predict(array![[-0.8], [0.8]].view()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn three_classes_one_vs_rest() {
        let x = array![[0.0, 0.0], [0.2, 0.1], [5.0, 0.0], [5.1, 0.2], [0.0, 5.0], [0.1, 5.2]];
        let mut lr = LogisticRegression::new(10.0);
        lr.fit(x.view(), &[0, 0, 1, 1, 2, 2]).unwrap();
        assert_eq!(
            lr.predict(array![[0.1, 0.1], [5.0, 0.1], [0.1, 5.0]].view()).unwrap(),
            vec![0, 1, 2]
        );
    }
}
