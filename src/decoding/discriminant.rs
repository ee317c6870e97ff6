//! Linear and quadratic discriminant analysis.
//!
//! LDA uses one pooled within-class covariance and uniform class priors.
//! QDA fits one covariance per class and uses the empirical priors.
//! Singular covariances are handled through the SVD pseudo-inverse, and the
//! log-determinant only counts the non-null singular values.
use nalgebra::{DMatrix, DVector};
use ndarray::ArrayView2;

use crate::error::{Error, Result};

use super::classifier::{argmax, check_fit_input, group_by_class, not_fitted, Classifier};

const SVD_EPS: f64 = 1e-12;

pub(crate) fn row_vector(x: &ArrayView2<f64>, i: usize) -> DVector<f64> {
    DVector::from_iterator(x.ncols(), x.row(i).iter().copied())
}

fn class_mean(x: &ArrayView2<f64>, rows: &[usize]) -> DVector<f64> {
    let mut mean = DVector::zeros(x.ncols());
    for &i in rows {
        mean += row_vector(x, i);
    }
    mean / rows.len() as f64
}

/// Sum of outer products of the centred rows (un-normalised scatter).
fn scatter(x: &ArrayView2<f64>, rows: &[usize], mean: &DVector<f64>) -> DMatrix<f64> {
    let p = x.ncols();
    let mut s = DMatrix::zeros(p, p);
    for &i in rows {
        let d = row_vector(x, i) - mean;
        s += &d * d.transpose();
    }
    s
}

fn pseudo_inverse(m: DMatrix<f64>) -> Result<(DMatrix<f64>, f64)> {
    let svd = m.svd(true, true);
    let tol = SVD_EPS * svd.singular_values.max().max(1.0);
    let log_det = svd
        .singular_values
        .iter()
        .filter(|&&s| s > tol)
        .map(|s| s.ln())
        .sum();
    let inv = svd.pseudo_inverse(tol).map_err(|e| Error::Numerical(e.to_string()))?;
    Ok((inv, log_det))
}

#[derive(Debug, Clone, Default)]
pub struct Lda {
    classes: Vec<usize>,
    coef: Vec<DVector<f64>>,
    intercept: Vec<f64>,
}

impl Classifier for Lda {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        check_fit_input(&x, y)?;
        let groups = group_by_class(y);
        let n_classes = groups.len();
        let p = x.ncols();

        let means: Vec<DVector<f64>> = groups.iter().map(|(_, rows)| class_mean(&x, rows)).collect();
        let mut pooled = DMatrix::zeros(p, p);
        for ((_, rows), mean) in groups.iter().zip(&means) {
            pooled += scatter(&x, rows, mean);
        }
        let dof = if y.len() > n_classes { y.len() - n_classes } else { y.len() };
        let (precision, _) = pseudo_inverse(pooled / dof as f64)?;

        let log_prior = (1.0 / n_classes as f64).ln();
        self.coef = means.iter().map(|m| &precision * m).collect();
        self.intercept = means
            .iter()
            .zip(&self.coef)
            .map(|(m, w)| -0.5 * m.dot(w) + log_prior)
            .collect();
        self.classes = groups.into_iter().map(|(c, _)| c).collect();
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        if self.classes.is_empty() {
            return Err(not_fitted());
        }
        Ok((0..x.nrows())
            .map(|i| {
                let xi = row_vector(&x, i);
                let scores: Vec<f64> = self
                    .coef
                    .iter()
                    .zip(&self.intercept)
                    .map(|(w, b)| xi.dot(w) + b)
                    .collect();
                self.classes[argmax(&scores)]
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
struct QdaClass {
    label: usize,
    mean: DVector<f64>,
    precision: DMatrix<f64>,
    log_det: f64,
    log_prior: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Qda {
    classes: Vec<QdaClass>,
}

impl Classifier for Qda {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        check_fit_input(&x, y)?;
        let n = y.len() as f64;
        self.classes = group_by_class(y)
            .into_iter()
            .map(|(label, rows)| {
                let mean = class_mean(&x, &rows);
                let dof = rows.len().saturating_sub(1).max(1) as f64;
                let (precision, log_det) = pseudo_inverse(scatter(&x, &rows, &mean) / dof)?;
                Ok(QdaClass {
                    label,
                    mean,
                    precision,
                    log_det,
                    log_prior: (rows.len() as f64 / n).ln(),
                })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        if self.classes.is_empty() {
            return Err(not_fitted());
        }
        Ok((0..x.nrows())
            .map(|i| {
                let xi = row_vector(&x, i);
                let scores: Vec<f64> = self
                    .classes
                    .iter()
                    .map(|c| {
                        let d = &xi - &c.mean;
                        let maha = d.dot(&(&c.precision * &d));
                        -0.5 * c.log_det - 0.5 * maha + c.log_prior
                    })
                    .collect();
                self.classes[argmax(&scores)].label
            })
            .collect())
    }
}
