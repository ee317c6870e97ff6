//! Gaussian naive Bayes.
use ndarray::ArrayView2;

use crate::error::Result;

use super::classifier::{argmax, check_fit_input, group_by_class, not_fitted, Classifier};

/// Fraction of the largest feature variance added to every class variance.
const VAR_SMOOTHING: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
pub struct GaussianNb {
    classes: Vec<usize>,
    means: Vec<Vec<f64>>,
    vars: Vec<Vec<f64>>,
    log_priors: Vec<f64>,
}

fn mean_var(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count() as f64;
    let mean = values.clone().sum::<f64>() / n;
    let var = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var)
}

impl Classifier for GaussianNb {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        check_fit_input(&x, y)?;
        let p = x.ncols();
        let max_var = (0..p)
            .map(|f| mean_var(x.column(f).iter().copied()).1)
            .fold(0.0_f64, f64::max);
        let epsilon = if max_var > 0.0 { VAR_SMOOTHING * max_var } else { VAR_SMOOTHING };

        let groups = group_by_class(y);
        let n = y.len() as f64;
        self.classes.clear();
        self.means.clear();
        self.vars.clear();
        self.log_priors.clear();
        for (label, rows) in groups {
            let (means, vars): (Vec<f64>, Vec<f64>) = (0..p)
                .map(|f| {
                    let (m, v) = mean_var(rows.iter().map(|&i| x[[i, f]]));
                    (m, v + epsilon)
                })
                .unzip();
            self.classes.push(label);
            self.means.push(means);
            self.vars.push(vars);
            self.log_priors.push((rows.len() as f64 / n).ln());
        }
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        if self.classes.is_empty() {
            return Err(not_fitted());
        }
        let two_pi = 2.0 * std::f64::consts::PI;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let scores: Vec<f64> = (0..self.classes.len())
                    .map(|k| {
                        let ll: f64 = row
                            .iter()
                            .zip(&self.means[k])
                            .zip(&self.vars[k])
                            .map(|((&v, m), var)| {
                                -0.5 * (two_pi * var).ln() - 0.5 * (v - m).powi(2) / var
                            })
                            .sum();
                        self.log_priors[k] + ll
                    })
                    .collect();
                self.classes[argmax(&scores)]
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn separates_by_mean() {
        let x = array![[0.0], [0.5], [-0.5], [10.0], [10.5], [9.5]];
        let mut nb = GaussianNb::default();
        nb.fit(x.view(), &[0, 0, 0, 1, 1, 1]).unwrap();
        assert_eq!(nb.predict(array![[1.0], [8.0]].view()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn constant_features_do_not_divide_by_zero() {
        let x = array![[1.0], [1.0], [1.0], [1.0]];
        let mut nb = GaussianNb::default();
        nb.fit(x.view(), &[0, 0, 1, 1]).unwrap();
        let pred = nb.predict(array![[1.0]].view()).unwrap();
        assert_eq!(pred, vec![0]);
    }
}
