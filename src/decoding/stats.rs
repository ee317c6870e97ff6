//! Significance of decoding accuracies.
//!
//! * [`binomial_pvalue`]: tail probability of reaching an accuracy by chance
//!   under a binomial model with success rate `1 / n_classes`.
//! * [`chance_threshold`]: the smallest accuracy significant at a level `p`.
//! * [`perm_pvalue`]: p-value against a permutation null distribution.
use ndarray::{Array, Array2, ArrayView1, ArrayView2, Dimension};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use statrs::distribution::{Binomial, DiscreteCDF};

use crate::error::{invalid, Error, Result};

use super::classifier::group_by_class;

fn chance_model(n_trials: usize, n_classes: usize) -> Result<Binomial> {
    if n_trials == 0 {
        invalid!("binomial test needs at least one trial");
    }
    if n_classes < 2 {
        invalid!("binomial test needs at least 2 classes, got {n_classes}");
    }
    Binomial::new(1.0 / n_classes as f64, n_trials as u64)
        .map_err(|e| Error::InvalidArgument(e.to_string()))
}

/// `1 - BinomCDF(floor(n * da / 100); n, 1 / n_classes)` for every accuracy.
///
/// `da` is in percent; the output has the shape of `da`.
pub fn binomial_pvalue<D: Dimension>(
    n_trials: usize,
    n_classes: usize,
    da: &Array<f64, D>,
) -> Result<Array<f64, D>> {
    let model = chance_model(n_trials, n_classes)?;
    let n = n_trials as f64;
    Ok(da.mapv(|acc| {
        let k = (n * acc / 100.0).floor();
        if k < 0.0 {
            1.0
        } else {
            1.0 - model.cdf(k as u64)
        }
    }))
}

/// Decoding accuracy (percent) needed to reach significance level `p`.
pub fn chance_threshold(n_trials: usize, n_classes: usize, p: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        invalid!("significance level must lie in (0, 1), got {p}");
    }
    let model = chance_model(n_trials, n_classes)?;
    let k = (0..=n_trials as u64)
        .find(|&k| model.cdf(k) >= 1.0 - p)
        .unwrap_or(n_trials as u64);
    Ok(k as f64 * 100.0 / n_trials as f64)
}

/// `(#{null >= da} + 1) / (n_perm + 1)` per dataset.
///
/// `da` holds one accuracy per dataset (usually averaged over repetitions)
/// and `null` is `(n_datasets, n_perm)`. The result is `(n_datasets, 1)`.
pub fn perm_pvalue(da: ArrayView1<f64>, null: ArrayView2<f64>) -> Result<Array2<f64>> {
    if da.len() != null.nrows() {
        invalid!("{} accuracies for {} null distributions", da.len(), null.nrows());
    }
    let n_perm = null.ncols() as f64;
    Ok(Array2::from_shape_fn((da.len(), 1), |(d, _)| {
        let exceed = null.row(d).iter().filter(|&&v| v >= da[d]).count() as f64;
        (exceed + 1.0) / (n_perm + 1.0)
    }))
}

/// Copy of `x` where each column is shuffled among the trials of each class.
pub(crate) fn shuffle_within_classes(x: ArrayView2<f64>, y: &[usize], rng: &mut StdRng) -> Array2<f64> {
    let mut out = x.to_owned();
    let groups = group_by_class(y);
    for col in 0..x.ncols() {
        for (_, rows) in &groups {
            let mut from = rows.clone();
            from.shuffle(rng);
            for (&dst, &src) in rows.iter().zip(&from) {
                out[[dst, col]] = x[[src, col]];
            }
        }
    }
    out
}

/// Copy of `x` with its trial rows in a random order.
pub(crate) fn shuffle_rows(x: ArrayView2<f64>, rng: &mut StdRng) -> Array2<f64> {
    let mut order: Vec<usize> = (0..x.nrows()).collect();
    order.shuffle(rng);
    x.select(ndarray::Axis(0), &order)
}
