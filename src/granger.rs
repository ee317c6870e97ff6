//! Single-trial covariance-based Granger causality for Gaussian variables.
//!
//! For two sources `x` and `y`, each embedded as `lag + 1` delayed copies of a
//! `dt`-sample window ending at `t0`, the Gaussian conditional entropies are
//! differences of log-determinants of sample covariances:
//!
//! ```text
//! H(Y_t | Y_past)         = ln|Σ(Y)|         − ln|Σ(Y_past)|
//! H(Y_t | Y_past, X_past) = ln|Σ(Y, X_past)| − ln|Σ(Y_past, X_past)|
//! H(X_t | X_past)         = ln|Σ(X)|         − ln|Σ(X_past)|
//! H(X_t | X_past, Y_past) = ln|Σ(X, Y_past)| − ln|Σ(X_past, Y_past)|
//! H(X_t, Y_t | past)      = ln|Σ(X, Y)|      − ln|Σ(X_past, Y_past)|
//!
//! GC(x → y) = H(Y_t | Y_past) − H(Y_t | Y_past, X_past)
//! GC(y → x) = H(X_t | X_past) − H(X_t | X_past, Y_past)
//! GC(x · y) = H(Y_t | ·) + H(X_t | ·) − H(X_t, Y_t | past)
//! ```
//!
//! The three terms sum to the total Granger interdependence.
//!
//! Reference: Brovelli et al. (2005), NeuroImage 28, 154–164;
//! Brovelli et al. (2015).
//!
//! A covariance whose determinant is not positive does not abort the
//! computation: its logarithm is taken in the complex plane, the causality
//! value is reduced to its magnitude, and any infinite or NaN magnitude is
//! reported as `0`.
use nalgebra::DMatrix;
use ndarray::{concatenate, s, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_stats::CorrelationExt;
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{invalid, Error, Result};
use crate::pairs::{get_pairs, Part};

/// Output of [`covgc_time`].
#[derive(Debug, Clone)]
pub struct GcOutput {
    /// `(n_pairs, 3)`: `pairs[:,0] → pairs[:,1]`, `pairs[:,1] → pairs[:,0]`,
    /// instantaneous.
    pub gc: Array2<f64>,
    /// `(n_pairs, 2)` source indices, upper-triangle order.
    pub pairs: Array2<usize>,
}

/// Granger causality between every pair of sources of `x` (`[sources, samples]`).
///
/// `dt` is the window length in samples, `lag` the model order and `t0` the
/// (exclusive) end of the most recent window.
pub fn covgc_time(x: &Array2<f64>, dt: usize, lag: usize, t0: usize) -> Result<GcOutput> {
    let (n_so, n_ti) = x.dim();
    if n_so < 2 {
        invalid!("need at least 2 sources, got {n_so}");
    }
    if dt < 2 {
        invalid!("window dt must span at least 2 samples, got {dt}");
    }
    if t0 > n_ti {
        invalid!("t0 = {t0} is past the last sample ({n_ti})");
    }
    if t0 < dt + lag {
        invalid!("t0 = {t0} leaves no room for a {dt}-sample window at lag {lag}");
    }

    info!(
        dt,
        lag,
        t0,
        n_sources = n_so,
        "single-trial Granger causality"
    );

    let pairs = get_pairs(n_so, Part::Upper);
    let n_pairs = pairs.len();
    let embeddings: Vec<Array2<f64>> = x
        .rows()
        .into_iter()
        .map(|row| embed(row, dt, lag, t0))
        .collect();

    let rows: Vec<[f64; 3]> = pairs
        .iter()
        .enumerate()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(i_p, (s0, s1))| {
            debug!(pair = i_p, n_pairs, s0, s1, "computing pair");
            pair_gc(embeddings[s0].view(), embeddings[s1].view())
        })
        .collect::<Result<_>>()?;

    let mut gc = Array2::<f64>::zeros((n_pairs, 3));
    for (mut out, vals) in gc.rows_mut().into_iter().zip(&rows) {
        for (o, &v) in out.iter_mut().zip(vals) {
            *o = v;
        }
    }
    Ok(GcOutput { gc, pairs: pairs.to_array() })
}

/// `(lag + 1, dt)` delay embedding; row `k` holds `x[t0 - dt - k .. t0 - k]`.
fn embed(x: ArrayView1<f64>, dt: usize, lag: usize, t0: usize) -> Array2<f64> {
    Array2::from_shape_fn((lag + 1, dt), |(k, t)| x[t0 - dt - k + t])
}

fn pair_gc(x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<[f64; 3]> {
    let x_past = x.slice(s![1.., ..]);
    let y_past = y.slice(s![1.., ..]);

    fn stack(a: &ArrayView2<f64>, b: &ArrayView2<f64>) -> Result<Array2<f64>> {
        concatenate(Axis(0), &[a.view(), b.view()]).map_err(|e| Error::Numerical(e.to_string()))
    }

    // h_ycy : H(Y_i+1|Y_i) = H(Y_i+1) - H(Y_i)
    let h_ycy = log_det_cov(y)? - log_det_cov(y_past)?;
    // h_ycx : H(Y_i+1|X_i,Y_i) = H(Y_i+1,X_i,Y_i) - H(X_i,Y_i)
    let ln_yxi = log_det_cov(stack(&y_past, &x_past)?.view())?;
    let h_ycx = log_det_cov(stack(&y, &x_past)?.view())? - ln_yxi;
    // h_xcx : H(X_i+1|X_i) = H(X_i+1) - H(X_i)
    let h_xcx = log_det_cov(x)? - log_det_cov(x_past)?;
    // h_xcy : H(X_i+1|X_i,Y_i) = H(X_i+1,X_i,Y_i) - H(X_i,Y_i)
    let h_xcy = log_det_cov(stack(&x, &y_past)?.view())? - ln_yxi;
    // h_xxcyy : H(X_i+1,Y_i+1|X_i,Y_i) = H(X_i+1,Y_i+1,X_i,Y_i) - H(X_i,Y_i)
    let h_xxcyy = log_det_cov(stack(&x, &y)?.view())? - ln_yxi;

    Ok([
        finite_magnitude(h_ycy - h_ycx),
        finite_magnitude(h_xcx - h_xcy),
        finite_magnitude(h_ycx + h_xcy - h_xxcyy),
    ])
}

/// `ln det cov(rows)` with observations along columns and `ddof = 1`.
fn log_det_cov(rows: ArrayView2<f64>) -> Result<Complex64> {
    let cov = rows.cov(1.0).map_err(|e| Error::Numerical(e.to_string()))?;
    let n = cov.nrows();
    let det = DMatrix::from_fn(n, n, |i, j| cov[[i, j]]).determinant();
    Ok(complex_log(det))
}

/// Real logarithm for positive input, principal complex logarithm otherwise.
pub fn complex_log(v: f64) -> Complex64 {
    if v > 0.0 {
        Complex64::new(v.ln(), 0.0)
    } else {
        Complex64::new(v, 0.0).ln()
    }
}

fn finite_magnitude(z: Complex64) -> f64 {
    let m = z.norm();
    if m.is_finite() { m } else { 0.0 }
}

/// Dense N×N views of a [`GcOutput`].
#[derive(Debug, Clone)]
pub struct GcMatrices {
    /// `directed[[i, j]]` is the causality from source `i` to source `j`.
    pub directed: Array2<f64>,
    /// Symmetric instantaneous causality.
    pub instantaneous: Array2<f64>,
}

/// Scatter the per-pair rows of `out` into `n_sources × n_sources` matrices.
pub fn gc_to_matrix(out: &GcOutput, n_sources: usize) -> Result<GcMatrices> {
    if out.gc.nrows() != out.pairs.nrows() || out.gc.ncols() != 3 {
        invalid!("gc {:?} and pairs {:?} disagree", out.gc.dim(), out.pairs.dim());
    }
    let mut directed = Array2::<f64>::zeros((n_sources, n_sources));
    let mut instantaneous = Array2::<f64>::zeros((n_sources, n_sources));
    for (p, row) in out.gc.rows().into_iter().enumerate() {
        let (s0, s1) = (out.pairs[[p, 0]], out.pairs[[p, 1]]);
        if s0 >= n_sources || s1 >= n_sources {
            invalid!("pair ({s0}, {s1}) out of range for {n_sources} sources");
        }
        directed[[s0, s1]] = row[0];
        directed[[s1, s0]] = row[1];
        instantaneous[[s0, s1]] = row[2];
        instantaneous[[s1, s0]] = row[2];
    }
    Ok(GcMatrices { directed, instantaneous })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn embedding_rows_are_delayed_windows() {
        let x = Array1::from_iter((0..20).map(|v| v as f64));
        let e = embed(x.view(), 4, 2, 10);
        assert_eq!(e.row(0).to_vec(), vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(e.row(2).to_vec(), vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn complex_log_branches() {
        assert_eq!(complex_log(1.0), Complex64::new(0.0, 0.0));
        let neg = complex_log(-1.0);
        approx::assert_abs_diff_eq!(neg.re, 0.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(neg.im, std::f64::consts::PI, epsilon = 1e-12);
        assert!(complex_log(0.0).re.is_infinite());
    }

    #[test]
    fn non_finite_magnitude_is_zero() {
        assert_eq!(finite_magnitude(Complex64::new(f64::NAN, 0.0)), 0.0);
        assert_eq!(finite_magnitude(Complex64::new(f64::NEG_INFINITY, 1.0)), 0.0);
        assert_eq!(finite_magnitude(Complex64::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn window_parameters_are_validated() {
        let x = Array2::<f64>::zeros((3, 100));
        assert!(covgc_time(&x, 1, 2, 50).is_err());
        assert!(covgc_time(&x, 10, 2, 101).is_err());
        assert!(covgc_time(&x, 50, 5, 54).is_err());
        assert!(covgc_time(&Array2::zeros((1, 100)), 10, 2, 50).is_err());
    }

    #[test]
    fn noisy_pair_is_finite_and_mirrors() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(3);
        let x = Array1::from_shape_fn(64, |_| rng.gen_range(-1.0..1.0));
        let y = Array1::from_shape_fn(64, |_| rng.gen_range(-1.0..1.0));
        let ex = embed(x.view(), 40, 2, 60);
        let ey = embed(y.view(), 40, 2, 60);
        let gc = pair_gc(ex.view(), ey.view()).unwrap();
        assert!(gc.iter().all(|v| v.is_finite() && *v >= 0.0));
        // Swapping the sources swaps the two directed terms.
        let back = pair_gc(ey.view(), ex.view()).unwrap();
        approx::assert_abs_diff_eq!(gc[0], back[1], epsilon = 1e-9);
        approx::assert_abs_diff_eq!(gc[1], back[0], epsilon = 1e-9);
        approx::assert_abs_diff_eq!(gc[2], back[2], epsilon = 1e-9);
    }

    #[test]
    fn constant_signals_give_zero() {
        // Every covariance is singular: log 0 = -inf, differences are NaN.
        let x = Array2::from_elem((3, 100), 2.5);
        let out = covgc_time(&x, 20, 2, 60).unwrap();
        assert_eq!(out.gc.dim(), (3, 3));
        assert!(out.gc.iter().all(|&v| v == 0.0));
    }
}
