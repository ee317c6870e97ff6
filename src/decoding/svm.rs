//! Kernel support vector classifiers (C-SVC and ν-SVC).
//!
//! Both formulations are solved with SMO on the full kernel matrix, picking
//! the maximal violating pair at each step. ν-SVC selects its pair inside one
//! label sign so that both equality constraints hold, and its solution is
//! rescaled by `1/r` afterwards. Multiclass problems are split one-vs-one and
//! decided by vote, ties going to the smallest class.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{invalid, Error, Result};

use super::classifier::{argmax, check_fit_input, group_by_class, not_fitted, Classifier, Kernel};

const EPS: f64 = 1e-3;
const TAU: f64 = 1e-12;
const POLY_DEGREE: i32 = 3;
const COEF0: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Formulation {
    /// Box constraint `C > 0`.
    C(f64),
    /// `ν ∈ (0, 1]`, a lower bound on the fraction of support vectors.
    Nu(f64),
}

impl Kernel {
    pub(crate) fn eval(self, a: ArrayView1<f64>, b: ArrayView1<f64>, gamma: f64) -> f64 {
        match self {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf => {
                let d: f64 = a.iter().zip(b.iter()).map(|(u, v)| (u - v) * (u - v)).sum();
                (-gamma * d).exp()
            }
            Kernel::Poly => (gamma * a.dot(&b) + COEF0).powi(POLY_DEGREE),
            Kernel::Sigmoid => (gamma * a.dot(&b) + COEF0).tanh(),
        }
    }
}

/// SMO state for `min 1/2 a'Qa + p'a` s.t. `y'a = const`, `0 <= a <= upper`.
struct Smo<'a> {
    q: &'a Array2<f64>,
    y: &'a [f64],
    upper: f64,
    alpha: Vec<f64>,
    grad: Vec<f64>,
}

impl<'a> Smo<'a> {
    fn new(q: &'a Array2<f64>, y: &'a [f64], p: &[f64], alpha: Vec<f64>, upper: f64) -> Self {
        let n = y.len();
        let mut grad = p.to_vec();
        for j in 0..n {
            if alpha[j] != 0.0 {
                for k in 0..n {
                    grad[k] += q[[k, j]] * alpha[j];
                }
            }
        }
        Self { q, y, upper, alpha, grad }
    }

    fn at_upper(&self, t: usize) -> bool {
        self.alpha[t] >= self.upper
    }

    fn at_lower(&self, t: usize) -> bool {
        self.alpha[t] <= 0.0
    }

    fn in_up(&self, t: usize) -> bool {
        if self.y[t] > 0.0 { !self.at_upper(t) } else { !self.at_lower(t) }
    }

    fn in_low(&self, t: usize) -> bool {
        if self.y[t] > 0.0 { !self.at_lower(t) } else { !self.at_upper(t) }
    }

    /// Maximal violating pair among the indices accepted by `keep`, with its gap.
    fn violating_pair(&self, keep: impl Fn(usize) -> bool) -> Option<(usize, usize, f64)> {
        let mut up: Option<(usize, f64)> = None;
        let mut low: Option<(usize, f64)> = None;
        for t in (0..self.y.len()).filter(|&t| keep(t)) {
            let v = -self.y[t] * self.grad[t];
            if self.in_up(t) && up.map_or(true, |(_, m)| v > m) {
                up = Some((t, v));
            }
            if self.in_low(t) && low.map_or(true, |(_, m)| v < m) {
                low = Some((t, v));
            }
        }
        match (up, low) {
            (Some((i, a)), Some((j, b))) => Some((i, j, a - b)),
            _ => None,
        }
    }

    fn select(&self, same_sign: bool) -> Option<(usize, usize)> {
        let best = if same_sign {
            let pos = self.violating_pair(|t| self.y[t] > 0.0);
            let neg = self.violating_pair(|t| self.y[t] < 0.0);
            match (pos, neg) {
                (Some(p), Some(n)) => Some(if p.2 >= n.2 { p } else { n }),
                (p, n) => p.or(n),
            }
        } else {
            self.violating_pair(|_| true)
        };
        best.filter(|&(_, _, gap)| gap >= EPS).map(|(i, j, _)| (i, j))
    }

    /// Analytic two-variable step, clipped to the box.
    fn update(&mut self, i: usize, j: usize) {
        let (q, c) = (self.q, self.upper);
        let (old_i, old_j) = (self.alpha[i], self.alpha[j]);
        let (mut ai, mut aj) = (old_i, old_j);

        if self.y[i] != self.y[j] {
            let mut quad = q[[i, i]] + q[[j, j]] + 2.0 * q[[i, j]];
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (-self.grad[i] - self.grad[j]) / quad;
            let diff = ai - aj;
            ai += delta;
            aj += delta;
            if diff > 0.0 {
                if aj < 0.0 {
                    aj = 0.0;
                    ai = diff;
                }
            } else if ai < 0.0 {
                ai = 0.0;
                aj = -diff;
            }
            if diff > 0.0 {
                if ai > c {
                    ai = c;
                    aj = c - diff;
                }
            } else if aj > c {
                aj = c;
                ai = c + diff;
            }
        } else {
            let mut quad = q[[i, i]] + q[[j, j]] - 2.0 * q[[i, j]];
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (self.grad[i] - self.grad[j]) / quad;
            let sum = ai + aj;
            ai -= delta;
            aj += delta;
            if sum > c {
                if ai > c {
                    ai = c;
                    aj = sum - c;
                }
            } else if aj < 0.0 {
                aj = 0.0;
                ai = sum;
            }
            if sum > c {
                if aj > c {
                    aj = c;
                    ai = sum - c;
                }
            } else if ai < 0.0 {
                ai = 0.0;
                aj = sum;
            }
        }

        let (di, dj) = (ai - old_i, aj - old_j);
        self.alpha[i] = ai;
        self.alpha[j] = aj;
        for k in 0..self.grad.len() {
            self.grad[k] += q[[k, i]] * di + q[[k, j]] * dj;
        }
    }

    fn run(&mut self, same_sign: bool) {
        let max_iter = (100 * self.y.len()).max(10_000_000);
        for _ in 0..max_iter {
            match self.select(same_sign) {
                Some((i, j)) => self.update(i, j),
                None => break,
            }
        }
    }

    /// Offset estimate: mean gradient over free variables, else the midpoint
    /// of the bound-derived interval. With `signed`, gradients are taken as
    /// `y*grad` (C-SVC); otherwise raw, one label sign at a time (ν-SVC).
    fn rho_over(&self, keep: impl Fn(usize) -> bool, signed: bool) -> f64 {
        let (mut ub, mut lb) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut sum_free, mut n_free) = (0.0, 0usize);
        for t in (0..self.y.len()).filter(|&t| keep(t)) {
            let g = if signed { self.y[t] * self.grad[t] } else { self.grad[t] };
            // Whether the upper bound of alpha caps g from below.
            let upper_is_lb = !signed || self.y[t] > 0.0;
            if self.at_upper(t) {
                if upper_is_lb { lb = lb.max(g) } else { ub = ub.min(g) }
            } else if self.at_lower(t) {
                if upper_is_lb { ub = ub.min(g) } else { lb = lb.max(g) }
            } else {
                n_free += 1;
                sum_free += g;
            }
        }
        if n_free > 0 {
            sum_free / n_free as f64
        } else {
            0.5 * (ub + lb)
        }
    }
}

/// `(coef = alpha * y, rho)` of a C-SVC.
fn solve_c(q: &Array2<f64>, y: &[f64], c: f64) -> (Vec<f64>, f64) {
    let n = y.len();
    let mut smo = Smo::new(q, y, &vec![-1.0; n], vec![0.0; n], c);
    smo.run(false);
    let rho = smo.rho_over(|_| true, true);
    let coef = smo.alpha.iter().zip(y).map(|(a, s)| a * s).collect();
    (coef, rho)
}

/// `(coef = alpha * y / r, rho / r)` of a ν-SVC.
fn solve_nu(q: &Array2<f64>, y: &[f64], nu: f64) -> Result<(Vec<f64>, f64)> {
    let n = y.len();
    let n_pos = y.iter().filter(|&&s| s > 0.0).count();
    let half = nu * n as f64 / 2.0;
    if half > n_pos.min(n - n_pos) as f64 {
        invalid!("nu = {nu} is infeasible for classes of size {} and {}", n_pos, n - n_pos);
    }
    let (mut left_pos, mut left_neg) = (half, half);
    let alpha: Vec<f64> = y
        .iter()
        .map(|&s| {
            let left = if s > 0.0 { &mut left_pos } else { &mut left_neg };
            let a = left.min(1.0);
            *left -= a;
            a
        })
        .collect();

    let mut smo = Smo::new(q, y, &vec![0.0; n], alpha, 1.0);
    smo.run(true);
    let r1 = smo.rho_over(|t| y[t] > 0.0, false);
    let r2 = smo.rho_over(|t| y[t] < 0.0, false);
    let r = 0.5 * (r1 + r2);
    if r.abs() < f64::EPSILON || !r.is_finite() {
        return Err(Error::Numerical("degenerate nu-SVC solution".into()));
    }
    let rho = 0.5 * (r1 - r2) / r;
    let coef = smo.alpha.iter().zip(y).map(|(a, s)| a * s / r).collect();
    Ok((coef, rho))
}

#[derive(Debug, Clone)]
struct PairModel {
    positive: usize,
    negative: usize,
    support: Array2<f64>,
    coef: Array1<f64>,
    rho: f64,
}

#[derive(Debug, Clone)]
pub struct Svc {
    formulation: Formulation,
    kernel: Kernel,
    gamma: f64,
    classes: Vec<usize>,
    models: Vec<PairModel>,
}

impl Svc {
    pub fn new(formulation: Formulation, kernel: Kernel) -> Self {
        Self { formulation, kernel, gamma: 1.0, classes: Vec::new(), models: Vec::new() }
    }

    fn gram(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));
        for s in 0..n {
            for t in s..n {
                let v = self.kernel.eval(x.row(s), x.row(t), self.gamma);
                k[[s, t]] = v;
                k[[t, s]] = v;
            }
        }
        k
    }

    fn decision(&self, model: &PairModel, row: ArrayView1<f64>) -> f64 {
        model
            .support
            .axis_iter(Axis(0))
            .zip(&model.coef)
            .map(|(sv, c)| c * self.kernel.eval(sv, row, self.gamma))
            .sum::<f64>()
            - model.rho
    }
}

impl Classifier for Svc {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        check_fit_input(&x, y)?;
        match self.formulation {
            Formulation::C(c) if !(c > 0.0) => invalid!("C must be positive, got {c}"),
            Formulation::Nu(nu) if !(nu > 0.0 && nu <= 1.0) => {
                invalid!("nu must lie in (0, 1], got {nu}")
            }
            _ => {}
        }
        let groups = group_by_class(y);
        if groups.len() < 2 {
            return Err(Error::Numerical("SVM needs 2 classes".into()));
        }
        self.gamma = 1.0 / x.ncols().max(1) as f64;
        self.classes = groups.iter().map(|(c, _)| *c).collect();
        self.models.clear();

        for a in 0..groups.len() {
            for b in a + 1..groups.len() {
                let (pos_rows, neg_rows) = (&groups[a].1, &groups[b].1);
                let rows: Vec<usize> = pos_rows.iter().chain(neg_rows).copied().collect();
                let sign: Vec<f64> = (0..rows.len())
                    .map(|k| if k < pos_rows.len() { 1.0 } else { -1.0 })
                    .collect();
                let sub = x.select(Axis(0), &rows);
                let k = self.gram(&sub);
                let q = Array2::from_shape_fn(k.dim(), |(s, t)| sign[s] * sign[t] * k[[s, t]]);

                let (coef, rho) = match self.formulation {
                    Formulation::C(c) => solve_c(&q, &sign, c),
                    Formulation::Nu(nu) => solve_nu(&q, &sign, nu)?,
                };
                let support: Vec<usize> = (0..coef.len()).filter(|&s| coef[s] != 0.0).collect();
                self.models.push(PairModel {
                    positive: a,
                    negative: b,
                    support: sub.select(Axis(0), &support),
                    coef: support.iter().map(|&s| coef[s]).collect(),
                    rho,
                });
            }
        }
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        if self.models.is_empty() {
            return Err(not_fitted());
        }
        Ok(x.axis_iter(Axis(0))
            .map(|row| {
                let mut votes = vec![0.0; self.classes.len()];
                for model in &self.models {
                    if self.decision(model, row) > 0.0 {
                        votes[model.positive] += 1.0;
                    } else {
                        votes[model.negative] += 1.0;
                    }
                }
                self.classes[argmax(&votes)]
            })
            .collect())
    }
}
