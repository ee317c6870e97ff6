//! Splitting a worker budget between two nested loops.
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::{invalid, Result};

/// Worker budget for an outer loop (datasets) around an inner loop
/// (repetitions or permutations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSplit {
    pub total: usize,
    pub outer: usize,
    pub inner: usize,
}

impl JobSplit {
    /// `n_jobs = -1` takes every available core. Outer workers are capped by
    /// the number of outer items; what is left goes to the inner loop.
    pub fn new(n_jobs: i32, n_outer: usize) -> Result<Self> {
        let total = match n_jobs {
            -1 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            n if n >= 1 => n as usize,
            n => invalid!("n_jobs must be -1 or positive, got {n}"),
        };
        let outer = total.min(n_outer).max(1);
        let inner = (total / outer).max(1);
        Ok(Self { total, outer, inner })
    }

    pub fn inner_parallel(&self) -> bool {
        self.inner > 1
    }

    fn pool(&self) -> Result<ThreadPool> {
        Ok(rayon::ThreadPoolBuilder::new().num_threads(self.total).build()?)
    }

    /// Runs `f(k)` for every outer item inside a pool of `total` threads.
    /// Results come back in item order; the first error wins.
    pub fn run<T, F>(&self, n_outer: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        if self.total == 1 {
            return (0..n_outer).map(f).collect();
        }
        self.pool()?.install(|| (0..n_outer).into_par_iter().map(&f).collect())
    }
}

/// Inner loop, parallel only when the split leaves it more than one worker.
pub(crate) fn map_inner<T, F>(parallel: bool, n: usize, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync + Send,
{
    if parallel {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_split() {
        let s = JobSplit::new(8, 2).unwrap();
        assert_eq!((s.total, s.outer, s.inner), (8, 2, 4));
        let s = JobSplit::new(4, 10).unwrap();
        assert_eq!((s.outer, s.inner), (4, 1));
        assert!(!s.inner_parallel());
        assert!(JobSplit::new(-1, 3).unwrap().total >= 1);
        assert!(JobSplit::new(0, 3).is_err());
    }

    #[test]
    fn results_keep_item_order() {
        let s = JobSplit::new(3, 5).unwrap();
        let out = s.run(5, |k| Ok(k * k)).unwrap();
        assert_eq!(out, vec![0, 1, 4, 9, 16]);
    }

    #[test]
    fn first_error_is_returned() {
        let s = JobSplit::new(1, 3).unwrap();
        let out: Result<Vec<usize>> = s.run(3, |k| if k == 1 { invalid!("bad {k}") } else { Ok(k) });
        assert!(out.is_err());
    }
}
