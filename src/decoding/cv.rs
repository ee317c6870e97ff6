//! Cross-validation split generators.
//!
//! A [`CvSpec`] builds `rep` repetitions of train/test splits. Repetition `r`
//! is drawn from a generator seeded with `r`, so two builds over the same
//! labels are identical.
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{invalid, Error, Result};

use super::classifier::group_by_class;

/// One train/test partition of trial indices. Both sides are sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Split {
    fn from_test(n: usize, mut test: Vec<usize>) -> Self {
        test.sort_unstable();
        let mut in_test = vec![false; n];
        for &i in &test {
            in_test[i] = true;
        }
        let train = (0..n).filter(|&i| !in_test[i]).collect();
        Self { train, test }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CvKind {
    /// Stratified k-fold, shuffled.
    #[default]
    StratifiedKFold,
    /// k-fold, shuffled.
    KFold,
    /// Stratified shuffle split: `n_folds` random splits, test size `1/n_folds`.
    StratifiedShuffleSplit,
    /// Shuffle split: `rep` random splits, test size `1/n_folds`.
    ShuffleSplit,
}

impl CvKind {
    pub fn name(self) -> &'static str {
        match self {
            CvKind::StratifiedKFold => "skfold",
            CvKind::KFold => "kfold",
            CvKind::StratifiedShuffleSplit => "sss",
            CvKind::ShuffleSplit => "ss",
        }
    }
}

impl FromStr for CvKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "skfold" => Ok(CvKind::StratifiedKFold),
            "kfold" => Ok(CvKind::KFold),
            "sss" => Ok(CvKind::StratifiedShuffleSplit),
            "ss" => Ok(CvKind::ShuffleSplit),
            _ => invalid!("no cross-validation {s:?} found"),
        }
    }
}

impl fmt::Display for CvKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvSpec {
    pub kind: CvKind,
    pub n_folds: usize,
    pub rep: usize,
}

impl Default for CvSpec {
    fn default() -> Self {
        Self::new(CvKind::default())
    }
}

impl CvSpec {
    pub fn new(kind: CvKind) -> Self {
        Self { kind, n_folds: 10, rep: 10 }
    }

    /// `rep` lists of splits over the trials labelled by `y`.
    pub fn build(&self, y: &[usize]) -> Result<Vec<Vec<Split>>> {
        let n = y.len();
        if self.n_folds < 2 {
            invalid!("n_folds must be at least 2, got {}", self.n_folds);
        }
        if self.n_folds > n {
            invalid!("n_folds = {} exceeds the {n} trials", self.n_folds);
        }
        if self.rep == 0 {
            invalid!("rep must be at least 1");
        }
        Ok((0..self.rep)
            .map(|r| {
                let mut rng = StdRng::seed_from_u64(r as u64);
                match self.kind {
                    CvKind::StratifiedKFold => stratified_kfold(y, self.n_folds, &mut rng),
                    CvKind::KFold => kfold(n, self.n_folds, &mut rng),
                    CvKind::StratifiedShuffleSplit => (0..self.n_folds)
                        .map(|_| stratified_shuffle_split(y, self.n_folds, &mut rng))
                        .collect(),
                    CvKind::ShuffleSplit => (0..self.rep)
                        .map(|_| shuffle_split(n, self.n_folds, &mut rng))
                        .collect(),
                }
            })
            .collect())
    }

    pub fn long_name(&self) -> String {
        let (rep, k) = (self.rep, self.n_folds);
        match self.kind {
            CvKind::StratifiedKFold => format!("{rep}-times, {k} Stratified k-folds"),
            CvKind::KFold => format!("{rep}-times, {k} k-folds"),
            CvKind::StratifiedShuffleSplit => {
                format!("{rep}-times, test size 1/{k} Shuffle Stratified Split")
            }
            CvKind::ShuffleSplit => format!("{rep}-times, test size 1/{k} Shuffle Split"),
        }
    }

    pub fn short_name(&self) -> String {
        format!("{}rep x{} {}", self.rep, self.n_folds, self.kind)
    }
}

fn kfold(n: usize, k: usize, rng: &mut StdRng) -> Vec<Split> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let mut start = 0;
    (0..k)
        .map(|f| {
            let size = n / k + usize::from(f < n % k);
            let test = order[start..start + size].to_vec();
            start += size;
            Split::from_test(n, test)
        })
        .collect()
}

/// Each class is shuffled then dealt round-robin over the folds, the dealing
/// position carrying over from one class to the next.
fn stratified_kfold(y: &[usize], k: usize, rng: &mut StdRng) -> Vec<Split> {
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut at = 0;
    for (_, mut rows) in group_by_class(y) {
        rows.shuffle(rng);
        for i in rows {
            folds[at % k].push(i);
            at += 1;
        }
    }
    folds.into_iter().map(|test| Split::from_test(y.len(), test)).collect()
}

fn stratified_shuffle_split(y: &[usize], k: usize, rng: &mut StdRng) -> Split {
    let mut test = Vec::new();
    for (_, mut rows) in group_by_class(y) {
        rows.shuffle(rng);
        let n_c = rows.len();
        let n_test = ((n_c as f64 / k as f64).round() as usize).clamp(1, n_c.max(2) - 1);
        test.extend_from_slice(&rows[..n_test.min(n_c)]);
    }
    Split::from_test(y.len(), test)
}

fn shuffle_split(n: usize, k: usize, rng: &mut StdRng) -> Split {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let n_test = n.div_ceil(k);
    order.truncate(n_test);
    Split::from_test(n, order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<usize> {
        (0..20).map(|i| usize::from(i >= 12)).collect()
    }

    #[test]
    fn kfold_partitions_every_trial_once() {
        let spec = CvSpec { kind: CvKind::KFold, n_folds: 3, rep: 2 };
        let reps = spec.build(&labels()).unwrap();
        assert_eq!(reps.len(), 2);
        for splits in &reps {
            assert_eq!(splits.len(), 3);
            let mut all: Vec<usize> = splits.iter().flat_map(|s| s.test.clone()).collect();
            all.sort_unstable();
            assert_eq!(all, (0..20).collect::<Vec<_>>());
            for s in splits {
                assert_eq!(s.train.len() + s.test.len(), 20);
            }
        }
    }

    #[test]
    fn stratified_folds_keep_class_balance() {
        let y = labels();
        let spec = CvSpec { kind: CvKind::StratifiedKFold, n_folds: 4, rep: 1 };
        for s in &spec.build(&y).unwrap()[0] {
            let ones = s.test.iter().filter(|&&i| y[i] == 1).count();
            assert_eq!(s.test.len(), 5);
            assert!((1..=3).contains(&ones));
        }
    }

    #[test]
    fn repetitions_are_seeded() {
        let spec = CvSpec::new(CvKind::StratifiedKFold);
        let y = labels();
        let a = spec.build(&y).unwrap();
        assert_eq!(a, spec.build(&y).unwrap());
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn shuffle_splits_count_and_size() {
        let y = labels();
        let sss = CvSpec { kind: CvKind::StratifiedShuffleSplit, n_folds: 4, rep: 2 };
        let reps = sss.build(&y).unwrap();
        assert_eq!(reps[0].len(), 4);
        assert_eq!(reps[0][0].test.len(), 5);

        let ss = CvSpec { kind: CvKind::ShuffleSplit, n_folds: 3, rep: 5 };
        let reps = ss.build(&y).unwrap();
        assert_eq!(reps.len(), 5);
        assert_eq!(reps[0].len(), 5);
        assert_eq!(reps[0][0].test.len(), 7);
    }

    #[test]
    fn invalid_settings() {
        let y = labels();
        assert!("loo".parse::<CvKind>().is_err());
        assert!(CvSpec { n_folds: 1, ..CvSpec::default() }.build(&y).is_err());
        assert!(CvSpec { n_folds: 21, ..CvSpec::default() }.build(&y).is_err());
    }

    #[test]
    fn names() {
        let spec = CvSpec::default();
        assert_eq!(spec.long_name(), "10-times, 10 Stratified k-folds");
        assert_eq!(spec.short_name(), "10rep x10 skfold");
    }
}
