//! Classification-based decoding and its statistics.
//!
//! A [`Classify`] object ties a label vector to a classifier choice
//! ([`ClassifierSpec`]) and a repeated cross-validation ([`CvSpec`]).
//! [`Classify::fit`] returns decoding accuracies (percent) with one row per
//! dataset and one column per repetition; [`Classify::stat`] turns them into
//! p-values, either from a binomial chance model or from a permutation null.
//!
//! ```
//! use ieegconn::decoding::{Classify, ClassifierKind, ClassifierSpec, CvKind, CvSpec, FeatureMode};
//! use ndarray::{Array1, Array2};
//!
//! let y = Array1::from_iter((0..20).map(|i| (i % 2) as i64));
//! let x = Array2::from_shape_fn((20, 2), |(i, j)| (i % 2) as f64 * 5.0 + j as f64 * 0.01 * i as f64);
//! let cv = CvSpec { n_folds: 5, rep: 2, ..CvSpec::new(CvKind::StratifiedKFold) };
//! let clf = Classify::new(&y, ClassifierSpec::new(ClassifierKind::Lda), cv).unwrap();
//! let da = clf.fit(&x, FeatureMode::Single, 1).unwrap();
//! assert_eq!(da.dim(), (2, 2));
//! ```
mod bayes;
mod classifier;
mod cv;
mod discriminant;
mod forest;
mod jobs;
mod knn;
mod linear_svm;
mod logistic;
pub mod stats;
mod svm;

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::error::{invalid, Error, Result};

pub use bayes::GaussianNb;
pub use classifier::{Classifier, ClassifierKind, ClassifierSpec, Kernel};
pub use cv::{CvKind, CvSpec, Split};
pub use discriminant::{Lda, Qda};
pub use forest::RandomForest;
pub use jobs::JobSplit;
pub use knn::Knn;
pub use linear_svm::LinearSvm;
pub use logistic::LogisticRegression;
pub use stats::{binomial_pvalue, chance_threshold, perm_pvalue};
pub use svm::{Formulation, Svc};

use classifier::group_by_class;
use jobs::map_inner;

/// How the feature columns of `x` form datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureMode {
    /// `"sf"`: every column is decoded on its own.
    #[default]
    Single,
    /// `"mf"`: all columns are decoded together.
    Multi,
}

impl FromStr for FeatureMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sf" => Ok(FeatureMode::Single),
            "mf" => Ok(FeatureMode::Multi),
            _ => invalid!("feature mode must be 'sf' or 'mf', got {s:?}"),
        }
    }
}

impl fmt::Display for FeatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeatureMode::Single => "sf",
            FeatureMode::Multi => "mf",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatMethod {
    /// `"bino"`: binomial chance model.
    #[default]
    Binomial,
    /// `"label_rnd"`: labels shuffled.
    LabelShuffle,
    /// `"full_rnd"`: trial rows of `x` shuffled.
    FullShuffle,
    /// `"intra_rnd"`: every feature shuffled among the trials of each class.
    IntraClassShuffle,
}

impl FromStr for StatMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bino" => Ok(StatMethod::Binomial),
            "label_rnd" => Ok(StatMethod::LabelShuffle),
            "full_rnd" => Ok(StatMethod::FullShuffle),
            "intra_rnd" => Ok(StatMethod::IntraClassShuffle),
            _ => invalid!("no statistical method {s:?} found"),
        }
    }
}

impl fmt::Display for StatMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatMethod::Binomial => "bino",
            StatMethod::LabelShuffle => "label_rnd",
            StatMethod::FullShuffle => "full_rnd",
            StatMethod::IntraClassShuffle => "intra_rnd",
        })
    }
}

/// Result of [`Classify::stat`].
#[derive(Debug, Clone)]
pub struct StatOutcome {
    /// Same shape as `da` for the binomial test, `(n_datasets, 1)` otherwise.
    pub pvalue: Array2<f64>,
    /// `(n_datasets, n_perm)` null accuracies of the permutation methods.
    pub da_perm: Option<Array2<f64>>,
}

/// A label vector, a classifier and a repeated cross-validation.
#[derive(Debug, Clone)]
pub struct Classify {
    classes: Vec<i64>,
    y: Vec<usize>,
    clf: ClassifierSpec,
    cv: CvSpec,
    splits: Vec<Vec<Split>>,
}

/// One permuted version of a dataset.
enum Permuted {
    Labels(Vec<usize>),
    Data(Array2<f64>),
}

impl Classify {
    pub fn new(y: &Array1<i64>, clf: ClassifierSpec, cv: CvSpec) -> Result<Self> {
        let mut classes: Vec<i64> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            invalid!("labels hold {} distinct class(es), need at least 2", classes.len());
        }
        let encoded: Vec<usize> = y
            .iter()
            .map(|v| classes.binary_search(v).unwrap_or_default())
            .collect();
        let splits = cv.build(&encoded)?;
        Ok(Self { classes, y: encoded, clf, cv, splits })
    }

    /// Distinct labels, sorted; class `k` of the encoded labels is `classes()[k]`.
    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn n_trials(&self) -> usize {
        self.y.len()
    }

    pub fn splits(&self) -> &[Vec<Split>] {
        &self.splits
    }

    pub fn classifier(&self) -> &ClassifierSpec {
        &self.clf
    }

    pub fn cross_validation(&self) -> &CvSpec {
        &self.cv
    }

    /// Trials on the rows, flipping `x` if only its columns match the labels.
    fn orient<'a>(&self, x: &'a Array2<f64>) -> Result<ArrayView2<'a, f64>> {
        let n = self.n_trials();
        if x.nrows() == n {
            Ok(x.view())
        } else if x.ncols() == n {
            Ok(x.t())
        } else {
            invalid!("x of shape {:?} has no dimension matching {n} labels", x.dim())
        }
    }

    fn datasets(&self, x: ArrayView2<f64>, mode: FeatureMode) -> Vec<Array2<f64>> {
        match mode {
            FeatureMode::Multi => vec![x.to_owned()],
            FeatureMode::Single => x
                .axis_iter(Axis(1))
                .map(|col| col.to_owned().insert_axis(Axis(1)))
                .collect(),
        }
    }

    /// Decoding accuracy in percent, `(n_datasets, rep)`.
    pub fn fit(&self, x: &Array2<f64>, mode: FeatureMode, n_jobs: i32) -> Result<Array2<f64>> {
        let datasets = self.datasets(self.orient(x)?, mode);
        let rep = self.splits.len();
        let jobs = JobSplit::new(n_jobs, datasets.len())?;
        info!(
            clf = %self.clf.short_name(),
            cv = %self.cv.short_name(),
            n_datasets = datasets.len(),
            workers = jobs.total,
            "decoding"
        );

        let rows = jobs.run(datasets.len(), |d| {
            debug!(dataset = d, "fitting repetitions");
            map_inner(jobs.inner_parallel(), rep, |r| {
                cv_score(&self.clf, datasets[d].view(), &self.y, &self.splits[r])
            })
        })?;
        Ok(Array2::from_shape_fn((rows.len(), rep), |(d, r)| rows[d][r]))
    }

    /// p-values of the accuracies `da` returned by [`fit`](Self::fit) on `x`.
    ///
    /// The feature layout is read off `da`: one row per column of `x` means
    /// single-feature datasets, a single row means one multi-feature dataset.
    /// Permutation null accuracies use the first repetition's splits, and
    /// every permutation is drawn up front from one generator seeded with
    /// `seed`.
    pub fn stat(
        &self,
        x: &Array2<f64>,
        da: &Array2<f64>,
        method: StatMethod,
        n_perm: usize,
        n_jobs: i32,
        seed: u64,
    ) -> Result<StatOutcome> {
        if method == StatMethod::Binomial {
            let pvalue = binomial_pvalue(self.n_trials(), self.n_classes(), da)?;
            return Ok(StatOutcome { pvalue, da_perm: None });
        }

        let x = self.orient(x)?;
        let mode = if da.nrows() == x.ncols() {
            FeatureMode::Single
        } else if da.nrows() == 1 {
            FeatureMode::Multi
        } else {
            invalid!(
                "{} accuracy rows match neither {} single features nor one multi-feature set",
                da.nrows(),
                x.ncols()
            );
        };
        if n_perm == 0 {
            invalid!("permutation test needs n_perm >= 1");
        }
        let da_mean = da
            .mean_axis(Axis(1))
            .ok_or_else(|| Error::InvalidArgument("empty decoding accuracy".into()))?;

        let datasets = self.datasets(x, mode);
        let mut rng = StdRng::seed_from_u64(seed);
        let permutations: Vec<Vec<Permuted>> = datasets
            .iter()
            .map(|data| {
                (0..n_perm)
                    .map(|_| match method {
                        StatMethod::LabelShuffle => {
                            let mut y = self.y.clone();
                            y.shuffle(&mut rng);
                            Permuted::Labels(y)
                        }
                        StatMethod::FullShuffle => {
                            Permuted::Data(stats::shuffle_rows(data.view(), &mut rng))
                        }
                        _ => Permuted::Data(stats::shuffle_within_classes(
                            data.view(),
                            &self.y,
                            &mut rng,
                        )),
                    })
                    .collect()
            })
            .collect();

        let jobs = JobSplit::new(n_jobs, datasets.len())?;
        info!(
            %method,
            n_perm,
            n_datasets = datasets.len(),
            workers = jobs.total,
            "permutation test"
        );
        let first = &self.splits[0];
        let rows = jobs.run(datasets.len(), |d| {
            map_inner(jobs.inner_parallel(), n_perm, |p| match &permutations[d][p] {
                Permuted::Labels(y) => cv_score(&self.clf, datasets[d].view(), y, first),
                Permuted::Data(data) => cv_score(&self.clf, data.view(), &self.y, first),
            })
        })?;
        let null = Array2::from_shape_fn((rows.len(), n_perm), |(d, p)| rows[d][p]);
        let pvalue = perm_pvalue(da_mean.view(), null.view())?;
        Ok(StatOutcome { pvalue, da_perm: Some(null) })
    }
}

impl fmt::Display for Classify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with a {}", self.cv.long_name(), self.clf.long_name())
    }
}

/// Accuracy (percent) of one cross-validation: folds run in order and the
/// predictions of all test folds are pooled.
fn cv_score(spec: &ClassifierSpec, x: ArrayView2<f64>, y: &[usize], splits: &[Split]) -> Result<f64> {
    let (mut correct, mut total) = (0usize, 0usize);
    for split in splits {
        let y_train: Vec<usize> = split.train.iter().map(|&i| y[i]).collect();
        if group_by_class(&y_train).len() < 2 {
            return Err(Error::Numerical("training fold holds a single class".into()));
        }
        let mut model = spec.build();
        model.fit(x.select(Axis(0), &split.train).view(), &y_train)?;
        let predicted = model.predict(x.select(Axis(0), &split.test).view())?;
        correct += split
            .test
            .iter()
            .zip(&predicted)
            .filter(|&(&i, &p)| y[i] == p)
            .count();
        total += split.test.len();
    }
    if total == 0 {
        return Err(Error::Numerical("cross-validation produced no test trial".into()));
    }
    Ok(100.0 * correct as f64 / total as f64)
}
