//! Classifier selection and the [`Classifier`] trait.
//!
//! Every model is selected by name or integer code:
//!
//! | code | name        | model                                   |
//! |------|-------------|-----------------------------------------|
//! | 0    | `lda`       | Linear Discriminant Analysis            |
//! | 1    | `svm`       | kernel Support Vector Machine (C-SVC)   |
//! | 2    | `linearsvm` | linear SVM (squared hinge, one-vs-rest) |
//! | 3    | `nusvm`     | ν-Support Vector Machine                |
//! | 4    | `nb`        | Gaussian naive Bayes                    |
//! | 5    | `knn`       | k-nearest neighbours                    |
//! | 6    | `rf`        | random forest                           |
//! | 7    | `lr`        | logistic regression                     |
//! | 8    | `qda`       | Quadratic Discriminant Analysis         |
use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;

use crate::error::{invalid, Error, Result};

use super::bayes::GaussianNb;
use super::discriminant::{Lda, Qda};
use super::forest::RandomForest;
use super::knn::Knn;
use super::linear_svm::LinearSvm;
use super::logistic::LogisticRegression;
use super::svm::{Formulation, Svc};

/// A trainable classifier over class indices.
///
/// `fit` is always called on a fresh instance, one per cross-validation fold.
pub trait Classifier: Send {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()>;
    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifierKind {
    #[default]
    Lda,
    Svm,
    LinearSvm,
    NuSvm,
    NaiveBayes,
    Knn,
    RandomForest,
    LogisticRegression,
    Qda,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 9] = [
        ClassifierKind::Lda,
        ClassifierKind::Svm,
        ClassifierKind::LinearSvm,
        ClassifierKind::NuSvm,
        ClassifierKind::NaiveBayes,
        ClassifierKind::Knn,
        ClassifierKind::RandomForest,
        ClassifierKind::LogisticRegression,
        ClassifierKind::Qda,
    ];

    pub fn from_code(code: i64) -> Result<Self> {
        match usize::try_from(code).ok().and_then(|c| Self::ALL.get(c)) {
            Some(kind) => Ok(*kind),
            None => invalid!("no classifier with code {code}"),
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            ClassifierKind::Lda => "lda",
            ClassifierKind::Svm => "svm",
            ClassifierKind::LinearSvm => "linearsvm",
            ClassifierKind::NuSvm => "nusvm",
            ClassifierKind::NaiveBayes => "nb",
            ClassifierKind::Knn => "knn",
            ClassifierKind::RandomForest => "rf",
            ClassifierKind::LogisticRegression => "lr",
            ClassifierKind::Qda => "qda",
        }
    }
}

impl FromStr for ClassifierKind {
    type Err = Error;

    /// Accepts a name (case-insensitive) or an integer code.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return Self::from_code(code);
        }
        let lower = s.to_lowercase();
        match Self::ALL.iter().find(|k| k.name() == lower) {
            Some(kind) => Ok(*kind),
            None => invalid!("no classifier {s:?} found"),
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// SVM kernel. `gamma` is `1 / n_features` for the non-linear kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kernel {
    Linear,
    #[default]
    Rbf,
    Poly,
    Sigmoid,
}

impl FromStr for Kernel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(Kernel::Linear),
            "rbf" => Ok(Kernel::Rbf),
            "poly" => Ok(Kernel::Poly),
            "sigmoid" => Ok(Kernel::Sigmoid),
            _ => invalid!("no kernel {s:?} found"),
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kernel::Linear => "linear",
            Kernel::Rbf => "rbf",
            Kernel::Poly => "poly",
            Kernel::Sigmoid => "sigmoid",
        })
    }
}

/// A classifier choice plus its hyper-parameters.
///
/// ```
/// use ieegconn::decoding::{ClassifierKind, ClassifierSpec};
///
/// let spec = ClassifierSpec { n_knn: 5, ..ClassifierSpec::new(ClassifierKind::Knn) };
/// assert_eq!(spec.short_name(), "KNN-5");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSpec {
    pub kind: ClassifierKind,
    /// Kernel of the `svm` / `nusvm` models. Default: rbf.
    pub kernel: Kernel,
    /// Neighbours of the `knn` model. Default: 10.
    pub n_knn: usize,
    /// Trees of the `rf` model. Default: 100.
    pub n_tree: usize,
    /// Inverse regularisation strength (`svm`, `linearsvm`, `lr`). Default: 1.
    pub c: f64,
    /// ν of the `nusvm` model. Default: 0.5.
    pub nu: f64,
    /// Seed of the randomised models (`rf`, `linearsvm`). Default: 0.
    pub random_state: u64,
}

impl Default for ClassifierSpec {
    fn default() -> Self {
        Self::new(ClassifierKind::default())
    }
}

impl ClassifierSpec {
    pub fn new(kind: ClassifierKind) -> Self {
        Self {
            kind,
            kernel: Kernel::Rbf,
            n_knn: 10,
            n_tree: 100,
            c: 1.0,
            nu: 0.5,
            random_state: 0,
        }
    }

    /// Fresh, unfitted model.
    pub fn build(&self) -> Box<dyn Classifier> {
        match self.kind {
            ClassifierKind::Lda => Box::new(Lda::default()),
            ClassifierKind::Svm => Box::new(Svc::new(Formulation::C(self.c), self.kernel)),
            ClassifierKind::LinearSvm => Box::new(LinearSvm::new(self.c, self.random_state)),
            ClassifierKind::NuSvm => Box::new(Svc::new(Formulation::Nu(self.nu), self.kernel)),
            ClassifierKind::NaiveBayes => Box::new(GaussianNb::default()),
            ClassifierKind::Knn => Box::new(Knn::new(self.n_knn)),
            ClassifierKind::RandomForest => {
                Box::new(RandomForest::new(self.n_tree, self.random_state))
            }
            ClassifierKind::LogisticRegression => Box::new(LogisticRegression::new(self.c)),
            ClassifierKind::Qda => Box::new(Qda::default()),
        }
    }

    pub fn long_name(&self) -> String {
        match self.kind {
            ClassifierKind::Lda => "Linear Discriminant Analysis".into(),
            ClassifierKind::Svm => format!("Support Vector Machine (kernel={})", self.kernel),
            ClassifierKind::LinearSvm => "Linear Support Vector Machine".into(),
            ClassifierKind::NuSvm => "Nu Support Vector Machine".into(),
            ClassifierKind::NaiveBayes => "Naive Bayesian".into(),
            ClassifierKind::Knn => format!("k-Nearest Neighbor (neighbor={})", self.n_knn),
            ClassifierKind::RandomForest => format!("Random Forest (tree={})", self.n_tree),
            ClassifierKind::LogisticRegression => "Logistic Regression".into(),
            ClassifierKind::Qda => "Quadratic Discriminant Analysis".into(),
        }
    }

    pub fn short_name(&self) -> String {
        match self.kind {
            ClassifierKind::Lda => "LDA".into(),
            ClassifierKind::Svm => format!("SVM-{}", self.kernel),
            ClassifierKind::LinearSvm => "LSVM".into(),
            ClassifierKind::NuSvm => "NuSVM".into(),
            ClassifierKind::NaiveBayes => "NB".into(),
            ClassifierKind::Knn => format!("KNN-{}", self.n_knn),
            ClassifierKind::RandomForest => format!("RF-{}", self.n_tree),
            ClassifierKind::LogisticRegression => "LogReg".into(),
            ClassifierKind::Qda => "QDA".into(),
        }
    }
}

/// Training rows of every class present in `y`, sorted by class.
pub(crate) fn group_by_class(y: &[usize]) -> Vec<(usize, Vec<usize>)> {
    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    for (i, &label) in y.iter().enumerate() {
        match groups.binary_search_by_key(&label, |(c, _)| *c) {
            Ok(pos) => groups[pos].1.push(i),
            Err(pos) => groups.insert(pos, (label, vec![i])),
        }
    }
    groups
}

/// Index of the first maximum.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (k, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = k;
        }
    }
    best
}

pub(crate) fn check_fit_input(x: &ArrayView2<f64>, y: &[usize]) -> Result<()> {
    if x.nrows() != y.len() {
        invalid!("{} training rows for {} labels", x.nrows(), y.len());
    }
    if x.nrows() == 0 {
        invalid!("empty training set");
    }
    Ok(())
}

pub(crate) fn not_fitted() -> Error {
    Error::Numerical("classifier used before fit".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_codes_agree() {
        for (code, kind) in ClassifierKind::ALL.iter().enumerate() {
            assert_eq!(kind.code(), code as i64);
            assert_eq!(ClassifierKind::from_code(code as i64).unwrap(), *kind);
            assert_eq!(kind.name().parse::<ClassifierKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn selection_is_case_insensitive_and_accepts_codes() {
        assert_eq!("RF".parse::<ClassifierKind>().unwrap(), ClassifierKind::RandomForest);
        assert_eq!("8".parse::<ClassifierKind>().unwrap(), ClassifierKind::Qda);
    }

    #[test]
    fn unknown_selection_is_invalid() {
        assert!(matches!("tree".parse::<ClassifierKind>(), Err(Error::InvalidArgument(_))));
        assert!(ClassifierKind::from_code(9).is_err());
        assert!(ClassifierKind::from_code(-1).is_err());
        assert!("laplace".parse::<Kernel>().is_err());
    }

    #[test]
    fn descriptions() {
        let svm = ClassifierSpec::new(ClassifierKind::Svm);
        assert_eq!(svm.long_name(), "Support Vector Machine (kernel=rbf)");
        assert_eq!(ClassifierSpec::new(ClassifierKind::RandomForest).short_name(), "RF-100");
    }

    #[test]
    fn grouping_sorts_classes() {
        let g = group_by_class(&[2, 0, 2, 1]);
        assert_eq!(g, vec![(0, vec![1]), (1, vec![3]), (2, vec![0, 2])]);
    }
}
