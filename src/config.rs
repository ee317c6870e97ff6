//! Analysis configuration.
//!
//! [`GrangerConfig`] drives [`crate::granger_connectivity`]; [`DecodingConfig`]
//! bundles every choice made by the `decode` tool. All fields are `pub` and
//! have defaults, so both are meant to be built with struct-update syntax.

use crate::contact::ContactMode;
use crate::decoding::{ClassifierSpec, CvSpec, FeatureMode, StatMethod};

/// Parameters of the single-trial Granger causality.
///
/// ```
/// use ieegconn::GrangerConfig;
///
/// let cfg = GrangerConfig { dt: 200, lag: 5, ..GrangerConfig::default() };
/// assert_eq!(cfg.resolve_t0(1000), 1000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GrangerConfig {
    /// Window length in samples.
    ///
    /// Default: `100`.
    pub dt: usize,

    /// Model order (number of past samples).
    ///
    /// Default: `2`.
    pub lag: usize,

    /// Exclusive end of the most recent window. `None` uses the whole
    /// recording, i.e. the last window ends on the last sample.
    ///
    /// Default: `None`.
    pub t0: Option<usize>,

    /// Mask the pairs of neighbouring contacts. Needs channel names.
    ///
    /// Default: `None` (no mask).
    pub contact_mode: Option<ContactMode>,

    /// OR-symmetrize the contact mask.
    ///
    /// Default: `false`.
    pub symmetrical: bool,
}

impl Default for GrangerConfig {
    fn default() -> Self {
        Self { dt: 100, lag: 2, t0: None, contact_mode: None, symmetrical: false }
    }
}

impl GrangerConfig {
    /// `t0` for a recording of `n_samples` samples.
    pub fn resolve_t0(&self, n_samples: usize) -> usize {
        self.t0.unwrap_or(n_samples)
    }
}

/// Classifier, cross-validation and statistics of a decoding run.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingConfig {
    /// Default: LDA.
    pub clf: ClassifierSpec,
    /// Default: 10 times 10 stratified folds.
    pub cv: CvSpec,
    /// Default: every column decoded on its own.
    pub feature_mode: FeatureMode,
    /// Default: binomial test.
    pub method: StatMethod,
    /// Permutations of the permutation methods. Default: `200`.
    pub n_perm: usize,
    /// Worker threads, `-1` for every core. Default: `-1`.
    pub n_jobs: i32,
    /// Seed of the permutation generator. Default: `0`.
    pub seed: u64,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            clf: ClassifierSpec::default(),
            cv: CvSpec::default(),
            feature_mode: FeatureMode::default(),
            method: StatMethod::default(),
            n_perm: 200,
            n_jobs: -1,
            seed: 0,
        }
    }
}
