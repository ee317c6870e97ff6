//! Error taxonomy shared by every module.
//!
//! Bad selectors, shape mismatches and out-of-range parameters are
//! [`Error::InvalidArgument`]; a channel name that does not look like
//! `<shaft><contact>[<sep><contact>]` is [`Error::UnrecognizedLabel`].
//! Degenerate covariance determinants in [`crate::granger`] are *not* errors:
//! they are absorbed into a zero causality value.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A selector, shape or numeric parameter was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A channel name could not be split into shaft and contact numbers.
    #[error("unrecognized channel label {0:?}")]
    UnrecognizedLabel(String),

    /// A model could not be fitted on the data it was given.
    #[error("numerical failure: {0}")]
    Numerical(String),

    #[error("cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand for returning [`Error::InvalidArgument`] with a formatted message.
macro_rules! invalid {
    ($($arg:tt)*) => {
        return Err($crate::error::Error::InvalidArgument(format!($($arg)*)))
    };
}

pub(crate) use invalid;
