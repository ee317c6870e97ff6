//! # ieegconn: intracranial EEG connectivity and decoding in pure Rust
//!
//! `ieegconn` gathers the matrix plumbing and the statistics used to study
//! connectivity between sEEG recording sites:
//!
//! ```text
//! data [sources, samples]          labels [trials]   features [trials, M]
//!   │                                 │                   │
//!   ├─ granger::covgc_time()          └── decoding::Classify::new()
//!   │     (n_pairs, 3) causality               ├─ fit()   → accuracy (%)
//!   ├─ granger::gc_to_matrix()                 └─ stat()  → p-values
//!   │     directed + instantaneous N×N
//!   ├─ contact::remove_site_contact()   neighbouring contacts masked
//!   ├─ anatomy::anat_based_reorder()    blocks per ROI
//!   └─ anatomy::anat_based_mean()       ROI × ROI average
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use ieegconn::{granger_connectivity, ContactMode, GrangerConfig};
//! use ieegconn::io::SeriesData;
//! use std::path::Path;
//!
//! let rec = SeriesData::load(Path::new("data/patient1.safetensors")).unwrap();
//! let cfg = GrangerConfig {
//!     dt: 200,
//!     lag: 4,
//!     contact_mode: Some(ContactMode::Soft),
//!     ..GrangerConfig::default()
//! };
//! let gc = granger_connectivity(&rec.data, &rec.ch_names, &cfg).unwrap();
//! println!("{} pairs", gc.output.pairs.nrows());
//! ```
//!
//! ## Connectivity helpers
//!
//! ```
//! use ieegconn::{get_pairs, ravel_connect, unravel_connect, Part};
//! use ndarray::array;
//!
//! let c = array![[0.0, 1.0, 2.0], [3.0, 0.0, 4.0], [5.0, 6.0, 0.0]];
//! let flat = ravel_connect(&c, Part::Upper).unwrap();
//! assert_eq!(flat.to_vec(), vec![1.0, 2.0, 4.0]);
//! let back = unravel_connect(&flat, 3, Part::Upper).unwrap();
//! assert_eq!(back[[1, 2]], 4.0);
//! assert_eq!(get_pairs(3, Part::Upper).len(), 3);
//! ```

pub mod anatomy;
pub mod config;
pub mod connect;
pub mod contact;
pub mod decoding;
pub mod error;
pub mod granger;
pub mod io;
pub mod masked;
pub mod pairs;

use ndarray::Array2;
use tracing::info;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `ieegconn::Foo` without having to know the internal module layout.

// anatomy
pub use anatomy::{anat_based_mean, anat_based_reorder, AnatMean, AnatReorder, AnnotationTable};

// config
pub use config::{DecodingConfig, GrangerConfig};

// connect
pub use connect::{concat_connect, concat_connect_dense, ravel_connect, symmetrize, unravel_connect};

// contact
pub use contact::{remove_site_contact, ChannelLabel, ContactMode};

// decoding: harness and selectors (the models live in `decoding`)
pub use decoding::{
    ClassifierKind, ClassifierSpec, Classify, CvKind, CvSpec, FeatureMode, StatMethod, StatOutcome,
};

// error
pub use error::{Error, Result};

// granger
pub use granger::{covgc_time, gc_to_matrix, GcMatrices, GcOutput};

// masked
pub use masked::MaskedMatrix;

// pairs
pub use pairs::{get_pairs, get_pairs_array, n_pairs, Pairs, Part};

/// Everything [`granger_connectivity`] computes for one recording.
#[derive(Debug, Clone)]
pub struct GrangerConnectivity {
    /// Per-pair causality and the pair list.
    pub output: GcOutput,
    /// The same values laid out as `N × N` matrices.
    pub matrices: GcMatrices,
    /// `true` on the pairs of neighbouring contacts, when requested.
    pub contact_mask: Option<Array2<bool>>,
}

/// Run the single-trial Granger causality on one recording.
///
/// # Steps
///
/// 1. [`covgc_time`] over every pair of sources, with `t0` resolved against
///    the recording length ([`GrangerConfig::resolve_t0`]).
/// 2. [`gc_to_matrix`]: directed and instantaneous `N × N` matrices.
/// 3. If [`GrangerConfig::contact_mode`] is set, [`remove_site_contact`] on
///    the channel names (lower triangle left unmasked).
///
/// # Arguments
///
/// * `data`     – signal, shape `[N, T]`.
/// * `channels` – one name per source; may be empty when no contact mask is
///   requested.
/// * `cfg`      – see [`GrangerConfig`].
///
/// # Errors
///
/// Invalid window parameters, a channel list that does not match `data`, or
/// an unparseable channel name.
pub fn granger_connectivity<S: AsRef<str>>(
    data: &Array2<f64>,
    channels: &[S],
    cfg: &GrangerConfig,
) -> Result<GrangerConnectivity> {
    let n_sources = data.nrows();
    let t0 = cfg.resolve_t0(data.ncols());
    info!(n_sources, n_samples = data.ncols(), t0, "granger connectivity");

    let output = covgc_time(data, cfg.dt, cfg.lag, t0)?;
    let matrices = gc_to_matrix(&output, n_sources)?;

    let contact_mask = match cfg.contact_mode {
        Some(mode) => {
            if channels.is_empty() {
                return Err(Error::InvalidArgument(
                    "contact masking needs channel names".into(),
                ));
            }
            Some(remove_site_contact(
                &matrices.directed,
                channels,
                mode,
                false,
                cfg.symmetrical,
            )?)
        }
        None => None,
    };

    Ok(GrangerConnectivity { output, matrices, contact_mask })
}
