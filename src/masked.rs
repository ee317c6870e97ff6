//! Value + validity-mask matrix.
//!
//! Follows the numpy masked-array convention: a `true` mask cell marks the
//! value as invalid. A matrix without a mask is fully valid.
use ndarray::Array2;

use crate::error::{invalid, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct MaskedMatrix {
    pub data: Array2<f64>,
    pub mask: Option<Array2<bool>>,
}

impl MaskedMatrix {
    /// Wrap `data` with no mask.
    pub fn new(data: Array2<f64>) -> Self {
        Self { data, mask: None }
    }

    /// Wrap `data` with a mask of the same shape.
    pub fn with_mask(data: Array2<f64>, mask: Array2<bool>) -> Result<Self> {
        if data.dim() != mask.dim() {
            invalid!("mask shape {:?} does not match data shape {:?}", mask.dim(), data.dim());
        }
        Ok(Self { data, mask: Some(mask) })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// `true` when at least one cell is masked.
    pub fn is_masked(&self) -> bool {
        self.mask.as_ref().is_some_and(|m| m.iter().any(|&v| v))
    }

    /// Mask as a dense array (all `false` when absent).
    pub fn mask_or_default(&self) -> Array2<bool> {
        self.mask
            .clone()
            .unwrap_or_else(|| Array2::from_elem(self.data.dim(), false))
    }

    /// Data with masked cells replaced by `fill`.
    pub fn filled(&self, fill: f64) -> Array2<f64> {
        match &self.mask {
            None => self.data.clone(),
            Some(m) => ndarray::Zip::from(&self.data)
                .and(m)
                .map_collect(|&v, &masked| if masked { fill } else { v }),
        }
    }
}

impl From<Array2<f64>> for MaskedMatrix {
    fn from(data: Array2<f64>) -> Self {
        Self::new(data)
    }
}
