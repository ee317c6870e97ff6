//! Index pairs of a square connectivity matrix.
//!
//! `Upper` enumerates `(i, j)` with `i < j`, `Lower` enumerates `i > j`, both
//! in row-major order (numpy `triu_indices(n, k=1)` / `tril_indices(n, k=-1)`).
//! `Both` is the upper list followed by the lower list.
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

use crate::error::{invalid, Error, Result};

/// Which part of a square matrix to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Part {
    #[default]
    Upper,
    Lower,
    Both,
}

impl FromStr for Part {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upper" => Ok(Part::Upper),
            "lower" => Ok(Part::Lower),
            "both" => Ok(Part::Both),
            other => invalid!("part must be one of upper, lower, both (got {other:?})"),
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Part::Upper => "upper",
            Part::Lower => "lower",
            Part::Both => "both",
        })
    }
}

/// Parallel row / column index lists, ready for gather and scatter loops.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pairs {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

impl Pairs {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }

    /// `(n_pairs, 2)` array form.
    pub fn to_array(&self) -> Array2<usize> {
        Array2::from_shape_fn((self.len(), 2), |(p, c)| {
            if c == 0 { self.rows[p] } else { self.cols[p] }
        })
    }

    /// `(rows, cols)` tuple form.
    pub fn into_indices(self) -> (Vec<usize>, Vec<usize>) {
        (self.rows, self.cols)
    }
}

/// Number of pairs `get_pairs(n, part)` returns, without allocating them.
pub fn n_pairs(n: usize, part: Part) -> usize {
    let half = n * n.saturating_sub(1) / 2;
    match part {
        Part::Upper | Part::Lower => half,
        Part::Both => 2 * half,
    }
}

/// Pairs of an `n × n` matrix for the requested `part`.
pub fn get_pairs(n: usize, part: Part) -> Pairs {
    let mut pairs = Pairs {
        rows: Vec::with_capacity(n_pairs(n, part)),
        cols: Vec::with_capacity(n_pairs(n, part)),
    };
    if matches!(part, Part::Upper | Part::Both) {
        for i in 0..n {
            for j in i + 1..n {
                pairs.rows.push(i);
                pairs.cols.push(j);
            }
        }
    }
    if matches!(part, Part::Lower | Part::Both) {
        for i in 0..n {
            for j in 0..i {
                pairs.rows.push(i);
                pairs.cols.push(j);
            }
        }
    }
    pairs
}

/// Shortcut for `get_pairs(n, part).to_array()`.
pub fn get_pairs_array(n: usize, part: Part) -> Array2<usize> {
    get_pairs(n, part).to_array()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_order_is_row_major() {
        let p = get_pairs(4, Part::Upper);
        let got: Vec<_> = p.iter().collect();
        assert_eq!(got, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn lower_order_is_row_major() {
        let p = get_pairs(3, Part::Lower);
        let got: Vec<_> = p.iter().collect();
        assert_eq!(got, vec![(1, 0), (2, 0), (2, 1)]);
    }

    #[test]
    fn both_is_upper_then_lower() {
        let both = get_pairs(5, Part::Both);
        let up = get_pairs(5, Part::Upper);
        let lo = get_pairs(5, Part::Lower);
        assert_eq!(both.len(), 20);
        assert_eq!(&both.rows[..10], &up.rows[..]);
        assert_eq!(&both.cols[10..], &lo.cols[..]);
    }

    #[test]
    fn degenerate_sizes_have_no_pairs() {
        assert!(get_pairs(0, Part::Both).is_empty());
        assert!(get_pairs(1, Part::Upper).is_empty());
        assert_eq!(get_pairs_array(1, Part::Upper).dim(), (0, 2));
    }

    #[test]
    fn part_parsing() {
        assert_eq!("lower".parse::<Part>().unwrap(), Part::Lower);
        assert!(matches!("diag".parse::<Part>(), Err(Error::InvalidArgument(_))));
    }
}
