//! Reshaping helpers for connectivity matrices.
//!
//! - [`ravel_connect`] / [`unravel_connect`]: square matrix ⇄ 1-D vector of
//!   the entries selected by [`Part`], in [`get_pairs`] order.
//! - [`symmetrize`]: `A + Aᵀ − diag(A)`.
//! - [`concat_connect`]: block-diagonal concatenation, mask aware.
use std::ops::{Add, Sub};

use ndarray::{s, Array1, Array2};
use num_traits::Zero;

use crate::error::{invalid, Result};
use crate::masked::MaskedMatrix;
use crate::pairs::{get_pairs, n_pairs, Part};

fn check_square<A>(arr: &Array2<A>, what: &str) -> Result<usize> {
    let (r, c) = arr.dim();
    if r != c {
        invalid!("{what} must be square, got ({r}, {c})");
    }
    Ok(r)
}

/// Entries of `connect` at the `part` pairs, in pair order.
pub fn ravel_connect<A: Clone>(connect: &Array2<A>, part: Part) -> Result<Array1<A>> {
    let n = check_square(connect, "connectivity array")?;
    let pairs = get_pairs(n, part);
    Ok(pairs.iter().map(|(i, j)| connect[[i, j]].clone()).collect())
}

/// Scatter `connect` back into a zero `n_sites × n_sites` matrix.
pub fn unravel_connect<A: Clone + Zero>(
    connect: &Array1<A>,
    n_sites: usize,
    part: Part,
) -> Result<Array2<A>> {
    let expected = n_pairs(n_sites, part);
    if connect.len() != expected {
        invalid!(
            "{} values cannot fill the {part} part of a {n_sites}x{n_sites} array ({expected} needed)",
            connect.len()
        );
    }
    let mut out = Array2::<A>::zeros((n_sites, n_sites));
    for ((i, j), v) in get_pairs(n_sites, part).iter().zip(connect.iter()) {
        out[[i, j]] = v.clone();
    }
    Ok(out)
}

/// Mirror a triangular matrix onto its other half without doubling the diagonal.
pub fn symmetrize<A>(arr: &Array2<A>) -> Result<Array2<A>>
where
    A: Copy + Zero + Add<Output = A> + Sub<Output = A>,
{
    let n = check_square(arr, "array to symmetrize")?;
    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        let diag = if i == j { arr[[i, i]] } else { A::zero() };
        arr[[i, j]] + arr[[j, i]] - diag
    }))
}

/// Block-diagonal concatenation of square matrices.
///
/// Off-block cells hold `fill_with`. When any input is masked the output is
/// masked everywhere except the placed blocks, which keep their own mask.
pub fn concat_connect(matrices: &[MaskedMatrix], fill_with: f64) -> Result<MaskedMatrix> {
    let mut sizes = Vec::with_capacity(matrices.len());
    for (k, m) in matrices.iter().enumerate() {
        sizes.push(check_square(&m.data, &format!("connectivity array #{k}"))?);
    }
    let total: usize = sizes.iter().sum();
    let any_masked = matrices.iter().any(MaskedMatrix::is_masked);

    let mut data = Array2::from_elem((total, total), fill_with);
    let mut mask = any_masked.then(|| Array2::from_elem((total, total), true));

    let mut q = 0;
    for (m, &n) in matrices.iter().zip(&sizes) {
        data.slice_mut(s![q..q + n, q..q + n]).assign(&m.data);
        if let Some(mask) = mask.as_mut() {
            let mut block = mask.slice_mut(s![q..q + n, q..q + n]);
            match &m.mask {
                Some(src) => block.assign(src),
                None => block.fill(false),
            }
        }
        q += n;
    }
    Ok(MaskedMatrix { data, mask })
}

/// [`concat_connect`] for plain matrices.
pub fn concat_connect_dense(matrices: &[Array2<f64>], fill_with: f64) -> Result<Array2<f64>> {
    let wrapped: Vec<MaskedMatrix> = matrices.iter().cloned().map(MaskedMatrix::new).collect();
    Ok(concat_connect(&wrapped, fill_with)?.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn ravel_upper_order() {
        let a = array![[0, 1, 2], [3, 4, 5], [6, 7, 8]];
        assert_eq!(ravel_connect(&a, Part::Upper).unwrap(), array![1, 2, 5]);
        assert_eq!(ravel_connect(&a, Part::Lower).unwrap(), array![3, 6, 7]);
        assert_eq!(ravel_connect(&a, Part::Both).unwrap(), array![1, 2, 5, 3, 6, 7]);
    }

    #[test]
    fn ravel_rejects_rectangular() {
        let a = Array2::<f64>::zeros((2, 3));
        assert!(ravel_connect(&a, Part::Upper).is_err());
    }

    #[test]
    fn unravel_rejects_wrong_length() {
        let v = array![1.0, 2.0];
        assert!(unravel_connect(&v, 3, Part::Upper).is_err());
    }

    #[test]
    fn symmetrize_keeps_diagonal() {
        let a = array![[1.0, 2.0], [0.0, 5.0]];
        assert_eq!(symmetrize(&a).unwrap(), array![[1.0, 2.0], [2.0, 5.0]]);
    }

    #[test]
    fn concat_unmasked_has_no_mask() {
        let out = concat_connect(
            &[MaskedMatrix::new(Array2::ones((1, 1))), MaskedMatrix::new(Array2::ones((2, 2)))],
            0.0,
        )
        .unwrap();
        assert!(out.mask.is_none());
        assert_eq!(out.dim(), (3, 3));
    }

    #[test]
    fn concat_masked_masks_off_blocks() {
        let m1 = MaskedMatrix::with_mask(Array2::ones((2, 2)), array![[true, false], [false, false]])
            .unwrap();
        let m2 = MaskedMatrix::new(Array2::from_elem((1, 1), 7.0));
        let out = concat_connect(&[m1, m2], -1.0).unwrap();
        let mask = out.mask.unwrap();
        assert!(mask[[0, 0]]);
        assert!(!mask[[0, 1]]);
        assert!(!mask[[2, 2]]);
        assert!(mask[[0, 2]] && mask[[2, 1]]);
        assert_eq!(out.data[[2, 2]], 7.0);
        assert_eq!(out.data[[2, 0]], -1.0);
    }
}
