mod common;
use common::max_abs_diff;
use ieegconn::{
    concat_connect, concat_connect_dense, get_pairs, get_pairs_array, n_pairs, ravel_connect,
    symmetrize, unravel_connect, MaskedMatrix, Part,
};
use ndarray::{array, Array2};

fn counting(n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, n), |(i, j)| (i * n + j) as f64)
}

#[test]
fn pair_counts_and_orientation() {
    for n in 0..7 {
        let upper = get_pairs(n, Part::Upper);
        let lower = get_pairs(n, Part::Lower);
        assert_eq!(upper.len(), n * n.saturating_sub(1) / 2);
        assert_eq!(upper.len(), n_pairs(n, Part::Upper));
        assert!(upper.iter().all(|(i, j)| i < j));
        assert!(lower.iter().all(|(i, j)| i > j));

        let mut flipped: Vec<(usize, usize)> = lower.iter().map(|(i, j)| (j, i)).collect();
        flipped.sort_unstable();
        assert_eq!(flipped, upper.iter().collect::<Vec<_>>());
        assert_eq!(get_pairs(n, Part::Both).len(), 2 * upper.len());
    }
}

#[test]
fn pairs_array_layout() {
    let arr = get_pairs_array(4, Part::Upper);
    assert_eq!(arr.dim(), (6, 2));
    assert_eq!(arr.row(0).to_vec(), vec![0, 1]);
    assert_eq!(arr.row(5).to_vec(), vec![2, 3]);
}

#[test]
fn ravel_unravel_round_trip_keeps_selected_cells() {
    let a = counting(5);
    for part in [Part::Upper, Part::Lower, Part::Both] {
        let flat = ravel_connect(&a, part).unwrap();
        assert_eq!(flat.len(), n_pairs(5, part));
        let back = unravel_connect(&flat, 5, part).unwrap();
        for i in 0..5 {
            for j in 0..5 {
                let selected = match part {
                    Part::Upper => i < j,
                    Part::Lower => i > j,
                    Part::Both => i != j,
                };
                let expected = if selected { a[[i, j]] } else { 0.0 };
                assert_eq!(back[[i, j]], expected, "part {part} cell ({i}, {j})");
            }
        }
    }
}

#[test]
fn symmetrize_upper_matrix() {
    let a = array![[1.0, 2.0, 3.0], [0.0, 4.0, 5.0], [0.0, 0.0, 6.0]];
    let s = symmetrize(&a).unwrap();
    assert_eq!(s, s.t());
    assert_eq!(s.diag().to_vec(), vec![1.0, 4.0, 6.0]);
    assert_eq!(s[[2, 0]], 3.0);
}

#[test]
fn concat_block_diagonal_with_fill() {
    let m1 = array![[1.0, 2.0], [3.0, 4.0]];
    let m2 = array![[5.0]];
    let out = concat_connect_dense(&[m1, m2], -1.0).unwrap();
    let expected = array![[1.0, 2.0, -1.0], [3.0, 4.0, -1.0], [-1.0, -1.0, 5.0]];
    assert!(max_abs_diff(&out, &expected) == 0.0);
}

#[test]
fn concat_propagates_block_masks() {
    let m1 = MaskedMatrix::with_mask(array![[1.0, 2.0], [3.0, 4.0]], array![[false, true], [false, false]])
        .unwrap();
    let m2 = MaskedMatrix::new(array![[5.0]]);
    let out = concat_connect(&[m1, m2], 0.0).unwrap();
    let mask = out.mask.expect("masked input gives a masked output");
    assert!(mask[[0, 1]]);
    assert!(!mask[[0, 0]] && !mask[[2, 2]]);
    assert!(mask[[0, 2]] && mask[[2, 1]]);
}

#[test]
fn non_square_inputs_are_rejected() {
    let rect = Array2::<f64>::zeros((2, 3));
    assert!(ravel_connect(&rect, Part::Upper).is_err());
    assert!(symmetrize(&rect).is_err());
    assert!(concat_connect_dense(&[rect], 0.0).is_err());
}
