//! Brute-force k-nearest neighbours, Euclidean distance, uniform vote.
use ndarray::{Array2, ArrayView2};

use crate::error::{invalid, Result};

use super::classifier::{check_fit_input, not_fitted, Classifier};

#[derive(Debug, Clone)]
pub struct Knn {
    k: usize,
    train: Option<(Array2<f64>, Vec<usize>)>,
}

impl Knn {
    pub fn new(k: usize) -> Self {
        Self { k, train: None }
    }
}

impl Classifier for Knn {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        check_fit_input(&x, y)?;
        if self.k == 0 {
            invalid!("k-nearest neighbours needs k >= 1");
        }
        self.train = Some((x.to_owned(), y.to_vec()));
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<usize>> {
        let (train_x, train_y) = self.train.as_ref().ok_or_else(not_fitted)?;
        let k = self.k.min(train_y.len());
        let n_classes = train_y.iter().max().map_or(0, |m| m + 1);

        Ok(x.rows()
            .into_iter()
            .map(|q| {
                let mut dist: Vec<(f64, usize)> = train_x
                    .rows()
                    .into_iter()
                    .zip(train_y)
                    .map(|(r, &label)| {
                        let d: f64 = r.iter().zip(q.iter()).map(|(a, b)| (a - b).powi(2)).sum();
                        (d, label)
                    })
                    .collect();
                dist.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut votes = vec![0usize; n_classes];
                for &(_, label) in &dist[..k] {
                    votes[label] += 1;
                }
                // Ties go to the smallest class.
                let mut best = 0;
                for (c, &v) in votes.iter().enumerate() {
                    if v > votes[best] {
                        best = c;
                    }
                }
                best
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn majority_of_neighbours() {
        let x = array![[0.0], [0.1], [0.2], [5.0], [5.1]];
        let mut knn = Knn::new(3);
        knn.fit(x.view(), &[0, 0, 0, 1, 1]).unwrap();
        assert_eq!(knn.predict(array![[0.05], [4.9]].view()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn k_larger_than_training_set_is_clamped() {
        let x = array![[0.0], [1.0]];
        let mut knn = Knn::new(10);
        knn.fit(x.view(), &[1, 0]).unwrap();
        // One vote each: tie goes to class 0.
        assert_eq!(knn.predict(array![[0.0]].view()).unwrap(), vec![0]);
    }
}
