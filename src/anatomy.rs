//! Anatomy-driven reordering and averaging of connectivity matrices.
//!
//! Sites are grouped by one column of an [`AnnotationTable`] (e.g. the ROI
//! or Brodmann area of each contact). Groups are kept in first-occurrence
//! order, never sorted.
use ndarray::Array2;
use tracing::debug;

use crate::error::{invalid, Result};
use crate::masked::MaskedMatrix;
use crate::pairs::{get_pairs, Part};

/// Named string columns of equal length, one row per recording site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationTable {
    names: Vec<String>,
    columns: Vec<Vec<String>>,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(name, values)` pairs.
    pub fn from_columns<N, V>(columns: impl IntoIterator<Item = (N, Vec<V>)>) -> Result<Self>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Append a column. Its length must match the existing rows.
    pub fn push_column<N, V>(&mut self, name: N, values: Vec<V>) -> Result<()>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        if self.names.contains(&name) {
            invalid!("duplicate column {name:?}");
        }
        if !self.columns.is_empty() && values.len() != self.n_rows() {
            invalid!("column {name:?} has {} rows, table has {}", values.len(), self.n_rows());
        }
        self.names.push(name);
        self.columns.push(values.into_iter().map(Into::into).collect());
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Result<&[String]> {
        match self.names.iter().position(|n| n == name) {
            Some(k) => Ok(&self.columns[k]),
            None => invalid!("column {name:?} not found (have {:?})", self.names),
        }
    }

    /// Row indices grouped by the values of `column`, first-occurrence order.
    pub fn group_by(&self, column: &str) -> Result<Vec<(String, Vec<usize>)>> {
        let values = self.column(column)?;
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (row, v) in values.iter().enumerate() {
            match groups.iter_mut().find(|(label, _)| label == v) {
                Some((_, rows)) => rows.push(row),
                None => groups.push((v.clone(), vec![row])),
            }
        }
        Ok(groups)
    }
}

/// Output of [`anat_based_reorder`].
#[derive(Debug, Clone)]
pub struct AnatReorder<A> {
    /// Reorganized connectivity array.
    pub connect: Array2<A>,
    /// Group label of every position of the new ordering.
    pub labels: Vec<String>,
    /// Original site index of every position of the new ordering.
    pub index: Vec<usize>,
}

/// Reorder a connectivity array into contiguous anatomical blocks.
///
/// For every `part` pair `(k, i)` the value `c[k, i]` is written to
/// `(min(index[k], index[i]), max(index[k], index[i]))`.
pub fn anat_based_reorder<A: Clone + num_traits::Zero>(
    c: &Array2<A>,
    table: &AnnotationTable,
    column: &str,
    part: Part,
) -> Result<AnatReorder<A>> {
    let (n, m) = c.dim();
    if n != m {
        invalid!("connectivity array must be square, got ({n}, {m})");
    }
    if table.n_rows() != n {
        invalid!("annotation table has {} rows for {n} sites", table.n_rows());
    }
    let groups = table.group_by(column)?;

    let mut index = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for (label, rows) in &groups {
        index.extend_from_slice(rows);
        labels.extend(std::iter::repeat(label.clone()).take(rows.len()));
    }

    let mut connect = Array2::<A>::zeros((n, n));
    for (k, i) in get_pairs(n, part).iter() {
        let (a, b) = (index[k], index[i]);
        connect[[a.min(b), a.max(b)]] = c[[k, i]].clone();
    }
    debug!(n_sites = n, n_groups = groups.len(), "anatomical reorder");
    Ok(AnatReorder { connect, labels, index })
}

/// Output of [`anat_based_mean`].
#[derive(Debug, Clone)]
pub struct AnatMean {
    /// `(n_roi, n_roi)` block means.
    pub con: MaskedMatrix,
    /// Group labels, in first-occurrence order.
    pub labels: Vec<String>,
    /// Mean `(x, y, z)` of each group, when coordinates were supplied.
    pub xyz: Option<Array2<f64>>,
}

/// Mean connectivity between and within anatomical groups.
///
/// Works on a copy of `x`: the diagonal is zeroed and the upper triangle is
/// reflected onto the lower one. With a mask, only the upper triangle of the
/// mask is trusted and the diagonal is masked. Every block mean, the diagonal
/// blocks included, averages the valid cells of the block. Blocks without a
/// single valid cell are masked and hold `fill_with`.
pub fn anat_based_mean(
    x: &MaskedMatrix,
    table: &AnnotationTable,
    column: &str,
    fill_with: f64,
    xyz: Option<&Array2<f64>>,
) -> Result<AnatMean> {
    let (n, m) = x.dim();
    if n != m {
        invalid!("connectivity array must be square, got ({n}, {m})");
    }
    if table.n_rows() != n {
        invalid!("annotation table has {} rows for {n} sites", table.n_rows());
    }
    let groups = table.group_by(column)?;
    let n_roi = groups.len();

    // Upper-triangle reflection, diagonal zeroed.
    let data = Array2::from_shape_fn((n, n), |(i, j)| match i.cmp(&j) {
        std::cmp::Ordering::Less => x.data[[i, j]],
        std::cmp::Ordering::Greater => x.data[[j, i]],
        std::cmp::Ordering::Equal => 0.0,
    });
    let mask = x.is_masked().then(|| {
        let src = x.mask_or_default();
        Array2::from_shape_fn((n, n), |(i, j)| match i.cmp(&j) {
            std::cmp::Ordering::Less => src[[i, j]],
            std::cmp::Ordering::Greater => src[[j, i]],
            std::cmp::Ordering::Equal => true,
        })
    });

    let mut con = Array2::from_elem((n_roi, n_roi), fill_with);
    let mut con_mask = mask.as_ref().map(|_| Array2::from_elem((n_roi, n_roi), false));
    for (r, (_, rows)) in groups.iter().enumerate() {
        for (c, (_, cols)) in groups.iter().enumerate() {
            let mut sum = 0.0;
            let mut count = 0usize;
            for &i in rows {
                for &j in cols {
                    if mask.as_ref().map_or(true, |mk| !mk[[i, j]]) {
                        sum += data[[i, j]];
                        count += 1;
                    }
                }
            }
            if count > 0 {
                con[[r, c]] = sum / count as f64;
            } else if let Some(cm) = con_mask.as_mut() {
                cm[[r, c]] = true;
            }
        }
    }

    let xyz = match xyz {
        None => None,
        Some(coords) => {
            if coords.dim() != (n, 3) {
                invalid!("coordinates must be ({n}, 3), got {:?}", coords.dim());
            }
            let mut centroids = Array2::<f64>::zeros((n_roi, 3));
            for (r, (_, rows)) in groups.iter().enumerate() {
                for &i in rows {
                    let mut row = centroids.row_mut(r);
                    row += &coords.row(i);
                }
                centroids.row_mut(r).mapv_inplace(|v| v / rows.len() as f64);
            }
            Some(centroids)
        }
    };

    debug!(n_sites = n, n_roi, masked = con_mask.is_some(), "anatomical mean");
    Ok(AnatMean {
        con: MaskedMatrix { data: con, mask: con_mask },
        labels: groups.into_iter().map(|(label, _)| label).collect(),
        xyz,
    })
}
