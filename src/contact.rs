//! sEEG contact-proximity masking.
//!
//! Channel names look like `A1`, `A12`, `A1-A2` or `OF'3-OF'4`: a shaft
//! prefix followed by one or two contact numbers. Neighbouring contacts on the
//! same shaft pick up the same signal, so their connectivity is usually
//! excluded before any statistics.
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

use crate::error::{invalid, Error, Result};

/// A parsed channel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelLabel {
    pub shaft: String,
    pub first: u32,
    pub second: Option<u32>,
}

impl ChannelLabel {
    /// Split `s` into its shaft prefix and one or two contact numbers.
    pub fn parse(s: &str) -> Result<Self> {
        let unrecognized = || Error::UnrecognizedLabel(s.to_string());

        let shaft_end = s.find(|c: char| c.is_ascii_digit()).ok_or_else(unrecognized)?;
        if shaft_end == 0 {
            return Err(unrecognized());
        }
        let shaft = &s[..shaft_end];

        let numbers: Vec<u32> = s[shaft_end..]
            .split(|c: char| !c.is_ascii_digit())
            .filter(|run| !run.is_empty())
            .map(|run| run.parse::<u32>().map_err(|_| unrecognized()))
            .collect::<Result<_>>()?;

        match numbers.as_slice() {
            [first] => Ok(Self { shaft: shaft.to_string(), first: *first, second: None }),
            [first, second] => Ok(Self {
                shaft: shaft.to_string(),
                first: *first,
                second: Some(*second),
            }),
            _ => Err(unrecognized()),
        }
    }

    /// The contact immediately after this one on the same shaft, `None` when
    /// a contact number is already `u32::MAX`.
    pub fn next_contact(&self) -> Option<Self> {
        let second = match self.second {
            Some(d) => Some(d.checked_add(1)?),
            None => None,
        };
        Some(Self {
            shaft: self.shaft.clone(),
            first: self.first.checked_add(1)?,
            second,
        })
    }
}

impl FromStr for ChannelLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// How aggressively same-shaft connectivity is excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContactMode {
    /// Only the next contact on the same shaft.
    #[default]
    Soft,
    /// Every other contact on the same shaft.
    Hard,
}

impl FromStr for ContactMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "soft" => Ok(ContactMode::Soft),
            "hard" => Ok(ContactMode::Hard),
            other => invalid!("contact mode must be soft or hard (got {other:?})"),
        }
    }
}

impl fmt::Display for ContactMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContactMode::Soft => "soft",
            ContactMode::Hard => "hard",
        })
    }
}

/// Boolean `(n, n)` mask, `true` where connectivity should be removed.
///
/// The lower triangle (diagonal included) is overwritten with `remove_lower`
/// before the optional OR-symmetrization, then the diagonal is forced `true`.
/// `mat` is only read for its shape.
pub fn remove_site_contact<A, S: AsRef<str>>(
    mat: &Array2<A>,
    channels: &[S],
    mode: ContactMode,
    remove_lower: bool,
    symmetrical: bool,
) -> Result<Array2<bool>> {
    let n = channels.len();
    if mat.dim() != (n, n) {
        invalid!("connectivity shape {:?} does not match {n} channels", mat.dim());
    }
    let labels: Vec<ChannelLabel> = channels
        .iter()
        .map(|c| ChannelLabel::parse(c.as_ref()))
        .collect::<Result<_>>()?;

    let mut select = Array2::from_elem((n, n), false);
    for (i, label) in labels.iter().enumerate() {
        match mode {
            ContactMode::Soft => {
                let Some(next) = label.next_contact() else { continue };
                for (j, other) in labels.iter().enumerate() {
                    if *other == next {
                        select[[i, j]] = true;
                    }
                }
            }
            ContactMode::Hard => {
                for (j, other) in labels.iter().enumerate() {
                    if j != i && other.shaft == label.shaft {
                        select[[i, j]] = true;
                    }
                }
            }
        }
    }

    for i in 0..n {
        for j in 0..=i {
            select[[i, j]] = remove_lower;
        }
    }

    if symmetrical {
        select = Array2::from_shape_fn((n, n), |(i, j)| select[[i, j]] || select[[j, i]]);
    }
    select.diag_mut().fill(true);
    Ok(select)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_contact() {
        let l = ChannelLabel::parse("A12").unwrap();
        assert_eq!(l.shaft, "A");
        assert_eq!(l.first, 12);
        assert_eq!(l.second, None);
    }

    #[test]
    fn parse_bipolar_contact() {
        let l: ChannelLabel = "OF'3-OF'4".parse().unwrap();
        assert_eq!(l.shaft, "OF'");
        assert_eq!((l.first, l.second), (3, Some(4)));
        assert_eq!(l.next_contact().unwrap().second, Some(5));
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        for bad in ["12", "A", "", "A1-A2-A3"] {
            assert!(
                matches!(ChannelLabel::parse(bad), Err(Error::UnrecognizedLabel(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn last_contact_number_has_no_neighbour() {
        let l = ChannelLabel::parse("A4294967295").unwrap();
        assert_eq!(l.next_contact(), None);
        let m = remove_site_contact(
            &Array2::<f64>::zeros((2, 2)),
            &["A4294967295", "A1"],
            ContactMode::Soft,
            false,
            false,
        )
        .unwrap();
        assert!(!m[[0, 1]] && !m[[1, 0]]);
    }

    #[test]
    fn remove_lower_fills_lower_triangle() {
        let mat = Array2::<f64>::zeros((3, 3));
        let m = remove_site_contact(&mat, &["A1", "B1", "C1"], ContactMode::Soft, true, false).unwrap();
        assert!(m[[2, 0]] && m[[1, 0]] && m[[2, 1]]);
        assert!(!m[[0, 1]]);
    }
}
