//! Row selectors.
//!
//! [`Index`] selects rows by position. Negative positions count from the
//! end; ranges clamp to the row count like slices do. A `Multi` concatenates
//! the selections of its parts in order, so rows may repeat.

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::error::{ApiError, Result};

/// A row selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
    /// One row.
    Single(isize),
    /// A half-open range; `None` bounds are open.
    Range {
        start: Option<isize>,
        end: Option<isize>,
    },
    /// Several singles or ranges. Nesting is rejected.
    Multi(Vec<Index>),
}

/// A column selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Position(usize),
    Name(String),
}

impl Index {
    /// Every row.
    pub const ALL: Index = Index::Range {
        start: None,
        end: None,
    };

    pub fn range(start: isize, end: isize) -> Self {
        Index::Range {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Resolve to row positions for a collection of `len` rows.
    pub fn positions(&self, len: usize) -> Result<Vec<usize>> {
        match self {
            Index::Single(i) => Ok(vec![single(*i, len)?]),
            Index::Range { start, end } => Ok(range(*start, *end, len)),
            Index::Multi(parts) => {
                let mut out = Vec::new();
                for part in parts {
                    match part {
                        Index::Multi(_) => {
                            return Err(ApiError::invalid_index("nested multi-index"))
                        }
                        other => out.extend(other.positions(len)?),
                    }
                }
                Ok(out)
            }
        }
    }
}

/// Resolve a possibly negative position against `len`.
pub(crate) fn single(i: isize, len: usize) -> Result<usize> {
    let len_i = len as isize;
    let pos = if i < 0 { len_i + i } else { i };
    if pos < 0 || pos >= len_i {
        return Err(ApiError::invalid_index(format!(
            "position {} out of range for {} rows",
            i, len
        )));
    }
    Ok(pos as usize)
}

fn clamp_bound(bound: isize, len: usize) -> usize {
    let len_i = len as isize;
    let pos = if bound < 0 { len_i + bound } else { bound };
    pos.clamp(0, len_i) as usize
}

fn range(start: Option<isize>, end: Option<isize>, len: usize) -> Vec<usize> {
    let start = start.map_or(0, |s| clamp_bound(s, len));
    let end = end.map_or(len, |e| clamp_bound(e, len));
    (start..end.max(start)).collect()
}

impl From<isize> for Index {
    fn from(i: isize) -> Self {
        Index::Single(i)
    }
}

impl From<Range<isize>> for Index {
    fn from(r: Range<isize>) -> Self {
        Index::range(r.start, r.end)
    }
}

impl From<RangeFrom<isize>> for Index {
    fn from(r: RangeFrom<isize>) -> Self {
        Index::Range {
            start: Some(r.start),
            end: None,
        }
    }
}

impl From<RangeTo<isize>> for Index {
    fn from(r: RangeTo<isize>) -> Self {
        Index::Range {
            start: None,
            end: Some(r.end),
        }
    }
}

impl From<RangeFull> for Index {
    fn from(_: RangeFull) -> Self {
        Index::ALL
    }
}

impl From<Vec<Index>> for Index {
    fn from(parts: Vec<Index>) -> Self {
        Index::Multi(parts)
    }
}

impl From<usize> for ColumnRef {
    fn from(i: usize) -> Self {
        ColumnRef::Position(i)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        ColumnRef::Name(name)
    }
}
