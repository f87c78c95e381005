//! NumPy-style selections.
//!
//! A selection is a mix of integers, ranges, and at most one ellipsis which resolves to an
//! [`ArraySubset`] plus the set of axes selected by integers (which are squeezed from the result
//! shape).

use thiserror::Error;

use super::ArraySubset;

/// One component of a [selection](self).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceSpec {
    /// Select a whole axis (`:`).
    Full,
    /// Select a single index along an axis; the axis is squeezed from the result shape.
    ///
    /// Negative values count from the end of the axis.
    Index(i64),
    /// Select a half-open range along an axis (`start:stop`).
    ///
    /// [`None`] bounds default to the start/end of the axis and negative values count from the
    /// end of the axis. An empty or inverted range selects nothing.
    Range {
        /// The start of the range, or [`None`] for the start of the axis.
        start: Option<i64>,
        /// The end of the range (exclusive), or [`None`] for the end of the axis.
        stop: Option<i64>,
    },
    /// Expand to the minimal number of full-axis selections (`...`). At most one is permitted.
    Ellipsis,
}

impl From<i64> for SliceSpec {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<std::ops::Range<i64>> for SliceSpec {
    fn from(range: std::ops::Range<i64>) -> Self {
        Self::Range {
            start: Some(range.start),
            stop: Some(range.end),
        }
    }
}

impl From<std::ops::RangeFull> for SliceSpec {
    fn from(_: std::ops::RangeFull) -> Self {
        Self::Full
    }
}

impl From<std::ops::RangeFrom<i64>> for SliceSpec {
    fn from(range: std::ops::RangeFrom<i64>) -> Self {
        Self::Range {
            start: Some(range.start),
            stop: None,
        }
    }
}

impl From<std::ops::RangeTo<i64>> for SliceSpec {
    fn from(range: std::ops::RangeTo<i64>) -> Self {
        Self::Range {
            start: None,
            stop: Some(range.end),
        }
    }
}

/// An invalid selection error.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// More selection components than array dimensions.
    #[error("selection has {got} components, array has {dimensionality} dimensions")]
    TooManyIndices {
        /// The number of non-ellipsis selection components.
        got: usize,
        /// The array dimensionality.
        dimensionality: usize,
    },
    /// More than one ellipsis.
    #[error("only one ellipsis may be used in a selection")]
    MultipleEllipsis,
    /// An integer index outside the bounds of its axis.
    #[error("index {index} is out of range for axis of size {size}")]
    IndexOutOfBounds {
        /// The requested index.
        index: i64,
        /// The size of the axis.
        size: u64,
    },
}

/// Normalize an integer `index` along an axis of `size` to a length-1 half-open interval.
fn index_to_start_stop(index: i64, size: u64) -> Result<(u64, u64), SelectionError> {
    let size_i64 = i64::try_from(size).unwrap_or(i64::MAX);
    let start = if (-size_i64..0).contains(&index) {
        index + size_i64
    } else if index >= size_i64 || index < -size_i64 {
        return Err(SelectionError::IndexOutOfBounds { index, size });
    } else {
        index
    };
    let start = u64::try_from(start).expect("start is non-negative");
    Ok((start, start + 1))
}

/// Normalize a range along an axis of `size` to a half-open interval, clamping out-of-bounds
/// bounds and mapping empty/inverted ranges to an empty interval.
fn range_to_start_stop(start: Option<i64>, stop: Option<i64>, size: u64) -> (u64, u64) {
    let size_i64 = i64::try_from(size).unwrap_or(i64::MAX);
    let start = match start {
        None => 0,
        Some(start) if (-size_i64..0).contains(&start) => start + size_i64,
        Some(start) if start < -size_i64 || start >= size_i64 => return (0, 0),
        Some(start) => start,
    };
    let stop = match stop {
        None => size_i64,
        Some(stop) if stop > size_i64 => size_i64,
        Some(stop) if stop < 0 => stop + size_i64,
        Some(stop) => stop,
    };
    if stop <= start {
        (0, 0)
    } else {
        (
            u64::try_from(start).expect("start is non-negative"),
            u64::try_from(stop).expect("stop is non-negative"),
        )
    }
}

/// Normalize `selection` against an array `shape`.
///
/// Returns the selected [`ArraySubset`] and the axes selected by integers, which are squeezed
/// from the result shape (see [`squeeze_shape`]).
/// A selection with fewer components than `shape` has dimensions is padded with full-axis
/// selections, as if it ended with an ellipsis.
///
/// # Errors
/// Returns a [`SelectionError`] if the selection has more components than `shape` has dimensions,
/// more than one ellipsis, or an out-of-bounds integer index.
pub fn normalize_selection(
    selection: &[SliceSpec],
    shape: &[u64],
) -> Result<(ArraySubset, Vec<usize>), SelectionError> {
    let dimensionality = shape.len();
    let num_specs = selection
        .iter()
        .filter(|spec| !matches!(spec, SliceSpec::Ellipsis))
        .count();
    if num_specs > dimensionality {
        return Err(SelectionError::TooManyIndices {
            got: num_specs,
            dimensionality,
        });
    }
    if selection
        .iter()
        .filter(|spec| matches!(spec, SliceSpec::Ellipsis))
        .count()
        > 1
    {
        return Err(SelectionError::MultipleEllipsis);
    }

    let mut starts: Vec<u64> = Vec::with_capacity(dimensionality);
    let mut stops: Vec<u64> = Vec::with_capacity(dimensionality);
    let mut squeeze: Vec<usize> = Vec::new();
    let mut specs_remaining = num_specs;
    for spec in selection {
        let axis = starts.len();
        match spec {
            SliceSpec::Full => {
                starts.push(0);
                stops.push(shape[axis]);
                specs_remaining -= 1;
            }
            SliceSpec::Index(index) => {
                let (start, stop) = index_to_start_stop(*index, shape[axis])?;
                starts.push(start);
                stops.push(stop);
                squeeze.push(axis);
                specs_remaining -= 1;
            }
            SliceSpec::Range { start, stop } => {
                let (start, stop) = range_to_start_stop(*start, *stop, shape[axis]);
                starts.push(start);
                stops.push(stop);
                specs_remaining -= 1;
            }
            SliceSpec::Ellipsis => {
                while starts.len() + specs_remaining < dimensionality {
                    let axis = starts.len();
                    starts.push(0);
                    stops.push(shape[axis]);
                }
            }
        }
    }
    // Implicit trailing ellipsis.
    while starts.len() < dimensionality {
        let axis = starts.len();
        starts.push(0);
        stops.push(shape[axis]);
    }

    let subset =
        ArraySubset::new_with_start_end_exc(starts, &stops).expect("start and stop lengths match");
    Ok((subset, squeeze))
}

/// Remove the `squeeze` axes (as returned by [`normalize_selection`]) from `shape`.
#[must_use]
pub fn squeeze_shape(shape: &[u64], squeeze: &[usize]) -> Vec<u64> {
    shape
        .iter()
        .enumerate()
        .filter(|(axis, _)| !squeeze.contains(axis))
        .map(|(_, size)| *size)
        .collect()
}
