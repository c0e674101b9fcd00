use crate::core::errors::{DimensionError, FloatCastError, UsizeCastError};
use num_traits::{FromPrimitive, NumCast};
use std::{any::type_name, cmp::Ordering};

pub(crate) fn cast_usize<T>(value: usize) -> Result<T, UsizeCastError>
where
    T: FromPrimitive,
{
    T::from_usize(value).ok_or(UsizeCastError {
        value,
        dtype: type_name::<T>(),
    })
}

pub(crate) fn cast_f64<T>(value: f64) -> Result<T, FloatCastError>
where
    T: NumCast,
{
    T::from(value).ok_or(FloatCastError {
        value,
        dtype: type_name::<T>(),
    })
}

/// Maps a possibly negative dimension onto `0..rank`.
/// `-1` is the last dimension. `extra` widens the range, e.g. `unsqueeze` accepts `rank`.
pub(crate) fn normalize_dim(dim: isize, rank: usize, extra: usize) -> Result<usize, DimensionError> {
    let bound = (rank + extra) as isize;
    let normalized = if dim < 0 { dim + bound } else { dim };

    if (0..bound).contains(&normalized) {
        Ok(normalized as usize)
    } else {
        Err(DimensionError::OutOfRange {
            dimension: dim,
            rank,
        })
    }
}

/// Total order for `PartialOrd` values; incomparable pairs (NaN) count as equal.
pub(crate) fn partial_order<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}
