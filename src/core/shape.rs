use crate::core::errors::*;
use anyhow::Result;
use std::{cmp::max, collections::HashSet};

/// Sizes, strides and storage offset of a tensor view.
/// A stride of zero marks an expanded (broadcast) dimension.
#[derive(Clone, Debug)]
pub(crate) struct Shape {
    pub sizes: Vec<usize>,
    pub strides: Vec<usize>,
    pub offset: usize,
}

impl Shape {
    pub(crate) fn new(sizes: &[usize]) -> Shape {
        Shape {
            sizes: sizes.to_vec(),
            strides: contiguous_strides(sizes),
            offset: 0,
        }
    }

    pub(crate) fn scalar() -> Shape {
        Shape::new(&[])
    }

    pub(crate) fn rank(&self) -> usize {
        self.sizes.len()
    }

    pub(crate) fn numel(&self) -> usize {
        self.sizes.iter().product()
    }

    // --- Shape operations ---

    pub(crate) fn view(&self, sizes: &[usize]) -> Result<Shape> {
        self.valid_contiguity()?;
        self.valid_reshape(sizes)?;

        Ok(Shape {
            sizes: sizes.to_vec(),
            strides: contiguous_strides(sizes),
            offset: self.offset,
        })
    }

    pub(crate) fn permute(&self, permutation: &[usize]) -> Result<Shape> {
        self.valid_rank(permutation.len())?;
        self.valid_dimensions(permutation)?;

        let (sizes, strides) = permutation
            .iter()
            .map(|&d| (self.sizes[d], self.strides[d]))
            .unzip();

        Ok(Shape {
            sizes,
            strides,
            offset: self.offset,
        })
    }

    pub(crate) fn transpose(&self, dim_1: usize, dim_2: usize) -> Result<Shape> {
        let rank = self.rank();
        if rank < 2 {
            return Err(RankError { required: 2, rank }.into());
        }

        for dimension in [dim_1, dim_2] {
            if dimension >= rank {
                return Err(DimensionError::OutOfRange {
                    dimension: dimension as isize,
                    rank,
                }
                .into());
            }
        }

        let mut permutation = Vec::from_iter(0..rank);
        permutation.swap(dim_1, dim_2);

        self.permute(&permutation)
    }

    pub(crate) fn expand(&self, expansions: &[usize]) -> Result<Shape> {
        if self.sizes == expansions {
            return Ok(self.clone());
        }

        self.valid_rank(expansions.len())?;

        let (sizes, strides) = self
            .sizes
            .iter()
            .zip(self.strides.iter())
            .zip(expansions)
            .map(|((&size, &stride), &expansion)| {
                if expansion == size {
                    Ok((size, stride))
                } else if size == 1 {
                    Ok((expansion, 0))
                } else {
                    Err(ExpansionError { size, expansion })
                }
            })
            .collect::<Result<Vec<(usize, usize)>, ExpansionError>>()?
            .into_iter()
            .unzip();

        Ok(Shape {
            sizes,
            strides,
            offset: self.offset,
        })
    }

    /// Left-pads with unit dimensions up to `rank`.
    pub(crate) fn pad_rank(&self, rank: usize) -> Result<Shape, RankError> {
        let current = self.rank();

        if rank < current {
            return Err(RankError {
                required: current,
                rank,
            });
        }

        let ones = rank - current;
        let sizes = [vec![1; ones], self.sizes.to_vec()].concat();
        let strides = [vec![0; ones], self.strides.to_vec()].concat();

        Ok(Shape {
            sizes,
            strides,
            offset: self.offset,
        })
    }

    pub(crate) fn squeeze(&self) -> Shape {
        let (sizes, strides) = self
            .sizes
            .iter()
            .zip(&self.strides)
            .filter_map(|(&size, &stride)| (size != 1).then_some((size, stride)))
            .unzip();

        Shape {
            sizes,
            strides,
            offset: self.offset,
        }
    }

    pub(crate) fn squeeze_dim(&self, dimension: usize) -> Shape {
        let mut shape = self.clone();

        if self.sizes[dimension] == 1 {
            shape.sizes.remove(dimension);
            shape.strides.remove(dimension);
        }

        shape
    }

    /// Inserts a unit dimension before `dimension` (`dimension == rank` appends).
    pub(crate) fn insert_dim(&self, dimension: usize) -> Shape {
        let stride = if dimension < self.rank() {
            self.sizes[dimension] * self.strides[dimension]
        } else {
            1
        };

        let mut shape = self.clone();
        shape.sizes.insert(dimension, 1);
        shape.strides.insert(dimension, stride);
        shape
    }

    // --- Index and Slice ---

    pub(crate) fn idx(&self, indices: &[usize]) -> usize {
        self.strides
            .iter()
            .zip(indices)
            .map(|(&stride, &index)| stride * index)
            .sum::<usize>()
            + self.offset
    }

    pub(crate) fn index(&self, indices: &[usize]) -> Result<usize, IndexError> {
        self.valid_rank(indices.len())?;
        self.valid_indices(indices)?;

        Ok(self.idx(indices))
    }

    pub(crate) fn select(&self, dimension: usize, index: usize) -> Result<Shape, IndexError> {
        let size = self.sizes[dimension];
        if index >= size {
            return Err(IndexError::OutOfRange {
                index,
                dimension,
                size,
            });
        }

        let mut shape = self.clone();
        shape.offset += index * self.strides[dimension];
        shape.sizes.remove(dimension);
        shape.strides.remove(dimension);

        Ok(shape)
    }

    /// Half-open `(start, end)` ranges over the leading dimensions.
    pub(crate) fn slice(&self, ranges: &[(usize, usize)]) -> Result<Shape> {
        let rank = self.rank();
        if ranges.len() > rank {
            return Err(IndexError::IndicesLength {
                num_indices: ranges.len(),
                num_dimensions: rank,
            }
            .into());
        }

        self.valid_ranges(ranges)?;

        let mut shape = self.clone();
        for (dimension, &(start, end)) in ranges.iter().enumerate() {
            shape.offset += start * self.strides[dimension];
            shape.sizes[dimension] = end - start;
        }

        Ok(shape)
    }

    pub(crate) fn slicer(&self, indices: &[Option<usize>]) -> Shape {
        let mut offset = self.offset;

        let sizes = self
            .sizes
            .iter()
            .zip(&self.strides)
            .zip(indices)
            .map(|((&size, &stride), i)| {
                if let Some(i) = i {
                    offset += i * stride;
                    1
                } else {
                    size
                }
            })
            .collect();

        Shape {
            sizes,
            strides: self.strides.to_vec(),
            offset,
        }
    }

    // --- Broadcast ---

    pub(crate) fn broadcast(
        lhs_sizes: &[usize],
        rhs_sizes: &[usize],
    ) -> Result<Vec<usize>, BroadcastError> {
        let mut lhs_iter = lhs_sizes.iter();
        let mut rhs_iter = rhs_sizes.iter();

        let max_len = max(lhs_sizes.len(), rhs_sizes.len());
        let mut result = Vec::with_capacity(max_len);

        loop {
            match (lhs_iter.next_back(), rhs_iter.next_back()) {
                (Some(&l), Some(&r)) => {
                    if l == r {
                        result.push(l);
                    } else if l == 1 {
                        result.push(r);
                    } else if r == 1 {
                        result.push(l);
                    } else {
                        return Err(BroadcastError {
                            lhs_sizes: lhs_sizes.to_vec(),
                            rhs_sizes: rhs_sizes.to_vec(),
                        });
                    }
                }
                (Some(&l), None) => result.push(l),
                (None, Some(&r)) => result.push(r),
                (None, None) => break,
            }
        }

        result.reverse();
        Ok(result)
    }

    // --- Validation ---

    pub(crate) fn is_contiguous(&self) -> bool {
        self.sizes
            .iter()
            .zip(&self.strides)
            .zip(contiguous_strides(&self.sizes))
            .all(|((&size, &stride), expected)| size == 1 || stride == expected)
    }

    pub(crate) fn valid_contiguity(&self) -> Result<(), NonContiguousError> {
        if self.is_contiguous() {
            Ok(())
        } else {
            Err(NonContiguousError)
        }
    }

    pub(crate) fn valid_reshape(&self, sizes: &[usize]) -> Result<(), ReshapeError> {
        if self.numel() != sizes.iter().product::<usize>() {
            return Err(ReshapeError {
                current_shape: self.sizes.to_vec(),
                new_shape: sizes.to_vec(),
            });
        }

        Ok(())
    }

    fn valid_indices(&self, indices: &[usize]) -> Result<(), IndexError> {
        for (dimension, (&index, &size)) in indices.iter().zip(&self.sizes).enumerate() {
            if index >= size {
                return Err(IndexError::OutOfRange {
                    index,
                    dimension,
                    size,
                });
            }
        }

        Ok(())
    }

    fn valid_ranges(&self, ranges: &[(usize, usize)]) -> Result<(), RangeError> {
        for (dimension, (&range, &size)) in ranges.iter().zip(&self.sizes).enumerate() {
            if range.0 > range.1 {
                return Err(RangeError::GreaterStartRange(range.0, range.1));
            } else if range.1 > size {
                return Err(RangeError::OutOfRange {
                    range,
                    dimension,
                    size,
                });
            }
        }

        Ok(())
    }

    pub(crate) fn valid_dimensions(&self, dimensions: &[usize]) -> Result<(), DimensionError> {
        let rank = self.rank();
        let mut set = HashSet::with_capacity(dimensions.len());

        for &dimension in dimensions {
            if dimension >= rank {
                return Err(DimensionError::OutOfRange {
                    dimension: dimension as isize,
                    rank,
                });
            } else if !set.insert(dimension) {
                return Err(DimensionError::Repetition(dimension));
            }
        }

        Ok(())
    }

    fn valid_rank(&self, num_indices: usize) -> Result<(), IndexError> {
        let num_dimensions = self.rank();

        if num_indices != num_dimensions {
            Err(IndexError::IndicesLength {
                num_indices,
                num_dimensions,
            })
        } else {
            Ok(())
        }
    }

    pub(crate) fn valid_data_length(
        &self,
        data_length: usize,
    ) -> Result<(), InvalidDataLengthError> {
        let numel = self.numel();

        if data_length != numel {
            Err(InvalidDataLengthError {
                data_length,
                tensor_size: numel,
            })
        } else {
            Ok(())
        }
    }
}

fn contiguous_strides(sizes: &[usize]) -> Vec<usize> {
    let mut current = 1;
    let mut strides: Vec<usize> = sizes
        .iter()
        .rev()
        .map(|size| {
            let stride = current;
            current *= size;
            stride
        })
        .collect();

    strides.reverse();
    strides
}
