use crate::{
    core::{
        errors::{IndexError, RankError, TopkError},
        iters::Indexer,
        shape::Shape,
        utils::partial_order,
    },
    Tensor,
};
use anyhow::Result;
use std::cmp::Ordering;

impl<T> Tensor<T>
where
    T: Copy,
{
    /// The `k` largest (or smallest) elements along `dimension`, with their positions.
    ///
    /// Ties keep the lower position first. With `sorted == false` the selected elements
    /// are returned in their original positional order.
    pub fn topk(
        &self,
        k: usize,
        dimension: isize,
        largest: bool,
        sorted: bool,
    ) -> Result<(Tensor<T>, Tensor<usize>)>
    where
        T: PartialOrd,
    {
        let dimension = self.dim(dimension)?;
        let size = self.sizes()[dimension];

        if k > size {
            return Err(TopkError { k, size }.into());
        }

        let lanes = self.lanes(dimension);
        let mut values = Vec::with_capacity(lanes.len() * k);
        let mut indices = Vec::with_capacity(lanes.len() * k);

        for (_, lane) in lanes {
            let mut entries: Vec<(usize, T)> = lane.data().iter().copied().enumerate().collect();

            if largest {
                entries.sort_by(|a, b| partial_order(&b.1, &a.1));
            } else {
                entries.sort_by(|a, b| partial_order(&a.1, &b.1));
            }
            entries.truncate(k);

            if !sorted {
                entries.sort_by_key(|&(position, _)| position);
            }

            for (position, value) in entries {
                indices.push(position);
                values.push(value);
            }
        }

        // Lanes come out with `dimension` last; move it back into place.
        let mut sizes: Vec<usize> = self.sizes().to_vec();
        sizes.remove(dimension);
        sizes.push(k);

        let last = self.rank() - 1;
        let permutation: Vec<usize> = (0..self.rank())
            .map(|d| match d.cmp(&dimension) {
                Ordering::Less => d,
                Ordering::Equal => last,
                Ordering::Greater => d - 1,
            })
            .collect();

        let values = Tensor::init(values, &sizes)?.permute(&permutation)?.into_contiguous()?;
        let indices = Tensor::init(indices, &sizes)?.permute(&permutation)?.into_contiguous()?;

        Ok((values, indices))
    }

    /// Selects along `dimension` with one index tensor shared by every slice.
    /// The result has shape `sizes[..d] ++ indices.sizes ++ sizes[d + 1..]`.
    pub fn index_select(&self, dimension: isize, indices: &Tensor<usize>) -> Result<Tensor<T>> {
        let dimension = self.dim(dimension)?;
        valid_selection(indices, dimension, self.sizes()[dimension])?;

        let index_rank = indices.rank();
        let sizes = [
            &self.sizes()[..dimension],
            indices.sizes(),
            &self.sizes()[dimension + 1..],
        ]
        .concat();

        let data = Indexer::new(&sizes)
            .map(|index| {
                let selected = indices.idx(&index[dimension..dimension + index_rank]);
                let source = [
                    &index[..dimension],
                    &[selected],
                    &index[dimension + index_rank..],
                ]
                .concat();

                self.idx(&source)
            })
            .collect();

        Tensor::init(data, &sizes)
    }

    /// Gathers along `dimension` with indices that may differ per leading position.
    ///
    /// `indices` must broadcast to `sizes[..d] ++ [n]`, and
    /// `out[pre, i, post] = self[pre, indices[pre, i], post]`.
    pub fn take_along(&self, dimension: isize, indices: &Tensor<usize>) -> Result<Tensor<T>> {
        let dimension = self.dim(dimension)?;
        let (indices, sizes) = self.along(dimension, indices)?;

        let data = Indexer::new(&sizes)
            .map(|mut index| {
                index[dimension] = indices.idx(&index[..=dimension]);
                self.idx(&index)
            })
            .collect();

        Tensor::init(data, &sizes)
    }

    /// Inverse of [`Tensor::take_along`]: writes `source` into the gathered positions.
    /// `source` broadcasts to the gathered shape; repeated indices keep the last write.
    pub fn put_along(
        &self,
        dimension: isize,
        indices: &Tensor<usize>,
        source: &Tensor<T>,
    ) -> Result<Tensor<T>> {
        let dimension = self.dim(dimension)?;
        let (indices, sizes) = self.along(dimension, indices)?;
        let source = source.broadcast_to(&sizes)?;

        let shape = Shape::new(self.sizes());
        let mut data = self.to_vec();

        for index in Indexer::new(&sizes) {
            let mut target = index.clone();
            target[dimension] = indices.idx(&index[..=dimension]);
            data[shape.idx(&target)] = source.idx(&index);
        }

        Tensor::init(data, self.sizes())
    }

    fn along(
        &self,
        dimension: usize,
        indices: &Tensor<usize>,
    ) -> Result<(Tensor<usize>, Vec<usize>)> {
        let count = *indices.sizes().last().ok_or(RankError {
            required: 1,
            rank: 0,
        })?;

        let prefix = [&self.sizes()[..dimension], &[count]].concat();
        let indices = indices.broadcast_to(&prefix)?;
        valid_selection(&indices, dimension, self.sizes()[dimension])?;

        let sizes = [prefix.as_slice(), &self.sizes()[dimension + 1..]].concat();
        Ok((indices, sizes))
    }
}

fn valid_selection(
    indices: &Tensor<usize>,
    dimension: usize,
    size: usize,
) -> Result<(), IndexError> {
    match indices.data().iter().find(|&&index| index >= size) {
        Some(&index) => Err(IndexError::OutOfRange {
            index,
            dimension,
            size,
        }),
        None => Ok(()),
    }
}
