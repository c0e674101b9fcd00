use crate::{
    core::{errors::RankError, iters::Indexer, shape::Shape},
    Tensor,
};
use anyhow::Result;
use std::sync::Arc;

impl<T> Tensor<T>
where
    T: Copy + Default,
{
    /// Upper triangle of the last two dimensions: keeps `col - row >= diagonal`.
    pub fn triu(&self, diagonal: isize) -> Result<Tensor<T>> {
        self.triangle(|row, col| col - row >= diagonal)
    }

    /// Lower triangle of the last two dimensions: keeps `col - row <= diagonal`.
    pub fn tril(&self, diagonal: isize) -> Result<Tensor<T>> {
        self.triangle(|row, col| col - row <= diagonal)
    }

    fn triangle(&self, keep: impl Fn(isize, isize) -> bool) -> Result<Tensor<T>> {
        let rank = self.rank();
        if rank < 2 {
            return Err(RankError { required: 2, rank }.into());
        }

        let data = Indexer::new(self.sizes())
            .map(|index| {
                let (row, col) = (index[rank - 2] as isize, index[rank - 1] as isize);
                if keep(row, col) {
                    self.idx(&index)
                } else {
                    T::default()
                }
            })
            .collect();

        Ok(Tensor {
            data: Arc::new(data),
            shape: Shape::new(self.sizes()),
        })
    }
}

impl<T> Tensor<T>
where
    T: Copy,
{
    /// Replaces elements with `value` where `mask` (broadcast to this shape) is `true`.
    pub fn masked_fill(&self, mask: &Tensor<bool>, value: T) -> Result<Tensor<T>> {
        let mask = mask.broadcast_to(self.sizes())?;
        self.zip(&mask, |elem, masked| if masked { value } else { elem })
    }
}
