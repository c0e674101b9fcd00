use crate::{
    core::{
        errors::EmptyTensorError,
        iters::{Indexer, Slicer},
        shape::Shape,
        utils::{cast_usize, partial_order},
    },
    Tensor,
};
use anyhow::Result;
use num_traits::FromPrimitive;
use std::{
    cmp::Ordering,
    iter::{Product, Sum},
    ops::{Add, Div},
};

impl<T> Tensor<T>
where
    T: Copy,
{
    pub fn sum(&self) -> Result<T>
    where
        T: Sum<T>,
    {
        let sum = if self.is_contiguous() {
            self.data_contiguous().iter().copied().sum()
        } else {
            Indexer::new(&self.shape.sizes)
                .map(|index| self.idx(&index))
                .sum()
        };

        Ok(sum)
    }

    pub fn mean(&self) -> Result<T>
    where
        T: Sum<T> + Div<T, Output = T> + FromPrimitive,
    {
        let numel = self.numel();
        if numel == 0 {
            return Err(EmptyTensorError::ReduceMean.into());
        }

        let numel_casted = cast_usize(numel)?;

        Ok(self.sum()? / numel_casted)
    }

    pub fn product(&self) -> Result<T>
    where
        T: Product<T>,
    {
        let product = if self.is_contiguous() {
            self.data_contiguous().iter().copied().product()
        } else {
            Indexer::new(&self.shape.sizes)
                .map(|index| self.idx(&index))
                .product()
        };

        Ok(product)
    }

    pub fn max(&self) -> Result<T>
    where
        T: PartialOrd,
    {
        let max = self.data().iter().copied().max_by(partial_order);

        max.ok_or(EmptyTensorError::ReduceMax.into())
    }

    pub fn min(&self) -> Result<T>
    where
        T: PartialOrd,
    {
        let min = self.data().iter().copied().min_by(partial_order);

        min.ok_or(EmptyTensorError::ReduceMin.into())
    }

    pub fn sum_dims(&self, dimensions: &[usize], keepdims: bool) -> Result<Tensor<T>>
    where
        T: Sum<T>,
    {
        self.reduce(Tensor::sum, dimensions, keepdims)
    }

    pub fn mean_dims(&self, dimensions: &[usize], keepdims: bool) -> Result<Tensor<T>>
    where
        T: Sum<T> + Div<T, Output = T> + FromPrimitive,
    {
        self.reduce(Tensor::mean, dimensions, keepdims)
    }

    pub fn product_dims(&self, dimensions: &[usize], keepdims: bool) -> Result<Tensor<T>>
    where
        T: Product<T>,
    {
        self.reduce(Tensor::product, dimensions, keepdims)
    }

    pub fn max_dims(&self, dimensions: &[usize], keepdims: bool) -> Result<Tensor<T>>
    where
        T: PartialOrd,
    {
        self.reduce(Tensor::max, dimensions, keepdims)
    }

    pub fn min_dims(&self, dimensions: &[usize], keepdims: bool) -> Result<Tensor<T>>
    where
        T: PartialOrd,
    {
        self.reduce(Tensor::min, dimensions, keepdims)
    }

    /// Maximum along `dimension` together with its position.
    /// The first maximal position wins on ties.
    pub fn max_dim(&self, dimension: isize, keepdim: bool) -> Result<(Tensor<T>, Tensor<usize>)>
    where
        T: PartialOrd,
    {
        let dimension = self.dim(dimension)?;
        let dims = [dimension];

        let indices = self.reduce(
            |slice| {
                let mut best: Option<(usize, T)> = None;
                for (position, &elem) in slice.data().iter().enumerate() {
                    match best {
                        Some((_, value)) if partial_order(&elem, &value) != Ordering::Greater => {}
                        _ => best = Some((position, elem)),
                    }
                }

                best.map(|(position, _)| position)
                    .ok_or(EmptyTensorError::ReduceMax.into())
            },
            &dims,
            keepdim,
        )?;
        let values = self.max_dims(&dims, keepdim)?;

        Ok((values, indices))
    }

    /// Inclusive prefix sum along `dimension`.
    pub fn cumsum(&self, dimension: isize) -> Result<Tensor<T>>
    where
        T: Add<Output = T>,
    {
        let dimension = self.dim(dimension)?;
        let shape = Shape::new(self.sizes());
        let stride = shape.strides[dimension];

        let mut data: Vec<T> = Vec::with_capacity(self.numel());
        for index in Indexer::new(&shape.sizes) {
            let elem = self.idx(&index);
            let value = if index[dimension] == 0 {
                elem
            } else {
                data[shape.idx(&index) - stride] + elem
            };

            data.push(value);
        }

        Tensor::init(data, &shape.sizes)
    }

    /// Slices along `dimension`, each one a view with the other dimensions fixed.
    pub(crate) fn lanes(&self, dimension: usize) -> Vec<(Vec<Option<usize>>, Tensor<T>)> {
        let fixed: Vec<usize> = (0..self.rank()).filter(|&d| d != dimension).collect();

        Slicer::new(&self.shape.sizes, &fixed)
            .map(|index| {
                let lane = self.slicer(&index);
                (index, lane)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::Tensor;

    #[test]
    fn whole_tensor() {
        let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        assert_eq!(a.sum().unwrap(), 10.0);
        assert_eq!(a.mean().unwrap(), 2.5);
        assert_eq!(a.product().unwrap(), 24.0);
        assert_eq!(a.max().unwrap(), 4.0);
        assert_eq!(a.min().unwrap(), 1.0);
        assert!(Tensor::<f32>::zeros(&[0]).unwrap().max().is_err());
    }

    #[test]
    fn empty_mean_is_an_error() {
        let empty = Tensor::<i32>::zeros(&[0]).unwrap();
        assert!(empty.mean().is_err());
        assert!(Tensor::<f64>::zeros(&[0]).unwrap().mean().is_err());

        let rows = Tensor::<i32>::zeros(&[2, 0]).unwrap();
        assert!(rows.mean_dims(&[1], false).is_err());
        assert_eq!(Tensor::new(&[2, 4], &[2]).unwrap().mean().unwrap(), 3);
    }

    #[test]
    fn along_dims() {
        let a = Tensor::arange(0.0, 6.0, 1.0).unwrap().view(&[2, 3]).unwrap();

        assert_eq!(a.sum_dims(&[1], false).unwrap().to_vec(), vec![3.0, 12.0]);
        assert_eq!(a.sum_dims(&[0], true).unwrap().sizes(), &[1, 3]);
        assert_eq!(a.mean_dims(&[0], false).unwrap().to_vec(), vec![1.5, 2.5, 3.5]);
        assert_eq!(a.max_dims(&[1], false).unwrap().to_vec(), vec![2.0, 5.0]);
        assert_eq!(a.min_dims(&[0, 1], false).unwrap().to_vec(), vec![0.0]);
        assert!(a.sum_dims(&[2], false).is_err());
        assert!(a.sum_dims(&[1, 1], false).is_err());
    }

    #[test]
    fn max_dim_values_and_indices() {
        let a = Tensor::new(&[3.0, 7.0, 7.0, 9.0, 1.0, 2.0], &[2, 3]).unwrap();

        let (values, indices) = a.max_dim(-1, false).unwrap();
        assert_eq!(values.to_vec(), vec![7.0, 9.0]);
        assert_eq!(indices.to_vec(), vec![1, 0]);

        let (values, indices) = a.max_dim(0, true).unwrap();
        assert_eq!(values.sizes(), &[1, 3]);
        assert_eq!(values.to_vec(), vec![9.0, 7.0, 7.0]);
        assert_eq!(indices.to_vec(), vec![1, 0, 0]);
    }

    #[test]
    fn cumsum_along_rows() {
        let v = Tensor::<f32>::ones(&[1, 1, 5, 4]).unwrap();
        let context = v.cumsum(-2).unwrap();

        assert_eq!(context.sizes(), &[1, 1, 5, 4]);
        for row in 0..5 {
            let expected = Tensor::full((row + 1) as f32, &[4]).unwrap();
            let actual = context.select(0, 0).unwrap().select(0, 0).unwrap();
            assert_eq!(actual.select(0, row).unwrap(), expected);
        }

        let a = Tensor::new(&[1, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
        assert_eq!(a.cumsum(1).unwrap().to_vec(), vec![1, 3, 6, 4, 9, 15]);
        assert_eq!(a.cumsum(0).unwrap().to_vec(), vec![1, 2, 3, 5, 7, 9]);
        assert_eq!(
            a.transpose(0, 1).unwrap().cumsum(0).unwrap().to_vec(),
            vec![1, 4, 3, 9, 6, 15]
        );
    }
}
