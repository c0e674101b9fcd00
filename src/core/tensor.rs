use anyhow::Result;
use num_traits::{FromPrimitive, NumOps, One, Zero};
use std::{borrow::Cow, cmp::Ordering, fmt::Debug, iter::successors, ops::Add, sync::Arc};

use crate::core::{
    errors::*,
    iters::{Indexer, Slicer},
    shape::Shape,
    utils::{cast_usize, normalize_dim},
};

/// Dense N-dimensional array over shared, immutable storage.
///
/// View operations (`view`, `transpose`, `unsqueeze`, `expand`, `select`, ...) share the
/// storage and only rewrite the shape. Everything else allocates a new buffer.
pub struct Tensor<T> {
    pub(crate) data: Arc<Vec<T>>,
    pub(crate) shape: Shape,
}

impl<T: Copy> Tensor<T> {
    pub(crate) fn init(data: Vec<T>, sizes: &[usize]) -> Result<Tensor<T>> {
        let shape = Shape::new(sizes);
        shape.valid_data_length(data.len())?;

        Ok(Tensor {
            data: Arc::new(data),
            shape,
        })
    }

    pub fn new(data: &[T], sizes: &[usize]) -> Result<Tensor<T>> {
        Tensor::init(data.to_vec(), sizes)
    }

    pub fn new_1d(data: &[T]) -> Result<Tensor<T>> {
        Tensor::init(data.to_vec(), &[data.len()])
    }

    pub fn scalar(data: T) -> Result<Tensor<T>> {
        Ok(Tensor {
            data: Arc::new(vec![data]),
            shape: Shape::scalar(),
        })
    }

    pub fn full(element: T, sizes: &[usize]) -> Result<Tensor<T>> {
        Tensor::init(vec![element; sizes.iter().product()], sizes)
    }

    pub fn zeros(sizes: &[usize]) -> Result<Tensor<T>>
    where
        T: Zero,
    {
        Tensor::full(T::zero(), sizes)
    }

    pub fn ones(sizes: &[usize]) -> Result<Tensor<T>>
    where
        T: One,
    {
        Tensor::full(T::one(), sizes)
    }

    pub fn eye(size: usize) -> Result<Tensor<T>>
    where
        T: Zero + One,
    {
        let diagonal = size + 1;
        let data = (0..size * size)
            .map(|elem| {
                if elem % diagonal == 0 {
                    T::one()
                } else {
                    T::zero()
                }
            })
            .collect();

        Tensor::init(data, &[size, size])
    }

    pub fn arange(start: T, end: T, step: T) -> Result<Tensor<T>>
    where
        T: Add<Output = T> + PartialOrd + Zero,
    {
        let ascending = match step
            .partial_cmp(&T::zero())
            .ok_or(ArangeError::Comparison)?
        {
            Ordering::Equal => Err(ArangeError::Zero),
            _ if start == end => return Tensor::init(Vec::new(), &[0]),
            Ordering::Greater if end > start => Ok(true),
            Ordering::Less if start > end => Ok(false),
            Ordering::Greater => Err(ArangeError::Positive),
            Ordering::Less => Err(ArangeError::Negative),
        }?;

        let data: Vec<T> = successors(Some(start), |&prev| {
            let curr = prev + step;
            let within = if ascending { end > curr } else { curr > end };
            within.then_some(curr)
        })
        .collect();

        Tensor::new_1d(&data)
    }

    pub fn linspace(start: T, end: T, num: usize) -> Result<Tensor<T>>
    where
        T: NumOps + FromPrimitive + Debug,
    {
        if num < 2 {
            return Tensor::init(vec![start; num], &[num]);
        }

        let intervals = cast_usize::<T>(num - 1)?;
        let step = (end - start) / intervals;

        let data = successors(Some(start), |&prev| Some(prev + step))
            .take(num)
            .collect();

        Tensor::init(data, &[num])
    }

    // --- Data ---

    pub fn to_contiguous(&self) -> Result<Tensor<T>> {
        Tensor::init(self.data_non_contiguous(), &self.shape.sizes)
    }

    pub(crate) fn into_contiguous(self) -> Result<Tensor<T>> {
        if self.is_contiguous() {
            Ok(self)
        } else {
            self.to_contiguous()
        }
    }

    pub(crate) fn data_contiguous(&self) -> &[T] {
        let start = self.offset();
        let end = start + self.numel();
        &self.data[start..end]
    }

    pub(crate) fn data_non_contiguous(&self) -> Vec<T> {
        Indexer::new(&self.shape.sizes)
            .map(|index| self.idx(&index))
            .collect()
    }

    /// Elements in row-major order of the current view.
    pub fn data(&self) -> Cow<'_, [T]> {
        if self.is_contiguous() {
            Cow::Borrowed(self.data_contiguous())
        } else {
            Cow::Owned(self.data_non_contiguous())
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.data().into_owned()
    }

    pub(crate) fn idx(&self, indices: &[usize]) -> T {
        self.data[self.shape.idx(indices)]
    }

    pub fn index(&self, indices: &[usize]) -> Result<T> {
        Ok(self.data[self.shape.index(indices)?])
    }

    // --- New Data, New Shape ---

    pub fn reshape(&self, sizes: &[usize]) -> Result<Tensor<T>> {
        self.shape.valid_reshape(sizes)?;

        Tensor::init(self.data().into_owned(), sizes)
    }

    pub fn flatten(&self) -> Result<Tensor<T>> {
        self.reshape(&[self.numel()])
    }

    // --- Maps, Zips and Reduce ---

    pub fn unary_map<R>(&self, mut f: impl FnMut(T) -> R) -> Result<Tensor<R>> {
        let data = if self.is_contiguous() {
            self.data_contiguous().iter().map(|&elem| f(elem)).collect()
        } else {
            Indexer::new(&self.shape.sizes)
                .map(|index| f(self.idx(&index)))
                .collect()
        };

        Ok(Tensor {
            data: Arc::new(data),
            shape: Shape::new(self.sizes()),
        })
    }

    pub fn binary_map<R>(&self, rhs: T, f: impl Fn(T, T) -> R) -> Result<Tensor<R>> {
        self.unary_map(|elem| f(elem, rhs))
    }

    pub fn zip<U, R>(&self, rhs: &Tensor<U>, f: impl Fn(T, U) -> R) -> Result<Tensor<R>>
    where
        U: Copy,
    {
        if self.sizes() == rhs.sizes() {
            self.equal_zip(rhs, f)
        } else {
            self.broadcast_zip(rhs, f)
        }
    }

    fn equal_zip<U, R>(&self, rhs: &Tensor<U>, f: impl Fn(T, U) -> R) -> Result<Tensor<R>>
    where
        U: Copy,
    {
        let data = if self.is_contiguous() && rhs.is_contiguous() {
            self.data_contiguous()
                .iter()
                .zip(rhs.data_contiguous().iter())
                .map(|(&lhs_elem, &rhs_elem)| f(lhs_elem, rhs_elem))
                .collect()
        } else {
            Indexer::new(&self.shape.sizes)
                .map(|index| f(self.idx(&index), rhs.idx(&index)))
                .collect()
        };

        Ok(Tensor {
            data: Arc::new(data),
            shape: Shape::new(self.sizes()),
        })
    }

    fn broadcast_zip<U, R>(&self, rhs: &Tensor<U>, f: impl Fn(T, U) -> R) -> Result<Tensor<R>>
    where
        U: Copy,
    {
        let sizes = Shape::broadcast(&self.shape.sizes, &rhs.shape.sizes)?;
        let lhs_broadcasted = self.broadcast_to(&sizes)?;
        let rhs_broadcasted = rhs.broadcast_to(&sizes)?;

        let data = Indexer::new(&sizes)
            .map(|index| f(lhs_broadcasted.idx(&index), rhs_broadcasted.idx(&index)))
            .collect();

        Ok(Tensor {
            data: Arc::new(data),
            shape: Shape::new(&sizes),
        })
    }

    /// Applies `f` to every slice spanning `dimensions`.
    /// Reduced dimensions are kept as size 1 with `keepdims`, dropped otherwise.
    pub fn reduce<R>(
        &self,
        f: impl Fn(&Tensor<T>) -> Result<R>,
        dimensions: &[usize],
        keepdims: bool,
    ) -> Result<Tensor<R>>
    where
        R: Copy,
    {
        self.shape.valid_dimensions(dimensions)?;

        let fixed: Vec<usize> = (0..self.rank())
            .filter(|d| !dimensions.contains(d))
            .collect();

        let data = Slicer::new(&self.shape.sizes, &fixed)
            .map(|index| f(&self.slicer(&index)))
            .collect::<Result<Vec<R>>>()?;

        let sizes: Vec<usize> = self
            .shape
            .sizes
            .iter()
            .enumerate()
            .filter_map(|(d, &size)| {
                if dimensions.contains(&d) {
                    keepdims.then_some(1)
                } else {
                    Some(size)
                }
            })
            .collect();

        Tensor::init(data, &sizes)
    }
}

impl<T> Tensor<T> {
    // --- Same Data, Different Shape ---

    pub(crate) fn with_shape(&self, shape: Shape) -> Tensor<T> {
        Tensor {
            data: Arc::clone(&self.data),
            shape,
        }
    }

    pub(crate) fn dim(&self, dimension: isize) -> Result<usize> {
        Ok(normalize_dim(dimension, self.rank(), 0)?)
    }

    pub fn view(&self, sizes: &[usize]) -> Result<Tensor<T>> {
        Ok(self.with_shape(self.shape.view(sizes)?))
    }

    /// Removes every dimension of size 1.
    pub fn squeeze(&self) -> Result<Tensor<T>> {
        Ok(self.with_shape(self.shape.squeeze()))
    }

    /// Removes `dimension` if it has size 1, otherwise returns the same view.
    pub fn squeeze_dim(&self, dimension: isize) -> Result<Tensor<T>> {
        let dimension = self.dim(dimension)?;
        Ok(self.with_shape(self.shape.squeeze_dim(dimension)))
    }

    /// Inserts a dimension of size 1 at `dimension`, which may range over `-rank-1..=rank`.
    pub fn unsqueeze(&self, dimension: isize) -> Result<Tensor<T>> {
        let dimension = normalize_dim(dimension, self.rank(), 1)?;
        Ok(self.with_shape(self.shape.insert_dim(dimension)))
    }

    pub fn permute(&self, permutation: &[usize]) -> Result<Tensor<T>> {
        Ok(self.with_shape(self.shape.permute(permutation)?))
    }

    pub fn transpose(&self, dim_1: isize, dim_2: isize) -> Result<Tensor<T>> {
        let (dim_1, dim_2) = (self.dim(dim_1)?, self.dim(dim_2)?);
        Ok(self.with_shape(self.shape.transpose(dim_1, dim_2)?))
    }

    pub fn expand(&self, expansions: &[usize]) -> Result<Tensor<T>> {
        Ok(self.with_shape(self.shape.expand(expansions)?))
    }

    pub fn broadcast_to(&self, sizes: &[usize]) -> Result<Tensor<T>> {
        Ok(self.with_shape(self.shape.pad_rank(sizes.len())?.expand(sizes)?))
    }

    /// Indexes `dimension` at `index`, dropping the dimension.
    pub fn select(&self, dimension: isize, index: usize) -> Result<Tensor<T>> {
        let dimension = self.dim(dimension)?;
        Ok(self.with_shape(self.shape.select(dimension, index)?))
    }

    pub fn slice(&self, ranges: &[(usize, usize)]) -> Result<Tensor<T>> {
        Ok(self.with_shape(self.shape.slice(ranges)?))
    }

    pub(crate) fn slicer(&self, indices: &[Option<usize>]) -> Tensor<T> {
        self.with_shape(self.shape.slicer(indices))
    }

    // --- Shape Attributes ---

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn sizes(&self) -> &[usize] {
        &self.shape.sizes
    }

    pub fn strides(&self) -> &[usize] {
        &self.shape.strides
    }

    pub fn offset(&self) -> usize {
        self.shape.offset
    }

    pub fn is_contiguous(&self) -> bool {
        self.shape.is_contiguous()
    }
}

impl<T> Clone for Tensor<T> {
    fn clone(&self) -> Self {
        self.with_shape(self.shape.clone())
    }
}

impl<T: Copy + PartialEq> PartialEq for Tensor<T> {
    fn eq(&self, rhs: &Tensor<T>) -> bool {
        self.sizes() == rhs.sizes() && *self.data() == *rhs.data()
    }
}

#[cfg(test)]
mod tests {
    use crate::Tensor;
    use std::sync::Arc;

    #[test]
    fn views_share_storage() {
        let a = Tensor::new(&[1, 2, 3, 4, 5, 6, 7, 8, 9], &[1, 9]).unwrap();
        let b = a.view(&[3, 3]).unwrap();
        let c = b.transpose(0, 1).unwrap().unsqueeze(0).unwrap();

        assert!(Arc::ptr_eq(&a.data, &b.data));
        assert!(Arc::ptr_eq(&a.data, &c.data));
        assert_eq!(c.sizes(), &[1, 3, 3]);
    }

    #[test]
    fn invalid_data_length() {
        assert!(Tensor::new(&[1, 2, 3], &[2, 2]).is_err());
    }

    #[test]
    fn transpose_reads_logical_order() {
        let a = Tensor::new(&[1, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
        let t = a.transpose(-2, -1).unwrap();

        assert_eq!(t.sizes(), &[3, 2]);
        assert!(!t.is_contiguous());
        assert_eq!(t.to_vec(), vec![1, 4, 2, 5, 3, 6]);
        assert_eq!(t, Tensor::new(&[1, 4, 2, 5, 3, 6], &[3, 2]).unwrap());
    }

    #[test]
    fn unsqueeze_positions() {
        let k = Tensor::<f32>::zeros(&[1, 1, 5, 4]).unwrap();

        assert_eq!(k.unsqueeze(-1).unwrap().sizes(), &[1, 1, 5, 4, 1]);
        assert_eq!(k.unsqueeze(-2).unwrap().sizes(), &[1, 1, 5, 1, 4]);
        assert_eq!(k.unsqueeze(-3).unwrap().sizes(), &[1, 1, 1, 5, 4]);
        assert_eq!(k.unsqueeze(0).unwrap().sizes(), &[1, 1, 1, 5, 4]);
        assert_eq!(k.unsqueeze(4).unwrap().sizes(), &[1, 1, 5, 4, 1]);
        assert!(k.unsqueeze(5).is_err());
        assert!(k.unsqueeze(-6).is_err());
    }

    #[test]
    fn expand_repeats_rows() {
        let k = Tensor::arange(0, 8, 1).unwrap().view(&[2, 4]).unwrap();
        let expanded = k.unsqueeze(0).unwrap().expand(&[3, 2, 4]).unwrap();

        assert_eq!(expanded.sizes(), &[3, 2, 4]);
        for i in 0..3 {
            assert_eq!(expanded.select(0, i).unwrap(), k);
        }
    }

    #[test]
    fn select_and_squeeze() {
        let a = Tensor::arange(0, 24, 1).unwrap().view(&[2, 3, 4]).unwrap();
        let row = a.select(0, 1).unwrap().select(0, 2).unwrap();
        assert_eq!(row.to_vec(), vec![20, 21, 22, 23]);

        let b = Tensor::<i32>::zeros(&[1, 1, 5, 1, 3]).unwrap();
        assert_eq!(b.squeeze().unwrap().sizes(), &[5, 3]);
        assert_eq!(b.squeeze_dim(-2).unwrap().sizes(), &[1, 1, 5, 3]);
        assert_eq!(b.squeeze_dim(-1).unwrap().sizes(), &[1, 1, 5, 1, 3]);
    }

    #[test]
    fn reduce_keepdims() {
        let a = Tensor::arange(0, 6, 1).unwrap().view(&[2, 3]).unwrap();

        let rows = a.reduce(|slice| slice.sum(), &[1], false).unwrap();
        assert_eq!(rows, Tensor::new(&[3, 12], &[2]).unwrap());

        let cols = a.reduce(|slice| slice.sum(), &[0], true).unwrap();
        assert_eq!(cols, Tensor::new(&[3, 5, 7], &[1, 3]).unwrap());
    }

    #[test]
    fn constructors() {
        assert_eq!(
            Tensor::<i32>::eye(2).unwrap(),
            Tensor::new(&[1, 0, 0, 1], &[2, 2]).unwrap()
        );
        assert_eq!(Tensor::arange(5, 0, -2).unwrap().to_vec(), vec![5, 3, 1]);
        assert!(Tensor::arange(0, 5, 0).is_err());
        assert!(Tensor::arange(5, 0, 1).is_err());
        assert_eq!(Tensor::arange(3, 0, -1).unwrap().to_vec(), vec![3, 2, 1]);
        assert_eq!(
            Tensor::linspace(0.0, 1.0, 5).unwrap().to_vec(),
            vec![0.0, 0.25, 0.5, 0.75, 1.0]
        );
        assert_eq!(Tensor::scalar(3.0).unwrap().rank(), 0);

        let empty = Tensor::arange(2.0, 2.0, 0.5).unwrap();
        assert_eq!(empty.sizes(), &[0]);
        assert!(Tensor::arange(4, 4, -1).unwrap().to_vec().is_empty());
        assert_eq!(Tensor::full(true, &[2, 2]).unwrap().numel(), 4);
    }
}
