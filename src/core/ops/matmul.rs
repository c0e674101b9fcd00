use crate::{
    core::{
        errors::{MatmulShapeError, RankError},
        iters::Indexer,
        shape::Shape,
    },
    Tensor,
};
use anyhow::Result;
use std::{iter::Sum, ops::Mul};

impl<T> Tensor<T>
where
    T: Copy + Mul<Output = T> + Sum<T>,
{
    pub fn matmul_2d(&self, rhs: &Tensor<T>) -> Result<Tensor<T>> {
        for rank in [self.rank(), rhs.rank()] {
            if rank != 2 {
                return Err(RankError { required: 2, rank }.into());
            }
        }

        let (n1, n2) = (self.sizes()[1], rhs.sizes()[0]);

        if n1 != n2 {
            return Err(MatmulShapeError::Matmul2d { n1, n2 }.into());
        }

        let (m, l) = (self.sizes()[0], rhs.sizes()[1]);
        let mut data = Vec::with_capacity(m * l);

        for i in 0..m {
            for j in 0..l {
                let prodsum = (0..n1).map(|k| self.idx(&[i, k]) * rhs.idx(&[k, j])).sum();
                data.push(prodsum);
            }
        }

        Tensor::init(data, &[m, l])
    }

    /// Batched product over the last two dimensions; leading dimensions broadcast.
    pub fn matmul_nd(&self, rhs: &Tensor<T>) -> Result<Tensor<T>> {
        let (lhs_rank, rhs_rank) = (self.rank(), rhs.rank());
        for rank in [lhs_rank, rhs_rank] {
            if rank < 2 {
                return Err(RankError { required: 2, rank }.into());
            }
        }

        let (m, n1) = (self.sizes()[lhs_rank - 2], self.sizes()[lhs_rank - 1]);
        let (n2, l) = (rhs.sizes()[rhs_rank - 2], rhs.sizes()[rhs_rank - 1]);

        if n1 != n2 {
            return Err(MatmulShapeError::MatmulNd { n1, n2 }.into());
        }

        let batch = Shape::broadcast(&self.sizes()[..lhs_rank - 2], &rhs.sizes()[..rhs_rank - 2])?;
        let lhs = self.broadcast_to(&[batch.as_slice(), &[m, n1]].concat())?;
        let rhs = rhs.broadcast_to(&[batch.as_slice(), &[n2, l]].concat())?;

        let rank = batch.len() + 2;
        let (row, column) = (rank - 2, rank - 1);

        let sizes = [batch.as_slice(), &[m, l]].concat();
        let data = Indexer::new(&sizes)
            .map(|index| {
                let mut lhs_index = index.clone();
                let mut rhs_index = index;

                (0..n1)
                    .map(|k| {
                        lhs_index[column] = k;
                        rhs_index[row] = k;
                        lhs.idx(&lhs_index) * rhs.idx(&rhs_index)
                    })
                    .sum()
            })
            .collect();

        Tensor::init(data, &sizes)
    }

    /// Matrix product with the broadcasting and 1-d promotion rules of `numpy.matmul`.
    pub fn matmul(&self, rhs: &Tensor<T>) -> Result<Tensor<T>> {
        match (self.rank(), rhs.rank()) {
            (0, _) | (_, 0) => Err(MatmulShapeError::Matmul0d.into()),
            (1, 1) => {
                let (n1, n2) = (self.numel(), rhs.numel());
                if n1 != n2 {
                    return Err(MatmulShapeError::Matmul2d { n1, n2 }.into());
                }

                Tensor::scalar((self * rhs)?.sum()?)
            }
            (2, 2) => self.matmul_2d(rhs),
            (1, _) => self.unsqueeze(0)?.matmul_nd(rhs)?.squeeze_dim(-2),
            (_, 1) => self.matmul_nd(&rhs.unsqueeze(1)?)?.squeeze_dim(-1),
            _ => self.matmul_nd(rhs),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Tensor;

    #[test]
    fn explicit_products_need_matrices() {
        let v = Tensor::new_1d(&[1.0, 2.0]).unwrap();
        let m = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let s = Tensor::scalar(2.0).unwrap();

        assert!(v.matmul_2d(&m).is_err());
        assert!(m.matmul_2d(&v).is_err());
        assert!(v.matmul_nd(&m).is_err());
        assert!(m.matmul_nd(&s).is_err());
        assert!(m.unsqueeze(0).unwrap().matmul_2d(&m).is_err());
        assert_eq!(v.matmul(&m).unwrap().to_vec(), vec![7.0, 10.0]);
    }

    #[test]
    fn matmul_2d() {
        let a = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]).unwrap();
        let b = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[3, 2]).unwrap();

        let c = a.matmul(&b).unwrap();
        assert_eq!(c, Tensor::new(&[22., 28., 49., 64.], &[2, 2]).unwrap());
        assert!(a.matmul(&a).is_err());
    }

    #[test]
    fn matmul_transposed_view() {
        let a = Tensor::new(&[1, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
        let gram = a.matmul(&a.transpose(0, 1).unwrap()).unwrap();
        assert_eq!(gram, Tensor::new(&[14, 32, 32, 77], &[2, 2]).unwrap());
    }

    #[test]
    fn matmul_batched_broadcast() {
        let a = Tensor::arange(0, 50, 1).unwrap().view(&[5, 5, 2]).unwrap();
        let b = Tensor::arange(0, 10, 1).unwrap().view(&[2, 5]).unwrap();

        let c = a.matmul(&b).unwrap();
        assert_eq!(c.sizes(), &[5, 5, 5]);

        for batch in 0..5 {
            let expected = a.select(0, batch).unwrap().matmul_2d(&b).unwrap();
            assert_eq!(c.select(0, batch).unwrap(), expected);
        }
    }

    #[test]
    fn matmul_row_per_query() {
        // [.., 5, 1, 4] @ [.., 5, 4, 3] -> [.., 5, 1, 3]
        let q = Tensor::<f32>::ones(&[1, 1, 5, 1, 4]).unwrap();
        let k = Tensor::<f32>::ones(&[1, 1, 5, 4, 3]).unwrap();

        let qk = q.matmul(&k).unwrap();
        assert_eq!(qk.sizes(), &[1, 1, 5, 1, 3]);
        assert!(qk.to_vec().iter().all(|&x| x == 4.0));
    }

    #[test]
    fn matmul_vectors() {
        let v = Tensor::new(&[1, 2, 3], &[3]).unwrap();
        let m = Tensor::new(&[1, 0, 0, 1, 1, 1], &[3, 2]).unwrap();

        assert_eq!(v.matmul(&v).unwrap().to_vec(), vec![14]);
        assert_eq!(v.matmul(&m).unwrap(), Tensor::new(&[4, 5], &[2]).unwrap());
        assert_eq!(
            m.transpose(0, 1).unwrap().matmul(&v).unwrap(),
            Tensor::new(&[4, 5], &[2]).unwrap()
        );
        assert!(Tensor::scalar(1).unwrap().matmul(&v).is_err());
    }
}
