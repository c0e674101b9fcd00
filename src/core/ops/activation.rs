use crate::{
    core::{errors::ProbabilityError, utils::cast_f64},
    Tensor,
};
use anyhow::Result;
use num_traits::Float;
use rand::Rng;
use std::iter::Sum;

impl<F> Tensor<F>
where
    F: Float + Sum,
{
    /// Normalised exponentials along `dimension`, shifted by the maximum for stability.
    /// `-inf` entries become zero; a lane of only `-inf` becomes NaN.
    pub fn softmax(&self, dimension: isize) -> Result<Tensor<F>> {
        let dims = [self.dim(dimension)?];

        let max = self.max_dims(&dims, true)?;
        let exp = (self - &max)?.exp()?;
        let sum = exp.sum_dims(&dims, true)?;

        exp / sum
    }

    /// Zeroes each element with probability `p` and scales the survivors by `1 / (1 - p)`.
    pub fn dropout<R>(&self, p: f64, rng: &mut R) -> Result<Tensor<F>>
    where
        R: Rng + ?Sized,
    {
        if !(0.0..=1.0).contains(&p) {
            return Err(ProbabilityError(p).into());
        }

        if p == 0.0 {
            return Ok(self.clone());
        }

        if p == 1.0 {
            return self.unary_map(|_| F::zero());
        }

        let scale = cast_f64::<F>(1.0 / (1.0 - p))?;
        self.unary_map(|elem| {
            if rng.gen::<f64>() < p {
                F::zero()
            } else {
                elem * scale
            }
        })
    }
}

/// Dropout layer; the identity outside training.
#[derive(Debug, Clone, Copy)]
pub struct Dropout {
    pub p: f64,
    pub training: bool,
}

impl Dropout {
    pub fn new(p: f64) -> Dropout {
        Dropout { p, training: true }
    }

    pub fn train(self) -> Dropout {
        Dropout {
            training: true,
            ..self
        }
    }

    pub fn eval(self) -> Dropout {
        Dropout {
            training: false,
            ..self
        }
    }

    pub fn forward<F, R>(&self, input: &Tensor<F>, rng: &mut R) -> Result<Tensor<F>>
    where
        F: Float + Sum,
        R: Rng + ?Sized,
    {
        if self.training {
            input.dropout(self.p, rng)
        } else {
            Ok(input.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Dropout;
    use crate::Tensor;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn softmax_rows_sum_to_one() {
        let a = Tensor::new(&[1.0f32, 2.0, 3.0, 1.0, 1.0, 1.0], &[2, 3]).unwrap();
        let soft = a.softmax(-1).unwrap();

        let sums = soft.sum_dims(&[1], false).unwrap();
        assert!(sums.allclose(&Tensor::ones(&[2]).unwrap(), 1e-6, 1e-6).unwrap());
        assert!((soft.index(&[1, 0]).unwrap() - 1.0 / 3.0).abs() < 1e-6);
        assert!(soft.index(&[0, 2]).unwrap() > soft.index(&[0, 1]).unwrap());
    }

    #[test]
    fn softmax_is_shift_invariant() {
        let a = Tensor::new(&[1000.0f64, 1001.0, 1002.0], &[3]).unwrap();
        let b = Tensor::new(&[0.0f64, 1.0, 2.0], &[3]).unwrap();

        let soft = a.softmax(0).unwrap();
        assert!(soft.to_vec().iter().all(|x| x.is_finite()));
        assert!(soft.allclose(&b.softmax(0).unwrap(), 1e-12, 1e-12).unwrap());
    }

    #[test]
    fn softmax_of_masked_lane() {
        let inf = f32::NEG_INFINITY;
        let a = Tensor::new(&[1.0, inf, inf, inf], &[2, 2]).unwrap();
        let soft = a.softmax(1).unwrap();

        assert_eq!(soft.index(&[0, 0]).unwrap(), 1.0);
        assert_eq!(soft.index(&[0, 1]).unwrap(), 0.0);
        assert!(soft.index(&[1, 0]).unwrap().is_nan());
    }

    #[test]
    fn dropout_zero_or_scaled() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = Tensor::<f32>::ones(&[64, 64]).unwrap();

        let dropped = a.dropout(0.5, &mut rng).unwrap();
        let data = dropped.to_vec();
        assert!(data.iter().all(|&x| x == 0.0 || x == 2.0));

        let zeros = data.iter().filter(|&&x| x == 0.0).count();
        assert!(zeros > 1500 && zeros < 2600, "{zeros} zeros");
    }

    #[test]
    fn dropout_edge_probabilities() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = Tensor::new(&[1.0, 2.0, 3.0], &[3]).unwrap();

        assert_eq!(a.dropout(0.0, &mut rng).unwrap(), a);
        assert_eq!(a.dropout(1.0, &mut rng).unwrap().to_vec(), vec![0.0; 3]);
        assert!(a.dropout(1.5, &mut rng).is_err());
        assert!(a.dropout(-0.1, &mut rng).is_err());
    }

    #[test]
    fn dropout_layer_eval_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = Tensor::new(&[1.0, 2.0, 3.0], &[3]).unwrap();

        let layer = Dropout::new(0.9).eval();
        assert_eq!(layer.forward(&a, &mut rng).unwrap(), a);
        assert!(layer.train().training);
    }
}
