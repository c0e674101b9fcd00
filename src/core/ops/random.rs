use crate::{
    core::{errors::EmptyRangeError, utils::cast_f64},
    Tensor,
};
use anyhow::Result;
use num_traits::Float;
use rand::Rng;

impl Tensor<usize> {
    /// Uniform integers in `[0, high)`.
    pub fn randint<R>(high: usize, sizes: &[usize], rng: &mut R) -> Result<Tensor<usize>>
    where
        R: Rng + ?Sized,
    {
        if high == 0 {
            return Err(EmptyRangeError.into());
        }

        let data = (0..sizes.iter().product::<usize>())
            .map(|_| rng.gen_range(0..high))
            .collect();

        Tensor::init(data, sizes)
    }
}

impl<F> Tensor<F>
where
    F: Float,
{
    /// Uniform floats in `[0, 1)`.
    pub fn rand<R>(sizes: &[usize], rng: &mut R) -> Result<Tensor<F>>
    where
        R: Rng + ?Sized,
    {
        Tensor::uniform(F::zero(), F::one(), sizes, rng)
    }

    /// Uniform floats in `[low, high)`.
    pub fn uniform<R>(low: F, high: F, sizes: &[usize], rng: &mut R) -> Result<Tensor<F>>
    where
        R: Rng + ?Sized,
    {
        let data = (0..sizes.iter().product::<usize>())
            .map(|_| -> Result<F> {
                let sample = cast_f64::<F>(rng.gen::<f64>())?;
                Ok(low + (high - low) * sample)
            })
            .collect::<Result<Vec<F>>>()?;

        Tensor::init(data, sizes)
    }
}
