use anyhow::Result;
use num_traits::Float;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::Tensor;

// --- Standard binary operations ---

macro_rules! binary_ops {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<T> $trait for Tensor<T>
        where
            T: Copy + $trait<Output = T>,
        {
            type Output = Result<Tensor<T>>;
            fn $method(self, rhs: Tensor<T>) -> Self::Output {
                self.zip(&rhs, |l, r| l $op r)
            }
        }

        impl<T> $trait for &Tensor<T>
        where
            T: Copy + $trait<Output = T>,
        {
            type Output = Result<Tensor<T>>;
            fn $method(self, rhs: &Tensor<T>) -> Self::Output {
                self.zip(rhs, |l, r| l $op r)
            }
        }

        impl<T> $trait<Tensor<T>> for &Tensor<T>
        where
            T: Copy + $trait<Output = T>,
        {
            type Output = Result<Tensor<T>>;
            fn $method(self, rhs: Tensor<T>) -> Self::Output {
                self.zip(&rhs, |l, r| l $op r)
            }
        }

        impl<T> $trait<&Tensor<T>> for Tensor<T>
        where
            T: Copy + $trait<Output = T>,
        {
            type Output = Result<Tensor<T>>;
            fn $method(self, rhs: &Tensor<T>) -> Self::Output {
                self.zip(rhs, |l, r| l $op r)
            }
        }

        impl<T> $trait<T> for Tensor<T>
        where
            T: Copy + $trait<Output = T>,
        {
            type Output = Result<Tensor<T>>;
            fn $method(self, rhs: T) -> Self::Output {
                self.binary_map(rhs, |l, r| l $op r)
            }
        }

        impl<T> $trait<T> for &Tensor<T>
        where
            T: Copy + $trait<Output = T>,
        {
            type Output = Result<Tensor<T>>;
            fn $method(self, rhs: T) -> Self::Output {
                self.binary_map(rhs, |l, r| l $op r)
            }
        }
    };
}

binary_ops!(Add, add, +);
binary_ops!(Sub, sub, -);
binary_ops!(Mul, mul, *);
binary_ops!(Div, div, /);

impl<T> Neg for &Tensor<T>
where
    T: Copy + Neg<Output = T>,
{
    type Output = Result<Tensor<T>>;
    fn neg(self) -> Self::Output {
        self.unary_map(|elem| -elem)
    }
}

// --- Comparisons ---

impl<T> Tensor<T>
where
    T: Copy + PartialEq,
{
    pub fn elem_eq(&self, rhs: &Tensor<T>) -> Result<Tensor<bool>> {
        self.zip(rhs, |l, r| l == r)
    }

    pub fn elem_ne(&self, rhs: &Tensor<T>) -> Result<Tensor<bool>> {
        self.zip(rhs, |l, r| l != r)
    }
}

impl Tensor<bool> {
    pub fn all(&self) -> bool {
        self.data().iter().all(|&elem| elem)
    }

    pub fn any(&self) -> bool {
        self.data().iter().any(|&elem| elem)
    }

    pub fn logical_not(&self) -> Result<Tensor<bool>> {
        self.unary_map(|elem| !elem)
    }
}

// --- Operations for floats ---

impl<F> Tensor<F>
where
    F: Float,
{
    pub fn ln(&self) -> Result<Tensor<F>> {
        self.unary_map(|elem| elem.ln())
    }

    pub fn exp(&self) -> Result<Tensor<F>> {
        self.unary_map(|elem| elem.exp())
    }

    pub fn powi(&self, rhs: i32) -> Result<Tensor<F>> {
        self.unary_map(|elem| elem.powi(rhs))
    }

    pub fn powf(&self, rhs: F) -> Result<Tensor<F>> {
        self.unary_map(|elem| elem.powf(rhs))
    }

    pub fn sqrt(&self) -> Result<Tensor<F>> {
        self.unary_map(|elem| elem.sqrt())
    }

    /// `|l - r| <= atol + rtol * |r|` everywhere, after broadcasting.
    /// Infinities compare equal when their signs match; NaN is never close.
    pub fn allclose(&self, rhs: &Tensor<F>, rtol: F, atol: F) -> Result<bool> {
        let close = self.zip(rhs, |l, r| {
            if l.is_infinite() || r.is_infinite() {
                l == r
            } else {
                (l - r).abs() <= atol + rtol * r.abs()
            }
        })?;

        Ok(close.all())
    }
}

#[cfg(test)]
mod tests {
    use crate::Tensor;

    #[test]
    fn broadcast_arithmetic() {
        let a = Tensor::linspace(1, 5, 5).unwrap();
        let b = Tensor::linspace(1, 5, 5).unwrap().reshape(&[5, 1]).unwrap();

        let prod = (&a * &b).unwrap();
        assert_eq!(prod.sizes(), &[5, 5]);
        assert_eq!(prod.index(&[2, 3]).unwrap(), 12);
        assert_eq!(prod.index(&[4, 4]).unwrap(), 25);

        assert!((&a + &Tensor::<i32>::zeros(&[2]).unwrap()).is_err());
    }

    #[test]
    fn scalar_ops_on_views() {
        let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let t = a.transpose(0, 1).unwrap();

        let scaled = (&t * 2.0).unwrap();
        assert_eq!(scaled.to_vec(), vec![2.0, 6.0, 4.0, 8.0]);
        assert_eq!((-&a).unwrap().to_vec(), vec![-1.0, -2.0, -3.0, -4.0]);
    }

    #[test]
    fn comparisons() {
        let a = Tensor::new(&[1, 2, 3], &[3]).unwrap();
        let b = Tensor::new(&[1, 0, 3], &[3]).unwrap();

        let eq = a.elem_eq(&b).unwrap();
        assert_eq!(eq.to_vec(), vec![true, false, true]);
        assert!(!eq.all());
        assert!(eq.any());
        assert!(a.elem_ne(&b).unwrap().any());
        assert!(a.elem_eq(&a).unwrap().all());
        assert!(!eq.logical_not().unwrap().all());
    }

    #[test]
    fn allclose_handles_infinities() {
        let inf = f32::NEG_INFINITY;
        let a = Tensor::new(&[1.0, inf, 3.0], &[3]).unwrap();
        let b = Tensor::new(&[1.0 + 1e-7, inf, 3.0], &[3]).unwrap();
        let c = Tensor::new(&[1.0, f32::INFINITY, 3.0], &[3]).unwrap();
        let d = Tensor::new(&[1.0, f32::NAN, 3.0], &[3]).unwrap();

        assert!(a.allclose(&b, 1e-5, 1e-6).unwrap());
        assert!(!a.allclose(&c, 1e-5, 1e-6).unwrap());
        assert!(!d.allclose(&d, 1e-5, 1e-6).unwrap());
    }
}
