mod display;
pub(crate) mod errors;
pub(crate) mod iters;
mod ops;
pub(crate) mod shape;
mod tensor;
pub(crate) mod utils;

pub use ops::{einsum, Dropout, Equation};
pub use tensor::Tensor;
