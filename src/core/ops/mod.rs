mod activation;
mod einsum;
mod elem_ops;
mod mask;
mod matmul;
mod random;
mod reduce_ops;
mod select;

pub use activation::Dropout;
pub use einsum::{einsum, Equation};
