//! Attention mechanisms over `[batch, length, heads, features]` tensors.

mod config;
mod full;
mod layer;
mod masking;
mod prob;

pub use config::AttentionConfig;
pub use full::FullAttention;
pub use layer::{AttentionLayer, Linear};
pub use masking::{ProbMask, TriangularCausalMask};
pub use prob::ProbAttention;

use crate::{core::errors::AttentionShapeError, Tensor};
use anyhow::Result;
use rand::RngCore;

/// Result of an attention forward pass.
#[derive(Debug, Clone)]
pub struct AttentionOutput<F> {
    /// `[batch, length, heads, features]`
    pub context: Tensor<F>,
    /// `[batch, heads, length, length]`, present when the config asks for it.
    pub attention: Option<Tensor<F>>,
}

pub trait Attention<F> {
    /// `queries [B, L, H, E]`, `keys [B, S, H, E]`, `values [B, S, H, D]`.
    fn forward(
        &self,
        queries: &Tensor<F>,
        keys: &Tensor<F>,
        values: &Tensor<F>,
        attn_mask: Option<&Tensor<bool>>,
        rng: &mut dyn RngCore,
    ) -> Result<AttentionOutput<F>>;
}

pub(crate) fn layout<T>(tensor: &Tensor<T>) -> Result<[usize; 4]> {
    <[usize; 4]>::try_from(tensor.sizes())
        .map_err(|_| AttentionShapeError::Layout(tensor.sizes().to_vec()).into())
}
