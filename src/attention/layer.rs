use super::{Attention, AttentionOutput};
use crate::{
    core::{
        errors::{AttentionShapeError, RankError},
        utils::cast_usize,
    },
    Tensor,
};
use anyhow::Result;
use num_traits::{Float, FromPrimitive};
use rand::{Rng, RngCore};
use std::iter::Sum;
use tracing::debug;

/// Affine map `y = x W + b` with `W: [in, out]`.
#[derive(Debug, Clone)]
pub struct Linear<F> {
    pub weight: Tensor<F>,
    pub bias: Tensor<F>,
}

impl<F> Linear<F>
where
    F: Float + Sum + FromPrimitive,
{
    /// Weights and bias drawn uniformly from `±1 / sqrt(in_features)`.
    pub fn new<R>(in_features: usize, out_features: usize, rng: &mut R) -> Result<Linear<F>>
    where
        R: Rng + ?Sized,
    {
        let bound = F::one() / cast_usize::<F>(in_features)?.sqrt();

        let weight = Tensor::uniform(-bound, bound, &[in_features, out_features], rng)?;
        let bias = Tensor::uniform(-bound, bound, &[out_features], rng)?;

        Ok(Linear { weight, bias })
    }

    pub fn from_weights(weight: Tensor<F>, bias: Tensor<F>) -> Result<Linear<F>> {
        if weight.rank() != 2 {
            return Err(RankError {
                required: 2,
                rank: weight.rank(),
            }
            .into());
        }

        Ok(Linear { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.sizes()[0]
    }

    pub fn out_features(&self) -> usize {
        self.weight.sizes()[1]
    }

    /// Maps the last dimension; leading dimensions broadcast.
    pub fn forward(&self, input: &Tensor<F>) -> Result<Tensor<F>> {
        input.matmul(&self.weight)? + &self.bias
    }
}

/// Multi-head projections around an inner attention.
///
/// `d_model` inputs are projected to `heads` heads of `d_keys` (queries, keys) and
/// `d_values` (values) features, attended, merged, and projected back to `d_model`.
#[derive(Debug, Clone)]
pub struct AttentionLayer<F, A> {
    inner: A,
    query_projection: Linear<F>,
    key_projection: Linear<F>,
    value_projection: Linear<F>,
    out_projection: Linear<F>,
    heads: usize,
    d_keys: usize,
    d_values: usize,
    mix: bool,
}

impl<F, A> AttentionLayer<F, A>
where
    F: Float + Sum + FromPrimitive,
    A: Attention<F>,
{
    /// `d_keys` and `d_values` default to `d_model / heads`.
    pub fn new<R>(
        inner: A,
        d_model: usize,
        heads: usize,
        d_keys: Option<usize>,
        d_values: Option<usize>,
        mix: bool,
        rng: &mut R,
    ) -> Result<AttentionLayer<F, A>>
    where
        R: Rng + ?Sized,
    {
        let needs_split = d_keys.is_none() || d_values.is_none();
        if heads == 0 || (needs_split && d_model % heads != 0) {
            return Err(AttentionShapeError::Heads { d_model, heads }.into());
        }

        let d_keys = d_keys.unwrap_or(d_model / heads);
        let d_values = d_values.unwrap_or(d_model / heads);

        Ok(AttentionLayer {
            inner,
            query_projection: Linear::new(d_model, d_keys * heads, rng)?,
            key_projection: Linear::new(d_model, d_keys * heads, rng)?,
            value_projection: Linear::new(d_model, d_values * heads, rng)?,
            out_projection: Linear::new(d_values * heads, d_model, rng)?,
            heads,
            d_keys,
            d_values,
            mix,
        })
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// `queries [B, L, d_model]`, `keys` and `values` `[B, S, d_model]`.
    /// Returns the `[B, L, d_model]` output and the inner attention weights, if any.
    pub fn forward(
        &self,
        queries: &Tensor<F>,
        keys: &Tensor<F>,
        values: &Tensor<F>,
        attn_mask: Option<&Tensor<bool>>,
        rng: &mut dyn RngCore,
    ) -> Result<AttentionOutput<F>> {
        let [batch, length, _] = sequence_layout(queries)?;
        let [_, keys_length, _] = sequence_layout(keys)?;
        sequence_layout(values)?;
        debug!(batch, length, keys_length, heads = self.heads, mix = self.mix, "attention layer");

        let q = self
            .query_projection
            .forward(queries)?
            .view(&[batch, length, self.heads, self.d_keys])?;
        let k = self
            .key_projection
            .forward(keys)?
            .view(&[batch, keys_length, self.heads, self.d_keys])?;
        let v = self
            .value_projection
            .forward(values)?
            .view(&[batch, keys_length, self.heads, self.d_values])?;

        let AttentionOutput { context, attention } =
            self.inner.forward(&q, &k, &v, attn_mask, rng)?;

        // Mixing reads the heads-first layout as if it were sequence-first.
        let context = if self.mix {
            context.transpose(2, 1)?.to_contiguous()?
        } else {
            context
        };
        let merged = context.reshape(&[batch, length, self.heads * self.d_values])?;

        Ok(AttentionOutput {
            context: self.out_projection.forward(&merged)?,
            attention,
        })
    }
}

fn sequence_layout<T>(tensor: &Tensor<T>) -> Result<[usize; 3]> {
    <[usize; 3]>::try_from(tensor.sizes())
        .map_err(|_| AttentionShapeError::Layout(tensor.sizes().to_vec()).into())
}
