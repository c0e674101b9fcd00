use super::{layout, Attention, AttentionConfig, AttentionOutput, TriangularCausalMask};
use crate::{einsum, Dropout, Tensor};
use anyhow::Result;
use num_traits::{Float, FromPrimitive};
use rand::RngCore;
use std::iter::Sum;
use tracing::debug;

/// Scaled dot-product attention over every query and key.
#[derive(Debug, Clone, Copy)]
pub struct FullAttention {
    config: AttentionConfig,
    dropout: Dropout,
}

impl FullAttention {
    pub fn new(config: AttentionConfig) -> FullAttention {
        FullAttention {
            config,
            dropout: Dropout::new(config.attention_dropout),
        }
    }

    /// Disables dropout.
    pub fn eval(self) -> FullAttention {
        FullAttention {
            dropout: self.dropout.eval(),
            ..self
        }
    }

    pub fn train(self) -> FullAttention {
        FullAttention {
            dropout: self.dropout.train(),
            ..self
        }
    }

    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }
}

impl<F> Attention<F> for FullAttention
where
    F: Float + Sum + FromPrimitive,
{
    fn forward(
        &self,
        queries: &Tensor<F>,
        keys: &Tensor<F>,
        values: &Tensor<F>,
        attn_mask: Option<&Tensor<bool>>,
        rng: &mut dyn RngCore,
    ) -> Result<AttentionOutput<F>> {
        let [batch, length, heads, features] = layout(queries)?;
        let [_, keys_length, _, _] = layout(keys)?;
        layout(values)?;
        debug!(batch, length, keys_length, heads, features, "full attention");

        let scores = einsum("blhe,bshe->bhls", &[queries, keys])?;

        let scores = if self.config.mask_flag {
            match attn_mask {
                Some(mask) => scores.masked_fill(mask, F::neg_infinity())?,
                None => {
                    let causal = TriangularCausalMask::new(batch, length)?;
                    scores.masked_fill(causal.mask(), F::neg_infinity())?
                }
            }
        } else {
            scores
        };

        let scale = self.config.scale_for::<F>(features)?;
        let attention = (scores * scale)?.softmax(-1)?;
        let attention = self.dropout.forward(&attention, rng)?;

        let context = einsum("bhls,bshd->blhd", &[&attention, values])?;

        Ok(AttentionOutput {
            context,
            attention: self.config.output_attention.then_some(attention),
        })
    }
}
