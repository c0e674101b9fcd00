use super::{layout, Attention, AttentionConfig, AttentionOutput, ProbMask};
use crate::{
    core::{errors::AttentionShapeError, utils::cast_usize},
    Tensor,
};
use anyhow::{bail, Result};
use num_traits::{Float, FromPrimitive};
use rand::RngCore;
use std::iter::Sum;
use tracing::{debug, trace};

/// ProbSparse self-attention.
///
/// Only the `u = factor * ceil(ln L_Q)` queries whose sampled scores are furthest from
/// uniform attend to the keys. Every other query keeps a lazy context: the running sum of
/// the values when masked, their mean otherwise.
#[derive(Debug, Clone, Copy)]
pub struct ProbAttention {
    config: AttentionConfig,
}

impl ProbAttention {
    pub fn new(config: AttentionConfig) -> ProbAttention {
        ProbAttention { config }
    }

    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }

    /// Scores of the `n_top` most active queries against every key.
    ///
    /// `q` and `k` are `[B, H, L, E]`. Row `i` of `index_sample` (`[L_Q, U]`) lists the keys
    /// sampled for query `i`. Returns the `[B, H, n_top, L_K]` scores and the `[B, H, n_top]`
    /// positions of the chosen queries, in ascending order.
    pub fn prob_qk<F>(
        &self,
        q: &Tensor<F>,
        k: &Tensor<F>,
        index_sample: &Tensor<usize>,
        n_top: usize,
    ) -> Result<(Tensor<F>, Tensor<usize>)>
    where
        F: Float + Sum + FromPrimitive,
    {
        let [batch, heads, keys_length, features] = layout(k)?;
        let [_, _, queries_length, _] = layout(q)?;

        let k_expand = k
            .unsqueeze(-3)?
            .expand(&[batch, heads, queries_length, keys_length, features])?;
        let k_sample = k_expand.take_along(3, index_sample)?;

        let q_k_sample = q
            .unsqueeze(-2)?
            .matmul(&k_sample.transpose(-2, -1)?)?
            .squeeze_dim(-2)?;

        // Sparsity measure: max minus mean over the sampled keys.
        let length = cast_usize::<F>(keys_length)?;
        let m = (q_k_sample.max_dims(&[3], false)? - (q_k_sample.sum_dims(&[3], false)? / length)?)?;
        let (_, m_top) = m.topk(n_top, -1, true, false)?;

        let q_reduce = q.take_along(2, &m_top)?;
        let q_k = q_reduce.matmul(&k.transpose(-2, -1)?)?;

        Ok((q_k, m_top))
    }

    fn initial_context<F>(&self, v: &Tensor<F>, queries_length: usize) -> Result<Tensor<F>>
    where
        F: Float + Sum + FromPrimitive,
    {
        let [batch, heads, values_length, features] = layout(v)?;

        if self.config.mask_flag {
            if queries_length != values_length {
                bail!(AttentionShapeError::MaskedLength {
                    queries: queries_length,
                    values: values_length,
                });
            }
            v.cumsum(-2)
        } else {
            v.mean_dims(&[2], true)?
                .expand(&[batch, heads, queries_length, features])
        }
    }

    fn update_context<F>(
        &self,
        context: &Tensor<F>,
        v: &Tensor<F>,
        scores: &Tensor<F>,
        index: &Tensor<usize>,
    ) -> Result<(Tensor<F>, Option<Tensor<F>>)>
    where
        F: Float + Sum + FromPrimitive,
    {
        let [batch, heads, values_length, _] = layout(v)?;
        let [_, _, queries_length, _] = layout(context)?;

        let scores = if self.config.mask_flag {
            let mask = ProbMask::new(batch, heads, queries_length, index, scores.sizes()[3])?;
            scores.masked_fill(mask.mask(), F::neg_infinity())?
        } else {
            scores.clone()
        };

        let attn = scores.softmax(-1)?;
        let context = context.put_along(2, index, &attn.matmul(v)?)?;

        let attention = if self.config.output_attention {
            let uniform = F::one() / cast_usize::<F>(values_length)?;
            let attns = Tensor::full(uniform, &[batch, heads, values_length, values_length])?;
            Some(attns.put_along(2, index, &attn)?)
        } else {
            None
        };

        Ok((context, attention))
    }
}

impl<F> Attention<F> for ProbAttention
where
    F: Float + Sum + FromPrimitive,
{
    /// Only the `ProbMask` built from the selected queries is applied; `attn_mask` is unused.
    fn forward(
        &self,
        queries: &Tensor<F>,
        keys: &Tensor<F>,
        values: &Tensor<F>,
        _attn_mask: Option<&Tensor<bool>>,
        rng: &mut dyn RngCore,
    ) -> Result<AttentionOutput<F>> {
        let [_, queries_length, _, features] = layout(queries)?;
        let [_, keys_length, _, _] = layout(keys)?;
        layout(values)?;

        let q = queries.transpose(2, 1)?;
        let k = keys.transpose(2, 1)?;
        let v = values.transpose(2, 1)?;

        let u_part = self.config.sample_count(keys_length);
        let u = self.config.sample_count(queries_length);
        debug!(queries_length, keys_length, u_part, u, "ProbSparse sampling");

        let index_sample = Tensor::randint(keys_length, &[queries_length, u_part], rng)?;
        let (scores_top, index) = self.prob_qk(&q, &k, &index_sample, u)?;
        trace!(selected = ?index.to_vec(), "active queries");

        let scale = self.config.scale_for::<F>(features)?;
        let scores_top = (scores_top * scale)?;

        let context = self.initial_context(&v, queries_length)?;
        let (context, attention) = self.update_context(&context, &v, &scores_top, &index)?;

        Ok(AttentionOutput {
            context: context.transpose(2, 1)?.to_contiguous()?,
            attention,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ProbAttention;
    use crate::{
        attention::{Attention, AttentionConfig, FullAttention},
        Tensor,
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn walkthrough() -> (Tensor<f64>, Tensor<f64>) {
        #[rustfmt::skip]
        let q = Tensor::new(
            &[
                1., 2., 3., 4.,
                5., 6., 7., 8.,
                1., 2., 1., 2.,
                3., 4., 3., 4.,
                5., 6., 5., 6.,
            ],
            &[1, 5, 1, 4],
        )
        .unwrap();
        #[rustfmt::skip]
        let k = Tensor::new(
            &[
                0.1, 0.2, 0.3, 0.4,
                0.1, 0.0, 0.0, 0.0,
                0.0, 0.1, 0.0, 0.0,
                0.0, 0.0, 0.1, 0.0,
                0.0, 0.0, 0.0, 0.1,
            ],
            &[1, 5, 1, 4],
        )
        .unwrap();

        (q, k)
    }

    #[test]
    fn prob_qk_selects_active_queries() {
        let (q, k) = walkthrough();
        let (q, k) = (q.transpose(2, 1).unwrap(), k.transpose(2, 1).unwrap());
        let index_sample =
            Tensor::new(&[0, 1, 2, 0, 1, 2, 1, 2, 3, 1, 2, 3, 0, 1, 2], &[5, 3]).unwrap();

        let attention = ProbAttention::new(AttentionConfig::default());
        let (q_k, m_top) = attention.prob_qk(&q, &k, &index_sample, 3).unwrap();

        assert_eq!(m_top.sizes(), &[1, 1, 3]);
        assert_eq!(m_top.to_vec(), vec![0, 1, 4]);
        assert_eq!(q_k.sizes(), &[1, 1, 3, 5]);

        let expected = q.select(2, 4).unwrap().matmul(&k.transpose(-2, -1).unwrap()).unwrap();
        let row = q_k.select(2, 2).unwrap();
        assert!(row.allclose(&expected, 1e-12, 1e-12).unwrap());
    }

    #[test]
    fn masked_lazy_rows_are_running_sums() {
        let (q, k) = walkthrough();
        let v = Tensor::<f64>::ones(&[1, 5, 1, 4]).unwrap();
        let config = AttentionConfig::default()
            .with_factor(1)
            .with_output_attention(true);
        let attention = ProbAttention::new(config);

        let output = attention
            .forward(&q, &k, &v, None, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(output.context.sizes(), &[1, 5, 1, 4]);

        // u = ceil(ln 5) = 2 queries attend and, with ones for values, stay ones.
        // Every other row keeps the running sum `row + 1`.
        let attns = output.attention.clone().unwrap();
        let uniform = Tensor::full(0.2, &[5]).unwrap();
        let context = output.context.select(2, 0).unwrap().select(0, 0).unwrap();
        let mut lazy = 0;
        for row in 0..5 {
            let values = context.select(0, row).unwrap().to_vec();
            let weights = attns.select(0, 0).unwrap().select(0, 0).unwrap().select(0, row).unwrap();
            if weights == uniform {
                lazy += 1;
                assert!(values.iter().all(|&x| x == (row + 1) as f64));
            } else {
                assert!(values.iter().all(|&x| (x - 1.0).abs() < 1e-12));
            }
        }
        assert_eq!(lazy, 3);

        let attns = output.attention.unwrap();
        assert_eq!(attns.sizes(), &[1, 1, 5, 5]);
        let sums = attns.sum_dims(&[3], false).unwrap();
        assert!(sums.allclose(&Tensor::ones(&[1, 1, 5]).unwrap(), 1e-12, 1e-12).unwrap());
    }

    #[test]
    fn unmasked_lazy_rows_are_means() {
        let mut rng = StdRng::seed_from_u64(11);
        let q = Tensor::<f64>::uniform(-1.0, 1.0, &[2, 30, 2, 4], &mut rng).unwrap();
        let k = Tensor::<f64>::uniform(-1.0, 1.0, &[2, 30, 2, 4], &mut rng).unwrap();
        let v = Tensor::<f64>::uniform(-1.0, 1.0, &[2, 30, 2, 3], &mut rng).unwrap();

        let config = AttentionConfig::default()
            .with_mask_flag(false)
            .with_factor(1)
            .with_output_attention(true);
        let output = ProbAttention::new(config)
            .forward(&q, &k, &v, None, &mut rng)
            .unwrap();
        assert_eq!(output.context.sizes(), &[2, 30, 2, 3]);

        // u = ceil(ln 30) = 4 rows per head attend; the rest are uniform.
        let attns = output.attention.unwrap();
        let uniform = Tensor::full(1.0 / 30.0, &[30]).unwrap();
        let mean = v.mean_dims(&[1], false).unwrap();
        let mut lazy = 0;
        for row in 0..30 {
            let weights = attns.select(0, 1).unwrap().select(0, 1).unwrap().select(0, row).unwrap();
            if weights == uniform {
                lazy += 1;
                let context = output.context.select(0, 1).unwrap().select(0, row).unwrap();
                let expected = mean.select(0, 1).unwrap().select(0, 1).unwrap();
                assert!(context
                    .select(0, 1)
                    .unwrap()
                    .allclose(&expected, 1e-12, 1e-12)
                    .unwrap());
            }
        }
        assert_eq!(lazy, 26);
    }

    #[test]
    fn matches_full_attention_when_nothing_is_pruned() {
        let mut rng = StdRng::seed_from_u64(5);
        let q = Tensor::<f64>::uniform(-1.0, 1.0, &[1, 6, 2, 4], &mut rng).unwrap();
        let k = Tensor::<f64>::uniform(-1.0, 1.0, &[1, 6, 2, 4], &mut rng).unwrap();
        let v = Tensor::<f64>::uniform(-1.0, 1.0, &[1, 6, 2, 3], &mut rng).unwrap();

        for mask_flag in [true, false] {
            let config = AttentionConfig::default()
                .with_mask_flag(mask_flag)
                .with_factor(10)
                .with_output_attention(true);
            let sparse = ProbAttention::new(config)
                .forward(&q, &k, &v, None, &mut rng)
                .unwrap();
            let full = FullAttention::new(config)
                .eval()
                .forward(&q, &k, &v, None, &mut rng)
                .unwrap();

            assert!(sparse.context.allclose(&full.context, 1e-9, 1e-12).unwrap());
            let (sparse, full) = (sparse.attention.unwrap(), full.attention.unwrap());
            assert!(sparse.allclose(&full, 1e-9, 1e-12).unwrap());
        }
    }

    #[test]
    fn masked_needs_equal_lengths() {
        let mut rng = StdRng::seed_from_u64(0);
        let q = Tensor::<f64>::ones(&[1, 4, 1, 2]).unwrap();
        let k = Tensor::<f64>::ones(&[1, 6, 1, 2]).unwrap();
        let v = Tensor::<f64>::ones(&[1, 6, 1, 2]).unwrap();

        let attention = ProbAttention::new(AttentionConfig::default());
        assert!(attention.forward(&q, &k, &v, None, &mut rng).is_err());

        let unmasked = ProbAttention::new(AttentionConfig::default().with_mask_flag(false));
        let output = unmasked.forward(&q, &k, &v, None, &mut rng).unwrap();
        assert_eq!(output.context.sizes(), &[1, 4, 1, 2]);
    }
}
