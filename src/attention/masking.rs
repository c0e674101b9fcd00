use crate::Tensor;
use anyhow::Result;

/// `[B, 1, L, L]` mask that is `true` strictly above the diagonal.
#[derive(Debug, Clone)]
pub struct TriangularCausalMask {
    mask: Tensor<bool>,
}

impl TriangularCausalMask {
    pub fn new(batch: usize, length: usize) -> Result<TriangularCausalMask> {
        let mask = Tensor::full(true, &[batch, 1, length, length])?.triu(1)?;
        Ok(TriangularCausalMask { mask })
    }

    pub fn mask(&self) -> &Tensor<bool> {
        &self.mask
    }
}

/// Causal mask restricted to the queries ProbSparse attention keeps.
///
/// Row `i` of the `[B, H, u, L_K]` mask is row `index[b, h, i]` of the `[L, L_K]`
/// causal mask.
#[derive(Debug, Clone)]
pub struct ProbMask {
    mask: Tensor<bool>,
}

impl ProbMask {
    pub fn new(
        batch: usize,
        heads: usize,
        length: usize,
        index: &Tensor<usize>,
        scores_length: usize,
    ) -> Result<ProbMask> {
        let causal = Tensor::full(true, &[length, scores_length])?.triu(1)?;
        let expanded = causal.broadcast_to(&[batch, heads, length, scores_length])?;
        let mask = expanded.take_along(2, index)?;

        Ok(ProbMask { mask })
    }

    pub fn mask(&self) -> &Tensor<bool> {
        &self.mask
    }
}
