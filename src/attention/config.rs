use crate::core::utils::cast_f64;
use anyhow::Result;
use num_traits::Float;

/// Settings shared by the attention mechanisms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttentionConfig {
    /// Hide future positions from each query.
    pub mask_flag: bool,
    /// ProbSparse sampling factor `c`; `c * ceil(ln L)` keys and queries are kept.
    pub factor: usize,
    /// Score scale; `1 / sqrt(E)` when unset.
    pub scale: Option<f64>,
    pub attention_dropout: f64,
    pub output_attention: bool,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        AttentionConfig {
            mask_flag: true,
            factor: 5,
            scale: None,
            attention_dropout: 0.1,
            output_attention: false,
        }
    }
}

impl AttentionConfig {
    pub fn with_mask_flag(self, mask_flag: bool) -> Self {
        AttentionConfig { mask_flag, ..self }
    }

    pub fn with_factor(self, factor: usize) -> Self {
        AttentionConfig { factor, ..self }
    }

    pub fn with_scale(self, scale: f64) -> Self {
        AttentionConfig {
            scale: Some(scale),
            ..self
        }
    }

    pub fn with_attention_dropout(self, attention_dropout: f64) -> Self {
        AttentionConfig {
            attention_dropout,
            ..self
        }
    }

    pub fn with_output_attention(self, output_attention: bool) -> Self {
        AttentionConfig {
            output_attention,
            ..self
        }
    }

    pub(crate) fn scale_for<F: Float>(&self, features: usize) -> Result<F> {
        let scale = self
            .scale
            .unwrap_or_else(|| 1.0 / (features as f64).sqrt());

        Ok(cast_f64(scale)?)
    }

    /// `factor * ceil(ln length)`, kept within `1..=length`.
    pub(crate) fn sample_count(&self, length: usize) -> usize {
        let count = self.factor * (length as f64).ln().ceil() as usize;
        count.clamp(1, length.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::AttentionConfig;

    #[test]
    fn defaults_and_builders() {
        let config = AttentionConfig::default();
        assert!(config.mask_flag);
        assert_eq!(config.factor, 5);
        assert_eq!(config.scale, None);
        assert_eq!(config.attention_dropout, 0.1);
        assert!(!config.output_attention);

        let config = config
            .with_mask_flag(false)
            .with_factor(1)
            .with_scale(0.5)
            .with_attention_dropout(0.0)
            .with_output_attention(true);
        assert_eq!(
            config,
            AttentionConfig {
                mask_flag: false,
                factor: 1,
                scale: Some(0.5),
                attention_dropout: 0.0,
                output_attention: true,
            }
        );
    }

    #[test]
    fn scale_defaults_to_inverse_root() {
        let config = AttentionConfig::default();
        assert_eq!(config.scale_for::<f64>(4).unwrap(), 0.5);
        assert_eq!(config.with_scale(2.0).scale_for::<f32>(4).unwrap(), 2.0);
    }

    #[test]
    fn sample_counts() {
        let config = AttentionConfig::default().with_factor(1);
        // ceil(ln 5) = 2, ceil(ln 96) = 5
        assert_eq!(config.sample_count(5), 2);
        assert_eq!(config.sample_count(96), 5);
        assert_eq!(config.with_factor(5).sample_count(5), 5);
        assert_eq!(config.with_factor(5).sample_count(96), 25);
        assert_eq!(config.sample_count(1), 1);
    }
}
