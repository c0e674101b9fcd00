use anyhow::Result;
use attnum::{
    attention::{Attention, AttentionConfig, AttentionLayer, FullAttention, ProbAttention},
    Tensor,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut rng = StdRng::seed_from_u64(0);
    let config = AttentionConfig::default()
        .with_factor(1)
        .with_output_attention(true);

    let q = Tensor::<f64>::uniform(-1.0, 1.0, &[1, 8, 1, 4], &mut rng)?;
    let k = Tensor::<f64>::uniform(-1.0, 1.0, &[1, 8, 1, 4], &mut rng)?;
    let v = Tensor::<f64>::ones(&[1, 8, 1, 4])?;

    let sparse = ProbAttention::new(config).forward(&q, &k, &v, None, &mut rng)?;
    println!("ProbSparse context");
    println!("{}", sparse.context);
    if let Some(attention) = sparse.attention {
        println!("ProbSparse attention");
        println!("{}", attention);
    }

    let full = FullAttention::new(config)
        .eval()
        .forward(&q, &k, &v, None, &mut rng)?;
    println!("Full context");
    println!("{}", full.context);

    let x = Tensor::<f64>::uniform(-1.0, 1.0, &[2, 16, 8], &mut rng)?;
    let layer = AttentionLayer::new(ProbAttention::new(config), 8, 2, None, None, true, &mut rng)?;
    let output = layer.forward(&x, &x, &x, None, &mut rng)?;
    println!("{:?}", output.context);

    Ok(())
}
