use anyhow::Result;
use attnum::{attention::TriangularCausalMask, einsum, Dropout, Tensor};
use rand::{rngs::StdRng, SeedableRng};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let scores = Tensor::arange(1.0, 10.0, 1.0)?.view(&[1, 1, 3, 3])?;
    let mask = TriangularCausalMask::new(1, 3)?;
    println!("mask");
    println!("{}", mask.mask());

    let scores = scores.masked_fill(mask.mask(), f64::NEG_INFINITY)?;
    println!("masked scores");
    println!("{}", &scores);

    let attn = (scores * (1.0 / 3f64.sqrt()))?.softmax(-1)?;
    println!("softmax");
    println!("{}", &attn);

    let attn = Dropout::new(0.5).forward(&attn, &mut StdRng::seed_from_u64(0))?;
    println!("dropout");
    println!("{}", &attn);

    let v = Tensor::new(
        &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.1, 0.1, 0.1, 0.1],
        &[1, 3, 1, 4],
    )?;
    println!("bhls,bshd->blhd");
    println!("{}", einsum("bhls,bshd->blhd", &[&attn, &v])?);

    Ok(())
}
