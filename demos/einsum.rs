use anyhow::Result;
use attnum::{einsum, Tensor};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let a = Tensor::arange(1.0, 7.0, 1.0)?.view(&[2, 3])?;
    let b = Tensor::arange(1.0, 7.0, 1.0)?.view(&[3, 2])?;
    println!("ij,jk->ik");
    println!("{}", einsum("ij,jk->ik", &[&a, &b])?);

    println!("a @ b");
    println!("{}", a.matmul(&b)?);

    println!("trace ii");
    println!("{}", einsum("ii", &[&Tensor::<f64>::eye(3)?])?);

    let q = Tensor::arange(0.0, 24.0, 1.0)?.view(&[1, 3, 2, 4])?;
    let k = Tensor::ones(&[1, 3, 2, 4])?;
    println!("blhe,bshe->bhls");
    println!("{}", einsum("blhe,bshe->bhls", &[&q, &k])?);

    Ok(())
}
