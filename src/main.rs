use lottery_harness::{
    artifact::{CompiledArtifact, LOTTERY},
    config::DeployerConfig,
    deployer, logging,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    logging::init();

    let config = DeployerConfig::from_env()?;
    let artifact = match &config.artifact_dir {
        Some(dir) => CompiledArtifact::load(dir, LOTTERY)?,
        None => CompiledArtifact::lottery()?,
    };

    let deployer = deployer::connect(&config).await?;
    let deployment = deployer.deploy(&artifact).await?;

    println!("Contract successfully deployed to {}", deployment.address);
    Ok(())
}
