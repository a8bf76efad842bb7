use eyre::eyre;
use lottery_harness::{artifact::LOTTERY, compile::compile_file, logging};
use std::env;
use tracing::{info, warn};

/// compile [source] [out_dir]
fn main() -> eyre::Result<()> {
    logging::init();

    let mut args = env::args().skip(1);
    let source = args.next().unwrap_or_else(|| "contracts/Lottery.sol".to_string());
    let out_dir = args.next().unwrap_or_else(|| "artifacts".to_string());

    let response = compile_file(&source)?;
    for error in &response.errors {
        warn!(kind = ?error.error_type, line = ?error.details.line, "{}", error.message);
    }

    let contract = response
        .contract(LOTTERY)
        .ok_or_else(|| eyre!("{source} defines no {LOTTERY} contract"))?;
    let artifact = contract.artifact()?;
    artifact.write(&out_dir, &contract.name)?;

    info!(%source, %out_dir, bytecode_len = artifact.bytecode.len(), "artifact written");
    Ok(())
}
