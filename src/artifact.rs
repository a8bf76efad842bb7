use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::{hex, Bytes};
use eyre::{eyre, WrapErr};
use std::fs;
use std::path::Path;

pub const LOTTERY: &str = "Lottery";

const LOTTERY_ABI: &str = include_str!("../artifacts/Lottery.abi.json");
const LOTTERY_BIN: &str = include_str!("../artifacts/Lottery.bin");

/// Interface description and creation bytecode of one compiled contract.
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl CompiledArtifact {
    pub fn from_parts(abi: &str, bytecode: &str) -> Result<Self, eyre::Error> {
        let abi: JsonAbi =
            serde_json::from_str(abi).wrap_err("interface description is not a JSON ABI")?;
        let bytecode = hex::decode(bytecode.trim()).map_err(|err| eyre!("invalid bytecode: {err}"))?;
        if bytecode.is_empty() {
            return Err(eyre!("bytecode is empty"));
        }
        Ok(Self {
            abi,
            bytecode: bytecode.into(),
        })
    }

    /// The Lottery artifact checked into `artifacts/`, embedded at build time.
    pub fn lottery() -> Result<Self, eyre::Error> {
        Self::from_parts(LOTTERY_ABI, LOTTERY_BIN)
    }

    /// Reads `<dir>/<name>.abi.json` and `<dir>/<name>.bin`.
    pub fn load(dir: impl AsRef<Path>, name: &str) -> Result<Self, eyre::Error> {
        let dir = dir.as_ref();
        let abi_path = dir.join(format!("{name}.abi.json"));
        let bin_path = dir.join(format!("{name}.bin"));
        let abi = fs::read_to_string(&abi_path)
            .wrap_err_with(|| format!("reading {}", abi_path.display()))?;
        let bytecode = fs::read_to_string(&bin_path)
            .wrap_err_with(|| format!("reading {}", bin_path.display()))?;
        Self::from_parts(&abi, &bytecode)
    }

    pub fn write(&self, dir: impl AsRef<Path>, name: &str) -> Result<(), eyre::Error> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let abi = serde_json::to_string_pretty(&self.abi)?;
        fs::write(dir.join(format!("{name}.abi.json")), abi + "\n")?;
        fs::write(
            dir.join(format!("{name}.bin")),
            hex::encode(&self.bytecode) + "\n",
        )?;
        Ok(())
    }

    /// First overload of the named entry point, if the interface declares one.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.abi.function(name).and_then(|overloads| overloads.first())
    }
}
