pub mod solidity;
pub use solidity::{compile, compile_file, ContractData, SolcCompileResponse};
