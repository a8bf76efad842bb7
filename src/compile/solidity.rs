use crate::artifact::CompiledArtifact;
use regex::Regex;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SolcCompileResponse {
    pub data: Vec<ContractData>,
    pub errors: Vec<SolcError>,
}

impl SolcCompileResponse {
    pub fn contract(&self, name: &str) -> Option<&ContractData> {
        self.data.iter().find(|contract| contract.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorType {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct SolcError {
    pub error_type: ErrorType,
    pub message: String,
    pub details: ErrorDetails,
}

#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub code_snippet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ContractData {
    pub name: String,
    pub abi: String,
    pub bytecode: String,
}

impl ContractData {
    pub fn artifact(&self) -> Result<CompiledArtifact, eyre::Error> {
        CompiledArtifact::from_parts(&self.abi, &self.bytecode)
    }
}

/// Compiles Solidity source held in memory.
pub fn compile(code: &str) -> Result<SolcCompileResponse, eyre::Error> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(code.as_bytes())?;
    compile_file(temp_file.path())
}

pub fn compile_file(path: impl AsRef<Path>) -> Result<SolcCompileResponse, eyre::Error> {
    let output = Command::new("solc")
        .arg("--combined-json")
        .arg("bin,abi")
        .arg(path.as_ref())
        .output()?;

    if !output.status.success() {
        return Err(eyre::eyre!(
            "solc failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    debug!(status = %output.status, stdout_len = output.stdout.len(), "solc finished");

    Ok(SolcCompileResponse {
        data: parse_solc_out(&output.stdout)?,
        errors: parse_solc_errors(&String::from_utf8_lossy(&output.stderr))?,
    })
}

fn parse_solc_out(stdout: &[u8]) -> Result<Vec<ContractData>, eyre::Error> {
    if stdout.is_empty() {
        return Ok(Vec::default());
    }
    let solc_output: Value = serde_json::from_slice(stdout)?;

    let contracts = solc_output
        .get("contracts")
        .ok_or(eyre::eyre!("No contracts key in solc output"))?
        .as_object()
        .ok_or(eyre::eyre!("Contracts is not an object"))?;

    let mut results = Vec::new();

    for (full_name, contract_data) in contracts {
        // "<path>:<Contract>"
        let name = full_name
            .rsplit(':')
            .next()
            .ok_or(eyre::eyre!("Invalid contract name format"))?
            .to_string();

        // Older solc releases emit the ABI as an embedded JSON string
        let abi = match contract_data.get("abi") {
            Some(Value::String(abi)) => abi.clone(),
            Some(abi) => abi.to_string(),
            None => return Err(eyre::eyre!("No abi in contract {name}")),
        };

        let bytecode = contract_data
            .get("bin")
            .ok_or(eyre::eyre!("No bin in contract {name}"))?
            .as_str()
            .ok_or(eyre::eyre!("Bin is not a string"))?
            .to_string();

        results.push(ContractData {
            name,
            abi,
            bytecode,
        });
    }

    Ok(results)
}

fn parse_solc_errors(stderr: &str) -> Result<Vec<SolcError>, eyre::Error> {
    let error_regex = Regex::new(r"(?m)^(Warning|Error): (.+)$")?;
    let details_regex = Regex::new(r"(?ms)--> (.+?):(\d+):(\d+):\n((?:.|\n)*?)\n\n")?;

    let mut errors = Vec::new();

    for error_cap in error_regex.captures_iter(stderr) {
        let error_type = match &error_cap[1] {
            "Warning" => ErrorType::Warning,
            _ => ErrorType::Error,
        };
        let message = error_cap[2].trim().to_string();

        let mut details = ErrorDetails {
            line: None,
            column: None,
            code_snippet: None,
        };

        let rest = error_cap.get(0).map_or("", |m| &stderr[m.end()..]);
        if let Some(details_cap) = details_regex.captures(rest) {
            details.line = details_cap[2].parse().ok();
            details.column = details_cap[3].parse().ok();
            details.code_snippet = Some(details_cap[4].trim().to_string());
        }

        errors.push(SolcError {
            error_type,
            message,
            details,
        });
    }

    Ok(errors)
}
