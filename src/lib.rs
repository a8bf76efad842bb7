pub mod artifact;
pub mod chain;
pub mod compile;
pub mod config;
pub mod deployer;
pub mod harness;
pub mod logging;
pub mod lottery;
