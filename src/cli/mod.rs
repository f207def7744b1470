//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{
    CleanupCommand, DetectCommand, EncryptSecretsCommand, MatrixCommand, ResolveCommand,
    TagsCommand, ValidateCommand,
};

/// CloudFormation delivery pipeline tooling
#[derive(Debug, Parser, Clone)]
#[command(name = "cfn-pipeline")]
#[command(version = "0.1.0")]
#[command(about = "Change detection, matrix generation and secret resolution for CloudFormation delivery", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Detect changed resource directories
    Detect(DetectCommand),

    /// Generate tiered deployment matrices
    Matrix(MatrixCommand),

    /// Validate a deployment-config document
    Validate(ValidateCommand),

    /// Resolve secrets and assemble the deploy parameter file
    Resolve(ResolveCommand),

    /// Combine stack tags
    Tags(TagsCommand),

    /// Seal environment secrets for this run
    EncryptSecrets(EncryptSecretsCommand),

    /// Remove this run's scratch directory
    Cleanup(CleanupCommand),
}

impl Cli {
    /// Parse CLI arguments from the environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
