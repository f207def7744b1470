//! CLI output formatting and the run output channel

use console::Emoji;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");

/// Emit a warning both as a CI annotation and a log event
pub fn warn_annotation(message: &str) {
    println!("::warning::{message}");
    tracing::warn!("{message}");
}

/// Emit an error annotation without failing the process
pub fn error_annotation(message: &str) {
    println!("::error::{message}");
    tracing::error!("{message}");
}

/// Named-output channel for one run.
///
/// Outputs append to the file the orchestrator names (single-line values
/// as `key=value`, multiline values in heredoc form) and echo to stdout
/// when no file is configured.
#[derive(Debug, Clone, Default)]
pub struct OutputChannel {
    path: Option<PathBuf>,
}

impl OutputChannel {
    pub fn from_env() -> Self {
        Self {
            path: std::env::var("GITHUB_OUTPUT")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Stdout-only channel
    pub fn stdout() -> Self {
        Self { path: None }
    }

    /// Write a single-line output value
    pub fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.append(&format!("{key}={value}\n"))
    }

    /// Write a multiline output value in heredoc form
    pub fn set_multiline(&self, key: &str, value: &str) -> io::Result<()> {
        self.append(&format!("{key}<<EOF\n{value}\nEOF\n"))
    }

    fn append(&self, chunk: &str) -> io::Result<()> {
        match &self.path {
            Some(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                file.write_all(chunk.as_bytes())
            }
            None => {
                print!("{chunk}");
                Ok(())
            }
        }
    }
}
