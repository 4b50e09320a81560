use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::io::WriteMode;
use crate::split::NamePattern;

/// One splitter run: where to read, how many records to trust, and which
/// policy to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Input path or glob pattern.
    pub input: String,
    /// Declared record count N.
    pub declared_count: usize,
    /// Seed for the random policies. Drawn from OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_progress")]
    pub progress: bool,
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    pub mode: ModeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModeConfig {
    Split {
        selected: PathBuf,
        remainder: PathBuf,
        sample_size: usize,
    },
    Sample {
        output: PathBuf,
        sample_size: usize,
    },
    Partition {
        output_dir: PathBuf,
        parts: usize,
        #[serde(default)]
        name_pattern: Option<String>,
        #[serde(default = "default_write_mode")]
        write_mode: WriteMode,
    },
}

fn default_name() -> String {
    "split".to_string()
}

fn default_progress() -> bool {
    true
}

fn default_write_mode() -> WriteMode {
    WriteMode::Append
}

impl ModeConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ModeConfig::Split { .. } => "split",
            ModeConfig::Sample { .. } => "sample",
            ModeConfig::Partition { .. } => "partition",
        }
    }
}

impl RunConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: RunConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.trim().is_empty() {
            anyhow::bail!("input must not be empty");
        }

        match &self.mode {
            ModeConfig::Split {
                selected,
                remainder,
                sample_size,
            } => {
                self.check_sample_size(*sample_size)?;
                if selected == remainder {
                    anyhow::bail!(
                        "selected and remainder outputs must differ: {}",
                        selected.display()
                    );
                }
            }
            ModeConfig::Sample { sample_size, .. } => {
                self.check_sample_size(*sample_size)?;
            }
            ModeConfig::Partition {
                parts,
                name_pattern,
                ..
            } => {
                if *parts == 0 {
                    anyhow::bail!("parts must be greater than zero");
                }
                if let Some(pattern) = name_pattern {
                    NamePattern::new(pattern)?;
                }
            }
        }

        Ok(())
    }

    fn check_sample_size(&self, sample_size: usize) -> Result<()> {
        if sample_size > self.declared_count {
            anyhow::bail!(
                "sample_size {} exceeds declared_count {}",
                sample_size,
                self.declared_count
            );
        }
        Ok(())
    }
}
