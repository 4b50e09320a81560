use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_name: String,
    pub mode: String,
    pub inputs: Vec<String>,
    pub declared_count: usize,
    pub seed: Option<u64>, // Only set for the random policies
    pub outputs: Vec<OutputManifest>,
    pub total_records_written: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputManifest {
    pub role: String,
    pub path: String,
    pub records: usize,
}

impl RunManifest {
    pub fn new(
        run_name: String,
        mode: &str,
        inputs: Vec<String>,
        declared_count: usize,
        seed: Option<u64>,
    ) -> Self {
        Self {
            run_name,
            mode: mode.to_string(),
            inputs,
            declared_count,
            seed,
            outputs: Vec::new(),
            total_records_written: 0,
        }
    }

    pub fn add_output(&mut self, role: impl Into<String>, path: &Path, records: usize) {
        self.total_records_written += records;
        self.outputs.push(OutputManifest {
            role: role.into(),
            path: path.to_string_lossy().to_string(),
            records,
        });
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn read_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&json)?)
    }
}
