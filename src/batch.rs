use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BatchPlan {
    pub steps: Vec<BatchStep>,
}

/// One find/replace run. Unset flags fall back to the command line.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct BatchStep {
    pub find: Vec<String>,
    #[serde(default)]
    pub replace: Vec<String>,
    #[serde(default)]
    pub input_files: Vec<PathBuf>,
    pub plan: Option<bool>,
    pub rename: Option<bool>,
}

pub fn load_batch(path: &Path) -> Result<BatchPlan> {
    let data = fs::read(path).with_context(|| format!("reading batch {}", path.display()))?;
    let plan = if path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
    {
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing batch {}", path.display()))?
    } else {
        serde_yaml::from_slice(&data)
            .with_context(|| format!("parsing batch {}", path.display()))?
    };
    Ok(plan)
}
