use anyhow::{Context, Result};
use log::warn;
use std::path::PathBuf;

use mzrange::dispatch::BatchRequest;

use super::query::service;

/// Run a batch request file and print the response as JSON.
///
/// The file holds a [`BatchRequest`] in TOML:
///
/// ```toml
/// names = ["sample_01", "sample_02"]
/// mz_low = [445.11, 445.11]
/// mz_high = [445.13, 445.13]
/// rt_low = [10.0, 10.0]
/// rt_high = [12.0, 12.0]
/// kind = "chromatogram"
/// cache = true
/// ```
pub fn run(input: PathBuf, config: Option<PathBuf>, roots: Vec<PathBuf>) -> Result<()> {
    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read batch request {}", input.display()))?;
    let request: BatchRequest = toml::from_str(&content)
        .with_context(|| format!("Invalid batch request {}", input.display()))?;

    let service = service(config, roots)?;
    let response = service.batch(request).map_err(anyhow::Error::msg)?;
    if response.failed() > 0 {
        warn!("{} of {} batch items failed", response.failed(), response.results.len());
    }
    println!("{}", serde_json::to_string_pretty(&response)?);
    service.shutdown();
    Ok(())
}
