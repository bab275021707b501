use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use mzrange::config::Settings;
use mzrange::registry::Registry;
use mzrange::service::MsDataService;
use mzrange::source::Window;

use super::QueryArgs;

/// Load settings and append command-line roots
pub(super) fn settings(config: Option<PathBuf>, roots: Vec<PathBuf>) -> Result<Settings> {
    let mut settings = match config {
        Some(path) => Settings::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Settings::default(),
    };
    settings.service.roots.extend(roots);
    if settings.service.roots.is_empty() {
        anyhow::bail!("No root directories configured, pass --root or --config");
    }
    Ok(settings)
}

/// Build a one-shot service without the idle sweeper
pub(super) fn service(config: Option<PathBuf>, roots: Vec<PathBuf>) -> Result<MsDataService> {
    let registry = Registry::init(settings(config, roots)?).context("Failed to scan roots")?;
    let (raw, cached) = registry.counts();
    info!("Registered {raw} raw and {cached} cached acquisitions");
    Ok(MsDataService::with_registry(registry.into())?)
}

pub fn list(mask: &str, config: Option<PathBuf>, roots: Vec<PathBuf>) -> Result<()> {
    let service = service(config, roots)?;
    println!("{}", serde_json::to_string_pretty(&service.file_list(mask))?);
    Ok(())
}

fn window(args: &QueryArgs) -> Window {
    Window::new(args.mz_low, args.mz_high, args.rt_low, args.rt_high)
}

pub fn chromatogram(args: QueryArgs) -> Result<()> {
    let window = window(&args);
    let service = service(args.config, args.roots)?;
    let trace = service
        .chromatogram(&args.name, window, !args.raw && !args.profile)
        .map_err(anyhow::Error::msg)?;
    let pairs: Vec<[f64; 2]> = trace.chunks_exact(2).map(|c| [c[0], c[1]]).collect();
    println!("{}", serde_json::to_string(&pairs)?);
    service.shutdown();
    Ok(())
}

pub fn area(args: QueryArgs) -> Result<()> {
    let window = window(&args);
    let service = service(args.config, args.roots)?;
    let area = service
        .area(&args.name, window, !args.raw, args.profile)
        .map_err(anyhow::Error::msg)?;
    let triples: Vec<[f64; 3]> = area.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
    println!("{}", serde_json::to_string(&triples)?);
    service.shutdown();
    Ok(())
}
