use anyhow::{Context, Result};
use serde_json::json;
use std::path::PathBuf;

use mzrange::cache::{BinaryIndexedStore, FolderIndexedStore, FOLDER_CACHE_NAME};

/// Print the header summary of a cache file
pub fn run(file: PathBuf) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let is_folder = file
        .file_name()
        .is_some_and(|f| f.to_string_lossy().eq_ignore_ascii_case(FOLDER_CACHE_NAME));

    let summary = if is_folder {
        let store = FolderIndexedStore::open(&file)
            .with_context(|| format!("Failed to open folder cache {}", file.display()))?;
        let mass_range = store.mass_range().context("Failed to read the mass index")?;
        json!({
            "path": file.display().to_string(),
            "signature": store.signature(),
            "files": store.files(),
            "mass_range": mass_range,
        })
    } else {
        let store = BinaryIndexedStore::open(&file)
            .with_context(|| format!("Failed to open cache {}", file.display()))?;
        let mut value = serde_json::to_value(store.summary())?;
        value["path"] = json!(file.display().to_string());
        value
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
