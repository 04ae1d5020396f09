//! Manifest utility for the RenalSight horizon models.
//!
//! Hashes `gbm_1yr.json`, `gbm_3yr.json` and `gbm_5yr.json` and writes
//! `manifest.json` next to them, binding each file by SHA-256. The
//! application verifies the manifest at start-up.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin hash_models -- [<model_dir>] [--check]
//! ```
//!
//! `--check` verifies an existing manifest instead of writing one.

use std::env;
use std::fs;
use std::path::PathBuf;

use renalsight::adapters::store::{ModelManifest, ModelStore, MANIFEST_FILE};
use renalsight::domain::Horizon;

fn usage() -> String {
    "Usage: hash_models [<model_dir>] [--check]".to_string()
}

fn parse_args() -> Result<(PathBuf, bool), String> {
    let mut model_dir: Option<PathBuf> = None;
    let mut check = false;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--check" => check = true,
            "-h" | "--help" => return Err(usage()),
            _ => {
                if model_dir.is_none() {
                    model_dir = Some(PathBuf::from(arg));
                } else {
                    return Err(usage());
                }
            }
        }
    }

    Ok((model_dir.unwrap_or_else(|| PathBuf::from("models")), check))
}

fn main() -> Result<(), String> {
    let (model_dir, check) = parse_args()?;

    if check {
        let store = ModelStore::new(&model_dir, true);
        let manifest = store.verify().map_err(|e| e.to_string())?;
        for horizon in Horizon::ALL {
            store.load(horizon).map_err(|e| e.to_string())?;
        }
        let files = manifest.map_or(0, |m| m.files.len());
        println!("Manifest OK: {files} files in {model_dir:?}");
        return Ok(());
    }

    // Refuse to bind artifacts that do not load.
    let store = ModelStore::new(&model_dir, false);
    for horizon in Horizon::ALL {
        store
            .load(horizon)
            .map_err(|e| format!("{}: {e}", horizon.artifact_name()))?;
    }

    let manifest = ModelManifest::for_directory(&model_dir).map_err(|e| e.to_string())?;
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| format!("Failed to serialize {MANIFEST_FILE}: {e}"))?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .map_err(|e| format!("Failed to write {manifest_path:?}: {e}"))?;

    println!("Wrote manifest: {manifest_path:?}");
    for (name, digest) in &manifest.files {
        println!("  {name}  sha256={digest}");
    }

    Ok(())
}
