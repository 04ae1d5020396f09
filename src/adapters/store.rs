//! Model store: locates, verifies and loads the horizon artifacts.
//!
//! An optional `manifest.json` next to the artifacts binds every file by
//! SHA-256. It is written by the `hash_models` binary.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::gbm::GbmModel;
use crate::domain::Horizon;
use crate::ports::{ModelError, RiskModel};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

/// One loaded model per horizon.
pub type HorizonModels = BTreeMap<Horizon, Arc<dyn RiskModel>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    /// Unix timestamp (seconds) when this manifest was created.
    pub created_at: i64,
    /// File name -> lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

impl ModelManifest {
    /// Hash every horizon artifact in `dir`.
    ///
    /// # Errors
    /// Returns `ModelError::Io` if an artifact cannot be read.
    pub fn for_directory(dir: &Path) -> Result<Self, ModelError> {
        let mut files = BTreeMap::new();
        for horizon in Horizon::ALL {
            let name = horizon.artifact_name();
            files.insert(name.clone(), sha256_file(&dir.join(&name))?);
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            created_at: chrono::Utc::now().timestamp(),
            files,
        })
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

fn sha256_file(path: &Path) -> Result<String, ModelError> {
    let bytes = fs::read(path).map_err(|e| ModelError::Io(format!("{}: {e}", path.display())))?;
    Ok(sha256_hex(&bytes))
}

// Constant-time compare for ASCII hex digests.
fn digest_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y.to_ascii_lowercase();
    }
    diff == 0
}

/// Reads the model directory once at start-up.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
    require_manifest: bool,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>, require_manifest: bool) -> Self {
        Self {
            dir: dir.into(),
            require_manifest,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check `manifest.json` against the artifacts on disk.
    ///
    /// Returns `Ok(None)` when there is no manifest and one is not required.
    ///
    /// # Errors
    /// Returns `ModelError::Integrity` for a missing required manifest, an
    /// unsupported version, an unbound artifact or a hash mismatch.
    pub fn verify(&self) -> Result<Option<ModelManifest>, ModelError> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.exists() {
            if self.require_manifest {
                return Err(ModelError::Integrity(format!(
                    "{} is required but missing",
                    path.display()
                )));
            }
            tracing::warn!(
                "No {} in {:?}; loading models without integrity check",
                MANIFEST_FILE,
                self.dir
            );
            return Ok(None);
        }

        let content =
            fs::read(&path).map_err(|e| ModelError::Io(format!("{}: {e}", path.display())))?;
        let manifest: ModelManifest = serde_json::from_slice(&content)
            .map_err(|e| ModelError::Integrity(format!("invalid {MANIFEST_FILE}: {e}")))?;

        if manifest.version != MANIFEST_VERSION {
            return Err(ModelError::Integrity(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }

        let required: BTreeSet<String> = Horizon::ALL.iter().map(|h| h.artifact_name()).collect();
        if let Some(missing) = required.iter().find(|f| !manifest.files.contains_key(*f)) {
            return Err(ModelError::Integrity(format!(
                "{MANIFEST_FILE} does not bind {missing}"
            )));
        }

        for (name, expected) in &manifest.files {
            let actual = sha256_file(&self.dir.join(name))?;
            if !digest_eq(&actual, expected) {
                return Err(ModelError::Integrity(format!("hash mismatch for {name}")));
            }
        }

        tracing::info!(
            "Verified {} ({} files, created_at={})",
            MANIFEST_FILE,
            manifest.files.len(),
            manifest.created_at
        );
        Ok(Some(manifest))
    }

    /// Load one horizon's artifact without manifest verification.
    ///
    /// # Errors
    /// Propagates [`GbmModel::load`] errors.
    pub fn load(&self, horizon: Horizon) -> Result<GbmModel, ModelError> {
        GbmModel::load(&self.dir.join(horizon.artifact_name()))
    }

    /// Verify the manifest, then load all three horizons.
    ///
    /// # Errors
    /// Any verification or load failure is fatal.
    pub fn load_all(&self) -> Result<HorizonModels, ModelError> {
        self.verify()?;

        let mut models: HorizonModels = BTreeMap::new();
        for horizon in Horizon::ALL {
            let model = self.load(horizon)?;
            models.insert(horizon, Arc::new(model));
        }
        Ok(models)
    }
}
