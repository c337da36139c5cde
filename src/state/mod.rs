//! Persisted install state.
//!
//! An optional collaborator the CLI consults after successful single
//! package operations; the engine itself never reads or writes execution
//! history. Records live in `state.json` under the configuration
//! directory: the version that was installed, when, and optionally sha256
//! checksums of files the install produced, so a later run can verify an
//! installation is still intact.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

const STATE_FILE: &str = "state.json";

/// One package's recorded install state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageState {
    pub version: String,
    pub installed_at: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub file_checksums: HashMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    packages: HashMap<String, PackageState>,
}

/// Handle over `state.json`, safe to share across tasks.
pub struct StateStore {
    path: PathBuf,
    state: RwLock<StateFile>,
}

impl StateStore {
    /// Open (or initialize) the store under `config_dir`.
    pub fn open(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(STATE_FILE);
        let state = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            StateFile::default()
        };
        Ok(Self { path, state: RwLock::new(state) })
    }

    pub fn get(&self, name: &str) -> Option<PackageState> {
        self.state.read().expect("state lock poisoned").packages.get(name).cloned()
    }

    /// Record a successful install or update of `name`.
    pub fn record(&self, name: &str, version: &str) -> Result<()> {
        self.record_with_files(name, version, &[])
    }

    /// Record an install along with checksums of the files it produced.
    pub fn record_with_files(&self, name: &str, version: &str, files: &[PathBuf]) -> Result<()> {
        let mut checksums = HashMap::new();
        for file in files {
            checksums.insert(file.display().to_string(), file_checksum(file)?);
        }
        {
            let mut state = self.state.write().expect("state lock poisoned");
            state.packages.insert(
                name.to_string(),
                PackageState {
                    version: version.to_string(),
                    installed_at: chrono::Utc::now().to_rfc3339(),
                    file_checksums: checksums,
                },
            );
        }
        self.save()
    }

    /// Drop the record for `name` (after removal).
    pub fn forget(&self, name: &str) -> Result<()> {
        let removed = self
            .state
            .write()
            .expect("state lock poisoned")
            .packages
            .remove(name)
            .is_some();
        if removed { self.save() } else { Ok(()) }
    }

    /// Whether every recorded checksum for `name` still matches on disk.
    ///
    /// Returns false when nothing is recorded, a file disappeared, or any
    /// content changed. Files present on disk but not recorded are
    /// ignored.
    pub fn verify_checksums(&self, name: &str) -> Result<bool> {
        let Some(package) = self.get(name) else {
            return Ok(false);
        };
        if package.file_checksums.is_empty() {
            return Ok(false);
        }
        for (file, expected) in &package.file_checksums {
            let path = Path::new(file);
            if !path.exists() {
                debug!("{name}: recorded file missing: {file}");
                return Ok(false);
            }
            if &file_checksum(path)? != expected {
                debug!("{name}: checksum mismatch for {file}");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let state = self.state.read().expect("state lock poisoned");
        let text = serde_json::to_string_pretty(&*state)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// Hex-encoded sha256 of a file's contents.
pub fn file_checksum(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
