//! Catalog loading from a configuration directory.
//!
//! Every `*.yaml`/`*.yml` file in the directory is parsed as a catalog
//! fragment and merged in sorted filename order, so users can keep sources,
//! work machines, and personal packages in separate files. Validation runs
//! on the merged result and enforces the invariants the engine assumes:
//! globally unique package names and no dangling source references.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use super::Catalog;

/// Directory name under the user configuration root.
const CONFIG_DIR_NAME: &str = "unipak";

/// Resolve the configuration directory.
///
/// An explicit `--config` path wins: its parent directory is used, so
/// pointing at any file inside an alternate directory selects that whole
/// directory. Otherwise, when running under `sudo`, the invoking user's
/// `~/.config` is preferred over root's (looked up via `SUDO_USER`), so
/// that `sudo unipak install ...` sees the same catalog as the plain user.
pub fn config_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        let expanded = shellexpand::tilde(path).into_owned();
        let expanded = PathBuf::from(expanded);
        return match expanded.parent() {
            Some(parent) if expanded.is_file() => parent.to_path_buf(),
            _ => expanded,
        };
    }
    sudo_user_config_root()
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

fn sudo_user_config_root() -> Option<PathBuf> {
    let name = std::env::var("SUDO_USER").ok().filter(|s| !s.is_empty())?;
    let user = nix::unistd::User::from_name(&name).ok().flatten()?;
    Some(user.dir.join(".config"))
}

/// Load and validate the merged catalog from `dir`.
///
/// Returns an empty (valid) catalog when the directory does not exist,
/// matching first-run behavior before any configuration is written.
pub fn load_dir(dir: &Path) -> Result<Catalog> {
    let mut files = Vec::new();
    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("failed to read config directory {}", dir.display()))?
        {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
            if path.is_file() && is_yaml {
                files.push(path);
            }
        }
    }
    files.sort();
    load_files(&files)
}

/// Load and validate the catalog from an explicit file list.
pub fn load_files(files: &[PathBuf]) -> Result<Catalog> {
    let mut catalog = Catalog::default();
    // name -> file that first defined it, for duplicate diagnostics
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for file in files {
        debug!("loading catalog fragment {}", file.display());
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let fragment: Catalog = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse {}", file.display()))?;

        for name in fragment_names(&fragment) {
            if let Some(first) = seen.get(&name) {
                bail!(
                    "duplicate package {name:?} defined in both {} and {}",
                    first.display(),
                    file.display()
                );
            }
            seen.insert(name, file.clone());
        }
        catalog.merge(fragment);
    }

    catalog.build_indexes();
    validate(&catalog)?;
    Ok(catalog)
}

fn fragment_names(fragment: &Catalog) -> Vec<String> {
    fragment
        .packages
        .iter()
        .map(|p| p.name.clone())
        .chain(fragment.custom_packages.iter().map(|c| c.name.clone()))
        .chain(fragment.github_release_packages.iter().map(|g| g.name.clone()))
        .collect()
}

/// Check the merged catalog's structural invariants.
pub fn validate(catalog: &Catalog) -> Result<()> {
    let mut source_names = HashMap::new();
    for source in &catalog.sources {
        if source.name.trim().is_empty() {
            bail!("source with empty name");
        }
        if source_names.insert(source.name.clone(), ()).is_some() {
            bail!("duplicate source: {}", source.name);
        }
    }

    for package in &catalog.packages {
        if package.name.trim().is_empty() {
            bail!("package with empty name");
        }
        if catalog.source(&package.source).is_none() {
            bail!(
                "package {:?} references undefined source {:?}",
                package.name,
                package.source
            );
        }
    }

    for gh in &catalog.github_release_packages {
        if gh.repo.split('/').filter(|part| !part.is_empty()).count() != 2 {
            bail!(
                "github release package {:?} has invalid repo {:?} (expected owner/repo)",
                gh.name,
                gh.repo
            );
        }
    }

    // Dangling depends_on entries would surface as PackageNotFound at
    // resolve time; catching them here names the offender instead.
    let nodes = catalog.dependency_nodes();
    for (name, deps) in &nodes {
        for dep in deps {
            if !nodes.contains_key(dep) {
                bail!("package {name:?} depends on unknown package {dep:?}");
            }
        }
    }

    Ok(())
}
