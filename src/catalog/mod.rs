//! Catalog data model.
//!
//! The catalog is the read-only input to every engine operation: a set of
//! [`Source`] backends (OS package managers driven by shell command
//! templates), [`CustomPackage`] entries (arbitrary per-package scripts),
//! and [`GithubReleasePackage`] entries (binaries fetched from GitHub
//! releases). An external loader ([`loader`]) builds and validates it; the
//! engine only reads it.
//!
//! Package names are unique across all three kinds, and the union of all
//! `depends_on` lists forms a DAG. Both invariants are enforced at load
//! time.

pub mod loader;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A shell command plus its elevation requirement.
///
/// Commands are opaque shell text; the engine never inspects them beyond
/// placeholder substitution (`{package_list}`, `{package}`, `{query}`).
/// In YAML a script is written either as a bare string or as a mapping
/// with `command` and `require_root` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptSpec {
    /// Opaque shell text, empty when the script is not configured.
    pub command: String,
    /// Whether the command must run with elevated privileges.
    pub require_root: bool,
}

impl ScriptSpec {
    /// A script with an explicit elevation flag.
    pub fn new(command: impl Into<String>, require_root: bool) -> Self {
        Self { command: command.into(), require_root }
    }

    /// A non-privileged script.
    pub fn cmd(command: impl Into<String>) -> Self {
        Self::new(command, false)
    }

    /// True when no command is configured.
    pub fn is_empty(&self) -> bool {
        self.command.trim().is_empty()
    }

    /// True when a command is configured.
    pub fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<'de> Deserialize<'de> for ScriptSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bare(String),
            Full {
                command: String,
                #[serde(default)]
                require_root: bool,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bare(command) => Self { command, require_root: false },
            Repr::Full { command, require_root } => Self { command, require_root },
        })
    }
}

/// Backend descriptor for packages managed by an OS package manager.
///
/// Every command is a template: batch operations substitute
/// `{package_list}` with a space-joined name list, version queries
/// substitute `{package}` with a single name, and search substitutes
/// `{query}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Source {
    pub name: String,
    pub install: ScriptSpec,
    pub remove: ScriptSpec,
    pub update: ScriptSpec,
    pub search: ScriptSpec,
    pub get_installed_version: ScriptSpec,
    pub get_latest_version: ScriptSpec,
    /// Runs at most once per process before the first availability query
    /// against this source (e.g. `apt-get update`).
    pub pre_update: ScriptSpec,
}

/// A package installed through a [`Source`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Package {
    pub name: String,
    pub source: String,
    pub depends_on: Vec<String>,
}

/// A package driven entirely by user-supplied scripts.
///
/// Install-family scripts receive `latest_version` and `installed_version`
/// as quoted shell assignments prefixed to the command.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CustomPackage {
    pub name: String,
    pub depends_on: Vec<String>,
    pub get_latest_version: ScriptSpec,
    pub get_installed_version: ScriptSpec,
    /// Optional override for the built-in version comparison; stdout of
    /// `true`/`1`/`yes` (case-insensitive) means an update is needed.
    pub compare_versions: ScriptSpec,
    pub download: ScriptSpec,
    pub remove: ScriptSpec,
    pub install: ScriptSpec,
    pub update: ScriptSpec,
}

/// A package whose artifact comes from a GitHub release.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GithubReleasePackage {
    pub name: String,
    pub depends_on: Vec<String>,
    /// Repository identifier in `owner/repo` form.
    pub repo: String,
    /// Glob matched case-insensitively against release asset names.
    pub asset_pattern: String,
    pub get_installed_version: ScriptSpec,
    /// Receives `latest_version`, `installed_version` and `asset_path`
    /// (the downloaded artifact) as quoted shell assignments.
    pub post_install: ScriptSpec,
    pub remove: ScriptSpec,
}

/// Which execution pipeline handles a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    /// Batched through a [`Source`] command template.
    Source,
    /// Per-package custom script pipeline.
    Custom,
    /// GitHub release download plus post-install script.
    GithubRelease,
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Custom => "custom",
            Self::GithubRelease => "github",
        })
    }
}

/// Identity tuple addressing one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageKey {
    /// Source name for [`PackageKind::Source`] keys, otherwise the group
    /// label `custom` or `github`.
    pub source: String,
    pub name: String,
    pub kind: PackageKind,
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.name)
    }
}

/// The engine operations a catalog entry can support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Install,
    Update,
    Remove,
}

impl Operation {
    /// Step label for single-package command context.
    pub fn step(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }

    /// Step label for a batched source command.
    pub fn batch_step(self) -> &'static str {
        match self {
            Self::Install => "install-group",
            Self::Update => "update-group",
            Self::Remove => "remove-group",
        }
    }

    /// Past-tense success message.
    pub fn done_message(self) -> &'static str {
        match self {
            Self::Install => "installed",
            Self::Update => "updated",
            Self::Remove => "removed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.step())
    }
}

/// The merged, validated catalog with name indexes for constant-time lookup.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Catalog {
    pub sources: Vec<Source>,
    pub packages: Vec<Package>,
    pub custom_packages: Vec<CustomPackage>,
    pub github_release_packages: Vec<GithubReleasePackage>,

    #[serde(skip)]
    pub source_index: HashMap<String, usize>,
    #[serde(skip)]
    pub package_index: HashMap<String, usize>,
    #[serde(skip)]
    pub custom_index: HashMap<String, usize>,
    #[serde(skip)]
    pub github_index: HashMap<String, usize>,
}

impl Catalog {
    /// Absorb another catalog fragment (one parsed file) into this one.
    pub fn merge(&mut self, other: Catalog) {
        self.sources.extend(other.sources);
        self.packages.extend(other.packages);
        self.custom_packages.extend(other.custom_packages);
        self.github_release_packages.extend(other.github_release_packages);
    }

    /// Rebuild the name indexes. Must be called after construction or
    /// [`Catalog::merge`] before any lookup.
    pub fn build_indexes(&mut self) {
        self.source_index =
            self.sources.iter().enumerate().map(|(i, s)| (s.name.clone(), i)).collect();
        self.package_index =
            self.packages.iter().enumerate().map(|(i, p)| (p.name.clone(), i)).collect();
        self.custom_index =
            self.custom_packages.iter().enumerate().map(|(i, c)| (c.name.clone(), i)).collect();
        self.github_index = self
            .github_release_packages
            .iter()
            .enumerate()
            .map(|(i, g)| (g.name.clone(), i))
            .collect();
    }

    pub fn source(&self, name: &str) -> Option<&Source> {
        self.source_index.get(name).map(|&i| &self.sources[i])
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.package_index.get(name).map(|&i| &self.packages[i])
    }

    pub fn custom(&self, name: &str) -> Option<&CustomPackage> {
        self.custom_index.get(name).map(|&i| &self.custom_packages[i])
    }

    pub fn github(&self, name: &str) -> Option<&GithubReleasePackage> {
        self.github_index.get(name).map(|&i| &self.github_release_packages[i])
    }

    /// Kind of the named entry, if it exists anywhere in the catalog.
    pub fn kind_of(&self, name: &str) -> Option<PackageKind> {
        if self.custom_index.contains_key(name) {
            Some(PackageKind::Custom)
        } else if self.github_index.contains_key(name) {
            Some(PackageKind::GithubRelease)
        } else if self.package_index.contains_key(name) {
            Some(PackageKind::Source)
        } else {
            None
        }
    }

    /// Every package name with its direct dependency list, across all
    /// three kinds. This is the node set the resolver operates on.
    pub fn dependency_nodes(&self) -> HashMap<String, Vec<String>> {
        let mut nodes = HashMap::new();
        for p in &self.packages {
            nodes.insert(p.name.clone(), p.depends_on.clone());
        }
        for c in &self.custom_packages {
            nodes.insert(c.name.clone(), c.depends_on.clone());
        }
        for g in &self.github_release_packages {
            nodes.insert(g.name.clone(), g.depends_on.clone());
        }
        nodes
    }

    /// Total number of catalog entries across all kinds.
    pub fn len(&self) -> usize {
        self.packages.len() + self.custom_packages.len() + self.github_release_packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
