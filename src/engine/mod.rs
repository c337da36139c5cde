//! The execution engine.
//!
//! The engine is the orchestrator tying everything together: it consumes
//! the immutable [`Catalog`], resolves dependency plans, answers version
//! queries, and executes install/update/remove operations across the three
//! backend kinds. Work fans out per unit (one source batch, one custom
//! package, or one GitHub package each) and results fan back in through a
//! mutex-guarded sink plus an optional per-unit callback.
//!
//! # Unit model
//!
//! Within one [`Engine::execute`] call:
//! - keys of [`PackageKind::Source`] sharing a source are batched into a
//!   single command with `{package_list}` substituted; the batch's one
//!   outcome is applied to every name in it,
//! - every custom and GitHub package is its own unit with a fully
//!   sequential internal pipeline.
//!
//! Units run concurrently and are isolated: no unit's failure affects any
//! other, and the call always runs the whole batch to completion. Callers
//! must not start a second `execute` over overlapping keys while one is in
//! flight; the engine provides no per-key locking.

pub mod custom;
pub mod flow;
pub mod github_release;
pub mod hooks;
pub mod source;

use std::collections::BTreeMap;
use std::sync::Mutex;

use futures::StreamExt;
use tracing::{debug, info};

use crate::catalog::{Catalog, Operation, PackageKey, PackageKind, ScriptSpec};
use crate::core::{Result, UnipakError};
use crate::exec;
use crate::github::GithubClient;
use crate::resolver::DependencyResolver;
use crate::runner::CommandRunner;

pub use flow::{Phase, Reporter};
pub use github_release::ReleaseFetcher;
pub use hooks::HookCache;

/// Group labels for the non-source kinds.
pub const CUSTOM_GROUP: &str = "custom";
pub const GITHUB_GROUP: &str = "github";

/// Transient installed/available pair held during one engine invocation.
#[derive(Debug, Clone, Default)]
pub struct VersionStatus {
    pub installed: String,
    pub available: String,
}

/// Outcome of one scheduled unit entry.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub key: PackageKey,
    pub ok: bool,
    pub message: String,
}

/// Per-key outcomes of one [`Engine::execute`] call.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<UnitOutcome>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.ok)
    }
}

/// Per-unit completion callback: `(key, success, message)`.
///
/// Invocation order across units is unspecified; delivery is serialized
/// through the engine's result sink, so implementations need not be
/// reentrant.
pub type ResultCallback<'a> = &'a (dyn Fn(&PackageKey, bool, &str) + Send + Sync);

enum Unit {
    SourceBatch { source: String, names: Vec<String> },
    Custom(String),
    Github(String),
}

/// The package-operation orchestrator.
///
/// Holds the catalog, the release fetcher, and the pre-operation hook
/// cache. All mutable state (hook markers, result sinks) is owned by the
/// instance; dropping the engine tears the session down.
pub struct Engine {
    catalog: Catalog,
    fetcher: Box<dyn ReleaseFetcher>,
    hooks: HookCache,
}

impl Engine {
    /// Engine over the live GitHub API.
    pub fn new(catalog: Catalog) -> Self {
        Self::with_fetcher(catalog, Box::new(GithubClient::new()))
    }

    /// Engine with a caller-supplied release fetcher (tests, mirrors).
    pub fn with_fetcher(catalog: Catalog, fetcher: Box<dyn ReleaseFetcher>) -> Self {
        Self { catalog, fetcher, hooks: HookCache::new() }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The pre-operation hook cache, exposed for session resets.
    pub fn hooks(&self) -> &HookCache {
        &self.hooks
    }

    pub(crate) fn fetcher(&self) -> &dyn ReleaseFetcher {
        self.fetcher.as_ref()
    }

    /// The identity key for a catalog name.
    pub fn key_for(&self, name: &str) -> Result<PackageKey> {
        match self.catalog.kind_of(name) {
            Some(PackageKind::Custom) => Ok(PackageKey {
                source: CUSTOM_GROUP.to_string(),
                name: name.to_string(),
                kind: PackageKind::Custom,
            }),
            Some(PackageKind::GithubRelease) => Ok(PackageKey {
                source: GITHUB_GROUP.to_string(),
                name: name.to_string(),
                kind: PackageKind::GithubRelease,
            }),
            Some(PackageKind::Source) => {
                let package = self
                    .catalog
                    .package(name)
                    .ok_or_else(|| UnipakError::PackageNotFound { name: name.to_string() })?;
                Ok(PackageKey {
                    source: package.source.clone(),
                    name: name.to_string(),
                    kind: PackageKind::Source,
                })
            }
            None => Err(UnipakError::PackageNotFound { name: name.to_string() }),
        }
    }

    /// Dependency-ordered plan of names for `name`.
    pub fn resolve_plan(&self, name: &str) -> Result<Vec<String>> {
        DependencyResolver::from_catalog(&self.catalog).resolve(name)
    }

    /// Dependency-ordered plan of keys for `name`.
    pub fn resolve_keys(&self, name: &str) -> Result<Vec<PackageKey>> {
        self.resolve_plan(name)?.iter().map(|n| self.key_for(n)).collect()
    }

    /// Every tracked package, grouped by source name (custom packages
    /// under `custom`, GitHub packages under `github`), names sorted.
    pub fn tracked(&self) -> BTreeMap<String, Vec<String>> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for package in &self.catalog.packages {
            groups.entry(package.source.clone()).or_default().push(package.name.clone());
        }
        for custom in &self.catalog.custom_packages {
            groups.entry(CUSTOM_GROUP.to_string()).or_default().push(custom.name.clone());
        }
        for gh in &self.catalog.github_release_packages {
            groups.entry(GITHUB_GROUP.to_string()).or_default().push(gh.name.clone());
        }
        for names in groups.values_mut() {
            names.sort_unstable();
        }
        groups
    }

    /// Whether the backend behind `key` supports `operation`.
    ///
    /// Callers filter keys through this before offering an operation, so
    /// unsupported entries never reach [`Engine::execute`] by accident.
    pub fn has_command(&self, key: &PackageKey, operation: Operation) -> bool {
        match key.kind {
            PackageKind::Source => self.catalog.source(&key.source).is_some_and(|s| {
                match operation {
                    Operation::Install => s.install.is_present(),
                    Operation::Update => s.update.is_present(),
                    Operation::Remove => s.remove.is_present(),
                }
            }),
            PackageKind::Custom => self.catalog.custom(&key.name).is_some_and(|c| {
                match operation {
                    Operation::Install => c.install.is_present(),
                    Operation::Update => c.update.is_present(),
                    Operation::Remove => c.remove.is_present(),
                }
            }),
            PackageKind::GithubRelease => {
                self.catalog.github(&key.name).is_some_and(|g| match operation {
                    Operation::Install | Operation::Update => g.post_install.is_present(),
                    Operation::Remove => g.remove.is_present(),
                })
            }
        }
    }

    /// Installed version of `key`, empty when not installed or unknown.
    ///
    /// Query failures are swallowed into the empty string; one broken
    /// backend must not block unrelated status reporting.
    pub async fn installed_version(&self, key: &PackageKey) -> String {
        match key.kind {
            PackageKind::Custom => match self.catalog.custom(&key.name) {
                Some(custom) => query_soft(&custom.get_installed_version).await,
                None => String::new(),
            },
            PackageKind::GithubRelease => match self.catalog.github(&key.name) {
                Some(gh) => query_soft(&gh.get_installed_version).await,
                None => String::new(),
            },
            PackageKind::Source => match self.catalog.source(&key.source) {
                Some(source) => {
                    let script = substitute(&source.get_installed_version, "{package}", &key.name);
                    query_soft(&script).await
                }
                None => String::new(),
            },
        }
    }

    /// Latest available version of `key`, running the source's
    /// pre-operation hook first (at most once per process).
    pub async fn available_version(&self, key: &PackageKey) -> String {
        self.available_version_inner(key, true).await
    }

    /// Like [`Engine::available_version`] but guaranteed side-effect free:
    /// never triggers the pre-operation hook. For status inspection.
    pub async fn available_version_dry_run(&self, key: &PackageKey) -> String {
        self.available_version_inner(key, false).await
    }

    async fn available_version_inner(&self, key: &PackageKey, run_hooks: bool) -> String {
        match key.kind {
            PackageKind::Custom => match self.catalog.custom(&key.name) {
                Some(custom) => query_soft(&custom.get_latest_version).await,
                None => String::new(),
            },
            PackageKind::GithubRelease => match self.catalog.github(&key.name) {
                Some(gh) => match self.fetcher.latest_release(&gh.repo).await {
                    Ok(release) => release.tag_name.trim().to_string(),
                    Err(err) => {
                        debug!("{}: release query failed: {err}", key.name);
                        String::new()
                    }
                },
                None => String::new(),
            },
            PackageKind::Source => match self.catalog.source(&key.source) {
                Some(source) => {
                    if run_hooks {
                        self.hooks.ensure_ran_once(&source.name, &source.pre_update).await;
                    }
                    let script = substitute(&source.get_latest_version, "{package}", &key.name);
                    query_soft(&script).await
                }
                None => String::new(),
            },
        }
    }

    /// Run `operation` across `keys`, all units concurrently.
    ///
    /// The call blocks until every unit completes. `on_unit_done`, when
    /// supplied, fires once per key at unit completion. Note the
    /// documented coarse grain for source batches: a batch's single
    /// command outcome is reported identically for every name in it.
    pub async fn execute(
        &self,
        keys: &[PackageKey],
        operation: Operation,
        runner: &dyn CommandRunner,
        on_unit_done: Option<ResultCallback<'_>>,
    ) -> ExecutionReport {
        let units = build_units(keys);
        let sink: Mutex<Vec<UnitOutcome>> = Mutex::new(Vec::with_capacity(keys.len()));
        let concurrency = units.len().max(1);
        futures::stream::iter(
            units
                .into_iter()
                .map(|unit| self.run_unit(unit, operation, runner, &sink, on_unit_done)),
        )
        .buffer_unordered(concurrency)
        .collect::<Vec<()>>()
        .await;
        ExecutionReport { outcomes: sink.into_inner().expect("result sink poisoned") }
    }

    async fn run_unit(
        &self,
        unit: Unit,
        operation: Operation,
        runner: &dyn CommandRunner,
        sink: &Mutex<Vec<UnitOutcome>>,
        on_unit_done: Option<ResultCallback<'_>>,
    ) {
        match unit {
            Unit::SourceBatch { source, names } => {
                let result = self.run_source_batch(&source, &names, operation, runner).await;
                let (ok, message) = flatten(result);
                for name in names {
                    let key =
                        PackageKey { source: source.clone(), name, kind: PackageKind::Source };
                    deliver(sink, on_unit_done, key, ok, &message);
                }
            }
            Unit::Custom(name) => {
                let result = self.run_custom(&name, operation, runner).await;
                let (ok, message) = flatten(result);
                let key = PackageKey {
                    source: CUSTOM_GROUP.to_string(),
                    name,
                    kind: PackageKind::Custom,
                };
                deliver(sink, on_unit_done, key, ok, &message);
            }
            Unit::Github(name) => {
                let result = self.run_github(&name, operation, runner).await;
                let (ok, message) = flatten(result);
                let key = PackageKey {
                    source: GITHUB_GROUP.to_string(),
                    name,
                    kind: PackageKind::GithubRelease,
                };
                deliver(sink, on_unit_done, key, ok, &message);
            }
        }
    }

    /// Concurrent batch install over already-resolved keys.
    pub async fn install_selected(
        &self,
        keys: &[PackageKey],
        runner: &dyn CommandRunner,
        on_unit_done: Option<ResultCallback<'_>>,
    ) -> ExecutionReport {
        self.execute(keys, Operation::Install, runner, on_unit_done).await
    }

    /// Concurrent batch update over already-resolved keys.
    pub async fn update_selected(
        &self,
        keys: &[PackageKey],
        runner: &dyn CommandRunner,
        on_unit_done: Option<ResultCallback<'_>>,
    ) -> ExecutionReport {
        self.execute(keys, Operation::Update, runner, on_unit_done).await
    }

    /// Concurrent batch removal over already-resolved keys.
    pub async fn remove_selected(
        &self,
        keys: &[PackageKey],
        runner: &dyn CommandRunner,
        on_unit_done: Option<ResultCallback<'_>>,
    ) -> ExecutionReport {
        self.execute(keys, Operation::Remove, runner, on_unit_done).await
    }

    /// Install `name` and everything it depends on, sequentially in
    /// dependency order, failing fast on the first error.
    pub async fn install(&self, name: &str, runner: &dyn CommandRunner) -> Result<()> {
        let plan = self.resolve_plan(name)?;
        debug!("install plan for {name}: {}", plan.join(" -> "));
        for entry in &plan {
            let key = self.key_for(entry)?;
            let message = match key.kind {
                PackageKind::Custom => self.run_custom(entry, Operation::Install, runner).await?,
                PackageKind::GithubRelease => {
                    self.run_github(entry, Operation::Install, runner).await?
                }
                PackageKind::Source => {
                    self.run_source_batch(
                        &key.source,
                        std::slice::from_ref(entry),
                        Operation::Install,
                        runner,
                    )
                    .await?
                }
            };
            info!("{entry}: {message}");
        }
        Ok(())
    }

    /// Update a single package, propagating the first fatal error.
    pub async fn update_one(&self, name: &str, runner: &dyn CommandRunner) -> Result<String> {
        let key = self.key_for(name)?;
        match key.kind {
            PackageKind::Custom => self.run_custom(name, Operation::Update, runner).await,
            PackageKind::GithubRelease => self.run_github(name, Operation::Update, runner).await,
            PackageKind::Source => {
                self.run_source_batch(
                    &key.source,
                    std::slice::from_ref(&key.name),
                    Operation::Update,
                    runner,
                )
                .await
            }
        }
    }

    /// Remove a single package, propagating the first fatal error.
    pub async fn remove(&self, name: &str, runner: &dyn CommandRunner) -> Result<String> {
        let key = self.key_for(name)?;
        match key.kind {
            PackageKind::Custom => self.run_custom(name, Operation::Remove, runner).await,
            PackageKind::GithubRelease => self.run_github(name, Operation::Remove, runner).await,
            PackageKind::Source => {
                self.run_source_batch(
                    &key.source,
                    std::slice::from_ref(&key.name),
                    Operation::Remove,
                    runner,
                )
                .await
            }
        }
    }
}

fn build_units(keys: &[PackageKey]) -> Vec<Unit> {
    // BTreeMap keeps batch construction deterministic.
    let mut by_source: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut units = Vec::new();
    for key in keys {
        match key.kind {
            PackageKind::Source => {
                by_source.entry(key.source.clone()).or_default().push(key.name.clone());
            }
            PackageKind::Custom => units.push(Unit::Custom(key.name.clone())),
            PackageKind::GithubRelease => units.push(Unit::Github(key.name.clone())),
        }
    }
    for (source, names) in by_source {
        units.push(Unit::SourceBatch { source, names });
    }
    units
}

fn flatten(result: Result<String>) -> (bool, String) {
    match result {
        Ok(message) => (true, message),
        Err(err) => (false, err.to_string()),
    }
}

fn deliver(
    sink: &Mutex<Vec<UnitOutcome>>,
    on_unit_done: Option<ResultCallback<'_>>,
    key: PackageKey,
    ok: bool,
    message: &str,
) {
    sink.lock()
        .expect("result sink poisoned")
        .push(UnitOutcome { key: key.clone(), ok, message: message.to_string() });
    if let Some(callback) = on_unit_done {
        callback(&key, ok, message);
    }
}

/// Substitute a placeholder in a command template, preserving the
/// elevation flag.
pub(crate) fn substitute(template: &ScriptSpec, placeholder: &str, value: &str) -> ScriptSpec {
    ScriptSpec::new(template.command.replace(placeholder, value), template.require_root)
}

/// Prefix quoted `latest_version`/`installed_version` assignments to an
/// install-family script.
pub(crate) fn with_versions(script: &ScriptSpec, latest: &str, installed: &str) -> ScriptSpec {
    let prefix = format!(
        "latest_version={} installed_version={}",
        crate::runner::shell_literal(latest),
        crate::runner::shell_literal(installed)
    );
    ScriptSpec::new(format!("{prefix}; {}", script.command), script.require_root)
}

/// Run a version query, swallowing failures into the empty string.
pub(crate) async fn query_soft(script: &ScriptSpec) -> String {
    if script.is_empty() {
        return String::new();
    }
    let output = exec::run_shell(script).await;
    if output.success() {
        output.stdout_trimmed().to_string()
    } else {
        debug!("version query failed (exit {}), treating as unknown", output.code);
        String::new()
    }
}

/// Run a version query whose failure is fatal for the current unit.
pub(crate) async fn query_hard(name: &str, step: &str, script: &ScriptSpec) -> Result<String> {
    if script.is_empty() {
        return Ok(String::new());
    }
    let output = exec::run_shell(script).await;
    if output.success() {
        Ok(output.stdout_trimmed().to_string())
    } else {
        Err(UnipakError::command_failed(name, step, output.code, &output.stderr))
    }
}
