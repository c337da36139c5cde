//! The plan, confirm, execute flow.
//!
//! Interactive callers (the `update` command with no package argument)
//! drive the engine through the [`Reporter`] interface: the engine pushes
//! version information outward as concurrent queries complete, asks for
//! confirmation once both phases are done, then streams per-unit results.
//! The engine renders nothing itself.

use std::collections::BTreeMap;

use futures::StreamExt;

use crate::catalog::{Operation, PackageKey};
use crate::core::Result;
use crate::engine::Engine;
use crate::runner::CommandRunner;

/// Version-query phases reported by the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Installed-version queries have all completed.
    Installed,
    /// Available-version queries have all completed.
    Available,
}

/// Outward interface of the interactive flow.
///
/// Methods are invoked from concurrent query and execution tasks;
/// implementations must synchronize internally (a mutex around render
/// state is enough).
pub trait Reporter: Send + Sync {
    /// The flow is starting over these groups (source name to sorted
    /// package names).
    fn on_init(&self, groups: &BTreeMap<String, Vec<String>>);

    fn on_installed_version(&self, key: &PackageKey, version: &str);

    fn on_available_version(&self, key: &PackageKey, version: &str);

    fn on_phase_done(&self, phase: Phase);

    /// Ask whether to proceed from the status display to execution.
    fn confirm_proceed(&self) -> bool;

    fn on_execution_start(&self);

    fn on_unit_done(&self, key: &PackageKey, ok: bool, message: &str);

    fn on_done(&self);
}

impl Engine {
    /// Query every tracked package's versions, confirm, then update all.
    ///
    /// Declining the confirmation ends the flow successfully without
    /// running any command.
    pub async fn run_update_flow(
        &self,
        reporter: &dyn Reporter,
        runner: &dyn CommandRunner,
    ) -> Result<()> {
        let groups = self.tracked();
        reporter.on_init(&groups);

        let keys: Vec<PackageKey> = groups
            .values()
            .flat_map(|names| names.iter())
            .map(|name| self.key_for(name))
            .collect::<Result<_>>()?;
        let concurrency = keys.len().max(1);

        futures::stream::iter(keys.iter().map(|key| async move {
            let version = self.installed_version(key).await;
            reporter.on_installed_version(key, &version);
        }))
        .buffer_unordered(concurrency)
        .collect::<Vec<()>>()
        .await;
        reporter.on_phase_done(Phase::Installed);

        futures::stream::iter(keys.iter().map(|key| async move {
            let version = self.available_version(key).await;
            reporter.on_available_version(key, &version);
        }))
        .buffer_unordered(concurrency)
        .collect::<Vec<()>>()
        .await;
        reporter.on_phase_done(Phase::Available);

        if !reporter.confirm_proceed() {
            reporter.on_done();
            return Ok(());
        }

        reporter.on_execution_start();
        let callback =
            |key: &PackageKey, ok: bool, message: &str| reporter.on_unit_done(key, ok, message);
        self.execute(&keys, Operation::Update, runner, Some(&callback)).await;
        reporter.on_done();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::catalog::{Catalog, CustomPackage, Package, ScriptSpec, Source};
    use crate::engine::github_release::test_support::StaticFetcher;
    use crate::engine::test_support::RecordingRunner;

    #[derive(Default)]
    struct RecordingReporter {
        proceed: bool,
        events: Mutex<Vec<String>>,
    }

    impl RecordingReporter {
        fn new(proceed: bool) -> Self {
            Self { proceed, events: Mutex::new(Vec::new()) }
        }

        fn push(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Reporter for RecordingReporter {
        fn on_init(&self, groups: &BTreeMap<String, Vec<String>>) {
            self.push(format!("init:{}", groups.len()));
        }

        fn on_installed_version(&self, key: &PackageKey, version: &str) {
            self.push(format!("installed:{}={version}", key.name));
        }

        fn on_available_version(&self, key: &PackageKey, version: &str) {
            self.push(format!("available:{}={version}", key.name));
        }

        fn on_phase_done(&self, phase: Phase) {
            self.push(format!("phase:{phase:?}"));
        }

        fn confirm_proceed(&self) -> bool {
            self.push("confirm");
            self.proceed
        }

        fn on_execution_start(&self) {
            self.push("start");
        }

        fn on_unit_done(&self, key: &PackageKey, ok: bool, _message: &str) {
            self.push(format!("done:{}={ok}", key.name));
        }

        fn on_done(&self) {
            self.push("finished");
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog {
            sources: vec![Source {
                name: "apt".into(),
                update: ScriptSpec::cmd("echo upgrade {package_list}"),
                get_installed_version: ScriptSpec::cmd("echo 1.0.0"),
                get_latest_version: ScriptSpec::cmd("echo 1.1.0"),
                ..Default::default()
            }],
            packages: vec![Package {
                name: "git".into(),
                source: "apt".into(),
                ..Default::default()
            }],
            custom_packages: vec![CustomPackage {
                name: "tool".into(),
                get_installed_version: ScriptSpec::cmd("echo 0.9.0"),
                get_latest_version: ScriptSpec::cmd("echo 1.0.0"),
                update: ScriptSpec::cmd("echo update"),
                ..Default::default()
            }],
            ..Default::default()
        };
        catalog.build_indexes();
        catalog
    }

    #[tokio::test]
    async fn declining_confirmation_runs_nothing() {
        let engine = Engine::with_fetcher(catalog(), Box::new(StaticFetcher::empty()));
        let reporter = RecordingReporter::new(false);
        let runner = RecordingRunner::new();

        engine.run_update_flow(&reporter, &runner).await.unwrap();

        assert_eq!(runner.call_count(), 0);
        let events = reporter.events();
        assert!(events.contains(&"confirm".to_string()));
        assert!(events.contains(&"finished".to_string()));
        assert!(!events.contains(&"start".to_string()));
    }

    #[tokio::test]
    async fn accepted_flow_reports_phases_then_units() {
        let engine = Engine::with_fetcher(catalog(), Box::new(StaticFetcher::empty()));
        let reporter = RecordingReporter::new(true);
        let runner = RecordingRunner::new();

        engine.run_update_flow(&reporter, &runner).await.unwrap();

        let events = reporter.events();
        let pos = |needle: &str| {
            events
                .iter()
                .position(|e| e == needle)
                .unwrap_or_else(|| panic!("missing event {needle}: {events:?}"))
        };

        // Both query phases complete before confirmation, execution after.
        assert!(pos("phase:Installed") < pos("phase:Available"));
        assert!(pos("phase:Available") < pos("confirm"));
        assert!(pos("confirm") < pos("start"));
        assert!(pos("start") < pos("finished"));

        assert!(events.contains(&"installed:git=1.0.0".to_string()));
        assert!(events.contains(&"available:git=1.1.0".to_string()));
        assert!(events.contains(&"done:git=true".to_string()));
        assert!(events.contains(&"done:tool=true".to_string()));

        // One batch for apt, one custom unit.
        let mut calls = runner.recorded();
        calls.sort();
        assert_eq!(calls, vec!["apt:update-group", "tool:update"]);
    }
}
