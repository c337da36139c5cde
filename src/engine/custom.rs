//! Custom package pipelines.
//!
//! A custom package is fully script-driven. Install and update share one
//! pipeline shape, run sequentially within the package: query versions,
//! decide whether work is needed, then download, optionally clear the old
//! install, and run the main script. Version-query failures here are hard
//! failures for the package (unlike status queries, which swallow them):
//! a script author who wired up a broken query should hear about it before
//! anything mutates.

use tracing::debug;

use super::{query_hard, with_versions};
use crate::catalog::{CustomPackage, Operation, ScriptSpec};
use crate::core::{Result, UnipakError};
use crate::engine::Engine;
use crate::runner::CommandRunner;
use crate::version;

/// Stdout values of a `compare_versions` script that mean "update needed".
fn truthy(output: &str) -> bool {
    matches!(output.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

impl Engine {
    /// Run `operation` for the custom package `name`.
    pub(crate) async fn run_custom(
        &self,
        name: &str,
        operation: Operation,
        runner: &dyn CommandRunner,
    ) -> Result<String> {
        let package = self
            .catalog()
            .custom(name)
            .ok_or_else(|| UnipakError::PackageNotFound { name: name.to_string() })?;
        match operation {
            Operation::Remove => {
                if package.remove.is_empty() {
                    return Err(UnipakError::MissingScript {
                        name: name.to_string(),
                        step: "remove".to_string(),
                    });
                }
                runner.run(name, "remove", &package.remove).await?;
                Ok("removed".to_string())
            }
            Operation::Install | Operation::Update => {
                self.run_custom_pipeline(package, operation, runner).await
            }
        }
    }

    async fn run_custom_pipeline(
        &self,
        package: &CustomPackage,
        operation: Operation,
        runner: &dyn CommandRunner,
    ) -> Result<String> {
        let name = package.name.as_str();
        let main_script: &ScriptSpec = match operation {
            Operation::Install => {
                if package.install.is_empty() {
                    return Err(UnipakError::MissingScript {
                        name: name.to_string(),
                        step: "install".to_string(),
                    });
                }
                &package.install
            }
            Operation::Update => {
                if package.update.is_empty() {
                    // Updates without a script are a quiet no-op.
                    return Ok("no update script; skipped".to_string());
                }
                &package.update
            }
            Operation::Remove => unreachable!("remove handled by run_custom"),
        };

        let latest =
            query_hard(name, "get_latest_version", &package.get_latest_version).await?;
        let installed =
            query_hard(name, "get_installed_version", &package.get_installed_version).await?;
        debug!("{name} versions: latest={latest:?} installed={installed:?}");

        let needed = if package.compare_versions.is_present() {
            let script = with_versions(&package.compare_versions, &latest, &installed);
            truthy(&query_hard(name, "compare_versions", &script).await?)
        } else {
            match operation {
                Operation::Install => installed.is_empty(),
                _ => !installed.is_empty() && version::is_newer(&latest, &installed),
            }
        };

        if !needed {
            return Ok(match operation {
                Operation::Install => format!("already installed ({installed})"),
                _ => "up-to-date".to_string(),
            });
        }

        if package.download.is_present() {
            let script = with_versions(&package.download, &latest, &installed);
            runner.run(name, "download", &script).await?;
        }
        if operation == Operation::Install && package.remove.is_present() {
            runner.run(name, "remove-before-install", &package.remove).await?;
        }
        let script = with_versions(main_script, &latest, &installed);
        runner.run(name, operation.step(), &script).await?;

        Ok(match operation {
            Operation::Install => "installed".to_string(),
            _ => {
                if latest.is_empty() {
                    "updated".to_string()
                } else {
                    format!("updated to {latest}")
                }
            }
        })
    }
}
