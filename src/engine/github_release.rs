//! GitHub release package pipeline.
//!
//! Fetch the latest release, pick the asset matching the configured glob,
//! download it into a fresh temporary directory, and hand the path to the
//! package's post-install script. The temporary directory is removed when
//! the pipeline finishes, whether or not the script succeeded.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::query_soft;
use crate::catalog::{GithubReleasePackage, Operation, ScriptSpec};
use crate::core::{Result, UnipakError};
use crate::engine::Engine;
use crate::github::{GithubClient, Release, ReleaseAsset};
use crate::runner::{CommandRunner, shell_literal};
use crate::version;

/// The engine's view of the release backend.
///
/// Production uses [`GithubClient`]; tests substitute a canned fetcher so
/// pipelines run without the network.
#[async_trait]
pub trait ReleaseFetcher: Send + Sync {
    async fn latest_release(&self, repo: &str) -> Result<Release>;

    fn find_asset<'r>(&self, release: &'r Release, pattern: &str) -> Result<&'r ReleaseAsset>;

    async fn download_asset(&self, asset: &ReleaseAsset, dest_dir: &Path) -> Result<PathBuf>;
}

#[async_trait]
impl ReleaseFetcher for GithubClient {
    async fn latest_release(&self, repo: &str) -> Result<Release> {
        GithubClient::latest_release(self, repo).await
    }

    fn find_asset<'r>(&self, release: &'r Release, pattern: &str) -> Result<&'r ReleaseAsset> {
        GithubClient::find_asset(self, release, pattern)
    }

    async fn download_asset(&self, asset: &ReleaseAsset, dest_dir: &Path) -> Result<PathBuf> {
        GithubClient::download_asset(self, asset, dest_dir).await
    }
}

/// Prefix `latest_version`/`installed_version`/`asset_path` assignments to
/// the post-install script.
fn with_asset_path(
    script: &ScriptSpec,
    latest: &str,
    installed: &str,
    asset_path: &Path,
) -> ScriptSpec {
    let prefix = format!(
        "latest_version={} installed_version={} asset_path={}",
        shell_literal(latest),
        shell_literal(installed),
        shell_literal(&asset_path.display().to_string())
    );
    ScriptSpec::new(format!("{prefix}; {}", script.command), script.require_root)
}

impl Engine {
    /// Run `operation` for the GitHub release package `name`.
    pub(crate) async fn run_github(
        &self,
        name: &str,
        operation: Operation,
        runner: &dyn CommandRunner,
    ) -> Result<String> {
        let package = self
            .catalog()
            .github(name)
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
            Operation::Install => {
                // Failed queries count as not-installed for this kind.
                let installed = query_soft(&package.get_installed_version).await;
                if !installed.is_empty() {
                    return Ok(format!("already installed ({installed})"));
                }
                if package.post_install.is_empty() {
                    return Err(UnipakError::MissingScript {
                        name: name.to_string(),
                        step: "post_install".to_string(),
                    });
                }
                self.fetch_and_install(package, "", runner).await
            }
            Operation::Update => {
                let installed = query_soft(&package.get_installed_version).await;
                if installed.is_empty() {
                    return Ok("not installed; skipped".to_string());
                }
                if package.post_install.is_empty() {
                    return Ok("no post_install script; skipped".to_string());
                }
                self.fetch_and_install(package, &installed, runner).await
            }
        }
    }

    async fn fetch_and_install(
        &self,
        package: &GithubReleasePackage,
        installed: &str,
        runner: &dyn CommandRunner,
    ) -> Result<String> {
        let release = self.fetcher().latest_release(&package.repo).await?;
        let latest = release.tag_name.trim().to_string();
        if !installed.is_empty() && !latest.is_empty() && !version::is_newer(&latest, installed) {
            return Ok("up-to-date".to_string());
        }

        let asset = self.fetcher().find_asset(&release, &package.asset_pattern)?;
        debug!("{}: selected asset {} ({} bytes)", package.name, asset.name, asset.size);

        // TempDir removes the directory on drop, covering every exit path
        // out of this function including post-install failure.
        let tmp = tempfile::Builder::new()
            .prefix(&format!("unipak-{}-", package.name))
            .tempdir()?;
        let asset_path = self.fetcher().download_asset(asset, tmp.path()).await?;

        let script = with_asset_path(&package.post_install, &latest, installed, &asset_path);
        runner.run(&package.name, "post_install", &script).await?;

        Ok(if installed.is_empty() {
            "installed".to_string()
        } else {
            format!("updated to {latest}")
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::StaticFetcher;
    use super::*;
    use crate::catalog::Catalog;
    use crate::engine::test_support::{RecordingRunner, ShellRunner};

    fn engine_with(package: GithubReleasePackage, fetcher: StaticFetcher) -> Engine {
        let mut catalog =
            Catalog { github_release_packages: vec![package], ..Default::default() };
        catalog.build_indexes();
        Engine::with_fetcher(catalog, Box::new(fetcher))
    }

    fn package() -> GithubReleasePackage {
        GithubReleasePackage {
            name: "lazygit".into(),
            repo: "jesseduffield/lazygit".into(),
            asset_pattern: "*linux*.tar.gz".into(),
            post_install: ScriptSpec::cmd("echo install"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn install_skips_when_already_installed() {
        let mut pkg = package();
        pkg.get_installed_version = ScriptSpec::cmd("echo 1.0.0");
        let engine = engine_with(pkg, StaticFetcher::empty());
        let runner = RecordingRunner::new();
        let message =
            engine.run_github("lazygit", Operation::Install, &runner).await.unwrap();
        assert!(message.starts_with("already installed"));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn update_skips_when_not_installed() {
        let engine = engine_with(package(), StaticFetcher::empty());
        let runner = RecordingRunner::new();
        let message =
            engine.run_github("lazygit", Operation::Update, &runner).await.unwrap();
        assert_eq!(message, "not installed; skipped");
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn update_skips_when_latest_is_not_newer() {
        let mut pkg = package();
        pkg.get_installed_version = ScriptSpec::cmd("echo 1.4.0");
        let engine = engine_with(
            pkg,
            StaticFetcher::single_asset("v1.4.0", "lazygit-linux-amd64.tar.gz"),
        );
        let runner = RecordingRunner::new();
        let message =
            engine.run_github("lazygit", Operation::Update, &runner).await.unwrap();
        assert_eq!(message, "up-to-date");
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn install_downloads_and_runs_post_install() {
        let tmp = tempfile::tempdir().unwrap();
        let captured = tmp.path().join("captured");
        let mut pkg = package();
        pkg.post_install = ScriptSpec::cmd(format!(
            r#"test -f "$asset_path" && echo "$asset_path" > {}"#,
            captured.display()
        ));
        let engine = engine_with(
            pkg,
            StaticFetcher::single_asset("v1.4.0", "lazygit-linux-amd64.tar.gz"),
        );
        let message =
            engine.run_github("lazygit", Operation::Install, &ShellRunner).await.unwrap();
        assert_eq!(message, "installed");

        // The script saw a real file, and the temp directory it lived in
        // is gone now that the pipeline finished.
        let asset_path = std::fs::read_to_string(&captured).unwrap().trim().to_string();
        assert!(asset_path.ends_with("lazygit-linux-amd64.tar.gz"));
        assert!(!std::path::Path::new(&asset_path).exists());
    }

    #[tokio::test]
    async fn update_reports_new_version() {
        let mut pkg = package();
        pkg.get_installed_version = ScriptSpec::cmd("echo 1.3.0");
        let engine = engine_with(
            pkg,
            StaticFetcher::single_asset("v1.4.0", "lazygit-linux-amd64.tar.gz"),
        );
        let runner = RecordingRunner::new();
        let message =
            engine.run_github("lazygit", Operation::Update, &runner).await.unwrap();
        assert_eq!(message, "updated to v1.4.0");
        assert_eq!(runner.recorded(), vec!["lazygit:post_install"]);
    }

    #[tokio::test]
    async fn unmatched_pattern_is_asset_not_found() {
        let engine =
            engine_with(package(), StaticFetcher::single_asset("v1.4.0", "lazygit.zip"));
        let runner = RecordingRunner::new();
        let err =
            engine.run_github("lazygit", Operation::Install, &runner).await.unwrap_err();
        assert!(matches!(err, UnipakError::AssetNotFound { .. }));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn install_without_post_install_is_missing_script() {
        let mut pkg = package();
        pkg.post_install = ScriptSpec::default();
        let engine = engine_with(pkg, StaticFetcher::empty());
        let runner = RecordingRunner::new();
        let err =
            engine.run_github("lazygit", Operation::Install, &runner).await.unwrap_err();
        assert!(matches!(err, UnipakError::MissingScript { .. }));
    }

    #[tokio::test]
    async fn remove_runs_configured_script() {
        let mut pkg = package();
        pkg.remove = ScriptSpec::cmd("echo remove");
        let engine = engine_with(pkg, StaticFetcher::empty());
        let runner = RecordingRunner::new();
        let message =
            engine.run_github("lazygit", Operation::Remove, &runner).await.unwrap();
        assert_eq!(message, "removed");
        assert_eq!(runner.recorded(), vec!["lazygit:remove"]);
    }
}
