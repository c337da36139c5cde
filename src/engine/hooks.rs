//! One-shot pre-operation hook cache.
//!
//! Sources may declare a `pre_update` hook (typically a metadata refresh
//! like `apt-get update`) that should run at most once per process, no
//! matter how many packages or how many concurrent queries touch the
//! source. The cache is keyed by a content hash of the script text, so two
//! sources that happen to declare byte-identical hooks still trigger a
//! single execution.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::catalog::ScriptSpec;
use crate::exec;

/// Process-lifetime "already ran" set for pre-operation hooks.
///
/// Owned by the engine instance; there is no global state, and
/// [`HookCache::reset`] restores a fresh session (used between logical
/// runs and for test isolation).
pub struct HookCache {
    ran: DashMap<String, ()>,
}

impl HookCache {
    pub fn new() -> Self {
        Self { ran: DashMap::new() }
    }

    fn fingerprint(script: &str) -> String {
        hex::encode(Sha256::digest(script.as_bytes()))
    }

    /// Run `script` if this is the first time its content has been seen.
    ///
    /// The check-and-set is atomic, so concurrent callers with identical
    /// script text race to a single winner and the script executes exactly
    /// once. Hook failures are logged and swallowed; a broken metadata
    /// refresh must not block version queries.
    pub async fn ensure_ran_once(&self, label: &str, script: &ScriptSpec) {
        if script.is_empty() {
            return;
        }
        let key = Self::fingerprint(&script.command);
        if self.ran.insert(key, ()).is_some() {
            return;
        }
        debug!("{label} [pre_update]: {}", script.command);
        let output = exec::run_shell(script).await;
        if !output.success() {
            debug!("{label} [pre_update failed]: exit {}", output.code);
        }
    }

    /// Forget every marker, starting a fresh logical session.
    pub fn reset(&self) {
        self.ran.clear();
    }
}

impl Default for HookCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn identical_scripts_run_once() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("marker");
        let script = ScriptSpec::cmd(format!("echo x >> {}", marker.display()));

        let cache = Arc::new(HookCache::new());
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let script = script.clone();
                tokio::spawn(async move { cache.ensure_ran_once("apt", &script).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let content = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn distinct_scripts_each_run() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        let cache = HookCache::new();
        cache.ensure_ran_once("one", &ScriptSpec::cmd(format!("touch {}", a.display()))).await;
        cache.ensure_ran_once("two", &ScriptSpec::cmd(format!("touch {}", b.display()))).await;
        assert!(a.exists());
        assert!(b.exists());
    }

    #[tokio::test]
    async fn reset_allows_rerun() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("marker");
        let script = ScriptSpec::cmd(format!("echo x >> {}", marker.display()));

        let cache = HookCache::new();
        cache.ensure_ran_once("src", &script).await;
        cache.ensure_ran_once("src", &script).await;
        cache.reset();
        cache.ensure_ran_once("src", &script).await;

        let content = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn empty_script_is_ignored() {
        let cache = HookCache::new();
        cache.ensure_ran_once("src", &ScriptSpec::default()).await;
    }

    #[tokio::test]
    async fn failing_hook_is_swallowed() {
        let cache = HookCache::new();
        cache.ensure_ran_once("src", &ScriptSpec::cmd("exit 1")).await;
    }
}
