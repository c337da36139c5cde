//! Console implementation of the engine's reporter interface.
//!
//! Renders the update flow to a terminal: a spinner while the concurrent
//! version-query phases run, a grouped status table once both phases are
//! done, a confirmation prompt, then per-unit result lines as they land.
//! All interior state sits behind one mutex because the engine calls in
//! from concurrent tasks.

use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Write};
use std::sync::Mutex;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::catalog::PackageKey;
use crate::engine::{Phase, Reporter, VersionStatus};
use crate::version;

struct ReporterState {
    groups: BTreeMap<String, Vec<String>>,
    status: HashMap<PackageKey, VersionStatus>,
    spinner: Option<ProgressBar>,
}

/// Terminal [`Reporter`] used by the interactive update command.
pub struct ConsoleReporter {
    state: Mutex<ReporterState>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReporterState {
                groups: BTreeMap::new(),
                status: HashMap::new(),
                spinner: None,
            }),
        }
    }

    fn spinner(message: &str) -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }

    fn render_status(state: &ReporterState) {
        for (group, names) in &state.groups {
            println!("[{group}]");
            for name in names {
                let status = state
                    .status
                    .iter()
                    .find(|(key, _)| &key.name == name)
                    .map(|(_, status)| status.clone())
                    .unwrap_or_default();
                let installed = version::normalize(&status.installed);
                let available = version::normalize(&status.available);
                let line = match (installed.is_empty(), available.is_empty()) {
                    (true, true) => format!("  {name}:"),
                    (false, true) => format!("  {name}: {installed}"),
                    (true, false) => {
                        println!("{}", format!("  {name}: -> {available}").green());
                        continue;
                    }
                    (false, false) if installed == available => {
                        println!("{}", format!("  {name}: {installed}").bright_black());
                        continue;
                    }
                    (false, false) => {
                        println!(
                            "{}",
                            format!("  {name}: {installed} -> {available}").green()
                        );
                        continue;
                    }
                };
                println!("{line}");
            }
            println!();
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn on_init(&self, groups: &BTreeMap<String, Vec<String>>) {
        let mut state = self.state.lock().expect("reporter state poisoned");
        state.groups = groups.clone();
        state.spinner = Some(Self::spinner("querying installed versions"));
    }

    fn on_installed_version(&self, key: &PackageKey, version: &str) {
        let mut state = self.state.lock().expect("reporter state poisoned");
        state.status.entry(key.clone()).or_default().installed = version.to_string();
    }

    fn on_available_version(&self, key: &PackageKey, version: &str) {
        let mut state = self.state.lock().expect("reporter state poisoned");
        state.status.entry(key.clone()).or_default().available = version.to_string();
    }

    fn on_phase_done(&self, phase: Phase) {
        let mut state = self.state.lock().expect("reporter state poisoned");
        if let Some(spinner) = state.spinner.take() {
            spinner.finish_and_clear();
        }
        match phase {
            Phase::Installed => {
                state.spinner = Some(Self::spinner("querying available versions"));
            }
            Phase::Available => Self::render_status(&state),
        }
    }

    fn confirm_proceed(&self) -> bool {
        print!("Proceed with update? [Y/n]: ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        !matches!(line.trim(), "n" | "N" | "no" | "NO")
    }

    fn on_execution_start(&self) {
        println!("Applying updates...");
    }

    fn on_unit_done(&self, key: &PackageKey, ok: bool, message: &str) {
        // Serialize lines so concurrent unit completions don't interleave.
        let _state = self.state.lock().expect("reporter state poisoned");
        if ok {
            println!("{} {}", format!("updated: {}", key.name).green(), message.bright_black());
        } else {
            println!("{}", format!("failed:  {}", key.name).red());
            if !message.is_empty() {
                println!("  {message}");
            }
        }
    }

    fn on_done(&self) {
        println!();
    }
}
