//! Engine scenarios over real `bash` commands.

use unipak::catalog::{Catalog, CustomPackage, Operation, Package, ScriptSpec, Source};
use unipak::engine::Engine;
use unipak::runner::{CommandRunner, SudoRunner};

fn built(mut catalog: Catalog) -> Catalog {
    catalog.build_indexes();
    catalog
}

#[tokio::test]
async fn failing_source_batch_does_not_poison_sibling_source() {
    let catalog = built(Catalog {
        sources: vec![
            Source { name: "ok".into(), install: ScriptSpec::cmd("true"), ..Default::default() },
            Source {
                name: "bad".into(),
                install: ScriptSpec::cmd("echo nope >&2; exit 1"),
                ..Default::default()
            },
        ],
        packages: vec![
            Package { name: "alpha".into(), source: "ok".into(), ..Default::default() },
            Package { name: "beta".into(), source: "bad".into(), ..Default::default() },
        ],
        ..Default::default()
    });
    let engine = Engine::new(catalog);
    let runner = SudoRunner::new();
    let keys = vec![engine.key_for("alpha").unwrap(), engine.key_for("beta").unwrap()];

    let report = engine.execute(&keys, Operation::Install, &runner, None).await;
    runner.close().await;

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    let failed: Vec<_> =
        report.outcomes.iter().filter(|o| !o.ok).map(|o| o.key.name.as_str()).collect();
    assert_eq!(failed, vec!["beta"]);
    let failure = report.outcomes.iter().find(|o| !o.ok).unwrap();
    assert!(failure.message.contains("nope"), "message was: {}", failure.message);
}

#[tokio::test]
async fn identical_pre_update_hooks_run_once_across_sources() {
    let tmp = tempfile::tempdir().unwrap();
    let marker = tmp.path().join("hook-ran");
    let hook = format!("echo x >> {}", marker.display());

    let catalog = built(Catalog {
        sources: vec![
            Source {
                name: "apt".into(),
                pre_update: ScriptSpec::cmd(&hook),
                get_latest_version: ScriptSpec::cmd("echo 1.0.0"),
                ..Default::default()
            },
            Source {
                name: "dnf".into(),
                pre_update: ScriptSpec::cmd(&hook),
                get_latest_version: ScriptSpec::cmd("echo 1.0.0"),
                ..Default::default()
            },
        ],
        packages: vec![
            Package { name: "a".into(), source: "apt".into(), ..Default::default() },
            Package { name: "b".into(), source: "dnf".into(), ..Default::default() },
            Package { name: "c".into(), source: "apt".into(), ..Default::default() },
            Package { name: "d".into(), source: "dnf".into(), ..Default::default() },
        ],
        ..Default::default()
    });
    let engine = Engine::new(catalog);

    let keys: Vec<_> =
        ["a", "b", "c", "d"].iter().map(|n| engine.key_for(n).unwrap()).collect();
    let versions =
        futures::future::join_all(keys.iter().map(|key| engine.available_version(key))).await;

    assert!(versions.iter().all(|v| v == "1.0.0"));
    let content = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(content.lines().count(), 1, "hook must run exactly once");
}

#[tokio::test]
async fn install_runs_dependency_chain_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("order");
    let record = |name: &str| {
        CustomPackage {
            name: name.into(),
            get_installed_version: ScriptSpec::cmd("echo ''"),
            install: ScriptSpec::cmd(format!("echo {name} >> {}", log.display())),
            ..Default::default()
        }
    };

    let mut base = record("base");
    let mut lib = record("lib");
    lib.depends_on = vec!["base".into()];
    let mut app = record("app");
    app.depends_on = vec!["lib".into()];
    base.depends_on = vec![];

    let catalog =
        built(Catalog { custom_packages: vec![app, base, lib], ..Default::default() });
    let engine = Engine::new(catalog);
    let runner = SudoRunner::new();

    engine.install("app", &runner).await.unwrap();
    runner.close().await;

    let content = std::fs::read_to_string(&log).unwrap();
    assert_eq!(content.lines().collect::<Vec<_>>(), vec!["base", "lib", "app"]);
}

#[tokio::test]
async fn install_script_receives_versions_through_the_runner() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("versions");
    let catalog = built(Catalog {
        custom_packages: vec![CustomPackage {
            name: "tool".into(),
            get_installed_version: ScriptSpec::cmd("echo ''"),
            get_latest_version: ScriptSpec::cmd("echo 3.2.1"),
            install: ScriptSpec::cmd(format!(
                r#"echo "$latest_version" > {}"#,
                out.display()
            )),
            ..Default::default()
        }],
        ..Default::default()
    });
    let engine = Engine::new(catalog);
    let runner = SudoRunner::new();

    engine.install("tool", &runner).await.unwrap();
    runner.close().await;

    assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "3.2.1");
}

#[tokio::test]
async fn execute_update_skips_and_reports_success_for_up_to_date_custom() {
    let catalog = built(Catalog {
        custom_packages: vec![CustomPackage {
            name: "steady".into(),
            get_installed_version: ScriptSpec::cmd("echo 2.0.0"),
            get_latest_version: ScriptSpec::cmd("echo 2.0.0"),
            update: ScriptSpec::cmd("echo should-not-run; exit 1"),
            ..Default::default()
        }],
        ..Default::default()
    });
    let engine = Engine::new(catalog);
    let runner = SudoRunner::new();
    let keys = vec![engine.key_for("steady").unwrap()];

    let report = engine.update_selected(&keys, &runner, None).await;
    runner.close().await;

    assert!(report.all_ok());
    assert_eq!(report.outcomes[0].message, "up-to-date");
}
