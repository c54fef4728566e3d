//! In-memory backend: the seeded fleet behaves like a small Dokku host.

use std::time::Duration;

use dockyard_cli::application::DokkuApi;
use dockyard_cli::domain::DokkuError;
use dockyard_cli::infra::InMemoryDokku;
use dockyard_common::AppStatus;
use tokio::sync::mpsc;

#[tokio::test]
async fn created_app_is_listed_as_not_deployed() {
    let dokku = InMemoryDokku::new();

    dokku.create_app("new-app").await.unwrap();

    let apps = dokku.apps_list().await.unwrap();
    let created = apps.iter().find(|a| a.name == "new-app").unwrap();
    assert_eq!(created.status, AppStatus::NotDeployed);
    assert!(dokku.app_names().await.unwrap().contains(&"new-app".to_string()));
}

#[tokio::test]
async fn duplicate_app_is_refused() {
    let dokku = InMemoryDokku::new();

    let err = dokku.create_app("api-server").await.unwrap_err();

    assert!(matches!(err, DokkuError::RemoteExit { .. }));
}

#[tokio::test]
async fn destroyed_app_drops_its_database_links() {
    let dokku = InMemoryDokku::new();

    dokku.destroy_app("api-cron").await.unwrap();

    let dbs = dokku.databases().await.unwrap();
    assert!(dbs.iter().all(|db| !db.links.contains(&"api-cron".to_string())));
    assert!(dokku.app_report("api-cron").await.is_err());
}

#[tokio::test]
async fn stop_and_start_change_the_status() {
    let dokku = InMemoryDokku::new();

    dokku.stop_app("api-server").await.unwrap();
    let meta = dokku.app_meta("api-server").await.unwrap();
    assert!(meta.processes.iter().all(|p| p.status == "stopped"));

    dokku.start_app("api-server").await.unwrap();
    let apps = dokku.apps_list().await.unwrap();
    let server = apps.iter().find(|a| a.name == "api-server").unwrap();
    assert_eq!(server.status, AppStatus::Running);
}

#[tokio::test]
async fn scale_updates_the_report() {
    let dokku = InMemoryDokku::new();

    dokku
        .scale("api-server", &[("web".into(), 4), ("worker".into(), 1)])
        .await
        .unwrap();

    let scale = dokku.scale_report("api-server").await.unwrap();
    let web = scale.iter().find(|s| s.process_type == "web").unwrap();
    let worker = scale.iter().find(|s| s.process_type == "worker").unwrap();
    assert_eq!((web.count, worker.count), (4, 1));
}

#[tokio::test]
async fn config_round_trips_through_set_and_unset() {
    let dokku = InMemoryDokku::new();

    dokku
        .config_set("frontend", &[("FEATURE_X".into(), "on".into())], true)
        .await
        .unwrap();
    assert_eq!(
        dokku.config_show("frontend").await.unwrap().get("FEATURE_X"),
        Some(&"on".to_string())
    );

    dokku
        .config_unset("frontend", &["FEATURE_X".into()], true)
        .await
        .unwrap();
    assert!(!dokku.config_show("frontend").await.unwrap().contains_key("FEATURE_X"));
}

#[tokio::test]
async fn linked_database_cannot_be_destroyed() {
    let dokku = InMemoryDokku::new();

    let err = dokku.destroy_database("app-db").await.unwrap_err();
    assert!(matches!(err, DokkuError::RemoteExit { .. }));

    dokku.create_database("scratch-db").await.unwrap();
    dokku.destroy_database("scratch-db").await.unwrap();
}

#[tokio::test]
async fn link_and_unlink_track_the_app() {
    let dokku = InMemoryDokku::new();

    dokku.link_database("staging-db", "frontend").await.unwrap();
    assert!(dokku.link_database("staging-db", "frontend").await.is_err());
    dokku.unlink_database("staging-db", "frontend").await.unwrap();
    assert!(dokku.unlink_database("staging-db", "frontend").await.is_err());
}

#[tokio::test]
async fn unknown_table_is_a_query_error() {
    let dokku = InMemoryDokku::new();

    let err = dokku.table_schema("app-db", "missing").await.unwrap_err();

    assert!(matches!(err, DokkuError::Query(_)));
}

#[tokio::test]
async fn queries_are_still_validated() {
    let dokku = InMemoryDokku::new();

    let err = dokku
        .run_query("app-db", "DELETE FROM users")
        .await
        .unwrap_err();

    assert!(matches!(err, DokkuError::Validation { .. }));
}

#[tokio::test(start_paused = true)]
async fn tail_emits_lines_until_cancelled() {
    let dokku = InMemoryDokku::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = dokku
        .stream_logs(
            "api-server",
            Box::new(move |chunk| {
                let _ = tx.send(chunk);
            }),
            Box::new(|_| panic!("in-memory tail never closes on its own")),
        )
        .unwrap();

    let first = rx.recv().await.unwrap();
    assert!(first.contains("api-server"));
    assert!(first.ends_with('\n'));

    handle.cancel();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(rx.recv().await.is_none());
}
