//! Remote domain client: argument building, caching, degradation and query
//! error mapping, checked against a recording executor.

use std::time::Duration;

use dockyard_cli::application::services::DokkuClient;
use dockyard_cli::application::{DokkuApi, ResourceLimits};
use dockyard_cli::domain::DokkuError;
use dockyard_common::AppStatus;

use crate::helpers::{FakeExecutor, args};

const PS_REPORT: &str = "\
=====> api-server ps information
       Deployed:                 true
       Processes:                2
       Running:                  true
       Status web 1:             running (CID: 1a2b3c)
       Status web 2:             running (CID: 4d5e6f)
=====> api-cron ps information
       Deployed:                 true
       Processes:                0
       Running:                  false
";

const DOMAINS_REPORT: &str = "\
=====> api-server domains information
       Domains app enabled:           true
       Domains app vhosts:            api.example.com www.example.com
=====> api-cron domains information
       Domains app enabled:           false
       Domains app vhosts:
";

fn fleet() -> FakeExecutor {
    FakeExecutor::default()
        .ok("ps:report", PS_REPORT)
        .ok("domains:report", DOMAINS_REPORT)
}

#[tokio::test]
async fn apps_list_merges_bulk_domains() {
    let client = DokkuClient::new(fleet());

    let apps = client.apps_list().await.unwrap();

    assert_eq!(apps.len(), 2);
    assert_eq!(apps[0].name, "api-server");
    assert_eq!(apps[0].status, AppStatus::Running);
    assert_eq!(apps[0].process_count, 2);
    assert_eq!(apps[0].domains, vec!["api.example.com", "www.example.com"]);
    assert_eq!(apps[1].status, AppStatus::Stopped);
    assert!(apps[1].domains.is_empty());
    assert_eq!(client.executor().commands(), vec!["ps:report", "domains:report"]);
}

#[tokio::test]
async fn apps_list_is_served_from_cache() {
    let client = DokkuClient::new(fleet());

    client.apps_list().await.unwrap();
    client.apps_list().await.unwrap();

    assert_eq!(client.executor().calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cache_entries_expire() {
    let client = DokkuClient::with_ttl(fleet(), Duration::from_secs(120));

    client.apps_list().await.unwrap();
    tokio::time::advance(Duration::from_secs(121)).await;
    client.apps_list().await.unwrap();

    assert_eq!(client.executor().calls().len(), 4);
}

#[tokio::test]
async fn mutation_invalidates_the_apps_cache() {
    let client = DokkuClient::new(fleet().ok("ps:restart", "-----> Restarting app"));

    client.apps_list().await.unwrap();
    client.restart_app("api-server").await.unwrap();
    client.apps_list().await.unwrap();

    assert_eq!(
        client.executor().commands(),
        vec![
            "ps:report",
            "domains:report",
            "ps:restart",
            "ps:report",
            "domains:report"
        ]
    );
}

#[tokio::test]
async fn tls_and_resource_changes_invalidate_the_apps_cache() {
    let client = DokkuClient::new(
        fleet()
            .ok("resource:limit", "")
            .ok("letsencrypt:enable", "")
            .ok("letsencrypt:disable", ""),
    );
    let limits = ResourceLimits {
        process_type: "web".into(),
        memory: Some("512m".into()),
        cpu: None,
    };

    client.apps_list().await.unwrap();
    client.set_resource_limits("api-server", &limits).await.unwrap();
    client.apps_list().await.unwrap();
    client.enable_tls("api-server").await.unwrap();
    client.apps_list().await.unwrap();
    client.disable_tls("api-server").await.unwrap();
    client.apps_list().await.unwrap();

    assert_eq!(
        client.executor().commands(),
        vec![
            "ps:report",
            "domains:report",
            "resource:limit",
            "ps:report",
            "domains:report",
            "letsencrypt:enable",
            "ps:report",
            "domains:report",
            "letsencrypt:disable",
            "ps:report",
            "domains:report"
        ]
    );
}

#[tokio::test]
async fn failed_mutation_keeps_the_cache() {
    let client = DokkuClient::new(fleet().reply(
        "ps:stop",
        Err(DokkuError::Connection("reset".into())),
    ));

    client.apps_list().await.unwrap();
    client.stop_app("api-server").await.unwrap_err();
    client.apps_list().await.unwrap();

    assert_eq!(client.executor().calls().len(), 3);
}

#[tokio::test]
async fn domains_failure_degrades_to_empty_domains() {
    let client = DokkuClient::new(FakeExecutor::default().ok("ps:report", PS_REPORT));

    let apps = client.apps_list().await.unwrap();

    assert!(apps.iter().all(|app| app.domains.is_empty()));
}

#[tokio::test]
async fn primary_failure_propagates_unchanged() {
    let err = DokkuError::RemoteExit {
        command: "ps:report".into(),
        code: 1,
        output: "boom".into(),
    };
    let client = DokkuClient::new(FakeExecutor::default().reply("ps:report", Err(err.clone())));

    assert_eq!(client.apps_list().await.unwrap_err(), err);
}

#[tokio::test]
async fn invalid_names_never_reach_the_executor() {
    let client = DokkuClient::new(FakeExecutor::default());

    let err = client.destroy_app("Bad_Name").await.unwrap_err();

    assert!(matches!(err, DokkuError::Validation { ref field, .. } if field == "app name"));
    assert!(client.executor().calls().is_empty());
}

#[tokio::test]
async fn destroy_is_forced() {
    let client = DokkuClient::new(FakeExecutor::default().ok("apps:destroy", ""));

    client.destroy_app("api-cron").await.unwrap();

    assert_eq!(
        client.executor().calls()[0].args,
        args(&["apps:destroy", "api-cron", "--force"])
    );
}

#[tokio::test]
async fn scale_builds_type_count_pairs() {
    let client = DokkuClient::new(FakeExecutor::default().ok("ps:scale", ""));

    client
        .scale("api-server", &[("web".into(), 3), ("worker".into(), 1)])
        .await
        .unwrap();

    assert_eq!(
        client.executor().calls()[0].args,
        args(&["ps:scale", "api-server", "web=3", "worker=1"])
    );
}

#[tokio::test]
async fn scale_rejects_counts_above_the_cap() {
    let client = DokkuClient::new(FakeExecutor::default());

    let err = client
        .scale("api-server", &[("web".into(), 33)])
        .await
        .unwrap_err();

    assert!(matches!(err, DokkuError::Validation { .. }));
    assert!(client.executor().calls().is_empty());
}

#[tokio::test]
async fn config_set_places_flags_before_the_app() {
    let client = DokkuClient::new(FakeExecutor::default().ok("config:set", ""));

    client
        .config_set(
            "api-server",
            &[("PORT".into(), "5000".into()), ("MOTD".into(), "a=b c".into())],
            true,
        )
        .await
        .unwrap();

    assert_eq!(
        client.executor().calls()[0].args,
        args(&["config:set", "--no-restart", "api-server", "PORT=5000", "MOTD=a=b c"])
    );
}

#[tokio::test]
async fn config_keys_must_be_upper_snake_case() {
    let client = DokkuClient::new(FakeExecutor::default());

    let err = client
        .config_unset("api-server", &["lower".into()], false)
        .await
        .unwrap_err();

    assert!(matches!(err, DokkuError::Validation { ref field, .. } if field == "environment key"));
}

#[tokio::test]
async fn resource_limit_omits_the_default_process_type() {
    let client = DokkuClient::new(FakeExecutor::default().ok("resource:limit", ""));

    client
        .set_resource_limits(
            "api-server",
            &ResourceLimits {
                process_type: "web".into(),
                memory: Some("512m".into()),
                cpu: None,
            },
        )
        .await
        .unwrap();
    client
        .set_resource_limits(
            "api-worker",
            &ResourceLimits {
                process_type: "worker".into(),
                memory: None,
                cpu: Some("2".into()),
            },
        )
        .await
        .unwrap();

    let calls = client.executor().calls();
    assert_eq!(
        calls[0].args,
        args(&["resource:limit", "api-server", "--memory", "512m"])
    );
    assert_eq!(
        calls[1].args,
        args(&["resource:limit", "api-worker", "--cpu", "2", "--process-type", "worker"])
    );
}

#[tokio::test]
async fn postgres_list_failure_yields_no_services() {
    let client = DokkuClient::new(FakeExecutor::default().reply(
        "postgres:list",
        Err(DokkuError::RemoteExit {
            command: "postgres:list".into(),
            code: 1,
            output: "postgres:list is not a dokku command.".into(),
        }),
    ));

    assert!(client.databases().await.unwrap().is_empty());
}

#[tokio::test]
async fn databases_carry_their_links() {
    let client = DokkuClient::new(
        FakeExecutor::default()
            .ok("postgres:list", "=====> Postgres services\napp-db\nstaging-db\n")
            .ok("postgres:links", "api-server\napi-worker\n"),
    );

    let dbs = client.databases().await.unwrap();

    assert_eq!(dbs.len(), 2);
    assert_eq!(dbs[0].name, "app-db");
    assert_eq!(dbs[0].links, vec!["api-server", "api-worker"]);
}

#[tokio::test]
async fn link_invalidates_both_caches() {
    let client = DokkuClient::new(
        fleet()
            .ok("postgres:list", "=====> Postgres services\napp-db\n")
            .ok("postgres:links", "")
            .ok("postgres:link", ""),
    );

    client.apps_list().await.unwrap();
    client.databases().await.unwrap();
    client.link_database("app-db", "api-server").await.unwrap();
    let before = client.executor().calls().len();
    client.apps_list().await.unwrap();
    client.databases().await.unwrap();

    assert_eq!(client.executor().calls().len(), before + 4);
}

#[tokio::test]
async fn git_report_failure_is_not_an_error() {
    let client = DokkuClient::new(FakeExecutor::default());

    assert_eq!(client.git_report("api-server").await.unwrap(), None);
}

#[tokio::test]
async fn queries_run_on_a_oneshot_session() {
    let client = DokkuClient::new(
        FakeExecutor::default().ok("postgres:connect", "SET\nid,name\n1,alice\n(1 row)\n"),
    );

    let result = client
        .run_query("app-db", "SELECT id, name FROM users")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["id", "name"]);
    assert_eq!(result.rows, vec![vec!["1", "alice"]]);
    let calls = client.executor().calls();
    assert_eq!(calls[0].args, args(&["postgres:connect", "app-db"]));
    assert!(calls[0].oneshot);
    let script = calls[0].stdin.clone().unwrap();
    assert!(script.contains("\\pset format csv"));
    assert!(script.contains("SELECT id, name FROM users LIMIT 1000"));
}

#[tokio::test]
async fn remote_query_failure_becomes_a_query_error() {
    let client = DokkuClient::new(FakeExecutor::default().reply(
        "postgres:connect",
        Err(DokkuError::RemoteExit {
            command: "postgres:connect".into(),
            code: 1,
            output: "ERROR:  relation \"nope\" does not exist\n".into(),
        }),
    ));

    let err = client
        .run_query("app-db", "SELECT * FROM nope")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DokkuError::Query("ERROR:  relation \"nope\" does not exist".into())
    );
}

#[tokio::test]
async fn unsafe_sql_is_rejected_before_connecting() {
    let client = DokkuClient::new(FakeExecutor::default());

    let err = client
        .run_query("app-db", "SELECT 1; DROP TABLE users")
        .await
        .unwrap_err();

    assert!(matches!(err, DokkuError::Validation { .. }));
    assert!(client.executor().calls().is_empty());
}

#[tokio::test]
async fn table_identifiers_are_validated() {
    let client = DokkuClient::new(FakeExecutor::default());

    let err = client
        .table_preview("app-db", "users\"; --")
        .await
        .unwrap_err();

    assert!(matches!(err, DokkuError::Validation { ref field, .. } if field == "table name"));
}

#[tokio::test]
async fn live_tail_streams_the_last_hundred_lines() {
    let client = DokkuClient::new(FakeExecutor::default());

    client
        .stream_logs("api-server", Box::new(|_| {}), Box::new(|_| {}))
        .unwrap();

    assert_eq!(
        client.executor().calls()[0].args,
        args(&["logs", "api-server", "--tail", "--num", "100"])
    );
}
