//! Remote domain client: maps Dokku verbs onto allowlisted commands and
//! parses their output.
//!
//! Reads of the apps and database lists are cached for two minutes; any
//! mutation invalidates every entry under the owning resource's prefix.
//! Enrichment calls (domains, git metadata, database links) degrade to empty
//! values on failure; primary calls propagate their error unchanged.

use std::collections::BTreeMap;
use std::time::Duration;

use dockyard_common::{
    AppInfo, AppMeta, ColumnInfo, DatabaseInfo, GitReport, ProcessScale, QueryResult, ReportField,
    TableInfo, keys, ttl,
};
use tracing::{debug, warn};

use crate::application::ports::{
    ChunkSink, CloseSink, DokkuApi, RemoteExecutor, ResourceLimits, StreamHandle,
};
use crate::application::services::cache::TtlCache;
use crate::domain::report::{
    parse_app_report, parse_config_show, parse_domains_report, parse_domains_report_all,
    parse_git_report, parse_kv_report, parse_links_output, parse_list_output,
    parse_ps_report_all, parse_scale_report,
};
use crate::domain::safety::terminates_session;
use crate::domain::sql::{
    SqlStatement, apply_row_cap, parse_query_output, table_preview_statement,
    table_schema_statement, tables_statement, validate_sql_statement, wrap_for_psql,
};
use crate::domain::validate::{
    TableName, validate_app_name, validate_database_name, validate_domain, validate_env_key,
    validate_env_value, validate_process_type, validate_resource_value, validate_scale_count,
};
use crate::domain::{DokkuError, DokkuResult};

/// Lines fetched by the live log tail before following.
pub const TAIL_LINES: u32 = 100;

/// Process type Dokku applies resource limits to when none is named.
const DEFAULT_PROCESS_TYPE: &str = "web";

#[derive(Clone)]
enum Cached {
    Apps(Vec<AppInfo>),
    Databases(Vec<DatabaseInfo>),
}

fn argv(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).cloned().unwrap_or_default()
}

/// [`DokkuApi`] over a [`RemoteExecutor`].
pub struct DokkuClient<E: RemoteExecutor> {
    executor: E,
    cache: TtlCache<Cached>,
}

impl<E: RemoteExecutor> DokkuClient<E> {
    #[must_use]
    pub fn new(executor: E) -> Self {
        Self::with_ttl(executor, Duration::from_secs(ttl::DEFAULT_SECS))
    }

    #[must_use]
    pub fn with_ttl(executor: E, ttl: Duration) -> Self {
        Self {
            executor,
            cache: TtlCache::new(ttl),
        }
    }

    #[must_use]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    async fn mutate(&self, args: &[String], prefixes: &[&str]) -> DokkuResult<String> {
        let out = self.executor.exec(args).await?;
        for prefix in prefixes {
            self.cache.invalidate_prefix(prefix);
        }
        Ok(out)
    }

    async fn app_verb(&self, verb: &str, app: &str) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        self.mutate(&argv(&[verb, &app]), &[keys::APPS_PREFIX]).await
    }

    /// Stdin commands that end Dokku's handler go over a one-shot session.
    async fn exec_stdin(&self, args: &[String], stdin: &str) -> DokkuResult<String> {
        if args.first().is_some_and(|cmd| terminates_session(cmd)) {
            self.executor.exec_oneshot_with_stdin(args, stdin).await
        } else {
            self.executor.exec_with_stdin(args, stdin).await
        }
    }

    async fn query(&self, db: &str, statement: &SqlStatement) -> DokkuResult<QueryResult> {
        let script = wrap_for_psql(&apply_row_cap(statement));
        let out = self
            .exec_stdin(&argv(&["postgres:connect", db]), &script)
            .await
            .map_err(|err| match err {
                DokkuError::RemoteExit { output, .. } => DokkuError::Query(output.trim().to_string()),
                other => other,
            })?;
        Ok(parse_query_output(&out))
    }

    async fn database_links(&self, db: &str) -> Vec<String> {
        match self.executor.exec(&argv(&["postgres:links", db])).await {
            Ok(out) => parse_links_output(&out),
            Err(err) => {
                debug!(db, error = %err, "postgres:links failed; treating as unlinked");
                Vec::new()
            }
        }
    }
}

impl<E: RemoteExecutor> DokkuApi for DokkuClient<E> {
    async fn warmup(&self) -> DokkuResult<()> {
        match self.apps_list().await {
            Ok(apps) => {
                debug!(apps = apps.len(), "apps cache warmed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "warmup failed");
                Err(err)
            }
        }
    }

    async fn apps_list(&self) -> DokkuResult<Vec<AppInfo>> {
        if let Some(Cached::Apps(apps)) = self.cache.get(keys::APPS_LIST) {
            debug!("apps list served from cache");
            return Ok(apps);
        }

        let out = self.executor.exec(&argv(&["ps:report"])).await?;
        let mut apps = parse_ps_report_all(&out);

        // One bulk call rather than one per app.
        match self.executor.exec(&argv(&["domains:report"])).await {
            Ok(out) => {
                let domains = parse_domains_report_all(&out);
                for app in &mut apps {
                    app.domains = domains.get(&app.name).cloned().unwrap_or_default();
                }
            }
            Err(err) => debug!(error = %err, "domains:report failed; apps listed without domains"),
        }

        self.cache.insert(keys::APPS_LIST, Cached::Apps(apps.clone()));
        Ok(apps)
    }

    async fn app_names(&self) -> DokkuResult<Vec<String>> {
        let out = self.executor.exec(&argv(&["apps:list"])).await?;
        Ok(parse_list_output(&out))
    }

    async fn create_app(&self, app: &str) -> DokkuResult<String> {
        self.app_verb("apps:create", app).await
    }

    async fn destroy_app(&self, app: &str) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        self.mutate(&argv(&["apps:destroy", &app, "--force"]), &[keys::APPS_PREFIX])
            .await
    }

    async fn app_report(&self, app: &str) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        self.executor.exec(&argv(&["ps:report", &app])).await
    }

    async fn app_meta(&self, app: &str) -> DokkuResult<AppMeta> {
        let (report, config, git) = tokio::join!(
            self.app_report(app),
            self.config_show(app),
            self.git_report(app),
        );
        let (ps_report, processes) = parse_app_report(&report?);
        let config = config.unwrap_or_else(|err| {
            debug!(app, error = %err, "config:show failed; app meta without config");
            BTreeMap::new()
        });
        let git_report = git.unwrap_or_default();

        let app_type = config
            .get("DOKKU_APP_TYPE")
            .or_else(|| ps_report.get("Restore"))
            .cloned()
            .unwrap_or_default();

        Ok(AppMeta {
            git_rev: config.get("GIT_REV").cloned().unwrap_or_default(),
            github_repo: config.get("GITHUB_REPO").cloned().unwrap_or_default(),
            app_type,
            ps_report,
            git_report,
            processes,
        })
    }

    async fn git_report(&self, app: &str) -> DokkuResult<Option<GitReport>> {
        let app = validate_app_name(app)?;
        match self.executor.exec(&argv(&["git:report", &app])).await {
            Ok(out) => Ok(Some(parse_git_report(&out))),
            Err(err) => {
                debug!(app, error = %err, "git:report failed");
                Ok(None)
            }
        }
    }

    async fn start_app(&self, app: &str) -> DokkuResult<String> {
        self.app_verb("ps:start", app).await
    }

    async fn stop_app(&self, app: &str) -> DokkuResult<String> {
        self.app_verb("ps:stop", app).await
    }

    async fn restart_app(&self, app: &str) -> DokkuResult<String> {
        self.app_verb("ps:restart", app).await
    }

    async fn rebuild_app(&self, app: &str) -> DokkuResult<String> {
        self.app_verb("ps:rebuild", app).await
    }

    async fn scale_report(&self, app: &str) -> DokkuResult<Vec<ProcessScale>> {
        let app = validate_app_name(app)?;
        let out = self.executor.exec(&argv(&["ps:scale", &app])).await?;
        Ok(parse_scale_report(&out))
    }

    async fn scale(&self, app: &str, counts: &[(String, u32)]) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        let mut args = argv(&["ps:scale", &app]);
        for (process_type, count) in counts {
            let process_type = validate_process_type(process_type)?;
            let count = validate_scale_count(*count)?;
            args.push(format!("{process_type}={count}"));
        }
        self.mutate(&args, &[keys::APPS_PREFIX]).await
    }

    async fn logs(&self, app: &str, num: u32) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        self.executor
            .exec(&argv(&["logs", &app, "--num", &num.to_string()]))
            .await
    }

    fn stream_logs(
        &self,
        app: &str,
        on_chunk: ChunkSink,
        on_close: CloseSink,
    ) -> DokkuResult<StreamHandle> {
        let app = validate_app_name(app)?;
        let args = argv(&["logs", &app, "--tail", "--num", &TAIL_LINES.to_string()]);
        self.executor.stream(&args, on_chunk, on_close)
    }

    async fn config_show(&self, app: &str) -> DokkuResult<BTreeMap<String, String>> {
        let app = validate_app_name(app)?;
        let out = self.executor.exec(&argv(&["config:show", &app])).await?;
        Ok(parse_config_show(&out))
    }

    async fn config_set(
        &self,
        app: &str,
        vars: &[(String, String)],
        no_restart: bool,
    ) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        let mut args = argv(&["config:set"]);
        if no_restart {
            args.push("--no-restart".to_string());
        }
        args.push(app);
        for (key, value) in vars {
            let key = validate_env_key(key)?;
            let value = validate_env_value(value)?;
            args.push(format!("{key}={value}"));
        }
        self.mutate(&args, &[keys::APPS_PREFIX]).await
    }

    async fn config_unset(
        &self,
        app: &str,
        keys_to_unset: &[String],
        no_restart: bool,
    ) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        let mut args = argv(&["config:unset"]);
        if no_restart {
            args.push("--no-restart".to_string());
        }
        args.push(app);
        for key in keys_to_unset {
            args.push(validate_env_key(key)?);
        }
        self.mutate(&args, &[keys::APPS_PREFIX]).await
    }

    async fn domains(&self, app: &str) -> DokkuResult<Vec<String>> {
        let app = validate_app_name(app)?;
        let out = self.executor.exec(&argv(&["domains:report", &app])).await?;
        Ok(parse_domains_report(&out))
    }

    async fn add_domain(&self, app: &str, domain: &str) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        let domain = validate_domain(domain)?;
        self.mutate(&argv(&["domains:add", &app, &domain]), &[keys::APPS_PREFIX])
            .await
    }

    async fn remove_domain(&self, app: &str, domain: &str) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        let domain = validate_domain(domain)?;
        self.mutate(&argv(&["domains:remove", &app, &domain]), &[keys::APPS_PREFIX])
            .await
    }

    async fn enable_tls(&self, app: &str) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        self.mutate(&argv(&["letsencrypt:enable", &app]), &[keys::APPS_PREFIX])
            .await
    }

    async fn disable_tls(&self, app: &str) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        self.mutate(&argv(&["letsencrypt:disable", &app]), &[keys::APPS_PREFIX])
            .await
    }

    async fn databases(&self) -> DokkuResult<Vec<DatabaseInfo>> {
        if let Some(Cached::Databases(dbs)) = self.cache.get(keys::POSTGRES_LIST) {
            debug!("database list served from cache");
            return Ok(dbs);
        }

        let names = match self.executor.exec(&argv(&["postgres:list"])).await {
            Ok(out) => parse_list_output(&out),
            Err(err) => {
                warn!(error = %err, "postgres:list failed; is the postgres plugin installed?");
                return Ok(Vec::new());
            }
        };

        let mut dbs = Vec::with_capacity(names.len());
        for name in names {
            let links = self.database_links(&name).await;
            dbs.push(DatabaseInfo { name, links });
        }

        self.cache
            .insert(keys::POSTGRES_LIST, Cached::Databases(dbs.clone()));
        Ok(dbs)
    }

    async fn create_database(&self, db: &str) -> DokkuResult<String> {
        let db = validate_database_name(db)?;
        self.mutate(&argv(&["postgres:create", &db]), &[keys::POSTGRES_PREFIX])
            .await
    }

    async fn destroy_database(&self, db: &str) -> DokkuResult<String> {
        let db = validate_database_name(db)?;
        self.mutate(
            &argv(&["postgres:destroy", &db, "--force"]),
            &[keys::POSTGRES_PREFIX],
        )
        .await
    }

    async fn database_info(&self, db: &str) -> DokkuResult<Vec<ReportField>> {
        let db = validate_database_name(db)?;
        let out = self.executor.exec(&argv(&["postgres:info", &db])).await?;
        Ok(parse_kv_report(&out))
    }

    async fn link_database(&self, db: &str, app: &str) -> DokkuResult<String> {
        let db = validate_database_name(db)?;
        let app = validate_app_name(app)?;
        self.mutate(
            &argv(&["postgres:link", &db, &app]),
            &[keys::POSTGRES_PREFIX, keys::APPS_PREFIX],
        )
        .await
    }

    async fn unlink_database(&self, db: &str, app: &str) -> DokkuResult<String> {
        let db = validate_database_name(db)?;
        let app = validate_app_name(app)?;
        self.mutate(
            &argv(&["postgres:unlink", &db, &app]),
            &[keys::POSTGRES_PREFIX, keys::APPS_PREFIX],
        )
        .await
    }

    async fn resource_report(&self, app: &str) -> DokkuResult<Vec<ReportField>> {
        let app = validate_app_name(app)?;
        let out = self.executor.exec(&argv(&["resource:report", &app])).await?;
        Ok(parse_kv_report(&out))
    }

    async fn set_resource_limits(
        &self,
        app: &str,
        limits: &ResourceLimits,
    ) -> DokkuResult<String> {
        let app = validate_app_name(app)?;
        let process_type = validate_process_type(&limits.process_type)?;
        let mut args = argv(&["resource:limit", &app]);
        if let Some(memory) = &limits.memory {
            args.push("--memory".to_string());
            args.push(validate_resource_value(memory)?);
        }
        if let Some(cpu) = &limits.cpu {
            args.push("--cpu".to_string());
            args.push(validate_resource_value(cpu)?);
        }
        if process_type != DEFAULT_PROCESS_TYPE {
            args.push("--process-type".to_string());
            args.push(process_type);
        }
        self.mutate(&args, &[keys::APPS_PREFIX]).await
    }

    async fn run_query(&self, db: &str, sql: &str) -> DokkuResult<QueryResult> {
        let db = validate_database_name(db)?;
        let statement = validate_sql_statement(sql)?;
        self.query(&db, &statement).await
    }

    async fn tables(&self, db: &str) -> DokkuResult<Vec<TableInfo>> {
        let db = validate_database_name(db)?;
        let result = self.query(&db, &tables_statement()).await?;
        Ok(result
            .rows
            .iter()
            .map(|row| TableInfo {
                name: cell(row, 0),
                kind: cell(row, 1),
                row_estimate: cell(row, 2),
            })
            .collect())
    }

    async fn table_schema(&self, db: &str, table: &str) -> DokkuResult<Vec<ColumnInfo>> {
        let db = validate_database_name(db)?;
        let table = TableName::parse(table)?;
        let result = self.query(&db, &table_schema_statement(&table)).await?;
        Ok(result
            .rows
            .iter()
            .map(|row| ColumnInfo {
                column: cell(row, 0),
                data_type: cell(row, 1),
                nullable: cell(row, 2),
                default_value: cell(row, 3),
            })
            .collect())
    }

    async fn table_preview(&self, db: &str, table: &str) -> DokkuResult<QueryResult> {
        let db = validate_database_name(db)?;
        let table = TableName::parse(table)?;
        self.query(&db, &table_preview_statement(&table)).await
    }
}
