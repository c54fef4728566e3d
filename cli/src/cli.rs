//! CLI argument parsing with clap derive

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::application::DokkuApi;
use crate::application::services::DokkuClient;
use crate::commands;
use crate::domain::CommandAllowlist;
use crate::infra::config::{command_timeout, load_settings, ssh_settings};
use crate::infra::{AuditLog, InMemoryDokku, SessionPool, Ssh2Connector, SshExecutor};

/// Operator console for a Dokku host
#[derive(Parser)]
#[command(
    name = "dockyard",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage apps
    #[command(subcommand)]
    Apps(commands::apps::AppsCommand),

    /// Inspect and scale processes
    #[command(subcommand)]
    Ps(commands::ps::PsCommand),

    /// Show or follow app logs
    Logs(commands::logs::LogsArgs),

    /// Manage app environment variables
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Manage app domains
    #[command(subcommand)]
    Domains(commands::domains::DomainsCommand),

    /// Manage Let's Encrypt certificates
    #[command(subcommand)]
    Tls(commands::tls::TlsCommand),

    /// Manage Postgres services
    #[command(subcommand)]
    Postgres(commands::postgres::PostgresCommand),

    /// Show and set resource limits
    #[command(subcommand)]
    Resources(commands::resources::ResourcesCommand),

    /// Explore a Postgres database (read-only)
    #[command(subcommand)]
    Db(commands::db::DbCommand),

    /// Check connectivity to the host
    Ping,

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if settings are invalid or the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            command,
        } = self;
        let flags = AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
        };
        let settings = load_settings()?;
        let ssh = ssh_settings(&settings)?;
        let app = AppContext::new(&flags, settings);

        if let Command::Version = command {
            return commands::version::run(&app);
        }

        match ssh {
            Some(ssh) => {
                let executor = SshExecutor::new(
                    SessionPool::new(Ssh2Connector::new(ssh)),
                    Arc::new(CommandAllowlist::dokku()),
                    AuditLog::tracing(),
                    command_timeout(&app.settings),
                );
                let client = DokkuClient::new(executor);
                let result = dispatch(&app, &client, command).await;
                client.executor().pool().shutdown();
                result
            }
            None => {
                tracing::warn!("DOKKU_SSH_KEY is not set; using the in-memory backend");
                dispatch(&app, &InMemoryDokku::new(), command).await
            }
        }
    }
}

async fn dispatch(app: &AppContext, api: &impl DokkuApi, command: Command) -> Result<()> {
    match command {
        Command::Apps(cmd) => commands::apps::run(app, api, cmd).await,
        Command::Ps(cmd) => commands::ps::run(app, api, cmd).await,
        Command::Logs(args) => commands::logs::run(app, api, args).await,
        Command::Config(cmd) => commands::config::run(app, api, cmd).await,
        Command::Domains(cmd) => commands::domains::run(app, api, cmd).await,
        Command::Tls(cmd) => commands::tls::run(app, api, cmd).await,
        Command::Postgres(cmd) => commands::postgres::run(app, api, cmd).await,
        Command::Resources(cmd) => commands::resources::run(app, api, cmd).await,
        Command::Db(cmd) => commands::db::run(app, api, cmd).await,
        Command::Ping => commands::ping::run(app, api).await,
        Command::Version => commands::version::run(app),
    }
}
