//! `dockyard resources`: memory and CPU limits.

use anyhow::{Result, bail};
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::{DokkuApi, ResourceLimits};
use crate::commands::{apply, step};

/// Resources subcommands.
#[derive(Subcommand)]
pub enum ResourcesCommand {
    /// Show the resource report for an app
    Report {
        /// App name
        app: String,
    },
    /// Set limits for one process type
    Limit {
        /// App name
        app: String,
        /// Memory limit, e.g. `512m`
        #[arg(long)]
        memory: Option<String>,
        /// CPU limit, e.g. `1` or `2`
        #[arg(long)]
        cpu: Option<String>,
        /// Process type the limits apply to
        #[arg(long, default_value = "web")]
        process_type: String,
    },
}

/// Run the resources command.
///
/// # Errors
///
/// Returns an error if the remote command fails or input is invalid.
pub async fn run(app: &AppContext, api: &impl DokkuApi, cmd: ResourcesCommand) -> Result<()> {
    match cmd {
        ResourcesCommand::Report { app: name } => {
            let fields = step(app, "Fetching resources...", api.resource_report(&name)).await?;
            app.renderer().fields(&name, &fields)
        }
        ResourcesCommand::Limit {
            app: name,
            memory,
            cpu,
            process_type,
        } => {
            if memory.is_none() && cpu.is_none() {
                bail!("pass --memory, --cpu or both");
            }
            let limits = ResourceLimits {
                process_type,
                memory,
                cpu,
            };
            apply(
                app,
                &format!("Setting limits on {name}..."),
                &format!("Updated {} limits on {name}", limits.process_type),
                api.set_resource_limits(&name, &limits),
            )
            .await
        }
    }
}
