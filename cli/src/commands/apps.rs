//! `dockyard apps`: list, inspect and manage app lifecycles.

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::DokkuApi;
use crate::commands::{apply, step};

/// Apps subcommands.
#[derive(Subcommand)]
pub enum AppsCommand {
    /// List apps with status, processes and domains
    List {
        /// Print app names only
        #[arg(long)]
        names: bool,
    },
    /// Create an app
    Create {
        /// App name
        name: String,
    },
    /// Destroy an app and its add-on links
    Destroy {
        /// App name
        name: String,
    },
    /// Show deployment metadata and processes
    Info {
        /// App name
        name: String,
        /// Print the raw `ps:report` output instead
        #[arg(long)]
        raw: bool,
    },
    /// Start an app
    Start {
        /// App name
        name: String,
    },
    /// Stop an app
    Stop {
        /// App name
        name: String,
    },
    /// Restart an app
    Restart {
        /// App name
        name: String,
    },
    /// Rebuild an app from its last source
    Rebuild {
        /// App name
        name: String,
    },
}

/// Run the apps command.
///
/// # Errors
///
/// Returns an error if the remote command fails or input is invalid.
pub async fn run(app: &AppContext, api: &impl DokkuApi, cmd: AppsCommand) -> Result<()> {
    match cmd {
        AppsCommand::List { names: true } => {
            let names = step(app, "Listing apps...", api.app_names()).await?;
            app.renderer().names(&names)
        }
        AppsCommand::List { names: false } => {
            let apps = step(app, "Listing apps...", api.apps_list()).await?;
            app.renderer().apps(&apps)
        }
        AppsCommand::Create { name } => {
            apply(
                app,
                &format!("Creating {name}..."),
                &format!("Created {name}"),
                api.create_app(&name),
            )
            .await
        }
        AppsCommand::Destroy { name } => destroy(app, api, &name).await,
        AppsCommand::Info { name, raw: true } => {
            let report = step(app, "Fetching report...", api.app_report(&name)).await?;
            app.renderer().text("report", &report)
        }
        AppsCommand::Info { name, raw: false } => {
            let meta = step(app, "Fetching app info...", api.app_meta(&name)).await?;
            app.renderer().app_meta(&name, &meta)
        }
        AppsCommand::Start { name } => {
            apply(
                app,
                &format!("Starting {name}..."),
                &format!("Started {name}"),
                api.start_app(&name),
            )
            .await
        }
        AppsCommand::Stop { name } => {
            apply(
                app,
                &format!("Stopping {name}..."),
                &format!("Stopped {name}"),
                api.stop_app(&name),
            )
            .await
        }
        AppsCommand::Restart { name } => {
            apply(
                app,
                &format!("Restarting {name}..."),
                &format!("Restarted {name}"),
                api.restart_app(&name),
            )
            .await
        }
        AppsCommand::Rebuild { name } => {
            apply(
                app,
                &format!("Rebuilding {name}..."),
                &format!("Rebuilt {name}"),
                api.rebuild_app(&name),
            )
            .await
        }
    }
}

async fn destroy(app: &AppContext, api: &impl DokkuApi, name: &str) -> Result<()> {
    app.require_destructive()?;
    if !app.confirm_destroy(&format!("app {name}"))? {
        app.output.info("Cancelled.");
        return Ok(());
    }
    apply(
        app,
        &format!("Destroying {name}..."),
        &format!("Destroyed {name}"),
        api.destroy_app(name),
    )
    .await
}
