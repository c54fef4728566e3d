//! `dockyard postgres`: Postgres service lifecycle and links.

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::DokkuApi;
use crate::commands::{apply, step};

/// Postgres subcommands.
#[derive(Subcommand)]
pub enum PostgresCommand {
    /// List services and the apps linked to each
    List,
    /// Create a service
    Create {
        /// Service name
        db: String,
    },
    /// Destroy a service (must not be linked)
    Destroy {
        /// Service name
        db: String,
    },
    /// Show service details
    Info {
        /// Service name
        db: String,
    },
    /// Link a service to an app
    Link {
        /// Service name
        db: String,
        /// App name
        app: String,
    },
    /// Unlink a service from an app
    Unlink {
        /// Service name
        db: String,
        /// App name
        app: String,
    },
}

/// Run the postgres command.
///
/// # Errors
///
/// Returns an error if the remote command fails or input is invalid.
pub async fn run(app: &AppContext, api: &impl DokkuApi, cmd: PostgresCommand) -> Result<()> {
    match cmd {
        PostgresCommand::List => {
            let dbs = step(app, "Listing services...", api.databases()).await?;
            app.renderer().databases(&dbs)
        }
        PostgresCommand::Create { db } => {
            apply(
                app,
                &format!("Creating {db}..."),
                &format!("Created {db}"),
                api.create_database(&db),
            )
            .await
        }
        PostgresCommand::Destroy { db } => {
            app.require_destructive()?;
            if !app.confirm_destroy(&format!("service {db}"))? {
                app.output.info("Cancelled.");
                return Ok(());
            }
            apply(
                app,
                &format!("Destroying {db}..."),
                &format!("Destroyed {db}"),
                api.destroy_database(&db),
            )
            .await
        }
        PostgresCommand::Info { db } => {
            let fields = step(app, "Fetching service info...", api.database_info(&db)).await?;
            app.renderer().fields(&db, &fields)
        }
        PostgresCommand::Link { db, app: target } => {
            apply(
                app,
                &format!("Linking {db} to {target}..."),
                &format!("Linked {db} to {target}"),
                api.link_database(&db, &target),
            )
            .await
        }
        PostgresCommand::Unlink { db, app: target } => {
            apply(
                app,
                &format!("Unlinking {db} from {target}..."),
                &format!("Unlinked {db} from {target}"),
                api.unlink_database(&db, &target),
            )
            .await
        }
    }
}
