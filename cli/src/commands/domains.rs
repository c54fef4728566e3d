//! `dockyard domains`: list, add and remove app domains.

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::DokkuApi;
use crate::commands::{apply, step};

/// Domains subcommands.
#[derive(Subcommand)]
pub enum DomainsCommand {
    /// List an app's domains
    List {
        /// App name
        app: String,
    },
    /// Add a domain
    Add {
        /// App name
        app: String,
        /// Domain, e.g. `api.example.com`
        domain: String,
    },
    /// Remove a domain
    Remove {
        /// App name
        app: String,
        /// Domain to remove
        domain: String,
    },
}

/// Run the domains command.
///
/// # Errors
///
/// Returns an error if the remote command fails or input is invalid.
pub async fn run(app: &AppContext, api: &impl DokkuApi, cmd: DomainsCommand) -> Result<()> {
    match cmd {
        DomainsCommand::List { app: name } => {
            let domains = step(app, "Fetching domains...", api.domains(&name)).await?;
            app.renderer().domains(&name, &domains)
        }
        DomainsCommand::Add { app: name, domain } => {
            apply(
                app,
                &format!("Adding {domain}..."),
                &format!("Added {domain} to {name}"),
                api.add_domain(&name, &domain),
            )
            .await
        }
        DomainsCommand::Remove { app: name, domain } => {
            apply(
                app,
                &format!("Removing {domain}..."),
                &format!("Removed {domain} from {name}"),
                api.remove_domain(&name, &domain),
            )
            .await
        }
    }
}
