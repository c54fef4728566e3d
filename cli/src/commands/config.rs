//! `dockyard config`: show, set and unset app environment variables.

use anyhow::{Result, anyhow};
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::DokkuApi;
use crate::commands::{apply, step};

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show an app's environment
    Show {
        /// App name
        app: String,
    },
    /// Set one or more variables
    Set {
        /// App name
        app: String,
        /// Assignments, e.g. `KEY=value`
        #[arg(required = true)]
        vars: Vec<String>,
        /// Do not restart the app
        #[arg(long)]
        no_restart: bool,
    },
    /// Remove one or more variables
    Unset {
        /// App name
        app: String,
        /// Variable names
        #[arg(required = true)]
        keys: Vec<String>,
        /// Do not restart the app
        #[arg(long)]
        no_restart: bool,
    },
}

/// Split `KEY=value` at the first `=`. The value may be empty or contain `=`.
///
/// # Errors
///
/// Returns an error when there is no `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String)> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got {raw:?}"))
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the remote command fails or input is invalid.
pub async fn run(app: &AppContext, api: &impl DokkuApi, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { app: name } => {
            let config = step(app, "Fetching config...", api.config_show(&name)).await?;
            app.renderer().config(&name, &config)
        }
        ConfigCommand::Set {
            app: name,
            vars,
            no_restart,
        } => {
            let vars = vars
                .iter()
                .map(|raw| parse_assignment(raw))
                .collect::<Result<Vec<_>>>()?;
            let keys = vars
                .iter()
                .map(|(k, _)| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            apply(
                app,
                &format!("Setting config on {name}..."),
                &format!("Set {keys} on {name}"),
                api.config_set(&name, &vars, no_restart),
            )
            .await
        }
        ConfigCommand::Unset {
            app: name,
            keys,
            no_restart,
        } => {
            apply(
                app,
                &format!("Unsetting config on {name}..."),
                &format!("Unset {} on {name}", keys.join(", ")),
                api.config_unset(&name, &keys, no_restart),
            )
            .await
        }
    }
}
