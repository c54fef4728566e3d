//! `dockyard tls`: Let's Encrypt certificates.

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::DokkuApi;
use crate::commands::apply;

/// TLS subcommands.
#[derive(Subcommand)]
pub enum TlsCommand {
    /// Issue and enable a certificate
    Enable {
        /// App name
        app: String,
    },
    /// Disable the certificate
    Disable {
        /// App name
        app: String,
    },
}

/// Run the tls command.
///
/// # Errors
///
/// Returns an error if the remote command fails or input is invalid.
pub async fn run(app: &AppContext, api: &impl DokkuApi, cmd: TlsCommand) -> Result<()> {
    match cmd {
        TlsCommand::Enable { app: name } => {
            apply(
                app,
                &format!("Enabling TLS for {name}..."),
                &format!("TLS enabled for {name}"),
                api.enable_tls(&name),
            )
            .await
        }
        TlsCommand::Disable { app: name } => {
            apply(
                app,
                &format!("Disabling TLS for {name}..."),
                &format!("TLS disabled for {name}"),
                api.disable_tls(&name),
            )
            .await
        }
    }
}
