//! Settings loader: environment variables into [`ConsoleSettings`].

use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use dockyard_common::ConsoleSettings;

use crate::infra::ssh::SshSettings;

/// TCP connect and handshake timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read settings from the process environment.
///
/// # Errors
///
/// Returns an error if a variable is present but malformed.
pub fn load_settings() -> Result<ConsoleSettings> {
    envy::from_env::<ConsoleSettings>().context("invalid console settings in environment")
}

/// SSH parameters for the remote backend, or `None` when no key is
/// configured.
///
/// # Errors
///
/// Returns an error if the key is not valid base64 or not UTF-8 PEM text.
pub fn ssh_settings(settings: &ConsoleSettings) -> Result<Option<SshSettings>> {
    let Some(encoded) = settings.ssh_key() else {
        return Ok(None);
    };
    let decoded = STANDARD
        .decode(encoded)
        .context("DOKKU_SSH_KEY is not valid base64")?;
    let private_key_pem =
        String::from_utf8(decoded).context("DOKKU_SSH_KEY does not decode to a PEM key")?;

    Ok(Some(SshSettings {
        host: settings.dokku_ssh_host.clone(),
        port: settings.dokku_ssh_port,
        user: settings.dokku_ssh_user.clone(),
        private_key_pem,
        connect_timeout: CONNECT_TIMEOUT,
    }))
}

/// Per-command timeout from settings.
#[must_use]
pub fn command_timeout(settings: &ConsoleSettings) -> Duration {
    Duration::from_millis(settings.ssh_command_timeout_ms)
}
