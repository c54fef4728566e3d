use serde::{Deserialize, Deserializer};

/// Console settings, read from the process environment.
///
/// Field names map one-to-one onto upper-cased environment variables
/// (`dokku_ssh_host` ↔ `DOKKU_SSH_HOST`) so the struct can be loaded with
/// `envy::from_env`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleSettings {
    /// Dokku host to connect to (default `localhost`).
    #[serde(default = "default_ssh_host")]
    pub dokku_ssh_host: String,

    /// SSH port (default 22).
    #[serde(default = "default_ssh_port")]
    pub dokku_ssh_port: u16,

    /// SSH user; Dokku's command handler runs as `dokku`.
    #[serde(default = "default_ssh_user")]
    pub dokku_ssh_user: String,

    /// Base64-encoded private key. Unset or empty selects the in-memory backend.
    #[serde(default)]
    pub dokku_ssh_key: Option<String>,

    /// Per-command timeout in milliseconds (default 30 000).
    #[serde(default = "default_command_timeout_ms")]
    pub ssh_command_timeout_ms: u64,

    /// Enables the read-only SQL explorer commands.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub enable_sql_explorer: bool,

    /// When false the console is read-only.
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub enable_destructive_actions: bool,
}

impl ConsoleSettings {
    /// The configured private key, treating an empty value as unset.
    #[must_use]
    pub fn ssh_key(&self) -> Option<&str> {
        self.dokku_ssh_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            dokku_ssh_host: default_ssh_host(),
            dokku_ssh_port: default_ssh_port(),
            dokku_ssh_user: default_ssh_user(),
            dokku_ssh_key: None,
            ssh_command_timeout_ms: default_command_timeout_ms(),
            enable_sql_explorer: false,
            enable_destructive_actions: true,
        }
    }
}

fn default_ssh_host() -> String {
    "localhost".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_ssh_user() -> String {
    "dokku".to_string()
}

fn default_command_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

/// Accepts `true`, `false`, `1` or `0`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected one of true, false, 1, 0 (got {other:?})"
        ))),
    }
}
