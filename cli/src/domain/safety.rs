//! Command safety layer: argument escaping, the sub-command allowlist and
//! audit redaction.
//!
//! Pure and synchronous. Every command string handed to a transport is built
//! by [`CommandAllowlist::prepare`]; there is no other constructor.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::{DokkuError, DokkuResult};

/// Dokku sub-commands the console may send.
pub const DOKKU_COMMANDS: &[&str] = &[
    "apps:list",
    "apps:create",
    "apps:destroy",
    "ps:report",
    "ps:start",
    "ps:stop",
    "ps:restart",
    "ps:rebuild",
    "ps:scale",
    "logs",
    "config:get",
    "config:show",
    "config:set",
    "config:unset",
    "domains:report",
    "domains:add",
    "domains:remove",
    "letsencrypt:enable",
    "letsencrypt:disable",
    "postgres:list",
    "postgres:create",
    "postgres:destroy",
    "postgres:info",
    "postgres:link",
    "postgres:unlink",
    "postgres:links",
    "postgres:connect",
    "resource:report",
    "resource:limit",
    "git:report",
];

/// Sub-commands after which Dokku's `sshcommand` handler drops the TCP
/// connection. They must run on a one-shot session.
pub const SESSION_TERMINATING_COMMANDS: &[&str] = &["postgres:connect"];

/// Mask written in place of a redacted value.
pub const REDACTED: &str = "***";

/// Wrap `arg` in single quotes so a POSIX shell reads it as one literal token.
///
/// Embedded `'` become `'\''` (close, escaped quote, reopen).
#[must_use]
pub fn escape_argument(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('\'');
    for ch in arg.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

/// A command that passed the allowlist, with its escaped command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    name: String,
    rendered: String,
}

impl PreparedCommand {
    /// The sub-command name (`args[0]`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The escaped command line sent to the remote shell.
    #[must_use]
    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

/// True when the remote handler closes the connection after `command`.
#[must_use]
pub fn terminates_session(command: &str) -> bool {
    SESSION_TERMINATING_COMMANDS.contains(&command)
}

/// Fixed set of permitted remote sub-commands.
///
/// Built once at startup and injected into the executor.
#[derive(Debug, Clone)]
pub struct CommandAllowlist {
    commands: BTreeSet<String>,
}

impl CommandAllowlist {
    /// The allowlist for a Dokku host.
    #[must_use]
    pub fn dokku() -> Self {
        Self::from_names(DOKKU_COMMANDS)
    }

    /// Build an allowlist from explicit names.
    #[must_use]
    pub fn from_names(names: &[&str]) -> Self {
        Self {
            commands: names.iter().map(|name| (*name).to_string()).collect(),
        }
    }

    /// Whether `name` is a permitted sub-command.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains(name)
    }

    /// Fail with [`DokkuError::BlockedCommand`] unless `args[0]` is allowlisted.
    ///
    /// # Errors
    ///
    /// Returns `BlockedCommand` for an empty argument list or an unknown name.
    pub fn check(&self, args: &[String]) -> DokkuResult<()> {
        match args.first() {
            Some(name) if self.contains(name) => Ok(()),
            Some(name) => Err(DokkuError::BlockedCommand(name.clone())),
            None => Err(DokkuError::BlockedCommand("(empty)".to_string())),
        }
    }

    /// Check `args` and render the escaped command line.
    ///
    /// # Errors
    ///
    /// Returns `BlockedCommand` when the check fails.
    pub fn prepare(&self, args: &[String]) -> DokkuResult<PreparedCommand> {
        self.check(args)?;
        let rendered = args
            .iter()
            .map(|arg| escape_argument(arg))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(PreparedCommand {
            name: args[0].clone(),
            rendered,
        })
    }
}

static SENSITIVE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)KEY|SECRET|HASH|PASSWORD|TOKEN|PRIVATE|CREDENTIAL|DSN").expect("valid regex")
});

/// Masks sensitive `KEY=value` arguments for audit output.
///
/// Never applied to the arguments actually transmitted.
#[derive(Debug, Clone)]
pub struct Redactor {
    pattern: Regex,
}

impl Default for Redactor {
    fn default() -> Self {
        Self {
            pattern: SENSITIVE_KEY_RE.clone(),
        }
    }
}

impl Redactor {
    /// Whether `key` names a secret.
    #[must_use]
    pub fn is_sensitive(&self, key: &str) -> bool {
        self.pattern.is_match(key)
    }

    /// Redact a single argument. `=value` (no key) is left alone.
    #[must_use]
    pub fn redact(&self, arg: &str) -> String {
        match arg.split_once('=') {
            Some((key, _)) if !key.is_empty() && self.is_sensitive(key) => {
                format!("{key}={REDACTED}")
            }
            _ => arg.to_string(),
        }
    }

    /// Redact every argument in order.
    #[must_use]
    pub fn redact_arguments(&self, args: &[String]) -> Vec<String> {
        args.iter().map(|arg| self.redact(arg)).collect()
    }
}
