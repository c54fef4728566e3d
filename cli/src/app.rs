//! Application context: unified state passed to every command handler.
//!
//! Built once in `Cli::run()` from the global flags and the console
//! settings, then passed as `&AppContext` to every command.

use anyhow::{Result, bail};
use dockyard_common::ConsoleSettings;

use crate::output::{ChunkFormat, HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `DOCKYARD_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Which implementation serves Dokku verbs for this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Real host over SSH.
    Remote { host: String, port: u16 },
    /// Seeded in-process stand-in.
    InMemory,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote { host, port } => write!(f, "{host}:{port}"),
            Self::InMemory => f.write_str("in-memory"),
        }
    }
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Settings loaded from the environment.
    pub settings: ConsoleSettings,
    /// Backend selected from the settings.
    pub backend: Backend,
    /// When `true`, skip interactive prompts.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `DOCKYARD_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags and settings.
    #[must_use]
    pub fn new(flags: &AppFlags, settings: ConsoleSettings) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("DOCKYARD_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        let backend = if settings.ssh_key().is_some() {
            Backend::Remote {
                host: settings.dokku_ssh_host.clone(),
                port: settings.dokku_ssh_port,
            }
        } else {
            Backend::InMemory
        };

        Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            settings,
            backend,
            non_interactive,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Format for streamed log output.
    #[must_use]
    pub fn chunk_format(&self) -> ChunkFormat {
        match self.mode {
            OutputMode::Human => ChunkFormat::Raw,
            OutputMode::Json => ChunkFormat::JsonLines,
        }
    }

    /// Fail unless destructive actions are enabled.
    ///
    /// # Errors
    ///
    /// Returns an error in read-only mode.
    pub fn require_destructive(&self) -> Result<()> {
        if !self.settings.enable_destructive_actions {
            bail!("Destructive actions are disabled (ENABLE_DESTRUCTIVE_ACTIONS=false)");
        }
        Ok(())
    }

    /// Fail unless the SQL explorer is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error when `ENABLE_SQL_EXPLORER` is off.
    pub fn require_sql_explorer(&self) -> Result<()> {
        if !self.settings.enable_sql_explorer {
            bail!("SQL explorer is disabled (set ENABLE_SQL_EXPLORER=true)");
        }
        Ok(())
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `DOCKYARD_YES`
    /// env), returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }

    /// Confirm an irreversible action. Proceeds without asking when
    /// non-interactive; otherwise the prompt defaults to "no".
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails.
    pub fn confirm_destroy(&self, what: &str) -> Result<bool> {
        if self.non_interactive {
            return Ok(true);
        }
        self.confirm(&format!("Permanently destroy {what}?"), false)
    }
}
