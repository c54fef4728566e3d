//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod styles;

use std::collections::BTreeMap;
use std::future::Future;
use std::io::Write as _;

use anyhow::Result;
use console::Term;
use dockyard_common::{
    AppInfo, AppMeta, ColumnInfo, DatabaseInfo, ProcessScale, QueryResult, ReportField, TableInfo,
};
use owo_colors::OwoColorize as _;
pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use styles::Styles;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Await `work` behind a spinner when progress is shown.
    pub async fn with_progress<T>(&self, msg: &str, work: impl Future<Output = T>) -> T {
        if !self.show_progress() {
            return work.await;
        }
        let pb = progress::spinner(msg);
        let out = work.await;
        pb.finish_and_clear();
        out
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// How streamed log chunks are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFormat {
    /// Chunks as received.
    Raw,
    /// One `{"line": ...}` object per line.
    JsonLines,
}

impl ChunkFormat {
    /// Write `chunk` and flush.
    pub fn print(self, chunk: &str) {
        let mut stdout = std::io::stdout().lock();
        let written = match self {
            Self::Raw => write!(stdout, "{chunk}"),
            Self::JsonLines => chunk
                .lines()
                .try_for_each(|line| writeln!(stdout, "{}", serde_json::json!({ "line": line }))),
        };
        if written.and_then(|()| stdout.flush()).is_err() {
            tracing::debug!("stdout closed while streaming");
        }
    }
}

/// Human or JSON rendering, chosen once per invocation.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    pub fn apps(&self, apps: &[AppInfo]) -> Result<()> {
        match self {
            Self::Human(h) => h.render_apps(apps),
            Self::Json(j) => j.emit(&serde_json::json!({ "apps": apps }))?,
        }
        Ok(())
    }

    pub fn names(&self, names: &[String]) -> Result<()> {
        match self {
            Self::Human(h) => h.render_list("No apps.", names),
            Self::Json(j) => j.emit(&serde_json::json!({ "apps": names }))?,
        }
        Ok(())
    }

    pub fn app_meta(&self, app: &str, meta: &AppMeta) -> Result<()> {
        match self {
            Self::Human(h) => h.render_app_meta(app, meta),
            Self::Json(j) => j.emit(&serde_json::json!({ "app": app, "meta": meta }))?,
        }
        Ok(())
    }

    pub fn scale(&self, app: &str, scale: &[ProcessScale]) -> Result<()> {
        match self {
            Self::Human(h) => h.render_scale(app, scale),
            Self::Json(j) => j.emit(&serde_json::json!({ "app": app, "scale": scale }))?,
        }
        Ok(())
    }

    pub fn config(&self, app: &str, config: &BTreeMap<String, String>) -> Result<()> {
        match self {
            Self::Human(h) => h.render_config(app, config),
            Self::Json(j) => j.emit(&serde_json::json!({ "app": app, "config": config }))?,
        }
        Ok(())
    }

    pub fn domains(&self, app: &str, domains: &[String]) -> Result<()> {
        match self {
            Self::Human(h) => h.render_list(&format!("No domains for {app}."), domains),
            Self::Json(j) => j.emit(&serde_json::json!({ "app": app, "domains": domains }))?,
        }
        Ok(())
    }

    pub fn databases(&self, dbs: &[DatabaseInfo]) -> Result<()> {
        match self {
            Self::Human(h) => h.render_databases(dbs),
            Self::Json(j) => j.emit(&serde_json::json!({ "databases": dbs }))?,
        }
        Ok(())
    }

    /// A parsed key/value report such as `postgres:info` or
    /// `resource:report`.
    pub fn fields(&self, title: &str, fields: &[ReportField]) -> Result<()> {
        match self {
            Self::Human(h) => h.render_fields(title, fields),
            Self::Json(j) => j.emit(&serde_json::json!({ "name": title, "fields": fields }))?,
        }
        Ok(())
    }

    pub fn tables(&self, db: &str, tables: &[TableInfo]) -> Result<()> {
        match self {
            Self::Human(h) => h.render_tables(tables),
            Self::Json(j) => j.emit(&serde_json::json!({ "database": db, "tables": tables }))?,
        }
        Ok(())
    }

    pub fn columns(&self, table: &str, columns: &[ColumnInfo]) -> Result<()> {
        match self {
            Self::Human(h) => h.render_columns(columns),
            Self::Json(j) => j.emit(&serde_json::json!({ "table": table, "columns": columns }))?,
        }
        Ok(())
    }

    pub fn query(&self, result: &QueryResult) -> Result<()> {
        match self {
            Self::Human(h) => h.render_query(result),
            Self::Json(j) => j.emit(result)?,
        }
        Ok(())
    }

    /// Raw text output (reports, log excerpts) under `key` in JSON.
    pub fn text(&self, key: &str, text: &str) -> Result<()> {
        match self {
            Self::Human(h) => h.render_text(text),
            Self::Json(j) => {
                let mut doc = serde_json::Map::new();
                doc.insert(key.to_string(), text.into());
                j.emit(&doc)?;
            }
        }
        Ok(())
    }

    /// Outcome of a mutating command.
    pub fn done(&self, summary: &str, output: &str) -> Result<()> {
        match self {
            Self::Human(h) => h.render_done(summary, output),
            Self::Json(j) => j.emit(&serde_json::json!({
                "ok": true,
                "message": summary,
                "output": output.trim(),
            }))?,
        }
        Ok(())
    }

    pub fn version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(h) => h.render_version(version),
            Self::Json(j) => j.emit(&serde_json::json!({ "version": version }))?,
        }
        Ok(())
    }
}
