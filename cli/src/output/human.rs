//! Human-readable terminal renderer.

use std::collections::BTreeMap;

use console::measure_text_width;
use dockyard_common::{
    AppInfo, AppMeta, ColumnInfo, DatabaseInfo, ProcessScale, QueryResult, ReportField, TableInfo,
};
use owo_colors::{OwoColorize as _, Style};

use crate::output::OutputContext;

/// Placeholder for empty cells.
const NONE: &str = "-";

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

/// Pad `text` to `width` display columns.
#[must_use]
pub fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(measure_text_width(text));
    format!("{text}{}", " ".repeat(fill))
}

/// Column widths wide enough for the header and every row.
#[must_use]
pub fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| measure_text_width(h)).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let width = measure_text_width(cell);
            match widths.get_mut(idx) {
                Some(w) => *w = (*w).max(width),
                None => widths.push(width),
            }
        }
    }
    widths
}

fn or_none(text: &str) -> &str {
    if text.is_empty() { NONE } else { text }
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Print an aligned table. `style_cell` may restyle individual cells.
    fn table(
        &self,
        headers: &[&str],
        rows: &[Vec<String>],
        style_cell: impl Fn(usize, usize) -> Option<Style>,
    ) {
        let widths = column_widths(headers, rows);
        let header = headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| pad(h, *w).style(self.ctx.styles.bold).to_string())
            .collect::<Vec<_>>()
            .join("  ");
        println!("  {}", header.trim_end());

        for (r, row) in rows.iter().enumerate() {
            let line = row
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(c, (cell, w))| {
                    let padded = pad(cell, *w);
                    match style_cell(r, c) {
                        Some(style) => padded.style(style).to_string(),
                        None => padded,
                    }
                })
                .collect::<Vec<_>>()
                .join("  ");
            println!("  {}", line.trim_end());
        }
    }

    fn empty(&self, msg: &str) {
        if !self.ctx.quiet {
            println!("  {}", msg.style(self.ctx.styles.dim));
        }
    }

    pub fn render_apps(&self, apps: &[AppInfo]) {
        if apps.is_empty() {
            self.empty("No apps.");
            return;
        }
        let rows: Vec<Vec<String>> = apps
            .iter()
            .map(|app| {
                let processes = app
                    .process_types
                    .iter()
                    .map(|t| format!("{t}={}", app.process_type_counts.get(t).unwrap_or(&0)))
                    .collect::<Vec<_>>()
                    .join(" ");
                vec![
                    app.name.clone(),
                    app.status.to_string(),
                    or_none(&processes).to_string(),
                    or_none(&app.domains.join(", ")).to_string(),
                ]
            })
            .collect();
        self.table(&["NAME", "STATUS", "PROCESSES", "DOMAINS"], &rows, |r, c| {
            (c == 1).then(|| self.ctx.styles.status(apps[r].status))
        });
    }

    pub fn render_app_meta(&self, app: &str, meta: &AppMeta) {
        self.ctx.header(app);
        for (key, value) in &meta.ps_report {
            self.ctx.kv(&format!("{key}:"), or_none(value));
        }
        self.ctx.kv("App type:", or_none(&meta.app_type));
        self.ctx.kv("Git rev:", or_none(&meta.git_rev));
        self.ctx.kv("GitHub repo:", or_none(&meta.github_repo));
        if let Some(git) = &meta.git_report {
            self.ctx.kv("Deploy branch:", or_none(&git.deploy_branch));
            self.ctx.kv("Source:", or_none(&git.source_hash));
            self.ctx.kv("Last updated:", or_none(&git.last_updated_at));
        }
        if !meta.processes.is_empty() {
            println!();
            let rows: Vec<Vec<String>> = meta
                .processes
                .iter()
                .map(|p| vec![p.name.clone(), p.process_type.clone(), p.status.clone()])
                .collect();
            self.table(&["PROCESS", "TYPE", "STATUS"], &rows, |_, _| None);
        }
    }

    pub fn render_scale(&self, app: &str, scale: &[ProcessScale]) {
        if scale.is_empty() {
            self.empty(&format!("No process types for {app}."));
            return;
        }
        let rows: Vec<Vec<String>> = scale
            .iter()
            .map(|s| vec![s.process_type.clone(), s.count.to_string()])
            .collect();
        self.table(&["TYPE", "COUNT"], &rows, |_, _| None);
    }

    pub fn render_config(&self, app: &str, config: &BTreeMap<String, String>) {
        if config.is_empty() {
            self.empty(&format!("No config vars for {app}."));
            return;
        }
        let width = config.keys().map(|k| measure_text_width(k)).max().unwrap_or(0);
        for (key, value) in config {
            println!("  {}  {value}", pad(key, width).style(self.ctx.styles.dim));
        }
    }

    pub fn render_list(&self, empty_msg: &str, items: &[String]) {
        if items.is_empty() {
            self.empty(empty_msg);
            return;
        }
        for item in items {
            println!("  {item}");
        }
    }

    pub fn render_databases(&self, dbs: &[DatabaseInfo]) {
        if dbs.is_empty() {
            self.empty("No Postgres services.");
            return;
        }
        let rows: Vec<Vec<String>> = dbs
            .iter()
            .map(|db| vec![db.name.clone(), or_none(&db.links.join(", ")).to_string()])
            .collect();
        self.table(&["NAME", "LINKED APPS"], &rows, |_, _| None);
    }

    pub fn render_fields(&self, title: &str, fields: &[ReportField]) {
        self.ctx.header(title);
        let width = fields
            .iter()
            .map(|f| measure_text_width(&f.key) + 1)
            .max()
            .unwrap_or(0);
        for field in fields {
            let key = pad(&format!("{}:", field.key), width);
            println!("  {}  {}", key.style(self.ctx.styles.dim), or_none(&field.value));
        }
    }

    pub fn render_tables(&self, tables: &[TableInfo]) {
        if tables.is_empty() {
            self.empty("No tables in the public schema.");
            return;
        }
        let rows: Vec<Vec<String>> = tables
            .iter()
            .map(|t| vec![t.name.clone(), t.kind.clone(), t.row_estimate.clone()])
            .collect();
        self.table(&["NAME", "TYPE", "ROWS (EST.)"], &rows, |_, _| None);
    }

    pub fn render_columns(&self, columns: &[ColumnInfo]) {
        let rows: Vec<Vec<String>> = columns
            .iter()
            .map(|c| {
                vec![
                    c.column.clone(),
                    c.data_type.clone(),
                    c.nullable.clone(),
                    or_none(&c.default_value).to_string(),
                ]
            })
            .collect();
        self.table(&["COLUMN", "TYPE", "NULLABLE", "DEFAULT"], &rows, |_, _| None);
    }

    pub fn render_query(&self, result: &QueryResult) {
        let headers: Vec<&str> = result.columns.iter().map(String::as_str).collect();
        self.table(&headers, &result.rows, |_, _| None);
        if !self.ctx.quiet {
            let noun = if result.row_count == 1 { "row" } else { "rows" };
            println!("  {}", format!("({} {noun})", result.row_count).style(self.ctx.styles.dim));
        }
    }

    /// Raw command output, indented.
    pub fn render_text(&self, text: &str) {
        for line in text.lines() {
            println!("  {line}");
        }
    }

    /// Result of a mutating command.
    pub fn render_done(&self, summary: &str, output: &str) {
        if self.ctx.quiet {
            return;
        }
        let detail = output.trim();
        if !detail.is_empty() {
            for line in detail.lines() {
                println!("  {}", line.style(self.ctx.styles.dim));
            }
        }
        self.ctx.success(summary);
    }

    pub fn render_version(&self, version: &str) {
        println!("dockyard {version}");
    }
}
