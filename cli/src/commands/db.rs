//! `dockyard db`: read-only SQL explorer.
//!
//! Every subcommand requires `ENABLE_SQL_EXPLORER`.

use std::io::Read as _;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::DokkuApi;
use crate::commands::step;

/// SQL explorer subcommands.
#[derive(Subcommand)]
pub enum DbCommand {
    /// List tables in the public schema
    Tables {
        /// Service name
        db: String,
    },
    /// Show a table's columns
    Schema {
        /// Service name
        db: String,
        /// Table name
        table: String,
    },
    /// Show the first rows of a table
    Preview {
        /// Service name
        db: String,
        /// Table name
        table: String,
    },
    /// Run a single read-only statement
    Query {
        /// Service name
        db: String,
        /// SQL statement, or `-` to read it from stdin
        sql: String,
    },
}

fn read_sql(raw: String) -> Result<String> {
    if raw != "-" {
        return Ok(raw);
    }
    let mut sql = String::new();
    std::io::stdin()
        .read_to_string(&mut sql)
        .context("failed to read SQL from stdin")?;
    Ok(sql)
}

/// Run the db command.
///
/// # Errors
///
/// Returns an error if the explorer is disabled, the statement is rejected
/// or the query fails.
pub async fn run(app: &AppContext, api: &impl DokkuApi, cmd: DbCommand) -> Result<()> {
    app.require_sql_explorer()?;
    match cmd {
        DbCommand::Tables { db } => {
            let tables = step(app, "Listing tables...", api.tables(&db)).await?;
            app.renderer().tables(&db, &tables)
        }
        DbCommand::Schema { db, table } => {
            let columns = step(app, "Reading schema...", api.table_schema(&db, &table)).await?;
            app.renderer().columns(&table, &columns)
        }
        DbCommand::Preview { db, table } => {
            let rows = step(app, "Reading rows...", api.table_preview(&db, &table)).await?;
            app.renderer().query(&rows)
        }
        DbCommand::Query { db, sql } => {
            let sql = read_sql(sql)?;
            let result = step(app, "Running query...", api.run_query(&db, &sql)).await?;
            app.renderer().query(&result)
        }
    }
}
