//! Command implementations

pub mod apps;
pub mod config;
pub mod db;
pub mod domains;
pub mod logs;
pub mod ping;
pub mod postgres;
pub mod ps;
pub mod resources;
pub mod tls;
pub mod version;

use std::future::Future;

use anyhow::Result;

use crate::app::AppContext;
use crate::domain::DokkuResult;

/// Await a remote step, behind a spinner in human mode.
pub(crate) async fn step<T>(
    app: &AppContext,
    progress: &str,
    work: impl Future<Output = DokkuResult<T>>,
) -> Result<T> {
    let out = if app.is_json() {
        work.await
    } else {
        app.output.with_progress(progress, work).await
    };
    Ok(out?)
}

/// Run a mutating verb and report its outcome.
pub(crate) async fn apply(
    app: &AppContext,
    progress: &str,
    summary: &str,
    work: impl Future<Output = DokkuResult<String>>,
) -> Result<()> {
    app.require_destructive()?;
    let output = step(app, progress, work).await?;
    app.renderer().done(summary, &output)
}
