//! `dockyard ping`: open the session and report the backend.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::DokkuApi;
use crate::commands::step;

/// Run the ping command.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
pub async fn run(app: &AppContext, api: &impl DokkuApi) -> Result<()> {
    step(app, "Connecting...", api.warmup()).await?;
    app.renderer()
        .done(&format!("Connected to {}", app.backend), "")
}
