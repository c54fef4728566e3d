//! `dockyard ps scale`: show or change process counts.

use anyhow::{Context, Result, anyhow};
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::DokkuApi;
use crate::commands::{apply, step};

/// Process subcommands.
#[derive(Subcommand)]
pub enum PsCommand {
    /// Show process counts, or set them with TYPE=COUNT pairs
    Scale {
        /// App name
        app: String,
        /// New counts, e.g. `web=2 worker=1`
        counts: Vec<String>,
    },
}

/// Split `web=2` into its process type and count.
///
/// # Errors
///
/// Returns an error when the `=` is missing or the count is not a number.
pub fn parse_scale_arg(raw: &str) -> Result<(String, u32)> {
    let (process_type, count) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected TYPE=COUNT, got {raw:?}"))?;
    let count = count
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid count in {raw:?}"))?;
    Ok((process_type.trim().to_string(), count))
}

/// Run the ps command.
///
/// # Errors
///
/// Returns an error if the remote command fails or input is invalid.
pub async fn run(app: &AppContext, api: &impl DokkuApi, cmd: PsCommand) -> Result<()> {
    match cmd {
        PsCommand::Scale { app: name, counts } if counts.is_empty() => {
            let scale = step(app, "Fetching scale...", api.scale_report(&name)).await?;
            app.renderer().scale(&name, &scale)
        }
        PsCommand::Scale { app: name, counts } => {
            let counts = counts
                .iter()
                .map(|raw| parse_scale_arg(raw))
                .collect::<Result<Vec<_>>>()?;
            apply(
                app,
                &format!("Scaling {name}..."),
                &format!("Scaled {name}"),
                api.scale(&name, &counts),
            )
            .await
        }
    }
}
