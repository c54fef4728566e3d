//! `dockyard logs`: recent log lines or a live tail.

use anyhow::{Result, bail};
use clap::Args;
use tokio::sync::oneshot;

use crate::app::AppContext;
use crate::application::DokkuApi;
use crate::commands::step;

/// Arguments for the logs command.
#[derive(Args)]
pub struct LogsArgs {
    /// App name
    pub app: String,

    /// Number of lines to show
    #[arg(short, long, default_value_t = 100)]
    pub num: u32,

    /// Follow the log until interrupted
    #[arg(short, long)]
    pub tail: bool,
}

/// Run the logs command.
///
/// # Errors
///
/// Returns an error if the remote command fails or the tail ends with a
/// non-zero exit code.
pub async fn run(app: &AppContext, api: &impl DokkuApi, args: LogsArgs) -> Result<()> {
    if !args.tail {
        let text = step(app, "Fetching logs...", api.logs(&args.app, args.num)).await?;
        return app.renderer().text("logs", &text);
    }

    let format = app.chunk_format();
    let (closed_tx, closed_rx) = oneshot::channel();
    let handle = api.stream_logs(
        &args.app,
        Box::new(move |chunk| format.print(&chunk)),
        Box::new(move |code| {
            let _ = closed_tx.send(code);
        }),
    )?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            handle.cancel();
            Ok(())
        }
        code = closed_rx => match code {
            Ok(0) | Err(_) => Ok(()),
            Ok(code) => bail!("log stream ended with exit code {code}"),
        },
    }
}
