//! `dockyard version`

use anyhow::Result;

use crate::app::AppContext;

/// Print the build version.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(app: &AppContext) -> Result<()> {
    app.renderer().version(env!("CARGO_PKG_VERSION"))
}
