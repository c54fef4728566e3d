//! Terminal palette, applied only when stdout is a colour-capable TTY.

use dockyard_common::AppStatus;
use owo_colors::Style;

/// Styles shared by the human renderer. `Default` is the plain palette used
/// for pipes, `--no-color` and `NO_COLOR`.
#[derive(Default, Clone)]
pub struct Styles {
    /// Completed mutations and running apps.
    pub success: Style,
    /// Read-only notices and stopped apps.
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    /// Remote command output, placeholders and config keys.
    pub dim: Style,
    /// Table headers.
    pub bold: Style,
    /// App and service titles.
    pub header: Style,
}

impl Styles {
    /// Switch to the coloured palette.
    pub fn colorize(&mut self) {
        *self = Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
            info: Style::new().blue(),
            dim: Style::new().dimmed(),
            bold: Style::new().bold(),
            header: Style::new().bold().cyan(),
        };
    }

    /// Style for an app status cell.
    #[must_use]
    pub fn status(&self, status: AppStatus) -> Style {
        match status {
            AppStatus::Running => self.success,
            AppStatus::Stopped => self.warning,
            AppStatus::Deployed => self.info,
            AppStatus::NotDeployed => self.dim,
        }
    }
}
