//! Rendering surfaces for the avatar

use std::io::Write;

use crossterm::{execute, terminal::SetTitle};

use super::AvatarView;
use crate::{Error, Result};

/// Something the render thread can draw the avatar on
///
/// Surfaces live on the render thread only and are never shared.
pub trait AvatarSurface {
    /// Draw `view`, replacing whatever was shown before
    ///
    /// # Errors
    ///
    /// Returns `Error::Presentation` if the frame cannot be drawn
    fn paint(&mut self, view: &AvatarView) -> Result<()>;

    /// Release the surface; called once when the presenter closes
    fn teardown(&mut self) {}
}

/// Shows the avatar in the terminal window title
///
/// `{name} ● Online | Listening...` while idle and
/// `{name} ● Speaking | {preview}` while speaking. The original title is not
/// recoverable, so teardown resets it to the bare character name.
pub struct TerminalTitleSurface<W: Write = std::io::Stdout> {
    out: W,
    name: String,
}

impl TerminalTitleSurface {
    #[must_use]
    pub fn stdout(name: impl Into<String>) -> Self {
        Self::new(std::io::stdout(), name)
    }
}

impl<W: Write> TerminalTitleSurface<W> {
    pub fn new(out: W, name: impl Into<String>) -> Self {
        Self {
            out,
            name: name.into(),
        }
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(self.out, SetTitle(title))
            .map_err(|e| Error::Presentation(format!("failed to set terminal title: {e}")))
    }
}

/// Single-line window title for `view`
#[must_use]
pub fn title_line(view: &AvatarView) -> String {
    let text: String = view
        .state
        .text()
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    format!("{} {} | {text}", view.title, view.state.status())
}

impl<W: Write> AvatarSurface for TerminalTitleSurface<W> {
    fn paint(&mut self, view: &AvatarView) -> Result<()> {
        self.set_title(&title_line(view))
    }

    fn teardown(&mut self) {
        let name = self.name.clone();
        if let Err(e) = self.set_title(&name) {
            tracing::debug!(error = %e, "failed to reset terminal title");
        }
    }
}

/// Writes state changes to the log; used when no terminal is attached
#[derive(Debug, Default)]
pub struct LogSurface;

impl AvatarSurface for LogSurface {
    fn paint(&mut self, view: &AvatarView) -> Result<()> {
        tracing::info!(
            avatar = %view.title,
            speaking = view.state.is_speaking(),
            text = view.state.text(),
            "avatar"
        );
        Ok(())
    }
}
