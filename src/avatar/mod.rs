//! Avatar presenter
//!
//! A two-state (idle / speaking) indicator rendered on its own thread. The
//! conversation loop never touches the surface directly: state changes are
//! queued to the render thread, which owns the surface for its lifetime.
//!
//! ```text
//!  conversation loop            render thread
//!  ─────────────────            ─────────────
//!  set_speaking(text) ──Show──▶ paint(view)
//!  set_idle()         ──Show──▶ paint(view)
//!  close()            ──Close─▶ teardown(), exit
//! ```

mod surface;

pub use surface::{AvatarSurface, LogSurface, TerminalTitleSurface};

use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::AvatarConfig;
use crate::{Error, Result};

/// Text shown while idle
pub const IDLE_TEXT: &str = "Listening...";

/// Marker appended to truncated previews
pub const ELLIPSIS: &str = "...";

/// How long `spawn` waits for the first paint
const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// What the avatar is doing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AvatarState {
    #[default]
    Idle,
    Speaking {
        /// Truncated reply text
        preview: String,
    },
}

impl AvatarState {
    /// Speaking state showing at most `cap` characters of `text`
    #[must_use]
    pub fn speaking(text: &str, cap: usize) -> Self {
        Self::Speaking {
            preview: truncate_preview(text, cap),
        }
    }

    #[must_use]
    pub const fn is_speaking(&self) -> bool {
        matches!(self, Self::Speaking { .. })
    }

    /// Status badge for the state
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Idle => "● Online",
            Self::Speaking { .. } => "● Speaking",
        }
    }

    /// Main text for the state
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Idle => IDLE_TEXT,
            Self::Speaking { preview } => preview,
        }
    }
}

/// Keep the first `cap` characters of `text`, appending [`ELLIPSIS`] when cut
#[must_use]
pub fn truncate_preview(text: &str, cap: usize) -> String {
    match text.char_indices().nth(cap) {
        Some((end, _)) => format!("{}{ELLIPSIS}", &text[..end]),
        None => text.to_string(),
    }
}

/// Everything a surface needs to draw one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarView {
    /// Character name / window title
    pub title: String,
    pub state: AvatarState,
}

impl AvatarView {
    #[must_use]
    pub fn idle(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            state: AvatarState::Idle,
        }
    }

    /// Multi-line label text
    #[must_use]
    pub fn label(&self) -> String {
        match &self.state {
            AvatarState::Idle => format!("{}\n\n{IDLE_TEXT}", self.title),
            AvatarState::Speaking { preview } => {
                format!("{}\n\nSpeaking...\n\n{preview}", self.title)
            }
        }
    }
}

enum AvatarCommand {
    Show(AvatarState),
    Close,
}

/// Handle to the avatar render thread
///
/// Dropping or closing the presenter ends the render thread; a closed
/// presenter cannot be reopened, a new one must be spawned.
#[derive(Debug)]
pub struct AvatarPresenter {
    tx: mpsc::Sender<AvatarCommand>,
    handle: Option<JoinHandle<()>>,
    preview_chars: usize,
}

impl AvatarPresenter {
    /// Start the render thread and wait until the first frame is painted
    ///
    /// `make_surface` runs on the render thread, so the surface never has to
    /// be `Send`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Presentation` if the thread cannot start, the surface
    /// fails to initialize, or the first paint does not arrive in time
    pub fn spawn<F, S>(config: &AvatarConfig, make_surface: F) -> Result<Self>
    where
        F: FnOnce() -> Result<S> + Send + 'static,
        S: AvatarSurface + 'static,
    {
        let (tx, rx) = mpsc::channel::<AvatarCommand>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<std::result::Result<(), String>>(1);
        let title = config.title.clone();

        let handle = std::thread::Builder::new()
            .name("avatar".to_string())
            .spawn(move || {
                let mut surface = match make_surface() {
                    Ok(surface) => surface,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                let mut view = AvatarView::idle(title);
                if let Err(e) = surface.paint(&view) {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                render_loop(&mut surface, &mut view, &rx);
                surface.teardown();
                tracing::debug!("avatar closed");
            })
            .map_err(|e| Error::Presentation(format!("failed to start avatar thread: {e}")))?;

        match ready_rx.recv_timeout(READY_TIMEOUT) {
            Ok(Ok(())) => {
                tracing::info!("avatar window ready");
                Ok(Self {
                    tx,
                    handle: Some(handle),
                    preview_chars: config.preview_chars,
                })
            }
            Ok(Err(message)) => {
                let _ = handle.join();
                Err(Error::Presentation(message))
            }
            Err(_) => Err(Error::Presentation(
                "avatar did not become ready in time".to_string(),
            )),
        }
    }

    /// Show the speaking state with a preview of `text`
    pub fn set_speaking(&self, text: &str) {
        self.send(AvatarCommand::Show(AvatarState::speaking(text, self.preview_chars)));
    }

    /// Return to the idle "listening" state
    pub fn set_idle(&self) {
        self.send(AvatarCommand::Show(AvatarState::Idle));
    }

    /// Close the window and wait for the render thread to exit
    pub fn close(mut self) {
        self.shutdown();
    }

    fn send(&self, command: AvatarCommand) {
        // Render thread gone (window closed); nothing left to update
        if self.tx.send(command).is_err() {
            tracing::debug!("avatar is closed, dropping update");
        }
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.send(AvatarCommand::Close);
            if handle.join().is_err() {
                tracing::warn!("avatar thread panicked");
            }
        }
    }
}

impl Drop for AvatarPresenter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn render_loop<S: AvatarSurface>(
    surface: &mut S,
    view: &mut AvatarView,
    rx: &mpsc::Receiver<AvatarCommand>,
) {
    for command in rx {
        match command {
            AvatarCommand::Show(state) => {
                view.state = state;
                if let Err(e) = surface.paint(view) {
                    tracing::warn!(error = %e, "avatar paint failed");
                }
            }
            AvatarCommand::Close => break,
        }
    }
}
