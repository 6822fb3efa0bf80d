use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::config::{Configuration, MAX_WAIT_SLICE, OverlayOptions};
use crate::events::{DecodedFrame, ViewerCommand};
use crate::overlay::Caption;
use crate::session::{Progress, Session};

/// Display side of the slideshow: receives the frame to show together with
/// the visited/total counter.
pub trait Renderer {
    fn render(&mut self, frame: &DecodedFrame, progress: Progress) -> Result<()>;
}

/// Headless renderer that logs what would be on screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRenderer {
    overlay: OverlayOptions,
}

impl LogRenderer {
    pub fn new(overlay: OverlayOptions) -> Self {
        Self { overlay }
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, frame: &DecodedFrame, progress: Progress) -> Result<()> {
        let caption = Caption::compose(&frame.id, progress, &self.overlay);
        info!(
            path = %frame.id,
            width = frame.width,
            height = frame.height,
            caption = %caption,
            "displaying frame"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ViewerOptions {
    /// How long a frame stays before the timer advances.
    pub dwell: Duration,
    /// When false, only `Quit` is honoured.
    pub enable_input: bool,
    /// Upper bound on how long the loop sleeps before re-checking shutdown.
    pub poll: Duration,
}

impl From<&Configuration> for ViewerOptions {
    fn from(cfg: &Configuration) -> Self {
        Self {
            dwell: cfg.dwell,
            enable_input: cfg.enable_input,
            poll: cfg.preload.wait_slice,
        }
    }
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            dwell: Duration::from_secs(30),
            enable_input: true,
            poll: MAX_WAIT_SLICE,
        }
    }
}

enum Step {
    Forward,
    Back,
}

/// Foreground loop. Shows the first frame once enough are buffered, then
/// advances on the dwell timer or on request until shutdown or `Quit`.
///
/// "No frame available" is never fatal: the loop simply tries again on the
/// next tick. The timer restarts only after a frame was actually shown.
pub fn run<R: Renderer>(
    session: &Session,
    mut commands: Receiver<ViewerCommand>,
    renderer: &mut R,
    options: &ViewerOptions,
) -> Result<()> {
    let shutdown = session.shutdown_token();
    let mut cursor = session.cursor();

    let Some(first) = cursor.next() else {
        info!("shutdown before the first frame was ready");
        return Ok(());
    };
    renderer
        .render(&first, session.progress())
        .context("failed to render first frame")?;

    let mut last_switch = Instant::now();
    let mut paused = false;

    while !shutdown.is_cancelled() {
        let timeout = if paused {
            options.poll
        } else {
            options
                .dwell
                .saturating_sub(last_switch.elapsed())
                .min(options.poll)
        };

        let request = match commands.recv_timeout(timeout) {
            Ok(cmd) => Some(cmd),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("input surface closed; continuing on timer");
                commands = crossbeam_channel::never();
                None
            }
        };

        let step = match request {
            Some(ViewerCommand::Quit) => {
                info!("quit requested");
                shutdown.cancel();
                break;
            }
            Some(cmd) if !options.enable_input => {
                debug!(?cmd, "input disabled; ignoring request");
                continue;
            }
            Some(ViewerCommand::TogglePause) => {
                paused = !paused;
                last_switch = Instant::now();
                info!(paused, "slideshow pause toggled");
                continue;
            }
            Some(ViewerCommand::Next) => Step::Forward,
            Some(ViewerCommand::Previous) => Step::Back,
            None if !paused && last_switch.elapsed() >= options.dwell => Step::Forward,
            None => continue,
        };

        let frame = match step {
            Step::Forward => cursor.next(),
            Step::Back => cursor.previous(),
        };
        match frame {
            Some(frame) => {
                renderer
                    .render(&frame, session.progress())
                    .with_context(|| format!("failed to render {}", frame.id))?;
                last_switch = Instant::now();
            }
            None => debug!("no frame available yet; retrying on next tick"),
        }
    }

    Ok(())
}

/// Read console lines and forward them as commands. End of input quits.
///
/// The thread is left detached: it may stay blocked on stdin until the
/// process exits.
pub fn spawn_console_input(to_viewer: Sender<ViewerCommand>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("stdin read failed: {err}");
                        break;
                    }
                };
                match ViewerCommand::parse(&line) {
                    Some(cmd) => {
                        if to_viewer.send(cmd).is_err() {
                            return;
                        }
                    }
                    None => warn!(input = line.trim(), "unknown command (n, p, pause, q)"),
                }
            }
            info!("stdin closed; initiating shutdown");
            let _ = to_viewer.send(ViewerCommand::Quit);
        })
}
