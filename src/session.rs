//! Session context: owns everything the preloader and the foreground loop
//! share, and drives the preloader thread through an explicit lifecycle.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::buffer::FrameBuffer;
use crate::catalog::Catalog;
use crate::config::PreloadOptions;
use crate::error::Error;
use crate::navigation::NavigationCursor;
use crate::sampling::SamplingPolicy;
use crate::tasks::loader::FrameDecoder;
use crate::tasks::preloader::PreloadWorker;
use crate::visited::VisitedStore;

/// `Idle -> Running -> Stopping -> Stopped`. `stop` from `Idle` goes straight
/// to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Counter shown on screen: images visited since the last reset, out of the
/// catalog size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub visited: usize,
    pub total: usize,
}

pub struct Session {
    catalog: Catalog,
    visited: Arc<VisitedStore>,
    buffer: Arc<FrameBuffer>,
    options: PreloadOptions,
    shutdown: CancellationToken,
    state: SessionState,
    worker: Option<JoinHandle<()>>,
}

impl Session {
    /// Build the session context; the preloader is not started yet.
    ///
    /// # Errors
    /// [`Error::InvalidOptions`] when `options` would not keep the window
    /// bounded (see [`crate::config::Configuration::validated`]).
    pub fn new(
        catalog: Catalog,
        visited: VisitedStore,
        options: PreloadOptions,
    ) -> Result<Self, Error> {
        options
            .validate()
            .map_err(|err| Error::InvalidOptions(format!("{err:#}")))?;
        if options.prune_stale_visited {
            visited.retain_catalog(&catalog);
        }
        let shutdown = CancellationToken::new();
        let buffer = Arc::new(FrameBuffer::new(
            options.buffer_capacity,
            options.wait_slice,
            shutdown.clone(),
        ));
        Ok(Self {
            catalog,
            visited: Arc::new(visited),
            buffer,
            options,
            shutdown,
            state: SessionState::Idle,
            worker: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn visited(&self) -> &Arc<VisitedStore> {
        &self.visited
    }

    pub fn buffer(&self) -> &Arc<FrameBuffer> {
        &self.buffer
    }

    /// Token that stops the session when cancelled; hand it to signal
    /// handlers and input surfaces.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            visited: self.visited.len(),
            total: self.catalog.len(),
        }
    }

    /// A fresh cursor over this session's frame window. Only one consumer
    /// may navigate at a time.
    pub fn cursor(&self) -> NavigationCursor {
        NavigationCursor::new(
            Arc::clone(&self.buffer),
            &self.options,
            self.shutdown.clone(),
        )
    }

    /// Spawn the preloader thread.
    ///
    /// # Errors
    /// [`Error::Lifecycle`] unless the session is `Idle`; [`Error::Io`] if
    /// the thread cannot be spawned.
    pub fn start<D: FrameDecoder>(&mut self, decoder: D) -> Result<(), Error> {
        if self.state != SessionState::Idle {
            return Err(Error::Lifecycle {
                from: self.state,
                action: "start",
            });
        }
        let worker = PreloadWorker {
            catalog: self.catalog.clone(),
            visited: Arc::clone(&self.visited),
            buffer: Arc::clone(&self.buffer),
            decoder,
            sampling: SamplingPolicy::new(self.options.seed),
            exhaustion_backoff: self.options.exhaustion_backoff,
            wait_slice: self.options.wait_slice,
            shutdown: self.shutdown.clone(),
        };
        let handle = thread::Builder::new()
            .name("preloader".into())
            .spawn(move || worker.run())?;
        self.worker = Some(handle);
        self.state = SessionState::Running;
        info!(
            catalog = self.catalog.len(),
            visited = self.visited.len(),
            capacity = self.options.buffer_capacity,
            "session started"
        );
        Ok(())
    }

    /// Signal shutdown and join the preloader. Idempotent.
    pub fn stop(&mut self) {
        match self.state {
            SessionState::Stopped => return,
            SessionState::Idle => {
                self.shutdown.cancel();
                self.state = SessionState::Stopped;
                return;
            }
            SessionState::Running | SessionState::Stopping => {}
        }

        self.state = SessionState::Stopping;
        self.shutdown.cancel();
        self.buffer.wake_all();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("preloader thread panicked");
            }
        }
        self.state = SessionState::Stopped;
        info!(visited = self.visited.len(), "session stopped");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}
