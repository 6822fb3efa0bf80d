use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::buffer::FrameBuffer;
use crate::catalog::Catalog;
use crate::sampling::SamplingPolicy;
use crate::tasks::loader::FrameDecoder;
use crate::visited::VisitedStore;

/// Background producer: samples an unvisited image, decodes it, appends it to
/// the frame window and only then records it as visited.
///
/// Decoding and persistence run without the frame-buffer lock held. A decode
/// failure leaves the image unvisited; it is skipped for the rest of the
/// cycle and sampled again after the next reset.
pub struct PreloadWorker<D> {
    pub(crate) catalog: Catalog,
    pub(crate) visited: Arc<VisitedStore>,
    pub(crate) buffer: Arc<FrameBuffer>,
    pub(crate) decoder: D,
    pub(crate) sampling: SamplingPolicy,
    pub(crate) exhaustion_backoff: Duration,
    pub(crate) wait_slice: Duration,
    pub(crate) shutdown: CancellationToken,
}

impl<D: FrameDecoder> PreloadWorker<D> {
    pub fn run(mut self) {
        info!(catalog = self.catalog.len(), "preloader started");
        let mut preloaded: u64 = 0;

        while !self.shutdown.is_cancelled() {
            let skipped = self.sampling.skipped();
            if self.sampling.reset_if_exhausted(&self.catalog, &self.visited) {
                if skipped > 0 {
                    // A cycle made of failures would otherwise spin on disk writes.
                    self.backoff();
                }
                continue;
            }

            if !self.buffer.wait_for_room() {
                continue;
            }

            let Some(id) = self.sampling.pick_unvisited(&self.catalog, &self.visited) else {
                debug!("no unvisited image available; backing off");
                self.backoff();
                continue;
            };

            let frame = match self.decoder.decode(&id) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(path = %id, "skipping image that failed to decode: {err:#}");
                    self.sampling.skip_for_cycle(id);
                    continue;
                }
            };

            if !self.buffer.push(frame) {
                debug!(path = %id, "shutdown during enqueue; dropping decoded frame");
                break;
            }
            self.visited.mark_visited(&id);
            preloaded += 1;
            debug!(
                path = %id,
                visited = self.visited.len(),
                catalog = self.catalog.len(),
                "preloaded frame"
            );
        }

        info!(preloaded, "preloader stopped");
    }

    // Sleep in wait-slice sized steps so cancellation stays prompt.
    fn backoff(&self) {
        let mut remaining = self.exhaustion_backoff;
        while !remaining.is_zero() && !self.shutdown.is_cancelled() {
            let nap = remaining.min(self.wait_slice);
            thread::sleep(nap);
            remaining -= nap;
        }
    }
}
