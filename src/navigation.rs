//! Consumer-side cursor over the frame window.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::buffer::FrameBuffer;
use crate::config::PreloadOptions;
use crate::events::DecodedFrame;

/// Index of the displayed frame inside a [`FrameBuffer`].
///
/// The cursor is the only party that trims the window, and it shifts its own
/// index by exactly the number of frames trimmed, so the displayed frame
/// stays current across a trim. Nothing is displayed until the initial
/// ready threshold has been buffered.
#[derive(Debug)]
pub struct NavigationCursor {
    buffer: Arc<FrameBuffer>,
    position: Option<usize>,
    initial_ready: usize,
    trim_chunk: usize,
    next_frame_wait: Duration,
    shutdown: CancellationToken,
}

impl NavigationCursor {
    pub fn new(
        buffer: Arc<FrameBuffer>,
        options: &PreloadOptions,
        shutdown: CancellationToken,
    ) -> Self {
        // At least one frame must go and at least one must stay.
        let trim_chunk = options
            .trim_chunk
            .clamp(1, buffer.capacity().saturating_sub(1).max(1));
        Self {
            buffer,
            position: None,
            initial_ready: options.initial_ready,
            trim_chunk,
            next_frame_wait: options.next_frame_wait,
            shutdown,
        }
    }

    /// Index of the displayed frame, if one has been shown.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// The displayed frame, if any.
    pub fn current(&self) -> Option<Arc<DecodedFrame>> {
        self.position.and_then(|pos| self.buffer.at(pos))
    }

    /// Step forward. At the newest frame this waits briefly for the
    /// preloader and stays put if nothing arrives. Returns `None` only when
    /// nothing can be shown (shutdown, or the first frames never arrived).
    pub fn next(&mut self) -> Option<Arc<DecodedFrame>> {
        if self.shutdown.is_cancelled() {
            return None;
        }
        let Some(mut pos) = self.position else {
            return self.first_display();
        };

        let len = self.buffer.len();
        if pos + 1 < len || self.buffer.wait_for_more(len, self.next_frame_wait) {
            pos += 1;
        } else {
            debug!(position = pos, "no newer frame buffered; staying");
        }

        let capacity = self.buffer.capacity();
        if pos + 1 >= capacity && self.buffer.len() >= capacity {
            let removed = self.buffer.trim_front(self.trim_chunk);
            pos = pos.saturating_sub(removed);
        }

        self.position = Some(pos);
        debug!(position = pos, "navigated forward");
        self.current()
    }

    /// Step back. Index 0 is a hard stop; frames trimmed earlier are gone.
    pub fn previous(&mut self) -> Option<Arc<DecodedFrame>> {
        if self.shutdown.is_cancelled() {
            return None;
        }
        let Some(pos) = self.position else {
            return self.first_display();
        };
        let pos = pos.saturating_sub(1);
        self.position = Some(pos);
        debug!(position = pos, "navigated back");
        self.current()
    }

    fn first_display(&mut self) -> Option<Arc<DecodedFrame>> {
        if !self.buffer.wait_for_ready(self.initial_ready) {
            return None;
        }
        self.position = Some(0);
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ImageId;
    use std::thread;

    fn frame(i: usize) -> DecodedFrame {
        DecodedFrame {
            id: ImageId::from(format!("/f{i}.jpg").as_str()),
            width: 1,
            height: 1,
            pixels: vec![0; 4],
        }
    }

    fn filled(count: usize) -> (CancellationToken, Arc<FrameBuffer>, NavigationCursor) {
        let cancel = CancellationToken::new();
        let options = PreloadOptions {
            next_frame_wait: Duration::from_millis(20),
            wait_slice: Duration::from_millis(20),
            ..PreloadOptions::default()
        };
        let buffer = Arc::new(FrameBuffer::new(
            options.buffer_capacity,
            options.wait_slice,
            cancel.clone(),
        ));
        for i in 0..count {
            assert!(buffer.push(frame(i)));
        }
        let cursor = NavigationCursor::new(Arc::clone(&buffer), &options, cancel.clone());
        (cancel, buffer, cursor)
    }

    fn id(frame: Option<Arc<DecodedFrame>>) -> ImageId {
        frame.expect("expected a frame").id.clone()
    }

    #[test]
    fn first_display_starts_at_zero() {
        let (_cancel, _buffer, mut cursor) = filled(5);
        assert_eq!(cursor.position(), None);
        assert_eq!(id(cursor.next()), ImageId::from("/f0.jpg"));
        assert_eq!(cursor.position(), Some(0));
    }

    #[test]
    fn previous_at_zero_is_a_no_op() {
        let (_cancel, _buffer, mut cursor) = filled(5);
        cursor.next();
        assert_eq!(id(cursor.previous()), ImageId::from("/f0.jpg"));
        assert_eq!(cursor.position(), Some(0));
    }

    #[test]
    fn next_at_newest_frame_stays() {
        let (_cancel, _buffer, mut cursor) = filled(5);
        cursor.next();
        for _ in 0..4 {
            cursor.next();
        }
        assert_eq!(cursor.position(), Some(4));
        assert_eq!(id(cursor.next()), ImageId::from("/f4.jpg"));
        assert_eq!(cursor.position(), Some(4));
    }

    #[test]
    fn next_picks_up_a_frame_arriving_during_the_wait() {
        let (_cancel, buffer, mut cursor) = filled(5);
        cursor.next();
        for _ in 0..4 {
            cursor.next();
        }
        let producer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || buffer.push(frame(5)))
        };
        producer.join().unwrap();
        assert_eq!(id(cursor.next()), ImageId::from("/f5.jpg"));
    }

    #[test]
    fn trim_keeps_the_displayed_frame_current() {
        let (_cancel, buffer, mut cursor) = filled(10);
        cursor.next();
        for _ in 0..8 {
            cursor.next();
        }
        assert_eq!(cursor.position(), Some(8));
        assert_eq!(buffer.len(), 10);

        let shown = id(cursor.next());
        assert_eq!(shown, ImageId::from("/f9.jpg"));
        assert_eq!(buffer.len(), 5);
        assert_eq!(cursor.position(), Some(4));
        assert_eq!(id(cursor.current()), shown);
    }

    #[test]
    fn back_navigation_stops_at_trim_point() {
        let (_cancel, _buffer, mut cursor) = filled(10);
        for _ in 0..10 {
            cursor.next();
        }
        for _ in 0..10 {
            cursor.previous();
        }
        assert_eq!(cursor.position(), Some(0));
        assert_eq!(id(cursor.current()), ImageId::from("/f5.jpg"));
    }

    #[test]
    fn position_stays_in_range_while_browsing() {
        let (_cancel, buffer, mut cursor) = filled(10);
        let mut next_id = 10;
        for step in 0..60 {
            if step % 3 == 0 && !buffer.is_full() {
                buffer.push(frame(next_id));
                next_id += 1;
            }
            if step % 4 == 0 {
                cursor.previous();
            } else {
                cursor.next();
            }
            let pos = cursor.position().unwrap();
            assert!(pos < buffer.len(), "position {pos} outside window");
            assert!(buffer.len() <= buffer.capacity());
        }
    }

    #[test]
    fn oversized_trim_chunk_keeps_one_frame() {
        let cancel = CancellationToken::new();
        let options = PreloadOptions {
            trim_chunk: 12,
            next_frame_wait: Duration::from_millis(20),
            ..PreloadOptions::default()
        };
        let buffer = Arc::new(FrameBuffer::new(10, Duration::from_millis(20), cancel.clone()));
        for i in 0..10 {
            assert!(buffer.push(frame(i)));
        }
        let mut cursor = NavigationCursor::new(Arc::clone(&buffer), &options, cancel);
        for _ in 0..10 {
            cursor.next();
        }
        assert_eq!(buffer.len(), 1);
        assert_eq!(cursor.position(), Some(0));
        assert_eq!(id(cursor.current()), ImageId::from("/f9.jpg"));
    }

    #[test]
    fn zero_trim_chunk_still_frees_room() {
        let cancel = CancellationToken::new();
        let options = PreloadOptions {
            trim_chunk: 0,
            next_frame_wait: Duration::from_millis(20),
            ..PreloadOptions::default()
        };
        let buffer = Arc::new(FrameBuffer::new(10, Duration::from_millis(20), cancel.clone()));
        for i in 0..10 {
            assert!(buffer.push(frame(i)));
        }
        let mut cursor = NavigationCursor::new(Arc::clone(&buffer), &options, cancel);
        for _ in 0..10 {
            cursor.next();
        }
        assert!(!buffer.is_full());
        assert_eq!(id(cursor.current()), ImageId::from("/f9.jpg"));
    }

    #[test]
    fn shutdown_unblocks_first_display() {
        let (cancel, _buffer, mut cursor) = filled(2);
        let waiter = thread::spawn(move || cursor.next().is_none());
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
        assert!(waiter.join().unwrap());
    }
}
