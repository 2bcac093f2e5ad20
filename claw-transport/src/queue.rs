//! Bounded FIFO of inbound control frames
//!
//! Filled by the transport's delivery path (a reader thread, or the mock
//! responder) and drained by the command channel. One mutex covers push, pop
//! and flush; it is never held across an `.await`, so a waiting reader never
//! starves delivery.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::error::TransportError;
use crate::protocol::InboundFrame;

/// Maximum number of unconsumed frames
pub const QUEUE_CAPACITY: usize = 32;

pub struct InboundQueue {
    frames: Mutex<VecDeque<InboundFrame>>,
    capacity: usize,
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundQueue {
    pub fn new() -> Self {
        Self::with_capacity(QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a frame, dropping it when the queue is full
    pub fn push(&self, frame: InboundFrame) -> Result<(), TransportError> {
        let mut frames = self.frames.lock();
        if frames.len() >= self.capacity {
            return Err(TransportError::QueueOverflow {
                capacity: self.capacity,
            });
        }
        frames.push_back(frame);
        Ok(())
    }

    /// Push from the delivery path: overflow is logged, never propagated
    pub fn deliver(&self, frame: InboundFrame) {
        if let Err(e) = self.push(frame) {
            warn!("Too many unparsed events, dropping frame: {}", e);
        }
    }

    /// Take the oldest frame if one is queued
    pub fn try_pop(&self) -> Option<InboundFrame> {
        self.frames.lock().pop_front()
    }

    /// Wait for the oldest frame, polling every `poll_interval` until `timeout`
    pub async fn pop_blocking(
        &self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<InboundFrame, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frame) = self.try_pop() {
                return Ok(frame);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(TransportError::Timeout);
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
        }
    }

    /// Discard every queued frame, returning how many were dropped
    pub fn flush(&self) -> usize {
        let mut frames = self.frames.lock();
        let dropped = frames.len();
        frames.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_response, cmd};

    fn numbered(n: u8) -> InboundFrame {
        InboundFrame::new(build_response(cmd::ACK, &[n]))
    }

    #[test]
    fn test_overflow_keeps_oldest_in_order() {
        let queue = InboundQueue::new();
        let mut overflows = 0;
        for n in 0..40u8 {
            match queue.push(numbered(n)) {
                Ok(()) => {}
                Err(TransportError::QueueOverflow { capacity }) => {
                    assert_eq!(capacity, QUEUE_CAPACITY);
                    assert!(n >= 32, "frame {n} should have fit");
                    overflows += 1;
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(overflows, 8);
        assert_eq!(queue.len(), 32);

        for n in 0..32u8 {
            let frame = queue.try_pop().unwrap();
            assert_eq!(frame.byte(5), Some(n));
        }
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_flush_discards_everything() {
        let queue = InboundQueue::new();
        for n in 0..5 {
            queue.push(numbered(n)).unwrap();
        }
        assert_eq!(queue.flush(), 5);
        assert!(queue.is_empty());
        assert_eq!(queue.flush(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_blocking_times_out() {
        let queue = InboundQueue::new();
        let start = Instant::now();
        let err = queue
            .pop_blocking(Duration::from_millis(100), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_blocking_sees_late_frame() {
        let queue = std::sync::Arc::new(InboundQueue::new());
        let producer = std::sync::Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(70)).await;
            producer.deliver(numbered(7));
        });

        let frame = queue
            .pop_blocking(Duration::from_millis(1000), Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(frame.byte(5), Some(7));
    }
}
