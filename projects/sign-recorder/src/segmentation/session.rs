use crate::segmentation::types::{ClipTicket, FinishedClip};
use std::time::Duration;

/// An in-progress recording. Frames are kept in acquisition order.
pub struct ClipSession<F> {
    ticket: ClipTicket,
    started_at: Duration,
    frames: Vec<F>,
}

impl<F> ClipSession<F> {
    pub fn new(ticket: ClipTicket, started_at: Duration) -> Self {
        Self {
            ticket,
            started_at,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: F) {
        self.frames.push(frame);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Close the session. The frame buffer is dropped here.
    pub fn finish(self, ended_at: Duration) -> FinishedClip {
        FinishedClip {
            frame_count: self.frames.len(),
            ticket: self.ticket,
            started_at: self.started_at,
            ended_at,
        }
    }
}
