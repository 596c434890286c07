//! Progressive reveal of a prepared response.
//!
//! [`Reveal`] is the pure cursor: each step advances `chunk_chars`
//! characters, jumping past a whole code block in one step when the
//! advance would land inside it. [`spawn_stream`] drives a `Reveal` on a
//! timer and pushes frames into a channel; dropping the receiver stops it.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use super::markdown::{PreparedText, prepare};
use crate::config::StreamConfig;

const FRAME_CHANNEL_CAPACITY: usize = 16;
const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// One rendered step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub html: String,
    /// Bytes of source text revealed so far.
    pub revealed: usize,
    pub done: bool,
}

#[derive(Debug, Clone)]
pub struct Reveal {
    prepared: PreparedText,
    chunk_chars: usize,
    cursor: usize,
    finished: bool,
}

impl Reveal {
    #[must_use]
    pub fn new(source: &str, chunk_chars: usize) -> Self {
        Self { prepared: prepare(source), chunk_chars: chunk_chars.max(1), cursor: 0, finished: false }
    }

    #[must_use]
    pub fn prepared(&self) -> &PreparedText {
        &self.prepared
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn next_cursor(&self) -> usize {
        let rest = &self.prepared.text()[self.cursor..];
        let step = rest
            .char_indices()
            .nth(self.chunk_chars)
            .map_or(rest.len(), |(offset, _)| offset);
        let next = self.cursor + step;
        self.prepared.span_end_containing(next).unwrap_or(next)
    }

    /// Advance one step. Empty text yields a single empty, final frame.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.finished {
            return None;
        }
        self.cursor = self.next_cursor();
        self.finished = self.cursor >= self.prepared.len();
        Some(Frame { html: self.prepared.render_prefix(self.cursor), revealed: self.cursor, done: self.finished })
    }
}

impl Iterator for Reveal {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.next_frame()
    }
}

/// Stream `source` as frames, one every `frame_interval`.
///
/// The first frame is sent immediately. The task ends after the final frame
/// or as soon as the receiver is gone.
#[must_use]
pub fn spawn_stream(source: &str, config: StreamConfig) -> mpsc::Receiver<Frame> {
    let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    let mut reveal = Reveal::new(source, config.chunk_chars);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.frame_interval.max(MIN_FRAME_INTERVAL));
        while let Some(frame) = reveal.next_frame() {
            ticker.tick().await;
            if tx.send(frame).await.is_err() {
                debug!(revealed = reveal.cursor, "render: receiver dropped, stopping");
                return;
            }
        }
    });
    rx
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;
