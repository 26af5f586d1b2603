//! Multi-frame message type
//!
//! A logical message is an ordered sequence of frames. The relay preserves
//! frame boundaries and ordering end-to-end; frames are reference-counted
//! byte buffers so teeing a message to the capture endpoint never copies
//! payload data.

use bytes::Bytes;

/// A logical message consisting of one or more ordered frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    frames: Vec<Bytes>,
}

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Create a message from a list of frames.
    pub fn from_frames(frames: Vec<Bytes>) -> Self {
        Self { frames }
    }

    /// Create a single-frame message from a string.
    pub fn from_text(s: &str) -> Self {
        Self {
            frames: vec![Bytes::copy_from_slice(s.as_bytes())],
        }
    }

    /// Append a frame.
    pub fn push(&mut self, frame: impl Into<Bytes>) {
        self.frames.push(frame.into());
    }

    /// Insert a frame at the front.
    pub fn push_front(&mut self, frame: impl Into<Bytes>) {
        self.frames.insert(0, frame.into());
    }

    /// Remove and return the first frame.
    pub fn pop_front(&mut self) -> Option<Bytes> {
        if self.frames.is_empty() {
            None
        } else {
            Some(self.frames.remove(0))
        }
    }

    /// The frames of this message, in order.
    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Whether the message has no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Consume the message, returning its frames.
    pub fn into_frames(self) -> Vec<Bytes> {
        self.frames
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::from_text(s)
    }
}

impl From<Vec<Bytes>> for Message {
    fn from(frames: Vec<Bytes>) -> Self {
        Message::from_frames(frames)
    }
}
