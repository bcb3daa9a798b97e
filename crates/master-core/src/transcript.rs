//! Bounded transcript of recent human-readable lines.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TRANSCRIPT_CAPACITY;

/// Fixed-capacity FIFO of transcript lines.
///
/// Appending past capacity evicts the oldest line. A capacity of zero is
/// raised to one so the latest line is always visible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTranscript")]
pub struct Transcript {
    capacity: usize,
    lines: VecDeque<String>,
}

/// Unchecked wire form; converted through the capacity clamp.
#[derive(Deserialize)]
struct RawTranscript {
    capacity: usize,
    #[serde(default)]
    lines: Vec<String>,
}

impl From<RawTranscript> for Transcript {
    fn from(raw: RawTranscript) -> Self {
        let mut transcript = Self::with_capacity(raw.capacity);
        for line in raw.lines {
            transcript.push(line);
        }
        transcript
    }
}

impl Transcript {
    /// Empty transcript keeping at most `capacity` lines.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            lines: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a line, evicting the oldest one when full.
    pub fn push(&mut self, line: impl Into<String>) {
        while self.lines.len() >= self.capacity {
            let _ = self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// Lines in append order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Most recent line.
    pub fn latest(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    /// Copy of the lines, oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    /// Number of lines held.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Maximum number of lines held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TRANSCRIPT_CAPACITY)
    }
}
