//! Buffer table.
//!
//! Buffers hold at most one chunk each. The table also remembers what each
//! buffer held before its last change, which reward learning reads after the
//! goal has already been replaced.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::chunk::Chunk;

/// Names of the buffers the core reads.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BufferName {
    /// Current goal.
    Goal,
    /// Result of the last declarative retrieval.
    Retrieval,
    /// Working memory.
    Imaginal,
    /// Perceptual input.
    Input,
    /// Operator currently being carried out.
    Operator,
}

impl BufferName {
    /// Buffers that spread activation, in the order they are summed.
    pub const SPREADING_SOURCES: [BufferName; 4] = [
        BufferName::Goal,
        BufferName::Input,
        BufferName::Retrieval,
        BufferName::Imaginal,
    ];

    /// Buffers merged into a state snapshot, in the order they are merged.
    pub const SNAPSHOT_SOURCES: [BufferName; 4] = [
        BufferName::Goal,
        BufferName::Retrieval,
        BufferName::Imaginal,
        BufferName::Input,
    ];

    /// Every buffer name as written in files and on the command line.
    pub fn names() -> Vec<&'static str> {
        Self::iter().map(<&'static str>::from).collect()
    }

    /// Slot prefix used for this buffer in a state snapshot.
    pub fn snapshot_tag(&self) -> Option<&'static str> {
        match self {
            BufferName::Goal => Some("G"),
            BufferName::Retrieval => Some("RT"),
            BufferName::Imaginal => Some("WM"),
            BufferName::Input => Some("V"),
            BufferName::Operator => None,
        }
    }
}

/// Current and previous contents of every buffer.
#[derive(Debug, Clone, Default)]
pub struct Buffers {
    current: HashMap<BufferName, Chunk>,
    former: HashMap<BufferName, Chunk>,
}

impl Buffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a chunk in a buffer. What the buffer held before becomes its former content.
    pub fn set(&mut self, buffer: BufferName, chunk: Chunk) {
        if let Some(previous) = self.current.insert(buffer, chunk) {
            self.former.insert(buffer, previous);
        }
    }

    /// Builder-style [`Buffers::set`].
    pub fn with(mut self, buffer: BufferName, chunk: Chunk) -> Self {
        self.set(buffer, chunk);
        self
    }

    /// Empty a buffer, keeping the removed chunk as its former content.
    pub fn clear(&mut self, buffer: BufferName) {
        if let Some(previous) = self.current.remove(&buffer) {
            self.former.insert(buffer, previous);
        }
    }

    /// Remove and return a buffer's chunk without recording it as former content.
    pub fn take(&mut self, buffer: BufferName) -> Option<Chunk> {
        self.current.remove(&buffer)
    }

    pub fn get(&self, buffer: BufferName) -> Option<&Chunk> {
        self.current.get(&buffer)
    }

    pub fn get_mut(&mut self, buffer: BufferName) -> Option<&mut Chunk> {
        self.current.get_mut(&buffer)
    }

    /// What the buffer held before its last change.
    pub fn former(&self, buffer: BufferName) -> Option<&Chunk> {
        self.former.get(&buffer)
    }

    /// Overwrite a buffer's former content directly.
    pub fn set_former(&mut self, buffer: BufferName, chunk: Chunk) {
        self.former.insert(buffer, chunk);
    }
}
