//! Model trace output.
//!
//! The model trace is a write-only stream of human-readable lines, each with a
//! verbosity level (1 = most important). The core never reads it back.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Trace verbosity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Highest level that is kept.
    pub level: u8,
    /// Suppress all trace output.
    pub silent: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            level: 3,
            silent: false,
        }
    }
}

impl TraceConfig {
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Default::default()
        }
    }

    /// Whether a line at `level` should be emitted.
    pub fn allows(&self, level: u8) -> bool {
        !self.silent && level <= self.level
    }
}

/// Destination for model trace lines.
pub trait TraceSink {
    fn add_to_trace(&mut self, line: &str, level: u8);
}

/// Forwards trace lines to `tracing` events under the `prims::trace` target.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    config: TraceConfig,
}

impl TracingSink {
    pub fn new(config: TraceConfig) -> Self {
        Self { config }
    }
}

impl TraceSink for TracingSink {
    fn add_to_trace(&mut self, line: &str, level: u8) {
        if !self.config.allows(level) {
            return;
        }
        match level {
            0 | 1 => tracing::info!(target: "prims::trace", trace_level = level, "{}", line),
            2 | 3 => tracing::debug!(target: "prims::trace", trace_level = level, "{}", line),
            _ => tracing::trace!(target: "prims::trace", trace_level = level, "{}", line),
        }
    }
}

/// Keeps trace lines in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTrace {
    config: TraceConfig,
    lines: Vec<(u8, String)>,
}

impl MemoryTrace {
    pub fn new(config: TraceConfig) -> Self {
        Self {
            config,
            lines: Vec::new(),
        }
    }

    /// Keep every line regardless of level.
    pub fn verbose() -> Self {
        Self::new(TraceConfig {
            level: u8::MAX,
            silent: false,
        })
    }

    pub fn lines(&self) -> &[(u8, String)] {
        &self.lines
    }

    /// Whether any kept line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|(_, line)| line.contains(needle))
    }
}

impl TraceSink for MemoryTrace {
    fn add_to_trace(&mut self, line: &str, level: u8) {
        if self.config.allows(level) {
            self.lines.push((level, line.to_string()));
        }
    }
}

/// Lets a caller keep a handle on a sink it hands to a selector.
impl<T: TraceSink + ?Sized> TraceSink for Rc<RefCell<T>> {
    fn add_to_trace(&mut self, line: &str, level: u8) {
        self.borrow_mut().add_to_trace(line, level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_trace_filters_by_level() {
        let mut trace = MemoryTrace::new(TraceConfig {
            level: 2,
            silent: false,
        });
        trace.add_to_trace("kept", 1);
        trace.add_to_trace("also kept", 2);
        trace.add_to_trace("dropped", 5);
        assert_eq!(trace.lines().len(), 2);
        assert!(trace.contains("also kept"));
        assert!(!trace.contains("dropped"));
    }

    #[test]
    fn test_silent_drops_everything() {
        let mut trace = MemoryTrace::new(TraceConfig::silent());
        trace.add_to_trace("anything", 1);
        assert!(trace.lines().is_empty());
    }

    #[test]
    fn test_shared_sink() {
        let shared = Rc::new(RefCell::new(MemoryTrace::verbose()));
        let mut handle: Box<dyn TraceSink> = Box::new(Rc::clone(&shared));
        handle.add_to_trace("through the box", 4);
        assert!(shared.borrow().contains("through the box"));
    }

    #[test]
    fn test_tracing_sink_accepts_all_levels() {
        let mut sink = TracingSink::default();
        for level in 0..=6 {
            sink.add_to_trace("line", level);
        }
    }
}
