//! Persistence of declarative memory.
//!
//! Chunks are stored as [`ChunkRecord`]s, one JSON object per line.
//!
//! # Example
//!
//! ```ignore
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let stats = memory.export_to(File::create("memory.jsonl")?)?;
//! println!("Exported {} chunks", stats.exported);
//!
//! let stats = restored.import_from(BufReader::new(File::open("memory.jsonl")?))?;
//! ```

pub mod jsonl;
pub mod record;

pub use jsonl::{export_jsonl, import_jsonl, ExportStats, ImportStats};
pub use record::{ChunkRecord, NO_CREATION_TIME, NO_FIXED_ACTIVATION};
