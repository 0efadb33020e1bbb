//! Core types for PRIMs memory.

mod assoc;
mod buffer;
mod value;

pub use assoc::Association;
pub use buffer::{BufferName, Buffers};
pub use value::{Value, NIL};
