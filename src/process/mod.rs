//! Process management for UCI engines.
//!
//! This module spawns an engine as a subprocess and exchanges text lines
//! with it over its standard streams.
//!
//! # Architecture
//!
//! ```text
//! libuci                              engine
//! ┌──────────────┐                   ┌─────────────┐
//! │ LineClient   │───stdin (cmds)───▶│             │
//! │              │◀──stdout (lines)──│             │
//! └──────────────┘                   └─────────────┘
//! ```
//!
//! # Output
//!
//! Engine output is read in chunks by a background task, framed into lines
//! by [`LineFramer`], and queued until a caller asks for the next one.
//! Reads are built on [`CancellableReader`], which waits through "no data
//! yet" results until bytes arrive or the reader is shut down.

mod io;
mod lines;
mod spawn;

pub use io::{CancellableReader, LineFramer, ReadOutcome};
pub use lines::LineClient;
pub use spawn::EngineProcess;

/// Default number of bytes requested from the engine per read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;
