//! UCI wire grammar.
//!
//! This module defines the commands sent to an engine and the lines it
//! answers with. Every command is a single newline-terminated text line;
//! every response line is classified once into an [`EngineLine`] and then
//! handled by exhaustive matching.
//!
//! # Exchanges
//!
//! - `uci` → `id ...`, `option name ...` lines, then `uciok`
//! - `setoption name N value V` → silence on success, a diagnostic otherwise
//! - `position fen F` → nothing
//! - `isready` → `readyok`
//! - `go ...` → any number of `info ...` lines, then `bestmove M [ponder P]`
//!
//! # Example
//!
//! ```
//! use libuci::protocol::{EngineLine, SearchOptions};
//!
//! let options = SearchOptions::builder().white_ms(60_000).black_ms(60_000).build();
//! assert_eq!(options.encode(), "go wtime 60000 btime 60000");
//!
//! let line = EngineLine::classify("bestmove e2e4 ponder e7e5");
//! assert_eq!(line.best_move(), Some("e2e4"));
//! ```

mod command;
mod info;
mod response;
mod search;

pub use command::Command;
pub use info::{Score, SearchInfo};
pub use response::EngineLine;
pub use search::{SearchOptions, SearchOptionsBuilder};

/// Handshake command.
pub const UCI: &str = "uci";
/// Handshake completion token.
pub const UCI_OK: &str = "uciok";
/// Readiness probe.
pub const IS_READY: &str = "isready";
/// Readiness token.
pub const READY_OK: &str = "readyok";
/// Prefix of option declarations sent during the handshake.
pub const OPTION_NAME_PREFIX: &str = "option name ";
/// Keyword of the terminal search line.
pub const BEST_MOVE: &str = "bestmove";
