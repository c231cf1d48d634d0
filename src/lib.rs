//! # libuci
//!
//! Async Rust driver for chess engines speaking UCI over a subprocess's
//! standard streams.
//!
//! This library provides a typed interface to a UCI engine, supporting:
//! - Line framing that tolerates arbitrary chunking of engine output
//! - Cancellable waits with deadlines or explicit triggers
//! - The handshake, option, position, readiness and search exchanges
//! - Search progress observation callbacks
//!
//! ## Quick Start
//!
//! ```ignore
//! use libuci::{Clock, Engine, EngineConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Engine path from STOCKFISH_PATH
//!     let engine = Engine::spawn(EngineConfig::builder().build()?)?;
//!     engine.initialize().await?;
//!
//!     let clock = Clock { white_ms: 60_000, black_ms: 60_000, ..Default::default() };
//!     let best = engine
//!         .generate_move("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", &clock)
//!         .await?;
//!     println!("{best}");
//!
//!     engine.terminate().await
//! }
//! ```
//!
//! ## Protocol Client
//!
//! ```ignore
//! use std::time::Duration;
//! use libuci::{Cancel, SearchOptions, UciClient};
//!
//! let client = UciClient::spawn(&config)?;
//! let options = client.init(&Cancel::after(Duration::from_secs(1))).await?;
//! client.set_position(fen).await?;
//! while !client.is_ready(&Cancel::after(Duration::from_secs(1))).await? {}
//! let best = client
//!     .go(&Cancel::after(Duration::from_secs(5)), &SearchOptions::builder().depth(12).build())
//!     .await?;
//! ```
//!
//! ## Errors
//!
//! Failures fall into distinct kinds: transport ([`Error::is_transport`]),
//! timeout ([`Error::is_timeout`]), protocol ([`Error::is_protocol`]) and
//! validation ([`Error::InvalidSearch`]). Nothing is retried internally.

mod cancel;
mod client;
pub mod config;
mod engine;
mod error;
mod observer;
pub mod process;
pub mod protocol;

pub use error::{Error, Result};

// Re-export the main client types at crate root
pub use cancel::{Cancel, CancelHandle};
pub use client::{Phase, UciClient, DEFAULT_OPTION_WINDOW};
pub use engine::{Clock, Engine, Side};
pub use observer::{LogLevel, LoggingObserver, SearchObserver};

// Re-export commonly used config types at crate root
pub use config::{EngineConfig, EngineConfigBuilder, EnginePath, ENV_STOCKFISH_PATH};

// Re-export commonly used protocol types at crate root
pub use protocol::{EngineLine, Score, SearchInfo, SearchOptions, SearchOptionsBuilder};

// Re-export commonly used process types at crate root
pub use process::{EngineProcess, LineClient};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    /// All major public types must be Send + Sync for use across async tasks.
    #[test]
    fn public_types_are_send_sync() {
        // Main client types
        assert_send_sync::<UciClient>();
        assert_send_sync::<Engine>();
        assert_send_sync::<Cancel>();
        assert_send_sync::<CancelHandle>();

        // Configuration types
        assert_send_sync::<EngineConfig>();
        assert_send_sync::<EngineConfigBuilder>();
        assert_send_sync::<EnginePath>();

        // Protocol types
        assert_send_sync::<EngineLine>();
        assert_send_sync::<SearchInfo>();
        assert_send_sync::<SearchOptions>();

        // Process types
        assert_send_sync::<EngineProcess>();
        assert_send_sync::<LineClient>();

        // Error type
        assert_send_sync::<Error>();
    }
}
