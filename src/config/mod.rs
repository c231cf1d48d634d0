//! Configuration for spawning and driving a UCI engine.
//!
//! This module provides [`EngineConfig`] and [`EngineConfigBuilder`], which
//! describe where the engine lives, how its output is read, how long each
//! exchange may take, and which options to apply after the handshake.
//!
//! # Example
//!
//! ```ignore
//! use libuci::config::EngineConfig;
//!
//! // Path from STOCKFISH_PATH (default)
//! let config = EngineConfig::builder().build()?;
//!
//! // Explicit path and options
//! let config = EngineConfig::builder()
//!     .path("/usr/local/bin/stockfish")
//!     .option("Threads", "32")
//!     .build()?;
//!
//! // From a JSON document
//! let config = EngineConfigBuilder::from_json(&std::fs::read_to_string("engine.json")?)?
//!     .build()?;
//! ```

pub mod builder;

pub use builder::{EngineConfig, EngineConfigBuilder, EnginePath, ENV_STOCKFISH_PATH};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_exports_accessible() {
        let _: EnginePath = EnginePath::Path("engine".into());
        let _: &str = ENV_STOCKFISH_PATH;
    }

    #[test]
    fn builder_accessible() {
        let _ = EngineConfig::builder();
    }
}
