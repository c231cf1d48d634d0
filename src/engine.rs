//! Move generation on top of a [`UciClient`].
//!
//! [`Engine`] bundles a client with its configuration and turns a position
//! plus a game clock into a best move: load the position, wait until the
//! engine is ready, then search within the time the side to move has left.
//!
//! # Example
//!
//! ```ignore
//! use libuci::{Clock, Engine, EngineConfig};
//!
//! let config = EngineConfig::builder().option("Threads", "32").build()?;
//! let engine = Engine::spawn(config)?;
//! engine.initialize().await?;
//!
//! let clock = Clock { white_ms: 300_000, black_ms: 300_000, ..Default::default() };
//! let best = engine
//!     .generate_move("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", &clock)
//!     .await?;
//! engine.terminate().await?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cancel::Cancel;
use crate::client::UciClient;
use crate::config::EngineConfig;
use crate::observer::SearchObserver;
use crate::protocol::SearchOptions;
use crate::Result;

/// A side in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Side to move according to the second field of a FEN string.
    ///
    /// Defaults to white when the field is missing or unrecognized.
    pub fn to_move(fen: &str) -> Self {
        match fen.split_whitespace().nth(1) {
            Some("b") => Side::Black,
            _ => Side::White,
        }
    }
}

/// Remaining time and increments for both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clock {
    pub white_ms: u64,
    pub black_ms: u64,
    pub white_increment_ms: u64,
    pub black_increment_ms: u64,
    pub moves_to_go: u32,
}

impl Clock {
    /// Time left for `side`.
    pub fn remaining(&self, side: Side) -> Duration {
        Duration::from_millis(match side {
            Side::White => self.white_ms,
            Side::Black => self.black_ms,
        })
    }

    /// Whether the clock carries any remaining time.
    pub fn is_set(&self) -> bool {
        self.white_ms != 0 || self.black_ms != 0
    }
}

/// A configured engine that produces moves.
pub struct Engine {
    client: UciClient,
    config: EngineConfig,
}

impl Engine {
    /// Spawn the engine described by `config`.
    ///
    /// Call [`initialize`](Self::initialize) before generating moves.
    pub fn spawn(config: EngineConfig) -> Result<Self> {
        let client = UciClient::spawn(&config)?;
        Ok(Self { client, config })
    }

    /// Drive an existing client with the timeouts and options in `config`.
    pub fn with_client(client: UciClient, config: EngineConfig) -> Self {
        Self { client, config }
    }

    /// The underlying protocol client.
    pub fn client(&self) -> &UciClient {
        &self.client
    }

    /// The configuration this engine was created with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Complete the handshake and apply the configured options.
    ///
    /// Options the engine did not declare are skipped with a warning. A
    /// rejected option fails with [`Error::OptionRejected`](crate::Error::OptionRejected).
    pub async fn initialize(&self) -> Result<()> {
        let declared = self
            .client
            .init(&Cancel::after(self.config.handshake_timeout()))
            .await?;

        for (name, value) in self.config.options() {
            if !declared.contains(name) {
                tracing::warn!(option = %name, "engine does not declare option, skipping");
                continue;
            }
            self.client.set_option(&Cancel::never(), name, value).await?;
        }
        Ok(())
    }

    /// Pick a move for `position` (a FEN string) under `clock`.
    pub async fn generate_move(&self, position: &str, clock: &Clock) -> Result<String> {
        self.generate_move_with_observer(position, clock, None).await
    }

    /// Like [`generate_move`](Self::generate_move), reporting search progress.
    pub async fn generate_move_with_observer(
        &self,
        position: &str,
        clock: &Clock,
        observer: Option<&dyn SearchObserver>,
    ) -> Result<String> {
        self.client.set_position(position).await?;
        self.wait_until_ready().await?;

        let side = Side::to_move(position);
        let options = self.search_options(clock);
        let thinking = if clock.is_set() {
            clock.remaining(side)
        } else {
            self.config.default_move_time()
        };
        let budget = thinking + self.config.search_slack();

        tracing::debug!(?side, ?budget, "searching");
        self.client
            .go_with_observer(&Cancel::after(budget), &options, observer)
            .await
    }

    /// Shut the engine down.
    pub async fn terminate(&self) -> Result<()> {
        self.client.end().await
    }

    async fn wait_until_ready(&self) -> Result<()> {
        let cancel = Cancel::after(self.config.ready_timeout());
        while !self.client.is_ready(&cancel).await? {}
        Ok(())
    }

    fn search_options(&self, clock: &Clock) -> SearchOptions {
        let builder = SearchOptions::builder();
        if !clock.is_set() {
            return builder
                .move_time_ms(millis(self.config.default_move_time()))
                .build();
        }
        builder
            .white_ms(clock.white_ms)
            .black_ms(clock.black_ms)
            .white_increment_ms(clock.white_increment_ms)
            .black_increment_ms(clock.black_increment_ms)
            .moves_to_go(clock.moves_to_go)
            .build()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
