//! UCI protocol client.
//!
//! This module provides [`UciClient`], which speaks the UCI command/response
//! grammar over a [`LineClient`].
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use libuci::{Cancel, EngineConfig, SearchOptions, UciClient};
//!
//! #[tokio::main]
//! async fn main() -> libuci::Result<()> {
//!     let config = EngineConfig::builder().build()?;
//!     let client = UciClient::spawn(&config)?;
//!
//!     let options = client.init(&Cancel::after(Duration::from_secs(1))).await?;
//!     if options.contains("Threads") {
//!         client.set_option(&Cancel::never(), "Threads", "4").await?;
//!     }
//!
//!     client.set_position("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").await?;
//!     let search = SearchOptions::builder().move_time_ms(500).build();
//!     let best = client.go(&Cancel::after(Duration::from_secs(2)), &search).await?;
//!     println!("best move: {best}");
//!
//!     client.end().await
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::cancel::Cancel;
use crate::config::EngineConfig;
use crate::observer::SearchObserver;
use crate::process::LineClient;
use crate::protocol::{Command, EngineLine, SearchOptions};
use crate::{Error, Result};

/// Default silence window after `setoption` that counts as acceptance.
pub const DEFAULT_OPTION_WINDOW: Duration = Duration::from_millis(50);

/// Lifecycle phase of a [`UciClient`].
///
/// ```text
/// Uninitialized → Handshaking → Ready ⇄ Searching
///                                 ↓
///                              Ending → Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Bound to an engine that has not completed the handshake.
    Uninitialized,
    /// `uci` sent, waiting for `uciok`.
    Handshaking,
    /// Accepting commands.
    Ready,
    /// `go` sent, waiting for `bestmove`.
    Searching,
    /// Shutdown in progress.
    Ending,
    /// The engine has been shut down.
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Handshaking => "handshaking",
            Phase::Ready => "ready",
            Phase::Searching => "searching",
            Phase::Ending => "ending",
            Phase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct Identity {
    name: Option<String>,
    author: Option<String>,
}

/// A client for one UCI engine.
///
/// All methods take `&self`; the client is `Send + Sync` and can be shared
/// behind an `Arc`. Exchanges must not be pipelined: wait for one command's
/// answer before issuing the next.
///
/// # Errors
///
/// Every operation returns errors to the caller without retrying.
/// Use [`Error::is_timeout`], [`Error::is_transport`] and
/// [`Error::is_protocol`] to decide what to do next.
pub struct UciClient {
    lines: LineClient,
    options: Mutex<HashSet<String>>,
    identity: Mutex<Identity>,
    phase: Mutex<Phase>,
    option_window: Duration,
}

impl UciClient {
    /// Wrap a line client bound to an engine that has not been initialized.
    pub fn new(lines: LineClient) -> Self {
        Self {
            lines,
            options: Mutex::new(HashSet::new()),
            identity: Mutex::new(Identity::default()),
            phase: Mutex::new(Phase::Uninitialized),
            option_window: DEFAULT_OPTION_WINDOW,
        }
    }

    /// Spawn the engine described by `config` and wrap it.
    pub fn spawn(config: &EngineConfig) -> Result<Self> {
        let lines = LineClient::spawn(config)?;
        Ok(Self::new(lines).with_option_window(config.option_timeout()))
    }

    /// Set how long `setoption` waits for a diagnostic before assuming success.
    pub fn with_option_window(mut self, window: Duration) -> Self {
        self.option_window = window;
        self
    }

    /// The underlying line client.
    pub fn lines(&self) -> &LineClient {
        &self.lines
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        *lock(&self.phase)
    }

    /// Perform the handshake and record the options the engine declares.
    ///
    /// Returns a copy of the declared option names. On failure the client
    /// returns to its previous phase so the handshake can be retried.
    pub async fn init(&self, cancel: &Cancel) -> Result<HashSet<String>> {
        let transition = self.begin(
            "init",
            &[Phase::Uninitialized, Phase::Ready],
            Phase::Handshaking,
        )?;

        self.lines.set_flush_on_write(true);
        self.send(&Command::Uci).await?;

        // Published only once `uciok` arrives; a failed handshake keeps the previous ones.
        let mut options = HashSet::new();
        let mut identity = Identity::default();
        loop {
            let line = self.lines.read_line(cancel).await?;
            match EngineLine::classify(&line) {
                EngineLine::Option { name } => {
                    options.insert(name);
                }
                EngineLine::Id { field, value } => match field.as_str() {
                    "name" => identity.name = Some(value),
                    "author" => identity.author = Some(value),
                    _ => {}
                },
                EngineLine::UciOk => break,
                _ => {}
            }
        }

        tracing::debug!(
            options = options.len(),
            engine = identity.name.as_deref().unwrap_or("unknown"),
            "handshake complete"
        );
        *lock(&self.options) = options.clone();
        *lock(&self.identity) = identity;
        transition.finish(Phase::Ready);
        Ok(options)
    }

    /// Whether the engine declared an option with this name.
    pub fn is_option(&self, name: &str) -> bool {
        lock(&self.options).contains(name)
    }

    /// A copy of the declared option names.
    pub fn options(&self) -> HashSet<String> {
        lock(&self.options).clone()
    }

    /// Engine name from the handshake's `id name` line.
    pub fn engine_name(&self) -> Option<String> {
        lock(&self.identity).name.clone()
    }

    /// Engine author from the handshake's `id author` line.
    pub fn engine_author(&self) -> Option<String> {
        lock(&self.identity).author.clone()
    }

    /// Set an engine option.
    ///
    /// Engines answer `setoption` with silence on success and a diagnostic
    /// otherwise, so the call waits for a short window: no output means
    /// success, any line means [`Error::OptionRejected`] carrying that line.
    /// The window ends at the earlier of `cancel` and the option window.
    pub async fn set_option(&self, cancel: &Cancel, name: &str, value: &str) -> Result<()> {
        self.expect_phase("set option", Phase::Ready)?;
        self.send(&Command::set_option(name, value)).await?;

        match self.lines.read_line(&cancel.with_timeout(self.option_window)).await {
            Ok(detail) => {
                tracing::debug!(option = %name, %detail, "engine rejected option");
                Err(Error::OptionRejected {
                    name: name.to_string(),
                    detail,
                })
            }
            Err(e) if e.is_timeout() => {
                tracing::debug!(option = %name, %value, "option set");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Load a position. The engine sends no response.
    pub async fn set_position(&self, fen: &str) -> Result<()> {
        self.expect_phase("set position", Phase::Ready)?;
        self.send(&Command::position(fen)).await
    }

    /// Probe readiness.
    ///
    /// Reads exactly one line; returns `true` only if it is `readyok`.
    /// Returns a timeout error if nothing arrives before `cancel` fires.
    pub async fn is_ready(&self, cancel: &Cancel) -> Result<bool> {
        self.expect_phase("probe readiness", Phase::Ready)?;
        self.send(&Command::IsReady).await?;

        let line = self.lines.read_line(cancel).await?;
        let ready = EngineLine::classify(&line) == EngineLine::ReadyOk;
        tracing::debug!(ready, "readiness probe answered");
        Ok(ready)
    }

    /// Run a search and return the best move in coordinate notation.
    ///
    /// `options` are validated before anything is written. Progress lines
    /// are discarded until `bestmove`. Size `cancel` to the longest plausible
    /// search.
    pub async fn go(&self, cancel: &Cancel, options: &SearchOptions) -> Result<String> {
        self.go_with_observer(cancel, options, None).await
    }

    /// Like [`go`](Self::go), reporting progress to `observer`.
    pub async fn go_with_observer(
        &self,
        cancel: &Cancel,
        options: &SearchOptions,
        observer: Option<&dyn SearchObserver>,
    ) -> Result<String> {
        options.validate()?;
        let transition = self.begin("go", &[Phase::Ready], Phase::Searching)?;
        self.send(&Command::Go(options.clone())).await?;

        let best = loop {
            let line = self.lines.read_line(cancel).await?;
            match EngineLine::classify(&line) {
                EngineLine::Info(info) => {
                    if let Some(observer) = observer {
                        observer.on_info(&info);
                    }
                }
                EngineLine::BestMove { mv, ponder } => {
                    if let Some(observer) = observer {
                        observer.on_best_move(&mv, ponder.as_deref());
                    }
                    break mv;
                }
                malformed @ EngineLine::Malformed { .. } if malformed.is_search_end() => {
                    return Err(Error::protocol(line, "bestmove without a move"));
                }
                _ => {}
            }
        };

        tracing::debug!(best_move = %best, "search complete");
        transition.finish(Phase::Ready);
        Ok(best)
    }

    /// Shut the engine down.
    ///
    /// Interrupts the process, escalating to a kill if it does not exit.
    /// Calling `end` on a terminated client is a no-op.
    pub async fn end(&self) -> Result<()> {
        {
            let mut phase = lock(&self.phase);
            match *phase {
                Phase::Terminated | Phase::Ending => return Ok(()),
                _ => *phase = Phase::Ending,
            }
        }

        let result = self.lines.end().await;
        *lock(&self.phase) = Phase::Terminated;
        tracing::debug!("engine terminated");
        result
    }

    async fn send(&self, command: &Command) -> Result<()> {
        self.lines.write_line(&command.to_string()).await
    }

    fn expect_phase(&self, operation: &'static str, expected: Phase) -> Result<()> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(Error::WrongPhase { operation, phase })
        }
    }

    fn begin(
        &self,
        operation: &'static str,
        allowed: &[Phase],
        during: Phase,
    ) -> Result<Transition<'_>> {
        let mut phase = lock(&self.phase);
        if !allowed.contains(&phase) {
            return Err(Error::WrongPhase {
                operation,
                phase: *phase,
            });
        }
        let previous = std::mem::replace(&mut *phase, during);
        Ok(Transition {
            phase: &self.phase,
            during,
            on_abort: previous,
            done: false,
        })
    }
}

/// Moves the client out of a transient phase when an exchange ends,
/// including when its future is dropped mid-exchange.
struct Transition<'a> {
    phase: &'a Mutex<Phase>,
    during: Phase,
    on_abort: Phase,
    done: bool,
}

impl Transition<'_> {
    fn finish(mut self, next: Phase) {
        self.settle(next);
    }

    fn settle(&mut self, next: Phase) {
        self.done = true;
        let mut phase = lock(self.phase);
        // end() may have moved on concurrently.
        if *phase == self.during {
            *phase = next;
        }
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if !self.done {
            let on_abort = self.on_abort;
            self.settle(on_abort);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("client state lock poisoned")
}
