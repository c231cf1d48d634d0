//! Search progress observation.
//!
//! Engines stream `info` lines while searching. [`UciClient::go`](crate::UciClient::go)
//! discards them; [`go_with_observer`](crate::UciClient::go_with_observer)
//! hands each one to a [`SearchObserver`] first.
//!
//! # Example
//!
//! ```ignore
//! use libuci::{SearchInfo, SearchObserver};
//!
//! struct DepthTracker(std::sync::atomic::AtomicU32);
//!
//! impl SearchObserver for DepthTracker {
//!     fn on_info(&self, info: &SearchInfo) {
//!         if let Some(depth) = info.depth {
//!             self.0.fetch_max(depth, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//! }
//!
//! let tracker = DepthTracker(Default::default());
//! let best = client.go_with_observer(&cancel, &options, Some(&tracker)).await?;
//! ```

use crate::protocol::{Score, SearchInfo};

/// Observer for search progress.
///
/// Methods have default empty implementations for selective observation.
/// Observers are called synchronously while lines are read, so they must be
/// cheap; a slow observer delays the search result.
pub trait SearchObserver: Send + Sync {
    /// Called for every `info` line, in arrival order.
    fn on_info(&self, info: &SearchInfo) {
        let _ = info;
    }

    /// Called once with the terminal `bestmove` line.
    fn on_best_move(&self, best_move: &str, ponder: Option<&str>) {
        let _ = (best_move, ponder);
    }
}

/// Observer that logs search progress using tracing.
#[derive(Debug, Clone, Default)]
pub struct LoggingObserver {
    level: LogLevel,
}

/// Log level for [`LoggingObserver`].
#[derive(Debug, Clone, Copy, Default)]
pub enum LogLevel {
    /// Log at trace level.
    Trace,
    /// Log at debug level (default).
    #[default]
    Debug,
    /// Log at info level.
    Info,
}

impl LoggingObserver {
    /// Create a new logging observer with debug level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging observer with a specific level.
    pub fn with_level(level: LogLevel) -> Self {
        Self { level }
    }
}

impl SearchObserver for LoggingObserver {
    fn on_info(&self, info: &SearchInfo) {
        // Skip lines that only carry text.
        if info.depth.is_none() && info.score.is_none() {
            if let Some(text) = &info.string {
                tracing::trace!(%text, "engine info string");
            }
            return;
        }

        let score = info.score.map(|score| match score {
            Score::Centipawns(cp) => format!("cp {cp}"),
            Score::Mate(moves) => format!("mate {moves}"),
        });
        let pv = info.pv.join(" ");

        match self.level {
            LogLevel::Trace => {
                tracing::trace!(depth = ?info.depth, ?score, nodes = ?info.nodes, %pv, "search progress");
            }
            LogLevel::Debug => {
                tracing::debug!(depth = ?info.depth, ?score, nodes = ?info.nodes, %pv, "search progress");
            }
            LogLevel::Info => {
                tracing::info!(depth = ?info.depth, ?score, nodes = ?info.nodes, %pv, "search progress");
            }
        }
    }

    fn on_best_move(&self, best_move: &str, ponder: Option<&str>) {
        match self.level {
            LogLevel::Trace => tracing::trace!(%best_move, ?ponder, "best move"),
            LogLevel::Debug => tracing::debug!(%best_move, ?ponder, "best move"),
            LogLevel::Info => tracing::info!(%best_move, ?ponder, "best move"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn search_observer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SearchObserver>();
        assert_send_sync::<LoggingObserver>();
    }

    struct CountingObserver {
        infos: AtomicUsize,
        best_moves: AtomicUsize,
    }

    impl SearchObserver for CountingObserver {
        fn on_info(&self, _info: &SearchInfo) {
            self.infos.fetch_add(1, Ordering::Relaxed);
        }

        fn on_best_move(&self, _best_move: &str, _ponder: Option<&str>) {
            self.best_moves.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn counting_observer_tracks_calls() {
        let observer = CountingObserver {
            infos: AtomicUsize::new(0),
            best_moves: AtomicUsize::new(0),
        };

        observer.on_info(&SearchInfo::parse("depth 1 score cp 10 pv e2e4"));
        observer.on_info(&SearchInfo::parse("depth 2 score cp 12 pv e2e4 e7e5"));
        observer.on_best_move("e2e4", Some("e7e5"));

        assert_eq!(observer.infos.load(Ordering::Relaxed), 2);
        assert_eq!(observer.best_moves.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn default_trait_methods_are_no_ops() {
        struct EmptyObserver;
        impl SearchObserver for EmptyObserver {}

        let observer = EmptyObserver;
        observer.on_info(&SearchInfo::default());
        observer.on_best_move("e2e4", None);
    }

    #[test]
    fn logging_observer_handles_every_level() {
        for level in [LogLevel::Trace, LogLevel::Debug, LogLevel::Info] {
            let observer: Arc<dyn SearchObserver> = Arc::new(LoggingObserver::with_level(level));
            observer.on_info(&SearchInfo::parse("depth 3 score mate 2 nodes 99 pv h5f7"));
            observer.on_info(&SearchInfo::parse("string hello"));
            observer.on_best_move("h5f7", None);
        }
    }
}
