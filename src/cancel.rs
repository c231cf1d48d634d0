//! Cooperative cancellation for engine exchanges.
//!
//! Every operation that waits on the engine takes a [`Cancel`]. A `Cancel`
//! fires when its deadline passes, when its [`CancelHandle`] is triggered,
//! or both, whichever comes first. Firing never affects the background
//! reader; it only stops the current wait.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use libuci::Cancel;
//!
//! // Give the engine one second to finish the handshake.
//! let options = client.init(&Cancel::after(Duration::from_secs(1))).await?;
//!
//! // Abort a long search from another task.
//! let (handle, cancel) = Cancel::manual();
//! tokio::spawn(async move { stop_requested().await; handle.cancel(); });
//! let best = client.go(&cancel, &options).await;
//! ```

use std::future::pending;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// A deadline, an explicit trigger, or both.
///
/// Cheap to clone; clones observe the same trigger.
#[derive(Debug, Clone, Default)]
pub struct Cancel {
    deadline: Option<Instant>,
    trigger: Option<watch::Receiver<bool>>,
}

/// Fires the [`Cancel`] it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Fire the cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Check if this handle has already fired.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Cancel {
    /// A cancellation that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    /// Fire once `duration` has elapsed from now.
    pub fn after(duration: Duration) -> Self {
        Self::at(Instant::now() + duration)
    }

    /// Fire at the given instant.
    pub fn at(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            trigger: None,
        }
    }

    /// Create a cancellation fired explicitly through the returned handle.
    pub fn manual() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (
            CancelHandle { tx },
            Self {
                deadline: None,
                trigger: Some(rx),
            },
        )
    }

    /// Derive a cancellation that also fires after `duration`.
    ///
    /// The earlier of the existing deadline and the new one wins; the
    /// explicit trigger, if any, is kept.
    pub fn with_timeout(&self, duration: Duration) -> Self {
        let candidate = Instant::now() + duration;
        let deadline = match self.deadline {
            Some(existing) if existing <= candidate => existing,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
            trigger: self.trigger.clone(),
        }
    }

    /// The deadline, if one is set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Check if the cancellation has already fired.
    pub fn is_cancelled(&self) -> bool {
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        let triggered = self.trigger.as_ref().is_some_and(|rx| *rx.borrow());
        expired || triggered
    }

    /// Wait until the cancellation fires.
    ///
    /// Never completes for [`Cancel::never`], or when the handle was dropped
    /// without firing.
    pub async fn cancelled(&self) {
        let deadline = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        let trigger = async {
            match self.trigger.clone() {
                Some(mut rx) => {
                    if rx.wait_for(|fired| *fired).await.is_err() {
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            _ = deadline => {}
            _ = trigger => {}
        }
    }
}
