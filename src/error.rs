use crate::client::Phase;

/// Errors that can occur when driving a UCI engine.
///
/// Errors are organized by category:
/// - Configuration errors: detected at `build()` time
/// - Spawn errors: failed to start the engine process
/// - Transport errors: reading from or writing to the engine failed
/// - Timeout errors: a cancellation fired before the engine answered
/// - Protocol errors: the engine answered with something we cannot use
/// - Validation errors: a request was rejected before any I/O happened
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration errors (detected at build() time)
    // -------------------------------------------------------------------------
    /// Environment variable naming the engine executable is not set.
    #[error("environment variable {var} not set")]
    EnvVarNotFound { var: String },

    /// Invalid configuration provided to builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -------------------------------------------------------------------------
    // Spawn errors
    // -------------------------------------------------------------------------
    /// Engine executable not found.
    #[error("engine executable not found (searched: {searched})")]
    EngineNotFound { searched: String },

    /// Failed to spawn the engine subprocess.
    #[error("failed to spawn engine process: {0}")]
    ProcessSpawn(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Transport errors
    // -------------------------------------------------------------------------
    /// IO error communicating with the engine subprocess.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    /// The engine closed its output stream.
    #[error("engine output stream closed")]
    StreamClosed,

    /// The engine was already terminated.
    #[error("engine process has exited")]
    ProcessExited,

    // -------------------------------------------------------------------------
    // Timeout errors
    // -------------------------------------------------------------------------
    /// Cancellation fired before the awaited output arrived.
    #[error("timed out: {0}")]
    Timeout(String),

    // -------------------------------------------------------------------------
    // Protocol errors
    // -------------------------------------------------------------------------
    /// The engine sent a line that does not match the expected grammar.
    #[error("malformed engine response ({reason}): {line}")]
    Protocol { line: String, reason: String },

    /// The engine printed a diagnostic in response to `setoption`.
    #[error("engine rejected option {name}: {detail}")]
    OptionRejected { name: String, detail: String },

    /// The operation is not valid in the client's current phase.
    #[error("cannot {operation} while client is {phase}")]
    WrongPhase { operation: &'static str, phase: Phase },

    // -------------------------------------------------------------------------
    // Validation errors
    // -------------------------------------------------------------------------
    /// Search options failed validation; nothing was sent to the engine.
    #[error("invalid search options: {0}")]
    InvalidSearch(String),
}

/// A specialized Result type for libuci operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error.
    pub fn io(source: std::io::Error) -> Self {
        Self::Io(source)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a protocol error for the given line.
    pub fn protocol(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error came from a cancellation firing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Check if this error is a transport failure (broken pipe, closed stream).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::StreamClosed | Error::ProcessExited
        )
    }

    /// Check if the engine answered with something unusable.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol { .. } | Error::OptionRejected { .. })
    }

    /// Check if this error is retryable.
    ///
    /// Only timeouts qualify: the caller may try again with a larger budget.
    pub fn is_retryable(&self) -> bool {
        self.is_timeout()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidConfig(format!("failed to parse JSON: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }

    #[test]
    fn kinds_are_distinguishable() {
        let timeout = Error::timeout("no line");
        let transport = Error::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe broke",
        ));
        let protocol = Error::protocol("bestmove", "missing move");

        assert!(timeout.is_timeout());
        assert!(!timeout.is_transport());
        assert!(!timeout.is_protocol());

        assert!(transport.is_transport());
        assert!(!transport.is_timeout());

        assert!(protocol.is_protocol());
        assert!(!protocol.is_transport());

        assert!(Error::StreamClosed.is_transport());
        assert!(Error::OptionRejected {
            name: "Threads".into(),
            detail: "bad value".into()
        }
        .is_protocol());
    }

    #[test]
    fn is_retryable_detection() {
        assert!(Error::timeout("slow engine").is_retryable());
        assert!(!Error::StreamClosed.is_retryable());
        assert!(!Error::InvalidSearch("depth and movetime".into()).is_retryable());
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_transport());
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn option_rejected_keeps_detail_verbatim() {
        let err = Error::OptionRejected {
            name: "NotAnOption".into(),
            detail: "No such option: NotAnOption".into(),
        };
        assert!(err.to_string().contains("No such option: NotAnOption"));
    }

    #[test]
    fn wrong_phase_message() {
        let err = Error::WrongPhase {
            operation: "go",
            phase: Phase::Uninitialized,
        };
        assert_eq!(err.to_string(), "cannot go while client is uninitialized");
    }
}
