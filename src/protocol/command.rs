//! Commands sent to the engine.

use std::fmt;

use super::search::SearchOptions;

/// A single command line, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the handshake.
    Uci,
    /// Change an engine option.
    SetOption { name: String, value: String },
    /// Load a position given as a FEN string.
    Position(String),
    /// Probe readiness.
    IsReady,
    /// Start a search.
    Go(SearchOptions),
}

impl Command {
    /// Create a `setoption` command.
    pub fn set_option(name: impl Into<String>, value: impl Into<String>) -> Self {
        Command::SetOption {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create a `position fen` command.
    pub fn position(fen: impl Into<String>) -> Self {
        Command::Position(fen.into())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Uci => f.write_str(super::UCI),
            Command::SetOption { name, value } => {
                write!(f, "setoption name {name} value {value}")
            }
            Command::Position(fen) => write!(f, "position fen {fen}"),
            Command::IsReady => f.write_str(super::IS_READY),
            Command::Go(options) => f.write_str(&options.encode()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fixed_commands() {
        assert_eq!(Command::Uci.to_string(), "uci");
        assert_eq!(Command::IsReady.to_string(), "isready");
    }

    #[test]
    fn renders_set_option() {
        assert_eq!(
            Command::set_option("Threads", "32").to_string(),
            "setoption name Threads value 32"
        );
    }

    #[test]
    fn renders_position() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        assert_eq!(
            Command::position(fen).to_string(),
            format!("position fen {fen}")
        );
    }

    #[test]
    fn renders_search() {
        let options = SearchOptions {
            depth: 12,
            ..Default::default()
        };
        assert_eq!(Command::Go(options).to_string(), "go depth 12");
        assert_eq!(Command::Go(SearchOptions::default()).to_string(), "go");
    }
}
