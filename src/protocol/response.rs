//! Classification of engine output lines.

use super::info::SearchInfo;
use super::{BEST_MOVE, OPTION_NAME_PREFIX, READY_OK, UCI_OK};

/// One line of engine output, classified.
///
/// Produced by [`EngineLine::classify`]; callers dispatch on the variant
/// instead of checking prefixes themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine {
    /// `id name ...` or `id author ...`.
    Id { field: String, value: String },
    /// `option name NAME ...`; only the first token of the name is kept.
    Option { name: String },
    /// Handshake complete.
    UciOk,
    /// Engine ready.
    ReadyOk,
    /// Search progress.
    Info(SearchInfo),
    /// Terminal line of a search.
    BestMove { mv: String, ponder: Option<String> },
    /// A recognized keyword whose mandatory argument is missing.
    Malformed { keyword: &'static str, line: String },
    /// Anything else, including diagnostics and blank lines.
    Other(String),
}

impl EngineLine {
    /// Classify a single line (without its terminator).
    pub fn classify(line: &str) -> Self {
        if line == UCI_OK {
            return EngineLine::UciOk;
        }
        if line == READY_OK {
            return EngineLine::ReadyOk;
        }

        if let Some(rest) = line.strip_prefix(OPTION_NAME_PREFIX) {
            return match rest.split_whitespace().next() {
                Some(name) => EngineLine::Option {
                    name: name.to_string(),
                },
                None => EngineLine::Malformed {
                    keyword: "option",
                    line: line.to_string(),
                },
            };
        }

        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some(BEST_MOVE) => match tokens.next() {
                Some(mv) => {
                    let ponder = match (tokens.next(), tokens.next()) {
                        (Some("ponder"), Some(p)) => Some(p.to_string()),
                        _ => None,
                    };
                    EngineLine::BestMove {
                        mv: mv.to_string(),
                        ponder,
                    }
                }
                None => EngineLine::Malformed {
                    keyword: BEST_MOVE,
                    line: line.to_string(),
                },
            },
            Some("info") => {
                let body = line.trim_start().strip_prefix("info").unwrap_or_default();
                EngineLine::Info(SearchInfo::parse(body))
            }
            Some("id") => match tokens.next() {
                Some(field @ ("name" | "author")) => {
                    let value: Vec<&str> = tokens.collect();
                    EngineLine::Id {
                        field: field.to_string(),
                        value: value.join(" "),
                    }
                }
                _ => EngineLine::Other(line.to_string()),
            },
            _ => EngineLine::Other(line.to_string()),
        }
    }

    /// The chosen move, if this is a well-formed `bestmove` line.
    pub fn best_move(&self) -> Option<&str> {
        match self {
            EngineLine::BestMove { mv, .. } => Some(mv),
            _ => None,
        }
    }

    /// Whether this line ends a search, well-formed or not.
    pub fn is_search_end(&self) -> bool {
        matches!(
            self,
            EngineLine::BestMove { .. } | EngineLine::Malformed { keyword: BEST_MOVE, .. }
        )
    }
}
