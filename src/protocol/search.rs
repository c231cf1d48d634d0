//! Search request parameters and their `go` encoding.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Parameters of a single search.
///
/// Zero and empty fields are omitted from the encoded command. `depth` and
/// `move_time_ms` are mutually exclusive; [`SearchOptionsBuilder`] keeps
/// them that way, and [`validate`](Self::validate) rejects values built by
/// hand that set both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Restrict the search to these root moves, in coordinate notation.
    pub search_moves: Vec<String>,
    /// White's remaining time.
    pub white_ms: u64,
    /// Black's remaining time.
    pub black_ms: u64,
    /// White's increment per move.
    pub white_increment_ms: u64,
    /// Black's increment per move.
    pub black_increment_ms: u64,
    /// Moves until the next time control.
    pub moves_to_go: u32,
    /// Search exactly to this depth.
    pub depth: u32,
    /// Search for exactly this long.
    pub move_time_ms: u64,
}

impl SearchOptions {
    /// Create a builder.
    pub fn builder() -> SearchOptionsBuilder {
        SearchOptionsBuilder::default()
    }

    /// Check the depth/duration exclusivity and every restricted move.
    pub fn validate(&self) -> Result<()> {
        if self.depth != 0 && self.move_time_ms != 0 {
            return Err(Error::InvalidSearch(
                "cannot set both depth and movetime".into(),
            ));
        }
        if let Some(mv) = self.search_moves.iter().find(|mv| !is_coordinate_move(mv)) {
            return Err(Error::InvalidSearch(format!("invalid search move {mv:?}")));
        }
        Ok(())
    }

    /// Render the `go` command.
    ///
    /// Clauses appear in a fixed order: `searchmoves`, `wtime`, `btime`,
    /// `winc`, `binc`, `movestogo`, `depth`, `movetime`.
    pub fn encode(&self) -> String {
        let mut command = String::from("go");

        if !self.search_moves.is_empty() {
            command.push_str(" searchmoves");
            for mv in &self.search_moves {
                command.push(' ');
                command.push_str(mv.trim());
            }
        }

        let clauses = [
            ("wtime", self.white_ms),
            ("btime", self.black_ms),
            ("winc", self.white_increment_ms),
            ("binc", self.black_increment_ms),
            ("movestogo", u64::from(self.moves_to_go)),
            ("depth", u64::from(self.depth)),
            ("movetime", self.move_time_ms),
        ];
        for (keyword, value) in clauses {
            if value != 0 {
                command.push_str(&format!(" {keyword} {value}"));
            }
        }

        command.trim().to_string()
    }
}

/// A move like `e2e4`, or `e7e8q` for a promotion onto the last rank.
fn is_coordinate_move(mv: &str) -> bool {
    let bytes = mv.as_bytes();
    let on_board =
        |file: u8, rank: u8| (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank);

    match bytes {
        [f1, r1, f2, r2] => on_board(*f1, *r1) && on_board(*f2, *r2),
        [f1, r1, f2, r2, piece] => {
            on_board(*f1, *r1)
                && on_board(*f2, *r2)
                && matches!(*r2, b'1' | b'8')
                && b"qrbnQRBN".contains(piece)
        }
        _ => false,
    }
}

/// Builder for [`SearchOptions`].
///
/// Setting a depth clears any fixed duration and vice versa.
#[derive(Debug, Clone, Default)]
pub struct SearchOptionsBuilder {
    options: SearchOptions,
}

impl SearchOptionsBuilder {
    /// Restrict the search to the given root moves.
    pub fn search_moves(mut self, moves: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.search_moves = moves.into_iter().map(Into::into).collect();
        self
    }

    /// Set white's remaining time in milliseconds.
    pub fn white_ms(mut self, ms: u64) -> Self {
        self.options.white_ms = ms;
        self
    }

    /// Set black's remaining time in milliseconds.
    pub fn black_ms(mut self, ms: u64) -> Self {
        self.options.black_ms = ms;
        self
    }

    /// Set white's increment in milliseconds.
    pub fn white_increment_ms(mut self, ms: u64) -> Self {
        self.options.white_increment_ms = ms;
        self
    }

    /// Set black's increment in milliseconds.
    pub fn black_increment_ms(mut self, ms: u64) -> Self {
        self.options.black_increment_ms = ms;
        self
    }

    /// Set the number of moves until the next time control.
    pub fn moves_to_go(mut self, moves: u32) -> Self {
        self.options.moves_to_go = moves;
        self
    }

    /// Search to a fixed depth. Clears any fixed duration.
    pub fn depth(mut self, depth: u32) -> Self {
        if self.options.move_time_ms != 0 {
            tracing::warn!(
                movetime = self.options.move_time_ms,
                "depth and movetime are exclusive, clearing movetime"
            );
            self.options.move_time_ms = 0;
        }
        self.options.depth = depth;
        self
    }

    /// Search for a fixed duration in milliseconds. Clears any fixed depth.
    pub fn move_time_ms(mut self, ms: u64) -> Self {
        if self.options.depth != 0 {
            tracing::warn!(
                depth = self.options.depth,
                "depth and movetime are exclusive, clearing depth"
            );
            self.options.depth = 0;
        }
        self.options.move_time_ms = ms;
        self
    }

    /// Finish building.
    pub fn build(self) -> SearchOptions {
        self.options
    }
}
