//! Progress reports (`info` lines) emitted during a search.

use serde::Serialize;

/// Evaluation reported by the engine, from the side to move's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    /// Advantage in hundredths of a pawn.
    Centipawns(i32),
    /// Mate in this many moves; negative when being mated.
    Mate(i32),
}

/// Fields of one `info` line.
///
/// Every field is optional because engines report any subset. Unknown
/// keywords and unparseable values are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    /// The score is only a lower bound.
    pub lowerbound: bool,
    /// The score is only an upper bound.
    pub upperbound: bool,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub hashfull: Option<u32>,
    pub tbhits: Option<u64>,
    pub time_ms: Option<u64>,
    pub current_move: Option<String>,
    pub current_move_number: Option<u32>,
    /// Principal variation.
    pub pv: Vec<String>,
    /// Free-form text after `string`.
    pub string: Option<String>,
}

impl SearchInfo {
    /// Parse the tokens following the `info` keyword.
    pub fn parse(body: &str) -> Self {
        let mut info = SearchInfo::default();
        let mut tokens = body.split_whitespace().peekable();

        while let Some(keyword) = tokens.next() {
            match keyword {
                "depth" => info.depth = number(tokens.next()),
                "seldepth" => info.seldepth = number(tokens.next()),
                "multipv" => info.multipv = number(tokens.next()),
                "nodes" => info.nodes = number(tokens.next()),
                "nps" => info.nps = number(tokens.next()),
                "hashfull" => info.hashfull = number(tokens.next()),
                "tbhits" => info.tbhits = number(tokens.next()),
                "time" => info.time_ms = number(tokens.next()),
                "currmove" => info.current_move = tokens.next().map(str::to_string),
                "currmovenumber" => info.current_move_number = number(tokens.next()),
                "score" => {
                    info.score = match (tokens.next(), number(tokens.next())) {
                        (Some("cp"), Some(cp)) => Some(Score::Centipawns(cp)),
                        (Some("mate"), Some(moves)) => Some(Score::Mate(moves)),
                        _ => None,
                    };
                    match tokens.peek() {
                        Some(&"lowerbound") => {
                            info.lowerbound = true;
                            tokens.next();
                        }
                        Some(&"upperbound") => {
                            info.upperbound = true;
                            tokens.next();
                        }
                        _ => {}
                    }
                }
                "pv" => {
                    // The principal variation runs until the next known keyword.
                    while let Some(mv) = tokens.next_if(|t| !is_keyword(t)) {
                        info.pv.push(mv.to_string());
                    }
                }
                "string" => {
                    let text: Vec<&str> = tokens.by_ref().collect();
                    info.string = Some(text.join(" "));
                }
                _ => {}
            }
        }

        info
    }
}

fn number<T: std::str::FromStr>(token: Option<&str>) -> Option<T> {
    token.and_then(|t| t.parse().ok())
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "multipv"
            | "score"
            | "nodes"
            | "nps"
            | "hashfull"
            | "tbhits"
            | "time"
            | "pv"
            | "currmove"
            | "currmovenumber"
            | "string"
    )
}
