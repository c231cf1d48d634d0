//! Test utilities for libuci integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use libuci::{LineClient, UciClient};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
pub const AFTER_E4_FEN: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

pub const HANDSHAKE: &str = "id name Stockfish dev-20240314-fb07281f\n\
    id author the Stockfish developers (see AUTHORS file)\n\
    \n\
    option name Threads type spin default 1 min 1 max 1024\n\
    option name Ponder type check default false\n\
    uciok\n";

pub const THREADS_CRASH: &str = "terminate called after throwing an instance of 'std::invalid_argument'\n\
    \x20 what():  stof\n\
    Aborted (core dumped)\n";

/// How the scripted engine answers one command.
#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Search { infos: usize, best: String },
}

/// Builder for a scripted engine that answers commands over an in-memory pipe.
///
/// Commands are matched exactly. Commands without a rule get an
/// `Unknown command: ...` line, like a real engine.
pub struct ScriptBuilder {
    rules: Vec<(String, Option<Reply>)>,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl ScriptBuilder {
    /// Create an empty script.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            chunk_size: usize::MAX,
            chunk_delay: Duration::ZERO,
        }
    }

    /// A script modelled on a Stockfish session.
    pub fn stockfish() -> Self {
        Self::new()
            .reply("uci", HANDSHAKE)
            .silent("setoption name Threads value 2")
            .silent("setoption name Ponder value true")
            .reply("setoption name Threads value asdf", THREADS_CRASH)
            .reply(
                "setoption name NotAnOption value some-value",
                "No such option: NotAnOption\n",
            )
            .silent(&format!("position fen {START_FEN}"))
            .silent(&format!("position fen {AFTER_E4_FEN}"))
            .reply("isready", "readyok\n")
            .search("go wtime 100000", 60, "bestmove e2e4 ponder e7e5")
    }

    /// Answer `command` with `text`, written verbatim.
    pub fn reply(mut self, command: &str, text: &str) -> Self {
        self.rules
            .push((command.to_string(), Some(Reply::Text(text.to_string()))));
        self
    }

    /// Answer `command` with nothing.
    pub fn silent(mut self, command: &str) -> Self {
        self.rules.push((command.to_string(), None));
        self
    }

    /// Answer `command` with `infos` progress lines, then `best`.
    pub fn search(mut self, command: &str, infos: usize, best: &str) -> Self {
        self.rules.push((
            command.to_string(),
            Some(Reply::Search {
                infos,
                best: best.to_string(),
            }),
        ));
        self
    }

    /// Split every reply into chunks of at most `size` bytes.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Pause between chunks.
    pub fn chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Start the engine task and return a client connected to it.
    pub fn start(self) -> (UciClient, ScriptedEngine) {
        let (client_side, engine_side) = tokio::io::duplex(256 * 1024);
        let (reader, writer) = tokio::io::split(client_side);
        let client = UciClient::new(LineClient::new(reader, writer));
        let engine = ScriptedEngine::start(self, engine_side);
        (client, engine)
    }
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running scripted engine.
pub struct ScriptedEngine {
    received: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEngine {
    fn start(script: ScriptBuilder, pipe: DuplexStream) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);

        tokio::spawn(async move {
            let (input, mut output) = tokio::io::split(pipe);
            let mut commands = BufReader::new(input).lines();

            while let Ok(Some(command)) = commands.next_line().await {
                log.lock().unwrap().push(command.clone());

                let reply = match script.rules.iter().find(|(c, _)| *c == command) {
                    Some((_, None)) => continue,
                    Some((_, Some(Reply::Text(text)))) => text.clone(),
                    Some((_, Some(Reply::Search { infos, best }))) => search_output(*infos, best),
                    None => format!("Unknown command: '{command}'. Type help for more information.\n"),
                };

                for chunk in reply.as_bytes().chunks(script.chunk_size.min(reply.len().max(1))) {
                    if output.write_all(chunk).await.is_err() {
                        return;
                    }
                    if !script.chunk_delay.is_zero() {
                        tokio::time::sleep(script.chunk_delay).await;
                    }
                }
            }
        });

        Self { received }
    }

    /// Commands received so far, in order.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

/// Progress lines in the shape Stockfish emits them, followed by `best`.
pub fn search_output(infos: usize, best: &str) -> String {
    let mut out = String::from("info string NNUE evaluation using nn-1ceb1ade0001.nnue\n");
    for depth in 1..=infos {
        if depth % 5 == 0 {
            out.push_str(&format!("info depth {depth} currmove d2d4 currmovenumber 1\n"));
        } else {
            out.push_str(&format!(
                "info depth {depth} seldepth {} multipv 1 score cp {} nodes {} nps 1400000 \
                 hashfull 0 tbhits 0 time {depth} pv e2e4 e7e5 g1f3\n",
                depth + 2,
                20 + depth % 7,
                depth * 1000,
            ));
        }
    }
    out.push_str(best);
    out.push('\n');
    out
}

/// Wait until the engine has received `count` commands.
pub async fn wait_for_commands(engine: &ScriptedEngine, count: usize) {
    for _ in 0..200 {
        if engine.received().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("engine received {:?}, expected {count} commands", engine.received());
}
