//! Line-oriented client over an engine's stdin/stdout.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::io::{CancellableReader, LineFramer, ReadOutcome};
use super::spawn::EngineProcess;
use super::DEFAULT_READ_BUFFER_SIZE;
use crate::cancel::{Cancel, CancelHandle};
use crate::config::EngineConfig;
use crate::{Error, Result};

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Bookkeeping shared between callers and the background reader.
///
/// Guarded by one lock that is never held across I/O.
struct State {
    lines: VecDeque<String>,
    framer: LineFramer,
    reading: bool,
    closed: bool,
    failure: Option<Error>,
    buffer_size: usize,
    flush_on_write: bool,
    reader: Option<CancellableReader<BoxReader>>,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    state: Mutex<State>,
    line_ready: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("line client state lock poisoned")
    }
}

/// Writes command lines to an engine and reads its output line by line.
///
/// Output is read by a background task, started on the first
/// [`read_line`](Self::read_line), which frames chunks into lines and queues
/// them in arrival order. Lines split across reads are stitched back
/// together regardless of the configured buffer size.
///
/// # Stale output
///
/// With flush-on-write enabled (the default), every [`write_line`](Self::write_line)
/// first discards queued lines nobody consumed, so answers to an abandoned
/// command are never mistaken for answers to the next one.
pub struct LineClient {
    shared: Arc<Shared>,
    writer: tokio::sync::Mutex<Option<BoxWriter>>,
    process: tokio::sync::Mutex<Option<EngineProcess>>,
    shutdown: CancelHandle,
    termination_grace: Duration,
}

impl LineClient {
    /// Create a client over an arbitrary reader/writer pair.
    ///
    /// Useful for in-memory pipes; [`end`](Self::end) only closes the streams.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::build(Box::new(reader), Box::new(writer), None)
    }

    /// Create a client bound to a spawned engine's stdin and stdout.
    pub fn from_process(mut process: EngineProcess) -> Result<Self> {
        let stdout = process.take_stdout().ok_or(Error::ProcessExited)?;
        let stdin = process.take_stdin().ok_or(Error::ProcessExited)?;
        Ok(Self::build(Box::new(stdout), Box::new(stdin), Some(process)))
    }

    /// Spawn the engine described by `config` and bind a client to it.
    pub fn spawn(config: &EngineConfig) -> Result<Self> {
        let process = EngineProcess::spawn(config)?;
        let client = Self::from_process(process)?
            .with_termination_grace(config.termination_grace());
        client.set_buffer_size(config.read_buffer_size());
        client.set_flush_on_write(config.flush_on_write());
        Ok(client)
    }

    fn build(reader: BoxReader, writer: BoxWriter, process: Option<EngineProcess>) -> Self {
        let (shutdown, stop_reading) = Cancel::manual();
        let state = State {
            lines: VecDeque::new(),
            framer: LineFramer::new(),
            reading: false,
            closed: false,
            failure: None,
            buffer_size: DEFAULT_READ_BUFFER_SIZE,
            flush_on_write: true,
            reader: Some(CancellableReader::new(reader, stop_reading)),
            task: None,
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                line_ready: Notify::new(),
            }),
            writer: tokio::sync::Mutex::new(Some(writer)),
            process: tokio::sync::Mutex::new(process),
            shutdown,
            termination_grace: Duration::from_millis(500),
        }
    }

    /// Set how long [`end`](Self::end) waits after the interrupt before killing.
    pub fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    /// Write `text` followed by a newline.
    ///
    /// If flush-on-write is enabled, unconsumed lines are discarded first.
    pub async fn write_line(&self, text: &str) -> Result<()> {
        {
            let mut state = self.shared.lock();
            if state.flush_on_write && !state.lines.is_empty() {
                tracing::debug!(discarded = state.lines.len(), "discarding stale engine output");
                state.lines.clear();
            }
        }

        let mut writer = self.writer.lock().await;
        let writer = writer.as_mut().ok_or(Error::ProcessExited)?;

        tracing::trace!(line = %text, "engine <");
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        writer.write_all(line.as_bytes()).await.map_err(Error::io)?;
        writer.flush().await.map_err(Error::io)?;
        Ok(())
    }

    /// Wait for the next complete line.
    ///
    /// Starts the background reader if it is not running. Returns a
    /// timeout-kind error if `cancel` fires first; the queue is left as is.
    /// Once the engine's output has ended and every queued line has been
    /// consumed, returns [`Error::StreamClosed`].
    pub async fn read_line(&self, cancel: &Cancel) -> Result<String> {
        loop {
            let notified = self.shared.line_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.shared.lock();
                if let Some(line) = state.lines.pop_front() {
                    return Ok(line);
                }
                if let Some(err) = state.failure.take() {
                    return Err(err);
                }
                if state.closed {
                    return Err(Error::StreamClosed);
                }
                if !state.reading {
                    self.start_reading(&mut state);
                }
            }

            tokio::select! {
                biased;
                _ = &mut notified => {}
                _ = cancel.cancelled() => {
                    return Err(Error::timeout("no engine output before cancellation"));
                }
            }
        }
    }

    fn start_reading(&self, state: &mut State) {
        let reader = state
            .reader
            .take()
            .expect("output reader missing while no read task is active");
        state.reading = true;
        state.task = Some(tokio::spawn(produce_lines(Arc::clone(&self.shared), reader)));
    }

    /// Discard every queued line.
    pub fn flush(&self) {
        self.shared.lock().lines.clear();
    }

    /// Change the chunk size used by the background reader.
    ///
    /// Takes effect on the next read. Zero is treated as one.
    pub fn set_buffer_size(&self, size: usize) {
        self.shared.lock().buffer_size = size.max(1);
    }

    /// Current chunk size.
    pub fn buffer_size(&self) -> usize {
        self.shared.lock().buffer_size
    }

    /// Enable or disable discarding queued lines before each write.
    pub fn set_flush_on_write(&self, flush: bool) {
        self.shared.lock().flush_on_write = flush;
    }

    /// Whether queued lines are discarded before each write.
    pub fn flush_on_write(&self) -> bool {
        self.shared.lock().flush_on_write
    }

    /// Whether the background reader is currently running.
    pub fn is_reading(&self) -> bool {
        self.shared.lock().reading
    }

    /// Number of lines waiting to be read.
    pub fn queued(&self) -> usize {
        self.shared.lock().lines.len()
    }

    /// Shut the engine down and wait for the background reader to exit.
    ///
    /// Closes stdin, interrupts the process (killing it if it does not exit
    /// within the grace period), then stops and joins the reader task.
    /// Lines already queued can still be read afterwards.
    pub async fn end(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(error = %e, "closing engine stdin failed");
            }
        }

        let terminated = match self.process.lock().await.as_mut() {
            Some(process) => process.terminate(self.termination_grace).await.map(|_| ()),
            None => Ok(()),
        };

        self.shutdown.cancel();
        let task = {
            let mut state = self.shared.lock();
            state.closed = true;
            state.task.take()
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "engine output reader did not shut down cleanly");
            }
        }
        self.shared.line_ready.notify_waiters();

        terminated
    }
}

impl Drop for LineClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// How the background reader stopped.
enum Stop {
    Eof,
    Shutdown,
    Failed(Error),
}

/// Background task: read chunks, frame them into lines, queue the lines.
async fn produce_lines(shared: Arc<Shared>, mut reader: CancellableReader<BoxReader>) {
    tracing::debug!("engine output reader started");
    let mut chunk = Vec::new();

    let stop = loop {
        let size = shared.lock().buffer_size;
        chunk.resize(size, 0);

        match reader.read(&mut chunk).await {
            Ok(ReadOutcome::Data(n)) => {
                {
                    let mut state = shared.lock();
                    let lines = state.framer.push(&chunk[..n]);
                    for line in lines {
                        tracing::trace!(line = %line, "engine >");
                        state.lines.push_back(line);
                    }
                }
                shared.line_ready.notify_waiters();
            }
            Ok(ReadOutcome::Eof) => break Stop::Eof,
            Err(e) if e.is_timeout() => break Stop::Shutdown,
            Err(e) => break Stop::Failed(e),
        }
    };

    {
        let mut state = shared.lock();
        match stop {
            Stop::Eof => {
                if let Some(line) = state.framer.finish() {
                    tracing::trace!(line = %line, "engine >");
                    state.lines.push_back(line);
                }
                state.closed = true;
                tracing::debug!("engine output ended");
            }
            Stop::Shutdown => {
                state.closed = true;
                tracing::debug!("engine output reader stopped");
            }
            Stop::Failed(e) => {
                tracing::debug!(error = %e, "engine output reader failed");
                state.failure = Some(e);
            }
        }
        state.reading = false;
        state.reader = Some(reader);
    }
    shared.line_ready.notify_waiters();
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};

    fn pipe() -> (LineClient, DuplexStream) {
        let (client_side, engine_side) = tokio::io::duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(client_side);
        (LineClient::new(reader, writer), engine_side)
    }

    fn soon() -> Cancel {
        Cancel::after(Duration::from_millis(200))
    }

    #[test]
    fn line_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LineClient>();
    }

    #[tokio::test]
    async fn reads_available_line() {
        let (client, mut engine) = pipe();
        engine.write_all(b"this is the first line\n").await.unwrap();

        assert_eq!(client.read_line(&soon()).await.unwrap(), "this is the first line");
        assert!(client.is_reading());
    }

    #[tokio::test]
    async fn reads_line_arriving_later() {
        let (client, mut engine) = pipe();
        engine.write_all(b"this is the first line\n").await.unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            engine.write_all(b"the second line\n").await.unwrap();
            engine
        });

        let cancel = Cancel::after(Duration::from_secs(1));
        assert_eq!(client.read_line(&cancel).await.unwrap(), "this is the first line");
        assert_eq!(client.read_line(&cancel).await.unwrap(), "the second line");
    }

    #[tokio::test]
    async fn times_out_without_output() {
        let (client, _engine) = pipe();

        let err = client
            .read_line(&Cancel::after(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(client.queued(), 0);
    }

    #[tokio::test]
    async fn partial_line_is_not_surfaced_on_timeout() {
        let (client, mut engine) = pipe();
        engine.write_all(b"bestmove e2").await.unwrap();

        let err = client
            .read_line(&Cancel::after(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        engine.write_all(b"e4\n").await.unwrap();
        assert_eq!(client.read_line(&soon()).await.unwrap(), "bestmove e2e4");
    }

    #[tokio::test]
    async fn output_more_than_double_the_buffer() {
        let (client, mut engine) = pipe();
        client.set_buffer_size(4);
        engine.write_all(b"123456789\n").await.unwrap();

        assert_eq!(client.read_line(&soon()).await.unwrap(), "123456789");
    }

    #[tokio::test]
    async fn output_one_and_a_half_times_the_buffer() {
        let (client, mut engine) = pipe();
        client.set_buffer_size(6);
        engine.write_all(b"123456789\n").await.unwrap();

        assert_eq!(client.read_line(&soon()).await.unwrap(), "123456789");
    }

    #[tokio::test]
    async fn output_exactly_the_buffer() {
        let (client, mut engine) = pipe();
        client.set_buffer_size(8);
        engine.write_all(b"readyok\n").await.unwrap();

        assert_eq!(client.read_line(&soon()).await.unwrap(), "readyok");
    }

    #[tokio::test]
    async fn lines_wrapping_into_the_next_buffer() {
        let (client, mut engine) = pipe();
        client.set_buffer_size(4);
        engine.write_all(b"a\nbcdef\nghk\n").await.unwrap();

        assert_eq!(client.read_line(&soon()).await.unwrap(), "a");
        assert_eq!(client.read_line(&soon()).await.unwrap(), "bcdef");
        assert_eq!(client.read_line(&soon()).await.unwrap(), "ghk");
    }

    #[tokio::test]
    async fn unterminated_line_delivered_at_end_of_stream() {
        let (client, mut engine) = pipe();
        engine
            .write_all(b"info string ok\nNo such option: NotAnOption")
            .await
            .unwrap();
        drop(engine);

        assert_eq!(client.read_line(&soon()).await.unwrap(), "info string ok");
        assert_eq!(
            client.read_line(&soon()).await.unwrap(),
            "No such option: NotAnOption"
        );
        assert!(matches!(
            client.read_line(&soon()).await,
            Err(Error::StreamClosed)
        ));
        assert!(!client.is_reading());
    }

    #[tokio::test]
    async fn write_line_appends_terminator() {
        let (client, engine) = pipe();
        client.write_line("isready").await.unwrap();

        let mut engine = BufReader::new(engine);
        let mut received = String::new();
        engine.read_line(&mut received).await.unwrap();
        assert_eq!(received, "isready\n");
    }

    #[tokio::test]
    async fn write_flushes_stale_lines() {
        let (client, mut engine) = pipe();
        engine.write_all(b"stale one\nstale two\n").await.unwrap();
        assert_eq!(client.read_line(&soon()).await.unwrap(), "stale one");

        // Let the reader queue the second line before the next command.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(client.queued(), 1);

        client.write_line("isready").await.unwrap();
        assert_eq!(client.queued(), 0);

        engine.write_all(b"readyok\n").await.unwrap();
        assert_eq!(client.read_line(&soon()).await.unwrap(), "readyok");
    }

    #[tokio::test]
    async fn write_keeps_lines_without_flush_on_write() {
        let (client, mut engine) = pipe();
        client.set_flush_on_write(false);
        assert!(!client.flush_on_write());

        engine.write_all(b"first\nsecond\n").await.unwrap();
        assert_eq!(client.read_line(&soon()).await.unwrap(), "first");
        tokio::time::sleep(Duration::from_millis(20)).await;

        client.write_line("isready").await.unwrap();
        assert_eq!(client.read_line(&soon()).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn end_joins_reader_and_rejects_writes() {
        let (client, _engine) = pipe();
        let _ = client.read_line(&Cancel::after(Duration::from_millis(5))).await;
        assert!(client.is_reading());

        client.end().await.unwrap();
        assert!(!client.is_reading());
        assert!(matches!(
            client.write_line("uci").await,
            Err(Error::ProcessExited)
        ));
        assert!(matches!(
            client.read_line(&soon()).await,
            Err(Error::StreamClosed)
        ));
    }

    struct Broken;

    impl AsyncRead for Broken {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }
    }

    #[tokio::test]
    async fn read_failure_is_reported_as_transport_error() {
        let client = LineClient::new(Broken, tokio::io::sink());

        let err = client.read_line(&soon()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!err.is_timeout());
        assert!(!client.is_reading());

        // The next read restarts the reader, which fails the same way.
        let err = client.read_line(&soon()).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn lines_before_a_read_failure_are_delivered_first() {
        use tokio::io::AsyncReadExt;

        let reader = (&b"id name Stockfish\nuciok\n"[..]).chain(Broken);
        let client = LineClient::new(reader, tokio::io::sink());

        assert_eq!(client.read_line(&soon()).await.unwrap(), "id name Stockfish");
        assert_eq!(client.read_line(&soon()).await.unwrap(), "uciok");
        assert!(client.read_line(&soon()).await.unwrap_err().is_transport());
    }

    #[test]
    fn zero_buffer_size_is_clamped() {
        let client = LineClient::new(tokio::io::empty(), tokio::io::sink());
        client.set_buffer_size(0);
        assert_eq!(client.buffer_size(), 1);
    }
}
