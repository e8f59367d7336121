use std::net::SocketAddr;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use acqsync_frame::MessageAssembler;
use acqsync_transport::{default_marker_addr, TransportError, MARKER_DELIMITER};
use crossbeam_channel::{RecvTimeoutError, Sender};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument, Span};

use crate::error::{MarkerError, Result};
use crate::marker::TimedMarker;
use crate::queue::MarkerSender;

/// Configuration for the marker listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address to bind. Port 0 picks a free port.
    pub addr: SocketAddr,
    /// How long `spawn` waits for the listener to bind.
    pub ready_timeout: Duration,
    /// How long `shutdown` waits for the listener to exit.
    pub join_timeout: Duration,
    /// Read buffer size per connection.
    pub read_chunk: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            addr: default_marker_addr(),
            ready_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
            read_chunk: 64 * 1024,
        }
    }
}

type ReadySignal = Result<SocketAddr>;

/// Handle to a running marker listener.
///
/// The listener runs on its own thread with a single-threaded async runtime
/// and serves any number of connections. Dropping the handle signals it to
/// stop without waiting; call [`MarkerListener::shutdown`] to wait for it.
pub struct MarkerListener {
    local_addr: SocketAddr,
    stop: CancellationToken,
    exited: crossbeam_channel::Receiver<()>,
    thread: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl MarkerListener {
    /// Start the listener and block until it is bound and accepting.
    ///
    /// Markers are pushed into `queue`. Events are recorded inside `span`.
    /// A bind failure is returned here, not swallowed by the listener thread.
    pub fn spawn(config: ListenerConfig, queue: MarkerSender, span: Span) -> Result<Self> {
        let stop = CancellationToken::new();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<ReadySignal>(1);
        let (exit_tx, exit_rx) = crossbeam_channel::bounded::<()>(1);

        let task_stop = stop.clone();
        let task_config = config.clone();
        let thread = std::thread::Builder::new()
            .name("marker-listener".to_string())
            .spawn(move || {
                run(task_config, queue, ready_tx, task_stop, span);
                let _ = exit_tx.send(());
            })
            .map_err(MarkerError::Spawn)?;

        debug!("waiting for marker listener to become ready");
        let local_addr = match ready_rx.recv_timeout(config.ready_timeout) {
            Ok(Ok(addr)) => addr,
            Ok(Err(err)) => {
                let _ = thread.join();
                return Err(err);
            }
            Err(RecvTimeoutError::Timeout) => {
                stop.cancel();
                return Err(MarkerError::ReadyTimeout(config.ready_timeout));
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = thread.join();
                return Err(MarkerError::ListenerExited);
            }
        };
        debug!(%local_addr, "marker listener is ready");

        Ok(Self {
            local_addr,
            stop,
            exited: exit_rx,
            thread: Some(thread),
            join_timeout: config.join_timeout,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the listener thread has already exited.
    pub fn is_finished(&self) -> bool {
        self.thread
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }

    /// Stop the listener and wait (bounded) for it to close every socket and
    /// exit.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop.cancel();
        debug!("waiting for marker listener to stop");

        match self.exited.recv_timeout(self.join_timeout) {
            // Disconnected without a message: the thread is gone (panicked);
            // the join below reports it.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                return Err(MarkerError::JoinTimeout(self.join_timeout));
            }
        }

        if let Some(thread) = self.thread.take() {
            thread.join().map_err(|_| MarkerError::ListenerPanicked)?;
        }
        debug!("marker listener stopped");
        Ok(())
    }
}

impl Drop for MarkerListener {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

impl std::fmt::Debug for MarkerListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerListener")
            .field("local_addr", &self.local_addr)
            .field("stopped", &self.stop.is_cancelled())
            .finish()
    }
}

fn run(
    config: ListenerConfig,
    queue: MarkerSender,
    ready: Sender<ReadySignal>,
    stop: CancellationToken,
    span: Span,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = ready.send(Err(MarkerError::Runtime(err)));
            return;
        }
    };

    runtime.block_on(serve(config, queue, ready, stop).instrument(span));
}

async fn serve(
    config: ListenerConfig,
    queue: MarkerSender,
    ready: Sender<ReadySignal>,
    stop: CancellationToken,
) {
    let listener = match TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(source) => {
            let _ = ready.send(Err(TransportError::Bind {
                addr: config.addr,
                source,
            }
            .into()));
            return;
        }
    };
    let local_addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(err) => {
            let _ = ready.send(Err(TransportError::Io(err).into()));
            return;
        }
    };

    info!(%local_addr, "listening for markers");
    let _ = ready.send(Ok(local_addr));

    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "incoming marker connection");
                    connections.spawn(
                        read_connection(stream, peer, queue.clone(), stop.clone(), config.read_chunk)
                            .in_current_span(),
                    );
                }
                Err(err) => warn!(error = %err, "failed to accept marker connection"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    connections.shutdown().await;
    debug!("marker listener terminated");
}

async fn read_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    queue: MarkerSender,
    stop: CancellationToken,
    read_chunk: usize,
) {
    let mut assembler = MessageAssembler::new(MARKER_DELIMITER);
    let mut chunk = vec![0u8; read_chunk.max(1)];

    loop {
        let read = tokio::select! {
            _ = stop.cancelled() => break,
            read = stream.read(&mut chunk) => read,
        };

        let n = match read {
            Ok(0) => {
                debug!(%peer, pending = assembler.pending(), "marker connection closed");
                break;
            }
            Ok(n) => n,
            Err(err) => {
                warn!(%peer, error = %err, "marker connection failed, closing it");
                break;
            }
        };

        let received_at = SystemTime::now();
        for label in assembler.push(&chunk[..n]) {
            debug!(%peer, %label, "marker received");
            if queue.send(TimedMarker::new(received_at, label)).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::{Ipv4Addr, SocketAddrV4, TcpStream};
    use std::time::Instant;

    use super::*;
    use crate::queue::MarkerQueue;

    fn ephemeral_config() -> ListenerConfig {
        ListenerConfig {
            addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)),
            ..ListenerConfig::default()
        }
    }

    fn collect(queue: &MarkerQueue, expected: usize) -> Vec<TimedMarker> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut received = Vec::new();
        while received.len() < expected && Instant::now() < deadline {
            received.extend(queue.drain());
            std::thread::sleep(Duration::from_millis(5));
        }
        received
    }

    fn labels(markers: &[TimedMarker]) -> Vec<&str> {
        markers.iter().map(|m| m.label.as_str()).collect()
    }

    #[test]
    fn one_payload_yields_three_markers_in_order() {
        let queue = MarkerQueue::new();
        let listener =
            MarkerListener::spawn(ephemeral_config(), queue.sender(), Span::none()).unwrap();

        let mut client = TcpStream::connect(listener.local_addr()).unwrap();
        client.write_all(b"A\nB\nC\n").unwrap();

        let received = collect(&queue, 3);
        assert_eq!(labels(&received), vec!["A", "B", "C"]);
        // One read, one timestamp.
        assert!(received.iter().all(|m| m.timestamp == received[0].timestamp));

        drop(client);
        listener.shutdown().unwrap();
    }

    #[test]
    fn split_message_waits_for_delimiter() {
        let queue = MarkerQueue::new();
        let listener =
            MarkerListener::spawn(ephemeral_config(), queue.sender(), Span::none()).unwrap();

        let mut client = TcpStream::connect(listener.local_addr()).unwrap();
        client.write_all(b"A\nB").unwrap();
        let first = collect(&queue, 1);
        assert_eq!(labels(&first), vec!["A"]);

        // Nothing more until a delimiter follows "B".
        std::thread::sleep(Duration::from_millis(50));
        assert!(queue.drain().is_empty());

        client.write_all(b"C\n").unwrap();
        let second = collect(&queue, 1);
        assert_eq!(labels(&second), vec!["BC"]);

        drop(client);
        listener.shutdown().unwrap();
    }

    #[test]
    fn connections_are_reassembled_independently() {
        let queue = MarkerQueue::new();
        let listener =
            MarkerListener::spawn(ephemeral_config(), queue.sender(), Span::none()).unwrap();

        let mut first = TcpStream::connect(listener.local_addr()).unwrap();
        let mut second = TcpStream::connect(listener.local_addr()).unwrap();
        first.write_all(b"one-").unwrap();
        second.write_all(b"two\n").unwrap();
        assert_eq!(labels(&collect(&queue, 1)), vec!["two"]);

        first.write_all(b"half\n").unwrap();
        assert_eq!(labels(&collect(&queue, 1)), vec!["one-half"]);

        drop(first);
        drop(second);
        listener.shutdown().unwrap();
    }

    #[test]
    fn closed_connection_does_not_stop_listener() {
        let queue = MarkerQueue::new();
        let listener =
            MarkerListener::spawn(ephemeral_config(), queue.sender(), Span::none()).unwrap();

        {
            let mut client = TcpStream::connect(listener.local_addr()).unwrap();
            client.write_all(b"before\n").unwrap();
        }
        assert_eq!(labels(&collect(&queue, 1)), vec!["before"]);

        let mut client = TcpStream::connect(listener.local_addr()).unwrap();
        client.write_all(b"after\n").unwrap();
        assert_eq!(labels(&collect(&queue, 1)), vec!["after"]);
        assert!(!listener.is_finished());

        drop(client);
        listener.shutdown().unwrap();
    }

    #[test]
    fn shutdown_closes_open_connections_and_releases_port() {
        let queue = MarkerQueue::new();
        let listener =
            MarkerListener::spawn(ephemeral_config(), queue.sender(), Span::none()).unwrap();
        let addr = listener.local_addr();

        let client = TcpStream::connect(addr).unwrap();
        let started = Instant::now();
        listener.shutdown().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));

        // Peer sees EOF once its connection was closed.
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut buf = [0u8; 1];
        let n = std::io::Read::read(&mut &client, &mut buf).unwrap_or(0);
        assert_eq!(n, 0);

        // The port can be bound again.
        let rebound = std::net::TcpListener::bind(addr);
        assert!(rebound.is_ok());
    }

    #[test]
    fn bind_failure_is_returned_from_spawn() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ListenerConfig {
            addr: occupied.local_addr().unwrap(),
            ..ListenerConfig::default()
        };

        let queue = MarkerQueue::new();
        let err = MarkerListener::spawn(config, queue.sender(), Span::none()).unwrap_err();
        assert!(matches!(
            err,
            MarkerError::Transport(TransportError::Bind { .. })
        ));
    }
}
