use std::io::{ErrorKind, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// Default TCP port of the marker listener.
pub const DEFAULT_MARKER_PORT: u16 = 12345;

/// Byte separating consecutive marker messages on the wire.
pub const MARKER_DELIMITER: u8 = b'\n';

/// Loopback address the marker listener binds to by default.
pub fn default_marker_addr() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_MARKER_PORT))
}

/// Client side of the marker protocol.
///
/// Each label is sent as UTF-8 text followed by a single `\n`. The listener
/// sends nothing back.
#[derive(Debug)]
pub struct MarkerClient {
    stream: TcpStream,
    addr: SocketAddr,
}

impl MarkerClient {
    /// Connect to a marker listener.
    pub fn connect(addr: SocketAddr) -> Result<Self> {
        let stream =
            TcpStream::connect(addr).map_err(|source| TransportError::Connect { addr, source })?;
        // Markers are tiny and latency matters more than throughput.
        stream.set_nodelay(true)?;
        debug!(%addr, "connected to marker listener");
        Ok(Self { stream, addr })
    }

    /// Connect with an upper bound on the connection attempt.
    pub fn connect_timeout(addr: SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|source| TransportError::Connect { addr, source })?;
        stream.set_nodelay(true)?;
        debug!(%addr, "connected to marker listener");
        Ok(Self { stream, addr })
    }

    /// Send one marker label.
    pub fn send(&mut self, label: &str) -> Result<()> {
        let mut payload = Vec::with_capacity(label.len() + 1);
        push_label(&mut payload, label)?;
        self.write_all(&payload)
    }

    /// Send several labels in a single write.
    pub fn send_batch<S: AsRef<str>>(&mut self, labels: &[S]) -> Result<()> {
        let mut payload = Vec::new();
        for label in labels {
            push_label(&mut payload, label.as_ref())?;
        }
        self.write_all(&payload)
    }

    /// Address of the listener this client is connected to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.stream.write(buf) {
                Ok(0) => return Err(TransportError::Shutdown),
                Ok(n) => buf = &buf[n..],
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        self.stream.flush()?;
        Ok(())
    }
}

fn push_label(dst: &mut Vec<u8>, label: &str) -> Result<()> {
    if label.as_bytes().contains(&MARKER_DELIMITER) {
        return Err(TransportError::InvalidLabel(label.to_string()));
    }
    dst.extend_from_slice(label.as_bytes());
    dst.push(MARKER_DELIMITER);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn send_appends_delimiter() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).unwrap();
            received
        });

        let mut client = MarkerClient::connect(addr).unwrap();
        assert_eq!(client.peer_addr(), addr);
        client.send("stimulus").unwrap();
        client.send_batch(&["a", "b"]).unwrap();
        drop(client);

        let received = server.join().unwrap();
        assert_eq!(received, b"stimulus\na\nb\n");
    }

    #[test]
    fn label_with_delimiter_is_rejected() {
        let mut payload = Vec::new();
        let err = push_label(&mut payload, "bad\nlabel").unwrap_err();
        assert!(matches!(err, TransportError::InvalidLabel(_)));
        assert!(payload.is_empty());
    }

    #[test]
    fn connect_refused_reports_addr() {
        // Bind then drop to get a port that is very likely closed.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let err = MarkerClient::connect(addr).unwrap_err();
        assert!(matches!(err, TransportError::Connect { addr: a, .. } if a == addr));
    }

    #[test]
    fn default_addr_is_loopback() {
        let addr = default_marker_addr();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), DEFAULT_MARKER_PORT);
    }
}
