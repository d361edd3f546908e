//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use broadcast_relay::registry::ClientRegistry;
use broadcast_relay::{RelayConfig, RelayError, RelayServer, Shutdown};

/// A relay started on an ephemeral port, with handles for assertions.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub shutdown: Arc<Shutdown>,
    pub registry: Arc<ClientRegistry>,
    pub task: JoinHandle<Result<(), RelayError>>,
}

/// Start a relay on 127.0.0.1 with an ephemeral port and default settings.
pub async fn start_relay() -> TestRelay {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.shutdown.grace_period_secs = 2;
    start_relay_with(config).await
}

/// Start a relay with the given configuration.
pub async fn start_relay_with(config: RelayConfig) -> TestRelay {
    let server = RelayServer::bind(config).await.expect("bind test relay");
    let addr = server.local_addr().expect("local addr");
    let registry = server.registry();
    let shutdown = Arc::new(Shutdown::new());

    let task = tokio::spawn(server.run(Arc::clone(&shutdown)));

    TestRelay { addr, shutdown, registry, task }
}

/// Connect a test client to the relay.
pub async fn connect(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.expect("connect to relay")
}

/// Read exactly `len` bytes, failing the test if it takes too long.
pub async fn recv_exact(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    tokio::time::timeout(Duration::from_secs(2), stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for payload")
        .expect("read payload");
    buf
}

/// Assert that nothing arrives on `stream` within `window`.
pub async fn expect_silence(stream: &mut TcpStream, window: Duration) {
    let mut buf = [0u8; 64];
    match tokio::time::timeout(window, stream.read(&mut buf)).await {
        Err(_) => {} // timed out: silence, as expected
        Ok(Ok(0)) => panic!("connection closed while expecting silence"),
        Ok(Ok(n)) => panic!("unexpected {} bytes received", n),
        Ok(Err(e)) => panic!("unexpected read error: {}", e),
    }
}

/// Wait for the peer to close the connection (read returns 0).
pub async fn expect_eof(stream: &mut TcpStream, within: Duration) {
    let mut buf = [0u8; 64];
    loop {
        let n = tokio::time::timeout(within, stream.read(&mut buf))
            .await
            .expect("timed out waiting for close")
            .expect("read while waiting for close");
        if n == 0 {
            return;
        }
        // Drain any payloads still in flight before the close.
    }
}

/// Wait for the socket to close, draining any backlog first.
///
/// Accepts either a clean close or a reset: both mean the relay released
/// the connection.
pub async fn expect_closed(stream: &mut TcpStream, within: Duration) {
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        match tokio::time::timeout(within, stream.read(&mut buf))
            .await
            .expect("timed out waiting for the relay to release the connection")
        {
            Ok(0) | Err(_) => return,
            Ok(_) => {} // buffered payload still draining
        }
    }
}

/// Poll `predicate` until it holds or the timeout elapses.
pub async fn wait_until<F: Fn() -> bool>(predicate: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}
