//! TCP listener: bind, accept, serve one client at a time.
//!
//! The daemon deliberately has no per-connection tasks.  The beamline is
//! operated by a single control-system script, so the listener keeps the
//! historic service discipline: backlog of one, and each accepted client is
//! served to completion inside the accept loop before the next `accept()`.
//! A second client may sit in the OS queue during a session; further
//! connection attempts are refused by the kernel.
//!
//! Serving inline is also what lets the device registry be plain mutable
//! state: it is lent to one session at a time, with no locks anywhere.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time::timeout;
use tracing::{info, warn};

use beamcom_core::DeviceRegistry;

use crate::infrastructure::network::session::{run_session, SessionEnd};

/// The daemon's listening socket plus the resolved local address.
///
/// Splitting [`bind`](ComServer::bind) from [`serve`](ComServer::serve)
/// lets callers bind port 0 and learn the ephemeral port before any client
/// connects; the integration tests rely on this.
pub struct ComServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ComServer {
    /// Binds the listening socket with SO_REUSEADDR and a backlog of 1.
    ///
    /// SO_REUSEADDR lets a restarted daemon re-bind the port while the old
    /// socket lingers in TIME_WAIT, which is routine on a beamline where
    /// the daemon is bounced between measurement runs.
    ///
    /// # Errors
    ///
    /// Returns an error if `bind_address` is not a valid IP address or the
    /// socket cannot be created, bound, or put into listening state.
    pub async fn bind(bind_address: &str, port: u16) -> anyhow::Result<Self> {
        let ip: IpAddr = bind_address
            .parse()
            .with_context(|| format!("invalid bind address {bind_address:?}"))?;
        let addr = SocketAddr::new(ip, port);

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .context("failed to create TCP socket")?;
        socket
            .set_reuseaddr(true)
            .context("failed to set SO_REUSEADDR")?;
        socket
            .bind(addr)
            .with_context(|| format!("failed to bind {addr}"))?;

        let listener = socket
            .listen(1)
            .with_context(|| format!("failed to listen on {addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("failed to read local address")?;

        info!("listening on {local_addr}");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address the listener actually bound, with any ephemeral port resolved.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop until `running` is cleared.
    ///
    /// The registry is owned here and lent to one session at a time; device
    /// state carries over from connection to connection for the life of the
    /// process.
    ///
    /// # Errors
    ///
    /// This function itself only returns `Ok`: accept failures are logged
    /// and retried, session failures are logged and end that session only.
    /// The `anyhow::Result` return keeps the signature uniform with
    /// [`bind`](ComServer::bind) for the caller in `main`.
    pub async fn serve(
        self,
        mut registry: DeviceRegistry,
        running: Arc<AtomicBool>,
    ) -> anyhow::Result<()> {
        info!("serving {} device(s)", registry.len());

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            // Short timeout so the loop re-checks the flag while idle.
            match timeout(Duration::from_millis(200), self.listener.accept()).await {
                Ok(Ok((stream, peer))) => {
                    // Served inline: the next accept happens only after this
                    // session ends.
                    serve_client(stream, peer, &mut registry, &running).await;
                }
                Ok(Err(e)) => {
                    warn!("accept error: {e}");
                }
                Err(_) => {
                    // Timeout: no connection attempt in the last 200 ms.
                }
            }
        }

        Ok(())
    }
}

/// Top-level handler for a single client connection.
///
/// Wraps [`run_session`] and logs the outcome, so the session loop itself
/// can use `?` for clean error propagation.
async fn serve_client(
    mut stream: TcpStream,
    peer: SocketAddr,
    registry: &mut DeviceRegistry,
    running: &AtomicBool,
) {
    info!("connection established from {peer}");
    match run_session(&mut stream, registry, running).await {
        Ok(SessionEnd::ClosedByCommand) => info!("session {peer}: closed on client request"),
        Ok(SessionEnd::Disconnected) => info!("session {peer}: client disconnected"),
        Ok(SessionEnd::ShutdownRequested) => info!("session {peer}: closed for daemon shutdown"),
        Err(e) => warn!("session {peer}: terminated: {e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
