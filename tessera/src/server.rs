//! The server lifecycle: bind, accept, shut down.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use tessera_core::World;

use crate::config::Config;
use crate::network::Connection;

/// How long shutdown waits for in-flight work before giving up.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The listening server.
pub struct TesseraServer {
    tcp_listener: TcpListener,
    cancel_token: CancellationToken,
    client_id: u64,
    world: Arc<World>,
    config: Arc<Config>,
    tracker: TaskTracker,
}

impl TesseraServer {
    /// Binds the listener. A bind failure refuses startup.
    pub async fn bind(config: Arc<Config>, world: Arc<World>) -> io::Result<Self> {
        let address = SocketAddr::from(([0, 0, 0, 0], config.port));
        let tcp_listener = TcpListener::bind(address).await?;
        log::info!("listening on {}", tcp_listener.local_addr()?);
        Ok(Self {
            tcp_listener,
            cancel_token: CancellationToken::new(),
            client_id: 0,
            world,
            config,
            tracker: TaskTracker::new(),
        })
    }

    /// The bound address (useful when the configured port is 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp_listener.local_addr()
    }

    /// A handle that stops the accept loop and every connection.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Accepts connections until the token fires.
    pub async fn run(&mut self) {
        loop {
            select! {
                () = self.cancel_token.cancelled() => break,
                accept_result = self.tcp_listener.accept() => {
                    let Ok((connection, address)) = accept_result else {
                        continue;
                    };
                    if let Err(e) = connection.set_nodelay(true) {
                        log::warn!("failed to set TCP_NODELAY: {e}");
                    }
                    Connection::spawn(
                        connection,
                        address,
                        self.client_id,
                        self.cancel_token.child_token(),
                        self.world.clone(),
                        self.config.clone(),
                        self.tracker.clone(),
                    );
                    log::info!("accepted connection from {address} (id {})", self.client_id);
                    self.client_id = self.client_id.wrapping_add(1);
                }
            }
        }
    }

    /// Orderly shutdown: stop everything, drain workers with a bounded
    /// wait, save the world, close the region files.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        self.tracker.close();
        if tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, self.tracker.wait())
            .await
            .is_err()
        {
            log::warn!("shutdown: drain timed out, abandoning outstanding tasks");
        }

        let world = self.world.clone();
        let saved = tokio::task::spawn_blocking(move || world.save_all())
            .await
            .unwrap_or(0);
        log::info!("shutdown: saved {saved} chunks");

        if let Err(e) = self.world.close_storage() {
            log::error!("shutdown: closing region files failed: {e}");
        }
    }
}
