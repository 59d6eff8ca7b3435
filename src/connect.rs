//! Session establishment against a share transport

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::ConnectError;
use crate::session::{SessionSlot, ShareSession};
use crate::share::{Credentials, MountOptions, ShareTransport, ShareUrl};

/// Establishes authenticated sessions.
///
/// The mount choices are hard-coded at [`MountOptions::default`]; only
/// the handshake timeout comes from configuration. There are no retries:
/// one attempt, one result.
pub struct Connector {
    transport: Arc<dyn ShareTransport>,
    connect_timeout: Duration,
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl Connector {
    pub fn new(transport: Arc<dyn ShareTransport>) -> Self {
        Self {
            transport,
            connect_timeout: ClientConfig::default().connect_timeout(),
        }
    }

    pub fn with_config(transport: Arc<dyn ShareTransport>, config: &ClientConfig) -> Self {
        Self {
            transport,
            connect_timeout: config.connect_timeout(),
        }
    }

    /// Authenticate against `smb://<address>` and return the session.
    /// The address is used verbatim when deriving the share URL.
    pub async fn connect(
        &self,
        address: &str,
        credentials: &Credentials,
    ) -> Result<Arc<ShareSession>, ConnectError> {
        let url = ShareUrl::from_address(address);
        let options = MountOptions::default();
        let seconds = self.connect_timeout.as_secs();

        info!("Connecting to {} as '{}'", url, credentials.username);

        let attempt = self.transport.connect(&url, credentials, &options);
        let connection = match timeout(self.connect_timeout, attempt).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(source)) => {
                warn!("Connection to {} failed: {}", url, source);
                return Err(ConnectError::Handshake { url, source });
            }
            Err(_) => {
                warn!("Connection to {} timed out after {}s", url, seconds);
                return Err(ConnectError::Timeout { url, seconds });
            }
        };

        info!("Session established for {}", url);
        Ok(Arc::new(ShareSession::new(connection, url)))
    }

    /// Authenticate and install the session into the slot on success.
    /// On failure the slot keeps whatever it already held.
    pub async fn connect_into(
        &self,
        slot: &SessionSlot,
        address: &str,
        credentials: &Credentials,
    ) -> Result<Arc<ShareSession>, ConnectError> {
        let session = self.connect(address, credentials).await?;
        slot.install(Arc::clone(&session));
        Ok(session)
    }
}
