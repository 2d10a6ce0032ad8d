//! Handle for the network server interface an adapter exposes
//! (`org.bluez.NetworkServer1`).

use std::sync::Arc;

use zbus::Connection;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::constants::{bus, interface};
use crate::error::BluezError;
use crate::proxy::ProxyBase;

/// The NAP/GN/PANU server living on an adapter path.
#[derive(Debug, Clone)]
pub struct NetworkServer {
    base: Arc<ProxyBase>,
}

impl NetworkServer {
    pub async fn new(
        conn: &Connection,
        path: impl TryInto<OwnedObjectPath, Error: Into<BluezError>>,
    ) -> Result<NetworkServer> {
        let path = path.try_into().map_err(Into::into)?;
        let base =
            ProxyBase::get_or_create(conn, bus::BLUEZ, path, interface::NETWORK_SERVER).await?;
        Ok(NetworkServer { base })
    }

    pub fn path(&self) -> &OwnedObjectPath {
        self.base.path()
    }

    /// Registers `bridge` as the server for the role named by `uuid`
    /// ("nap", "gn", or "panu").
    pub async fn register(&self, uuid: &str, bridge: &str) -> Result<()> {
        self.base.call("Register", &(uuid, bridge)).await
    }

    pub async fn unregister(&self, uuid: &str) -> Result<()> {
        self.base.call("Unregister", &(uuid,)).await
    }
}
