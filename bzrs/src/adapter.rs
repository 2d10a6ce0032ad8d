//! Handle for a local Bluetooth adapter (`org.bluez.Adapter1`).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use zbus::Connection;
use zvariant::{OwnedObjectPath, OwnedValue};

use crate::Result;
use crate::constants::{bus, interface};
use crate::device::Device;
use crate::error::BluezError;
use crate::network::NetworkServer;
use crate::proxy::{PropertyChanged, ProxyBase};

/// A local adapter, e.g. `/org/bluez/hci0`.
#[derive(Debug, Clone)]
pub struct Adapter {
    base: Arc<ProxyBase>,
}

impl Adapter {
    /// Returns the handle for the adapter at `path`.
    ///
    /// Handles are singletons per path; constructing twice yields the same
    /// underlying handle.
    pub async fn new(
        conn: &Connection,
        path: impl TryInto<OwnedObjectPath, Error: Into<BluezError>>,
    ) -> Result<Adapter> {
        let path = path.try_into().map_err(Into::into)?;
        let base = ProxyBase::get_or_create(conn, bus::BLUEZ, path, interface::ADAPTER).await?;
        Ok(Adapter { base })
    }

    pub fn path(&self) -> &OwnedObjectPath {
        self.base.path()
    }

    /// Subscribes to property changes on this adapter.
    pub fn subscribe(&self) -> broadcast::Receiver<PropertyChanged> {
        self.base.subscribe()
    }

    pub async fn start_discovery(&self) -> Result<()> {
        self.base.call("StartDiscovery", &()).await
    }

    pub async fn stop_discovery(&self) -> Result<()> {
        self.base.call("StopDiscovery", &()).await
    }

    /// Removes a remote device and its pairing information.
    pub async fn remove_device(&self, device: &Device) -> Result<()> {
        self.base.call("RemoveDevice", &(device.path(),)).await
    }

    pub async fn address(&self) -> Result<String> {
        self.base.get("Address").await
    }

    /// The friendly name (alias) of the adapter.
    pub async fn name(&self) -> Result<String> {
        self.base.get("Alias").await
    }

    pub async fn set_name(&self, name: &str) -> Result<()> {
        self.base.set("Alias", name).await
    }

    pub async fn powered(&self) -> Result<bool> {
        self.base.get("Powered").await
    }

    pub async fn set_powered(&self, powered: bool) -> Result<()> {
        self.base.set("Powered", powered).await
    }

    pub async fn discoverable(&self) -> Result<bool> {
        self.base.get("Discoverable").await
    }

    pub async fn set_discoverable(&self, discoverable: bool) -> Result<()> {
        self.base.set("Discoverable", discoverable).await
    }

    pub async fn discovering(&self) -> Result<bool> {
        self.base.get("Discovering").await
    }

    /// All adapter properties, with fallback defaults injected for any the
    /// service did not report.
    pub async fn properties(&self) -> Result<HashMap<String, OwnedValue>> {
        self.base.get_all().await
    }

    /// Registers a network bridge on the adapter's NAP/GN/PANU server.
    pub async fn register_network(&self, uuid: &str, bridge: &str) -> Result<()> {
        let server =
            NetworkServer::new(self.base.connection(), self.base.path().clone()).await?;
        server.register(uuid, bridge).await
    }

    /// Unregisters a previously registered network bridge.
    pub async fn unregister_network(&self, uuid: &str) -> Result<()> {
        let server =
            NetworkServer::new(self.base.connection(), self.base.path().clone()).await?;
        server.unregister(uuid).await
    }
}

impl PartialEq for Adapter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.base, &other.base)
    }
}
