//! Handle for a remote Bluetooth device (`org.bluez.Device1`).
//!
//! The per-profile network client (`org.bluez.Network1`) lives on the same
//! object path and is reached through its own handle on demand.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;
use zbus::Connection;
use zvariant::{OwnedObjectPath, OwnedValue};

use crate::Result;
use crate::constants::{bus, interface, service_class};
use crate::error::BluezError;
use crate::proxy::{PropertyChanged, ProxyBase};
use crate::utils::short_uuid;

/// A remote device, e.g. `/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF`.
#[derive(Debug, Clone)]
pub struct Device {
    base: Arc<ProxyBase>,
}

impl Device {
    /// Returns the handle for the device at `path`.
    ///
    /// Handles are singletons per path; constructing twice yields the same
    /// underlying handle.
    pub async fn new(
        conn: &Connection,
        path: impl TryInto<OwnedObjectPath, Error: Into<BluezError>>,
    ) -> Result<Device> {
        let path = path.try_into().map_err(Into::into)?;
        let base = ProxyBase::get_or_create(conn, bus::BLUEZ, path, interface::DEVICE).await?;
        Ok(Device { base })
    }

    pub fn path(&self) -> &OwnedObjectPath {
        self.base.path()
    }

    /// Subscribes to property changes on this device.
    pub fn subscribe(&self) -> broadcast::Receiver<PropertyChanged> {
        self.base.subscribe()
    }

    /// Initiates pairing. May take a long time; the wait is unbounded.
    pub async fn pair(&self) -> Result<()> {
        self.base.call("Pair", &()).await
    }

    /// Connects all connectable profiles.
    pub async fn connect(&self) -> Result<()> {
        self.base.call("Connect", &()).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.base.call("Disconnect", &()).await
    }

    async fn network(&self) -> Result<Arc<ProxyBase>> {
        ProxyBase::get_or_create(
            self.base.connection(),
            bus::BLUEZ,
            self.base.path().clone(),
            interface::NETWORK,
        )
        .await
    }

    /// Connects the network profile named by `uuid` ("nap", "gn" or "panu").
    /// Returns the name of the local network interface created for it.
    pub async fn connect_network(&self, uuid: &str) -> Result<String> {
        self.network().await?.call("Connect", &(uuid,)).await
    }

    pub async fn disconnect_network(&self) -> Result<()> {
        self.network().await?.call("Disconnect", &()).await
    }

    pub async fn network_connected(&self) -> Result<bool> {
        self.network().await?.get("Connected").await
    }

    /// The local interface name of the active network connection.
    pub async fn network_interface(&self) -> Result<String> {
        self.network().await?.get("Interface").await
    }

    pub async fn address(&self) -> Result<String> {
        self.base.get("Address").await
    }

    pub async fn alias(&self) -> Result<String> {
        self.base.get("Alias").await
    }

    pub async fn set_alias(&self, alias: &str) -> Result<()> {
        self.base.set("Alias", alias).await
    }

    pub async fn paired(&self) -> Result<bool> {
        self.base.get("Paired").await
    }

    pub async fn connected(&self) -> Result<bool> {
        self.base.get("Connected").await
    }

    pub async fn trusted(&self) -> Result<bool> {
        self.base.get("Trusted").await
    }

    pub async fn set_trusted(&self, trusted: bool) -> Result<()> {
        self.base.set("Trusted", trusted).await
    }

    /// Icon name; falls back to `"generic"` when the service reports none.
    pub async fn icon(&self) -> Result<String> {
        self.base.get("Icon").await
    }

    /// Class of device; falls back to `0` when the service reports none.
    pub async fn device_class(&self) -> Result<u32> {
        self.base.get("Class").await
    }

    /// GAP appearance; falls back to `0` when the service reports none.
    pub async fn appearance(&self) -> Result<u16> {
        self.base.get("Appearance").await
    }

    /// Advertised service UUIDs.
    pub async fn uuids(&self) -> Result<Vec<String>> {
        self.base.get("UUIDs").await
    }

    /// The name to show for this device: its alias with surrounding
    /// whitespace trimmed.
    pub async fn display_name(&self) -> Result<String> {
        Ok(self.alias().await?.trim().to_string())
    }

    /// Whether the device advertises the Object Push Profile.
    pub async fn has_object_push(&self) -> Result<bool> {
        let uuids = self.uuids().await?;
        Ok(advertises_service(&uuids, service_class::OBEX_OBJECT_PUSH))
    }

    /// All device properties, with fallback defaults injected for any the
    /// service did not report.
    pub async fn properties(&self) -> Result<HashMap<String, OwnedValue>> {
        self.base.get_all().await
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.base, &other.base)
    }
}

/// Whether any advertised UUID resolves to the given SDP service class.
/// Malformed UUID strings are skipped.
fn advertises_service(uuids: &[String], service: u32) -> bool {
    uuids.iter().any(|raw| {
        Uuid::parse_str(raw)
            .ok()
            .and_then(|uuid| short_uuid(&uuid))
            .is_some_and(|assigned| assigned == service)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertises_object_push() {
        let uuids = vec![
            "0000110a-0000-1000-8000-00805f9b34fb".to_string(), // audio source
            "00001105-0000-1000-8000-00805f9b34fb".to_string(), // object push
        ];
        assert!(advertises_service(&uuids, service_class::OBEX_OBJECT_PUSH));
    }

    #[test]
    fn test_no_object_push() {
        let uuids = vec![
            "0000110a-0000-1000-8000-00805f9b34fb".to_string(),
            "0000111e-0000-1000-8000-00805f9b34fb".to_string(),
        ];
        assert!(!advertises_service(&uuids, service_class::OBEX_OBJECT_PUSH));
    }

    #[test]
    fn test_vendor_uuids_are_not_object_push() {
        // Same assigned-number prefix, but not derived from the base UUID.
        let uuids = vec!["00001105-0000-1000-8000-00805f9b34fc".to_string()];
        assert!(!advertises_service(&uuids, service_class::OBEX_OBJECT_PUSH));
    }

    #[test]
    fn test_malformed_uuid_is_skipped() {
        let uuids = vec!["not-a-uuid".to_string()];
        assert!(!advertises_service(&uuids, service_class::OBEX_OBJECT_PUSH));
    }
}
