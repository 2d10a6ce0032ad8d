//! Object registry for the BlueZ daemon.
//!
//! Subscribes once to the daemon's object-manager broadcasts at `/`,
//! classifies appearing and disappearing objects by their primary
//! interface, and re-emits typed lifecycle events. Also provides
//! enumeration of the current object tree.

use futures::{Stream, StreamExt};
use log::debug;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use zbus::Connection;
use zbus::fdo::ObjectManagerProxy;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::adapter::Adapter;
use crate::constants::{bus, interface};
use crate::device::Device;
use crate::error::BluezError;

const EVENT_CAPACITY: usize = 64;

/// Lifecycle events for adapters and devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    AdapterAdded(OwnedObjectPath),
    AdapterRemoved(OwnedObjectPath),
    DeviceCreated(OwnedObjectPath),
    DeviceRemoved(OwnedObjectPath),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectRole {
    Adapter,
    Device,
}

/// Classification order; the adapter interface wins over the device one.
static ROLES: &[(&str, ObjectRole)] = &[
    (interface::ADAPTER, ObjectRole::Adapter),
    (interface::DEVICE, ObjectRole::Device),
];

fn classify(interfaces: &[&str]) -> Option<ObjectRole> {
    crate::utils::classify(ROLES, interfaces)
}

/// Whether `path` sits at or below `base` on an object-path boundary.
fn is_under(path: &str, base: &str) -> bool {
    if base == "/" {
        return true;
    }
    match path.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

/// The registry of remote BlueZ objects.
///
/// Dropping the manager releases its object-manager subscription; events
/// already queued on subscribed receivers remain readable.
#[derive(Debug)]
pub struct Manager {
    conn: Connection,
    object_manager: ObjectManagerProxy<'static>,
    events: broadcast::Sender<ManagerEvent>,
    watch: JoinHandle<()>,
}

impl Manager {
    /// Connects to the daemon's object tree and starts listening for
    /// object add/remove broadcasts.
    pub async fn new(conn: &Connection) -> Result<Manager> {
        let object_manager = ObjectManagerProxy::builder(conn)
            .destination(bus::BLUEZ)
            .map_err(BluezError::from)?
            .path("/")
            .map_err(BluezError::from)?
            .build()
            .await
            .map_err(BluezError::from)?;

        let mut added = object_manager
            .receive_interfaces_added()
            .await
            .map_err(BluezError::from)?;
        let mut removed = object_manager
            .receive_interfaces_removed()
            .await
            .map_err(BluezError::from)?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let watch = {
            let events = events.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        maybe = added.next() => {
                            let Some(signal) = maybe else { break };
                            let Ok(args) = signal.args() else { continue };
                            let interfaces: Vec<&str> = args
                                .interfaces_and_properties()
                                .keys()
                                .map(|name| name.as_str())
                                .collect();
                            let path: OwnedObjectPath = args.object_path().clone().into();
                            match classify(&interfaces) {
                                Some(ObjectRole::Adapter) => {
                                    debug!("adapter added: {path}");
                                    let _ = events.send(ManagerEvent::AdapterAdded(path));
                                }
                                Some(ObjectRole::Device) => {
                                    debug!("device created: {path}");
                                    let _ = events.send(ManagerEvent::DeviceCreated(path));
                                }
                                None => {}
                            }
                        }
                        maybe = removed.next() => {
                            let Some(signal) = maybe else { break };
                            let Ok(args) = signal.args() else { continue };
                            let interfaces: Vec<&str> =
                                args.interfaces().iter().map(|name| name.as_str()).collect();
                            let path: OwnedObjectPath = args.object_path().clone().into();
                            match classify(&interfaces) {
                                Some(ObjectRole::Adapter) => {
                                    debug!("adapter removed: {path}");
                                    let _ = events.send(ManagerEvent::AdapterRemoved(path));
                                }
                                Some(ObjectRole::Device) => {
                                    debug!("device removed: {path}");
                                    let _ = events.send(ManagerEvent::DeviceRemoved(path));
                                }
                                None => {}
                            }
                        }
                    }
                }
            })
        };

        Ok(Manager {
            conn: conn.clone(),
            object_manager,
            events,
            watch,
        })
    }

    /// Subscribes to object lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.events.subscribe()
    }

    /// All adapters currently present, in path order.
    pub async fn adapters(&self) -> Result<Vec<Adapter>> {
        let mut paths = self.paths_with_interface(interface::ADAPTER, "/").await?;
        paths.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let mut adapters = Vec::with_capacity(paths.len());
        for path in paths {
            adapters.push(Adapter::new(&self.conn, path).await?);
        }
        Ok(adapters)
    }

    /// Returns the first adapter, or the one matching `pattern` (a path
    /// suffix such as "hci0", or an address).
    pub async fn adapter(&self, pattern: Option<&str>) -> Result<Adapter> {
        let adapters = self.adapters().await?;
        let Some(pattern) = pattern else {
            return adapters
                .into_iter()
                .next()
                .ok_or_else(|| BluezError::NoSuchAdapter("no adapters found".into()));
        };
        for adapter in adapters {
            if adapter.path().as_str().ends_with(pattern) || adapter.address().await? == pattern {
                return Ok(adapter);
            }
        }
        Err(BluezError::NoSuchAdapter(format!(
            "no adapter matching {pattern}"
        )))
    }

    /// All known devices.
    pub async fn devices(&self) -> Result<Vec<Device>> {
        self.devices_under("/").await
    }

    /// Devices owned by the adapter at `adapter_path`.
    pub async fn devices_under(&self, adapter_path: &str) -> Result<Vec<Device>> {
        let mut paths = self
            .paths_with_interface(interface::DEVICE, adapter_path)
            .await?;
        paths.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let mut devices = Vec::with_capacity(paths.len());
        for path in paths {
            devices.push(Device::new(&self.conn, path).await?);
        }
        Ok(devices)
    }

    /// Finds a device by address anywhere in the tree.
    pub async fn find_device(&self, address: &str) -> Result<Option<Device>> {
        for device in self.devices().await? {
            if device.address().await? == address {
                return Ok(Some(device));
            }
        }
        Ok(None)
    }

    async fn paths_with_interface(
        &self,
        wanted: &str,
        under: &str,
    ) -> Result<Vec<OwnedObjectPath>> {
        let objects = self
            .object_manager
            .get_managed_objects()
            .await
            .map_err(BluezError::from)?;
        Ok(objects
            .into_iter()
            .filter(|(path, interfaces)| {
                is_under(path.as_str(), under)
                    && interfaces.keys().any(|name| name.as_str() == wanted)
            })
            .map(|(path, _)| path)
            .collect())
    }

    /// Watches the daemon's presence on the bus. Yields `true` when the
    /// name gains an owner and `false` when it loses one.
    pub async fn watch_service(
        conn: &Connection,
    ) -> Result<impl Stream<Item = bool> + Send + use<>> {
        crate::utils::watch_name_owner(conn, bus::BLUEZ).await
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.watch.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_single_role() {
        assert_eq!(
            classify(&[interface::ADAPTER, "org.freedesktop.DBus.Properties"]),
            Some(ObjectRole::Adapter)
        );
        assert_eq!(classify(&[interface::DEVICE]), Some(ObjectRole::Device));
    }

    #[test]
    fn test_classify_priority_order() {
        // An object exposing both roles classifies as the first table entry.
        assert_eq!(
            classify(&[interface::DEVICE, interface::ADAPTER]),
            Some(ObjectRole::Adapter)
        );
    }

    #[test]
    fn test_classify_untracked() {
        assert_eq!(classify(&["org.bluez.GattService1"]), None);
        assert_eq!(classify(&[]), None);
    }

    #[test]
    fn test_is_under() {
        assert!(is_under("/org/bluez/hci0/dev_AA_BB", "/org/bluez/hci0"));
        assert!(is_under("/org/bluez/hci0", "/org/bluez/hci0"));
        assert!(is_under("/org/bluez/hci0/dev_AA_BB", "/"));
        assert!(!is_under("/org/bluez/hci10/dev_AA_BB", "/org/bluez/hci1"));
        assert!(!is_under("/org/bluez/hci0", "/org/bluez/hci1"));
    }
}
