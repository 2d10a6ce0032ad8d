//! Interface-wide property watching.
//!
//! A per-object handle only hears about the object it stands in for. The
//! [`AnyInterfaceWatcher`] instead installs one bus-wide match for
//! `PropertiesChanged` signals from a service and re-emits every change on
//! a chosen interface, whichever object it happened on. Useful for reacting
//! to devices that were never individually resolved.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use log::debug;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use zbus::message::Type as MessageType;
use zbus::{Connection, MatchRule, MessageStream};
use zvariant::{OwnedObjectPath, Value};

use crate::Result;
use crate::constants::{bus, interface};
use crate::error::BluezError;
use crate::proxy::PropertyChanged;
use crate::utils::lock;

const EVENT_CAPACITY: usize = 64;

/// Watches property changes on every object of one interface.
///
/// The watcher stops when [`close`](AnyInterfaceWatcher::close) is called or
/// the watcher is dropped; subscribed receivers then run dry after draining
/// what was already queued.
#[derive(Debug)]
pub struct AnyInterfaceWatcher {
    interface: &'static str,
    events: broadcast::Sender<PropertyChanged>,
    watch: Mutex<Option<JoinHandle<()>>>,
}

impl AnyInterfaceWatcher {
    /// Watches `interface` on every object of the service at `service`.
    pub async fn new(
        conn: &Connection,
        service: &'static str,
        interface: &'static str,
    ) -> Result<AnyInterfaceWatcher> {
        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .sender(service)
            .map_err(zbus::Error::from)?
            .interface("org.freedesktop.DBus.Properties")
            .map_err(zbus::Error::from)?
            .member("PropertiesChanged")
            .map_err(zbus::Error::from)?
            .build();
        let mut stream = MessageStream::for_match_rule(rule, conn, Some(EVENT_CAPACITY))
            .await
            .map_err(BluezError::from)?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let watch = {
            let events = events.clone();
            tokio::spawn(async move {
                while let Some(maybe) = stream.next().await {
                    let Ok(msg) = maybe else { continue };
                    let header = msg.header();
                    let Some(path) = header.path() else { continue };
                    let path: OwnedObjectPath = path.clone().into();

                    let body = msg.body();
                    let decoded: (String, HashMap<String, Value<'_>>, Vec<String>) =
                        match body.deserialize() {
                            Ok(decoded) => decoded,
                            Err(err) => {
                                debug!("{path}: undecodable PropertiesChanged: {err}");
                                continue;
                            }
                        };
                    let (changed_interface, changed, _invalidated) = decoded;
                    if changed_interface != interface {
                        continue;
                    }
                    for (name, value) in changed {
                        let owned = match value.try_to_owned() {
                            Ok(owned) => Arc::new(owned),
                            Err(err) => {
                                debug!("{path} {name}: value not representable: {err}");
                                continue;
                            }
                        };
                        let _ = events.send(PropertyChanged {
                            path: path.clone(),
                            interface: changed_interface.clone(),
                            name,
                            value: owned,
                        });
                    }
                }
            })
        };

        Ok(AnyInterfaceWatcher {
            interface,
            events,
            watch: Mutex::new(Some(watch)),
        })
    }

    /// Watches `org.bluez.Device1` on all devices.
    pub async fn devices(conn: &Connection) -> Result<AnyInterfaceWatcher> {
        Self::new(conn, bus::BLUEZ, interface::DEVICE).await
    }

    /// Watches `org.bluez.Adapter1` on all adapters.
    pub async fn adapters(conn: &Connection) -> Result<AnyInterfaceWatcher> {
        Self::new(conn, bus::BLUEZ, interface::ADAPTER).await
    }

    /// Watches `org.bluez.Network1` on all devices.
    pub async fn networks(conn: &Connection) -> Result<AnyInterfaceWatcher> {
        Self::new(conn, bus::BLUEZ, interface::NETWORK).await
    }

    /// The watched interface.
    pub fn interface(&self) -> &'static str {
        self.interface
    }

    /// Subscribes to changes on any object of the watched interface.
    pub fn subscribe(&self) -> broadcast::Receiver<PropertyChanged> {
        self.events.subscribe()
    }

    /// Stops watching. Safe to call any number of times; calls after the
    /// first do nothing.
    pub fn close(&self) {
        if let Some(watch) = lock(&self.watch).take() {
            debug!("closing {} watcher", self.interface);
            watch.abort();
        }
    }
}

impl Drop for AnyInterfaceWatcher {
    fn drop(&mut self) {
        self.close();
    }
}
