//! Object registry for the transfer daemon.
//!
//! Mirrors the daemon's object tree at `/`: sessions are announced as
//! lifecycle events, transfers are additionally tracked until they finish.
//! Each tracked transfer gets its own watch that derives a completion
//! event from the transfer's terminal status change.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use log::{debug, warn};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use zbus::Connection;
use zbus::fdo::ObjectManagerProxy;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::constants::{bus, interface};
use crate::error::BluezError;
use crate::utils::lock;

use super::transfer::{Transfer, TransferEvent};

const EVENT_CAPACITY: usize = 64;

/// Lifecycle events for sessions and transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    SessionAdded(OwnedObjectPath),
    SessionRemoved(OwnedObjectPath),
    TransferStarted(OwnedObjectPath),
    /// The daemon removed a transfer that never reached a terminal status.
    TransferRemoved(OwnedObjectPath),
    TransferCompleted {
        path: OwnedObjectPath,
        success: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectRole {
    Transfer,
    Session,
}

/// Classification order; a transfer object also carries session-adjacent
/// interfaces, so the transfer interface is checked first.
static ROLES: &[(&str, ObjectRole)] = &[
    (interface::OBEX_TRANSFER, ObjectRole::Transfer),
    (interface::OBEX_SESSION, ObjectRole::Session),
];

fn classify(interfaces: &[&str]) -> Option<ObjectRole> {
    crate::utils::classify(ROLES, interfaces)
}

/// A tracked transfer: the handle keeping its subscription alive, and the
/// task watching it for a terminal event.
struct TransferEntry {
    transfer: Transfer,
    watch: JoinHandle<()>,
}

type TransferTable = Arc<Mutex<HashMap<String, TransferEntry>>>;

/// The registry of remote transfer-daemon objects.
///
/// Dropping the manager releases its object-manager subscription and every
/// per-transfer watch.
pub struct Manager {
    transfers: TransferTable,
    events: broadcast::Sender<ManagerEvent>,
    watch: JoinHandle<()>,
}

impl Manager {
    /// Connects to the daemon's object tree and starts tracking sessions
    /// and transfers.
    pub async fn new(conn: &Connection) -> Result<Manager> {
        let object_manager = ObjectManagerProxy::builder(conn)
            .destination(bus::OBEX)
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

        let transfers: TransferTable = Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let watch = {
            let conn = conn.clone();
            let transfers = Arc::clone(&transfers);
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
                                Some(ObjectRole::Transfer) => {
                                    track_transfer(&conn, &transfers, &events, path).await;
                                }
                                Some(ObjectRole::Session) => {
                                    debug!("session added: {path}");
                                    let _ = events.send(ManagerEvent::SessionAdded(path));
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
                                Some(ObjectRole::Transfer) => {
                                    // Release the handle and its watch before
                                    // announcing, so subscribers never observe
                                    // a removed transfer as still tracked.
                                    let entry = lock(&transfers).remove(path.as_str());
                                    if let Some(entry) = entry {
                                        entry.watch.abort();
                                        drop(entry.transfer);
                                        debug!("transfer removed: {path}");
                                        let _ = events.send(ManagerEvent::TransferRemoved(path));
                                    }
                                }
                                Some(ObjectRole::Session) => {
                                    debug!("session removed: {path}");
                                    let _ = events.send(ManagerEvent::SessionRemoved(path));
                                }
                                None => {}
                            }
                        }
                    }
                }
            })
        };

        Ok(Manager {
            transfers,
            events,
            watch,
        })
    }

    /// Subscribes to session and transfer lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.events.subscribe()
    }

    /// The tracked transfer at `path`, while it is still running.
    pub fn transfer(&self, path: &str) -> Option<Transfer> {
        lock(&self.transfers)
            .get(path)
            .map(|entry| entry.transfer.clone())
    }

    /// Watches the transfer daemon's presence on the bus. Yields `true`
    /// when the name gains an owner and `false` when it loses one.
    pub async fn watch_service(
        conn: &Connection,
    ) -> Result<impl futures::Stream<Item = bool> + Send + use<>> {
        crate::utils::watch_name_owner(conn, bus::OBEX).await
    }
}

/// Starts tracking a newly announced transfer: builds its handle, watches
/// it for a terminal event, and announces the start.
async fn track_transfer(
    conn: &Connection,
    transfers: &TransferTable,
    events: &broadcast::Sender<ManagerEvent>,
    path: OwnedObjectPath,
) {
    let transfer = match Transfer::new(conn, path.clone()).await {
        Ok(transfer) => transfer,
        Err(err) => {
            warn!("cannot track transfer {path}: {err}");
            return;
        }
    };

    let mut stream = Box::pin(transfer.events());

    // Insert and announce while holding the table lock. A terminal event
    // already queued on the stream blocks on this lock inside the watch, so
    // the entry is always present for the watch to remove, and the start
    // event is observable before any completion event.
    let mut table = lock(transfers);
    let watch = {
        let transfers = Arc::clone(transfers);
        let events = events.clone();
        let path = path.clone();
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                let success = match event {
                    TransferEvent::Completed => true,
                    TransferEvent::Error => false,
                    TransferEvent::Progress(_) => continue,
                };
                // Drop the table entry first: the handle and its
                // subscription must be gone before anyone reacts to the
                // terminal event.
                drop(lock(&transfers).remove(path.as_str()));
                debug!("transfer {path} finished, success={success}");
                let _ = events.send(ManagerEvent::TransferCompleted { path, success });
                break;
            }
        })
    };

    debug!("transfer started: {path}");
    table.insert(path.as_str().to_string(), TransferEntry { transfer, watch });
    let _ = events.send(ManagerEvent::TransferStarted(path));
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.watch.abort();
        for entry in lock(&self.transfers).values() {
            entry.watch.abort();
        }
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("tracked", &lock(&self.transfers).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_roles() {
        assert_eq!(
            classify(&[interface::OBEX_SESSION]),
            Some(ObjectRole::Session)
        );
        assert_eq!(
            classify(&[interface::OBEX_TRANSFER, "org.freedesktop.DBus.Properties"]),
            Some(ObjectRole::Transfer)
        );
    }

    #[test]
    fn test_classify_transfer_wins_over_session() {
        assert_eq!(
            classify(&[interface::OBEX_SESSION, interface::OBEX_TRANSFER]),
            Some(ObjectRole::Transfer)
        );
    }

    #[test]
    fn test_classify_untracked() {
        assert_eq!(classify(&[interface::OBEX_CLIENT]), None);
        assert_eq!(classify(&[]), None);
    }
}
