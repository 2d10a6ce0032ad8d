//! Small helpers shared across the crate.

use std::sync::{Mutex, MutexGuard};

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use uuid::Uuid;
use zbus::Connection;

use crate::Result;
use crate::constants::base_uuid;
use crate::error::BluezError;

/// Locks a mutex, recovering the guard if a panicking holder poisoned it.
/// All guarded state in this crate stays consistent across panics (plain
/// map inserts/removes), so the poison flag carries no information.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Adapts a broadcast receiver into a `Stream`.
///
/// Lagged slots are skipped (the receiver only misses intermediate values);
/// the stream ends when the sending side is gone.
pub(crate) fn broadcast_stream<T>(rx: broadcast::Receiver<T>) -> impl Stream<Item = T> + Send
where
    T: Clone + Send + 'static,
{
    futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(item) => return Some((item, rx)),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::debug!("broadcast receiver lagged, skipped {missed} events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

/// Resolves an object's role from the interfaces it exposes.
///
/// `table` is an ordered list of `(interface name, role)` pairs evaluated
/// top-down; the first interface present wins. Objects are assumed to
/// expose at most one tracked role, so the order only matters for
/// malformed trees.
pub(crate) fn classify<R: Copy>(table: &[(&str, R)], interfaces: &[&str]) -> Option<R> {
    table
        .iter()
        .find(|(known, _)| interfaces.iter().any(|name| name == known))
        .map(|(_, role)| *role)
}

/// Watches ownership of a well-known bus name. Yields `true` when the name
/// gains an owner and `false` when it loses one.
pub(crate) async fn watch_name_owner(
    conn: &Connection,
    name: &'static str,
) -> Result<impl Stream<Item = bool> + Send + use<>> {
    let dbus = zbus::fdo::DBusProxy::new(conn)
        .await
        .map_err(BluezError::from)?;
    let stream = dbus
        .receive_name_owner_changed()
        .await
        .map_err(BluezError::from)?;
    Ok(stream.filter_map(move |signal| async move {
        let args = signal.args().ok()?;
        if args.name().as_str() != name {
            return None;
        }
        Some(args.new_owner().is_some())
    }))
}

/// Extracts the assigned number from a 128-bit service UUID derived from the
/// Bluetooth base UUID. Returns `None` for vendor-specific UUIDs.
pub(crate) fn short_uuid(uuid: &Uuid) -> Option<u32> {
    let (assigned, mid, hi, tail) = uuid.as_fields();
    if mid == base_uuid::MID && hi == base_uuid::HI && *tail == base_uuid::TAIL {
        Some(assigned)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::service_class;

    #[test]
    fn test_short_uuid_base_derived() {
        let uuid = Uuid::parse_str("00001105-0000-1000-8000-00805f9b34fb").unwrap();
        assert_eq!(short_uuid(&uuid), Some(service_class::OBEX_OBJECT_PUSH));

        let uuid = Uuid::parse_str("0000110b-0000-1000-8000-00805f9b34fb").unwrap();
        assert_eq!(short_uuid(&uuid), Some(0x110b));
    }

    #[test]
    fn test_short_uuid_vendor_specific() {
        let uuid = Uuid::parse_str("f000aa00-0451-4000-b000-000000000000").unwrap();
        assert_eq!(short_uuid(&uuid), None);

        // Right prefix, wrong tail.
        let uuid = Uuid::parse_str("00001105-0000-1000-8000-00805f9b34fc").unwrap();
        assert_eq!(short_uuid(&uuid), None);
    }

    #[test]
    fn test_lock_returns_guard() {
        let mutex = Mutex::new(7);
        assert_eq!(*lock(&mutex), 7);
    }
}
