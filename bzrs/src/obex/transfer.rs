//! Handle for a single object transfer (`org.bluez.obex.Transfer1`).

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use zbus::Connection;
use zvariant::{OwnedObjectPath, Value};

use crate::Result;
use crate::constants::{bus, interface};
use crate::error::BluezError;
use crate::proxy::{PropertyChanged, ProxyBase};
use crate::utils::broadcast_stream;

/// Progress of one transfer, derived from its property changes.
///
/// `Completed` and `Error` are terminal; the daemon removes the transfer
/// object shortly after either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    /// Bytes moved so far.
    Progress(u64),
    Completed,
    Error,
}

/// Maps one property change to a transfer event. Changes that carry no
/// progress information (queued/active status, session rewrites) map to
/// `None`.
fn derive_event(name: &str, value: &Value<'_>) -> Option<TransferEvent> {
    match name {
        "Transferred" => value.downcast_ref::<u64>().ok().map(TransferEvent::Progress),
        "Status" => match value.downcast_ref::<&str>().ok()? {
            "complete" => Some(TransferEvent::Completed),
            "error" => Some(TransferEvent::Error),
            _ => None,
        },
        _ => None,
    }
}

/// One queued or running transfer.
#[derive(Debug, Clone)]
pub struct Transfer {
    base: Arc<ProxyBase>,
}

impl Transfer {
    pub async fn new(
        conn: &Connection,
        path: impl TryInto<OwnedObjectPath, Error: Into<BluezError>>,
    ) -> Result<Transfer> {
        let path = path.try_into().map_err(Into::into)?;
        let base =
            ProxyBase::get_or_create(conn, bus::OBEX, path, interface::OBEX_TRANSFER).await?;
        Ok(Transfer { base })
    }

    pub fn path(&self) -> &OwnedObjectPath {
        self.base.path()
    }

    /// Name of the object being transferred.
    pub async fn name(&self) -> Result<String> {
        self.base.get("Name").await
    }

    /// Local file backing the transfer, when the daemon exposes one.
    pub async fn filename(&self) -> Result<Option<String>> {
        self.base.get_optional("Filename").await
    }

    /// Total size in bytes; unknown for some streamed objects.
    pub async fn size(&self) -> Result<Option<u64>> {
        self.base.get_optional("Size").await
    }

    /// The session this transfer belongs to.
    pub async fn session(&self) -> Result<OwnedObjectPath> {
        self.base.get("Session").await
    }

    /// Raw property changes, for callers that need more than [`events`].
    ///
    /// [`events`]: Transfer::events
    pub fn subscribe(&self) -> broadcast::Receiver<PropertyChanged> {
        self.base.subscribe()
    }

    /// Progress and terminal events for this transfer, in emission order.
    pub fn events(&self) -> impl Stream<Item = TransferEvent> + Send + use<> {
        broadcast_stream(self.base.subscribe())
            .filter_map(|change| async move { derive_event(&change.name, &change.value) })
    }
}

impl PartialEq for Transfer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.base, &other.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_from_transferred() {
        assert_eq!(
            derive_event("Transferred", &Value::from(4096u64)),
            Some(TransferEvent::Progress(4096))
        );
    }

    #[test]
    fn test_terminal_status_values() {
        assert_eq!(
            derive_event("Status", &Value::from("complete")),
            Some(TransferEvent::Completed)
        );
        assert_eq!(
            derive_event("Status", &Value::from("error")),
            Some(TransferEvent::Error)
        );
    }

    #[test]
    fn test_non_terminal_status_is_ignored() {
        assert_eq!(derive_event("Status", &Value::from("queued")), None);
        assert_eq!(derive_event("Status", &Value::from("active")), None);
    }

    #[test]
    fn test_unrelated_properties_are_ignored() {
        assert_eq!(derive_event("Session", &Value::from("/org/bluez/obex/server/session0")), None);
        assert_eq!(derive_event("Size", &Value::from(123u64)), None);
    }

    #[test]
    fn test_mistyped_transferred_is_ignored() {
        // A u32 where the contract says u64 is not progress.
        assert_eq!(derive_event("Transferred", &Value::from(4096u32)), None);
    }
}
