//! Handle for an established transfer session (`org.bluez.obex.Session1`).

use std::sync::Arc;

use zbus::Connection;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::constants::{bus, interface};
use crate::error::BluezError;
use crate::proxy::ProxyBase;

/// A session created through [`Client::create_session`](super::Client::create_session).
#[derive(Debug, Clone)]
pub struct Session {
    base: Arc<ProxyBase>,
}

impl Session {
    pub async fn new(
        conn: &Connection,
        path: impl TryInto<OwnedObjectPath, Error: Into<BluezError>>,
    ) -> Result<Session> {
        let path = path.try_into().map_err(Into::into)?;
        let base = ProxyBase::get_or_create(conn, bus::OBEX, path, interface::OBEX_SESSION).await?;
        Ok(Session { base })
    }

    pub fn path(&self) -> &OwnedObjectPath {
        self.base.path()
    }

    /// Address of the remote device the session is connected to.
    pub async fn address(&self) -> Result<String> {
        self.base.get("Destination").await
    }

    /// The remote folder the session is rooted at.
    pub async fn root(&self) -> Result<String> {
        self.base.get("Root").await
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.base, &other.base)
    }
}
