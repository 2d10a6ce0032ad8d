//! Handle for the transfer daemon's client entry point
//! (`org.bluez.obex.Client1`).

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use zbus::Connection;
use zvariant::{OwnedObjectPath, Value};

use crate::Result;
use crate::constants::{bus, interface, path};
use crate::proxy::ProxyBase;

/// The session factory at `/org/bluez/obex`.
#[derive(Debug, Clone)]
pub struct Client {
    base: Arc<ProxyBase>,
}

impl Client {
    /// Source address meaning "any local adapter".
    pub const ANY_SOURCE: &'static str = "00:00:00:00:00:00";
    /// Target profile for object push.
    pub const TARGET_OPP: &'static str = "opp";

    pub async fn new(conn: &Connection) -> Result<Client> {
        let base =
            ProxyBase::get_or_create(conn, bus::OBEX, path::OBEX.try_into()?, interface::OBEX_CLIENT)
                .await?;
        Ok(Client { base })
    }

    /// Creates a session to `destination` and returns its object path.
    ///
    /// `source` selects the local adapter by address ([`Client::ANY_SOURCE`]
    /// for any) and `target` the remote profile, e.g. [`Client::TARGET_OPP`].
    /// The daemon connects before replying, so the wait spans the whole
    /// link establishment.
    pub async fn create_session(
        &self,
        destination: &str,
        source: &str,
        target: &str,
    ) -> Result<OwnedObjectPath> {
        let mut args: HashMap<&str, Value<'_>> = HashMap::new();
        args.insert("Source", Value::from(source));
        args.insert("Target", Value::from(target));
        let session: OwnedObjectPath = self
            .base
            .call("CreateSession", &(destination, args))
            .await?;
        info!("session to {destination} created at {session}");
        Ok(session)
    }

    /// Tears down a session without waiting for the daemon's reply.
    ///
    /// Removal failures only matter for diagnostics (the daemon reaps
    /// orphaned sessions itself), so they are logged rather than returned.
    pub fn remove_session(&self, session: OwnedObjectPath) {
        let removed = session.clone();
        let failed = session.clone();
        self.base.call_background(
            "RemoveSession",
            (session,),
            move |(): ()| info!("session {removed} removed"),
            move |err| warn!("removing session {failed} failed: {err}"),
        );
    }
}
