//! Handle for transfer-side agent registration
//! (`org.bluez.obex.AgentManager1`).
//!
//! The transfer daemon asks its registered agent to authorize incoming
//! objects; like the pairing agent, the agent object itself lives outside
//! this crate.

use std::sync::Arc;

use zbus::Connection;
use zvariant::ObjectPath;

use crate::Result;
use crate::constants::{bus, interface, path};
use crate::proxy::ProxyBase;

/// The agent manager at `/org/bluez/obex`.
#[derive(Debug, Clone)]
pub struct AgentManager {
    base: Arc<ProxyBase>,
}

impl AgentManager {
    pub async fn new(conn: &Connection) -> Result<AgentManager> {
        let base = ProxyBase::get_or_create(
            conn,
            bus::OBEX,
            path::OBEX.try_into()?,
            interface::OBEX_AGENT_MANAGER,
        )
        .await?;
        Ok(AgentManager { base })
    }

    pub async fn register_agent(&self, agent_path: &ObjectPath<'_>) -> Result<()> {
        self.base.call("RegisterAgent", &(agent_path,)).await
    }

    pub async fn unregister_agent(&self, agent_path: &ObjectPath<'_>) -> Result<()> {
        self.base.call("UnregisterAgent", &(agent_path,)).await
    }
}
