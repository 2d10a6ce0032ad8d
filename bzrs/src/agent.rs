//! Handle for BlueZ agent registration (`org.bluez.AgentManager1`).
//!
//! Pairing agents are out-of-process objects; this handle only registers
//! and unregisters their paths with the daemon.

use std::sync::Arc;

use zbus::Connection;
use zvariant::ObjectPath;

use crate::Result;
use crate::constants::{bus, interface, path};
use crate::proxy::ProxyBase;

/// The agent manager at `/org/bluez`.
#[derive(Debug, Clone)]
pub struct AgentManager {
    base: Arc<ProxyBase>,
}

impl AgentManager {
    pub async fn new(conn: &Connection) -> Result<AgentManager> {
        let base =
            ProxyBase::get_or_create(conn, bus::BLUEZ, path::BLUEZ.try_into()?, interface::AGENT_MANAGER)
                .await?;
        Ok(AgentManager { base })
    }

    /// Registers an agent object.
    ///
    /// `capability` describes the agent's input/output abilities (e.g.
    /// "KeyboardDisplay", or empty for the default). With `request_default`
    /// the agent is additionally requested as the system default.
    pub async fn register_agent(
        &self,
        agent_path: &ObjectPath<'_>,
        capability: &str,
        request_default: bool,
    ) -> Result<()> {
        self.base
            .call::<_, ()>("RegisterAgent", &(agent_path, capability))
            .await?;
        if request_default {
            self.base
                .call::<_, ()>("RequestDefaultAgent", &(agent_path,))
                .await?;
        }
        Ok(())
    }

    pub async fn unregister_agent(&self, agent_path: &ObjectPath<'_>) -> Result<()> {
        self.base.call("UnregisterAgent", &(agent_path,)).await
    }
}
