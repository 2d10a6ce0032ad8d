//! Constants for the BlueZ and obex D-Bus services.
//!
//! Bus names, object paths, and interface names consumed by this crate,
//! plus the service-class values needed to decode advertised UUIDs.

/// Well-known bus names.
pub mod bus {
    /// The Bluetooth management daemon, on the system bus.
    pub const BLUEZ: &str = "org.bluez";
    /// The object transfer daemon, on the session bus.
    pub const OBEX: &str = "org.bluez.obex";
}

/// Fixed object paths.
pub mod path {
    /// Root of the BlueZ object tree (AgentManager1 lives here).
    pub const BLUEZ: &str = "/org/bluez";
    /// Root of the obex object tree (Client1 and AgentManager1 live here).
    pub const OBEX: &str = "/org/bluez/obex";
}

/// Interface names exposed by the two daemons.
pub mod interface {
    pub const ADAPTER: &str = "org.bluez.Adapter1";
    pub const DEVICE: &str = "org.bluez.Device1";
    pub const NETWORK: &str = "org.bluez.Network1";
    pub const NETWORK_SERVER: &str = "org.bluez.NetworkServer1";
    pub const AGENT_MANAGER: &str = "org.bluez.AgentManager1";

    pub const OBEX_CLIENT: &str = "org.bluez.obex.Client1";
    pub const OBEX_SESSION: &str = "org.bluez.obex.Session1";
    pub const OBEX_TRANSFER: &str = "org.bluez.obex.Transfer1";
    pub const OBEX_OBJECT_PUSH: &str = "org.bluez.obex.ObjectPush1";
    pub const OBEX_AGENT_MANAGER: &str = "org.bluez.obex.AgentManager1";
}

/// SDP service-class identifiers.
pub mod service_class {
    /// Object Push Profile (OPP) service class.
    pub const OBEX_OBJECT_PUSH: u32 = 0x1105;
}

/// Fields two through four of the Bluetooth base UUID
/// `00000000-0000-1000-8000-00805f9b34fb`. A 128-bit service UUID derived
/// from a 16/32-bit assigned number shares these fields; the assigned number
/// is the first field.
pub mod base_uuid {
    pub const MID: u16 = 0x0000;
    pub const HI: u16 = 0x1000;
    pub const TAIL: [u8; 8] = [0x80, 0x00, 0x00, 0x80, 0x5f, 0x9b, 0x34, 0xfb];
}
