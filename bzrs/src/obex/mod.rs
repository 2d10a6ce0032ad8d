//! Client side of the object transfer daemon (`org.bluez.obex`).
//!
//! The transfer daemon owns its own bus name and object tree; everything in
//! this module talks to it rather than to the main daemon.

mod agent;
mod client;
mod manager;
mod object_push;
mod session;
mod transfer;

pub use agent::AgentManager;
pub use client::Client;
pub use manager::{Manager, ManagerEvent};
pub use object_push::ObjectPush;
pub use session::Session;
pub use transfer::{Transfer, TransferEvent};
