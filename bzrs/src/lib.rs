//! A Rust library for talking to BlueZ over D-Bus.
//!
//! This crate provides high-level async handles for the two BlueZ daemons:
//!
//! - Adapters and devices: discovery, pairing, connecting, PAN networking
//! - Agent registration for pairing and for incoming-object authorization
//! - Object push over the transfer daemon, with per-transfer progress events
//! - Object registries that turn object-manager broadcasts into typed
//!   lifecycle events
//!
//! # Example
//!
//! ```no_run
//! use bzrs::Manager;
//!
//! # async fn example() -> bzrs::Result<()> {
//! let conn = zbus::Connection::system().await?;
//! let manager = Manager::new(&conn).await?;
//!
//! let adapter = manager.adapter(None).await?;
//! adapter.start_discovery().await?;
//!
//! for device in manager.devices().await? {
//!     println!("{} ({})", device.display_name().await?, device.address().await?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, BluezError>`. Errors the daemons report
//! by name (`org.bluez.Error.*`) are mapped to specific variants; anything
//! unrecognized lands in [`BluezError::Generic`] with the raw text intact.
//!
//! # Signal-Based State Monitoring
//!
//! This crate uses D-Bus signals instead of polling. Every handle keeps a
//! `PropertiesChanged` subscription for its object, and the managers turn
//! object-manager broadcasts into typed events. Handles are per-path
//! singletons, so repeated lookups share one subscription.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To
//! see log output, add a logging implementation like `env_logger`.

// Internal implementation modules
mod constants;
mod proxy;
mod utils;

// Public API modules
mod adapter;
mod agent;
mod device;
mod error;
mod manager;
mod network;
pub mod obex;
mod watcher;

// Re-exported public API
pub use adapter::Adapter;
pub use agent::AgentManager;
pub use device::Device;
pub use error::BluezError;
pub use manager::{Manager, ManagerEvent};
pub use network::NetworkServer;
pub use proxy::{PropertyChanged, PropertyValue};
pub use watcher::AnyInterfaceWatcher;

/// Shorthand for results carrying a [`BluezError`].
pub type Result<T> = std::result::Result<T, BluezError>;
