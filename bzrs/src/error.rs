//! Error taxonomy for BlueZ and obex operations.
//!
//! Both daemons report failures as named D-Bus errors. Every transport-level
//! failure is normalized into [`BluezError`] before it reaches a caller;
//! no raw `zbus` error crosses the public API.

use thiserror::Error;

/// Errors reported by the BlueZ and obex daemons, plus transport failures.
///
/// The named variants correspond to the error names the daemons emit
/// (`org.bluez.Error.*` and friends). Anything outside that closed set is
/// carried verbatim in [`BluezError::Generic`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BluezError {
    #[error("operation failed: {0}")]
    Failed(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    #[error("out of memory: {0}")]
    OutOfMemory(String),
    #[error("no such adapter: {0}")]
    NoSuchAdapter(String),
    #[error("adapter not ready: {0}")]
    NotReady(String),
    #[error("not available: {0}")]
    NotAvailable(String),
    #[error("not connected: {0}")]
    NotConnected(String),
    #[error("connection attempt failed: {0}")]
    ConnectionAttemptFailed(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("does not exist: {0}")]
    DoesNotExist(String),
    #[error("operation in progress: {0}")]
    InProgress(String),
    #[error("no reply from service: {0}")]
    NoReply(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("authentication timed out: {0}")]
    AuthenticationTimeout(String),
    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),
    #[error("authentication canceled: {0}")]
    AuthenticationCanceled(String),
    #[error("unsupported major device class: {0}")]
    UnsupportedMajorClass(String),
    #[error("service unknown: {0}")]
    ServiceUnknown(String),
    /// An error outside the known set, carried verbatim.
    #[error("{0}")]
    Generic(String),
}

/// Maps D-Bus error names to variant constructors.
///
/// Built once, never mutated. The two `org.bluez.serial` entries are
/// aliases the daemon still emits for serial-profile failures.
static ERROR_TABLE: &[(&str, fn(String) -> BluezError)] = &[
    ("org.bluez.Error.Failed", BluezError::Failed),
    ("org.bluez.Error.InvalidArguments", BluezError::InvalidArguments),
    ("org.bluez.Error.NotAuthorized", BluezError::NotAuthorized),
    ("org.bluez.Error.OutOfMemory", BluezError::OutOfMemory),
    ("org.bluez.Error.NoSuchAdapter", BluezError::NoSuchAdapter),
    ("org.bluez.Error.NotReady", BluezError::NotReady),
    ("org.bluez.Error.NotAvailable", BluezError::NotAvailable),
    ("org.bluez.Error.NotConnected", BluezError::NotConnected),
    (
        "org.bluez.serial.Error.ConnectionAttemptFailed",
        BluezError::ConnectionAttemptFailed,
    ),
    ("org.bluez.Error.AlreadyExists", BluezError::AlreadyExists),
    ("org.bluez.Error.DoesNotExist", BluezError::DoesNotExist),
    ("org.bluez.Error.InProgress", BluezError::InProgress),
    ("org.bluez.Error.NoReply", BluezError::NoReply),
    ("org.bluez.Error.NotSupported", BluezError::NotSupported),
    ("org.bluez.Error.AuthenticationFailed", BluezError::AuthenticationFailed),
    ("org.bluez.Error.AuthenticationTimeout", BluezError::AuthenticationTimeout),
    ("org.bluez.Error.AuthenticationRejected", BluezError::AuthenticationRejected),
    ("org.bluez.Error.AuthenticationCanceled", BluezError::AuthenticationCanceled),
    ("org.bluez.serial.Error.NotSupported", BluezError::NotSupported),
    ("org.bluez.Error.UnsupportedMajorClass", BluezError::UnsupportedMajorClass),
    ("org.freedesktop.DBus.Error.ServiceUnknown", BluezError::ServiceUnknown),
];

fn lookup(name: &str) -> Option<fn(String) -> BluezError> {
    ERROR_TABLE
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, ctor)| *ctor)
}

impl BluezError {
    /// Parses a delimited transport error string into a typed error.
    ///
    /// The expected shape is `name:message`, where `name` is a D-Bus error
    /// name. A transport prefix wrapping the name in one more delimited
    /// segment (GDBus produces `prefix:name: message`) is also recognized.
    /// Unrecognized or malformed input yields [`BluezError::Generic`]
    /// carrying the full original string; this never panics.
    pub fn parse(raw: &str) -> BluezError {
        let Some((name, message)) = raw.split_once(':') else {
            return BluezError::Generic(raw.to_string());
        };

        if let Some(ctor) = lookup(name.trim()) {
            return ctor(message.trim().to_string());
        }

        // The name may sit one segment deeper, behind a transport prefix.
        if let Some((inner_name, inner_message)) = message.split_once(':')
            && let Some(ctor) = lookup(inner_name.trim())
        {
            return ctor(inner_message.trim().to_string());
        }

        BluezError::Generic(raw.to_string())
    }
}

impl From<zbus::Error> for BluezError {
    fn from(err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, message, _) => {
                let message = message.unwrap_or_default();
                match lookup(name.as_str()) {
                    Some(ctor) => ctor(message),
                    None => BluezError::Generic(format!("{}: {message}", name.as_str())),
                }
            }
            zbus::Error::FDO(fdo) => (*fdo).into(),
            other => BluezError::Generic(other.to_string()),
        }
    }
}

impl From<zbus::fdo::Error> for BluezError {
    fn from(err: zbus::fdo::Error) -> Self {
        use zbus::fdo::Error as Fdo;

        match err {
            Fdo::ServiceUnknown(message) => BluezError::ServiceUnknown(message),
            Fdo::NoReply(message) | Fdo::Timeout(message) => BluezError::NoReply(message),
            Fdo::ZBus(inner) => inner.into(),
            other => BluezError::Generic(other.to_string()),
        }
    }
}

impl From<zvariant::Error> for BluezError {
    fn from(err: zvariant::Error) -> Self {
        BluezError::Generic(err.to_string())
    }
}

// Lets infallible path conversions flow through the generic constructors.
impl From<std::convert::Infallible> for BluezError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        assert_eq!(
            BluezError::parse("org.bluez.Error.Failed:Operation failed"),
            BluezError::Failed("Operation failed".into())
        );
        assert_eq!(
            BluezError::parse("org.bluez.Error.AuthenticationRejected: rejected by remote"),
            BluezError::AuthenticationRejected("rejected by remote".into())
        );
        assert_eq!(
            BluezError::parse("org.freedesktop.DBus.Error.ServiceUnknown:no owner"),
            BluezError::ServiceUnknown("no owner".into())
        );
    }

    #[test]
    fn test_parse_every_table_entry() {
        for (name, ctor) in ERROR_TABLE {
            let raw = format!("{name}:detail");
            assert_eq!(BluezError::parse(&raw), ctor("detail".into()), "{name}");
        }
    }

    #[test]
    fn test_parse_serial_aliases() {
        assert_eq!(
            BluezError::parse("org.bluez.serial.Error.NotSupported:nope"),
            BluezError::NotSupported("nope".into())
        );
        assert_eq!(
            BluezError::parse("org.bluez.serial.Error.ConnectionAttemptFailed:busy"),
            BluezError::ConnectionAttemptFailed("busy".into())
        );
    }

    #[test]
    fn test_parse_transport_prefix() {
        // GDBus-style wrapping: prefix, then the name, then the message.
        assert_eq!(
            BluezError::parse("GDBus.Error:org.bluez.Error.NotReady: resource not ready"),
            BluezError::NotReady("resource not ready".into())
        );
    }

    #[test]
    fn test_parse_unknown_name_keeps_full_string() {
        let raw = "org.bluez.Error.SomethingNew:details here";
        assert_eq!(BluezError::parse(raw), BluezError::Generic(raw.into()));
    }

    #[test]
    fn test_parse_malformed_input() {
        assert_eq!(
            BluezError::parse("no delimiter at all"),
            BluezError::Generic("no delimiter at all".into())
        );
        assert_eq!(BluezError::parse(""), BluezError::Generic(String::new()));
        // Empty message is preserved as empty.
        assert_eq!(
            BluezError::parse("org.bluez.Error.Failed:"),
            BluezError::Failed(String::new())
        );
    }

    #[test]
    fn test_from_fdo_connectivity() {
        let err = zbus::fdo::Error::ServiceUnknown("org.bluez not running".into());
        assert_eq!(
            BluezError::from(err),
            BluezError::ServiceUnknown("org.bluez not running".into())
        );

        let err = zbus::fdo::Error::NoReply("timed out".into());
        assert_eq!(BluezError::from(err), BluezError::NoReply("timed out".into()));
    }

    #[test]
    fn test_display_carries_message() {
        let err = BluezError::NotConnected("device hung up".into());
        assert!(err.to_string().contains("device hung up"));
    }
}
