//! Tests for the public API surface.
//!
//! These tests exercise what is usable without a running daemon: error
//! mapping, value conversions, and the event types subscribers consume.

use bzrs::{BluezError, ManagerEvent, PropertyValue};
use bzrs::obex::{ManagerEvent as ObexEvent, TransferEvent};
use zvariant::OwnedObjectPath;

#[test]
fn test_error_parse_known_name() {
    assert_eq!(
        BluezError::parse("org.bluez.Error.NotReady:Resource Not Ready"),
        BluezError::NotReady("Resource Not Ready".into())
    );
}

#[test]
fn test_error_parse_unknown_name_is_generic() {
    let raw = "org.example.Error.Odd:whatever";
    assert_eq!(BluezError::parse(raw), BluezError::Generic(raw.into()));
}

#[test]
fn test_error_from_zbus_transport() {
    // Connectivity failures map to the service-unknown variant so callers
    // can tell "daemon not running" apart from operation failures.
    let err: BluezError = zbus::Error::FDO(Box::new(zbus::fdo::Error::ServiceUnknown(
        "org.bluez".into(),
    )))
    .into();
    assert_eq!(err, BluezError::ServiceUnknown("org.bluez".into()));
}

#[test]
fn test_error_display_is_descriptive() {
    let err = BluezError::AuthenticationRejected("remote said no".into());
    let text = err.to_string();
    assert!(text.contains("rejected"), "{text}");
    assert!(text.contains("remote said no"), "{text}");
}

#[test]
fn test_property_value_conversions() {
    assert_eq!(PropertyValue::from("hci0"), PropertyValue::Str("hci0".into()));
    assert_eq!(PropertyValue::from(7u32), PropertyValue::U32(7));
    assert_eq!(PropertyValue::from(true), PropertyValue::Bool(true));
}

#[test]
fn test_manager_events_compare_by_path() {
    let path = OwnedObjectPath::try_from("/org/bluez/hci0").unwrap();
    let event = ManagerEvent::AdapterAdded(path.clone());
    assert_eq!(event.clone(), ManagerEvent::AdapterAdded(path.clone()));
    assert_ne!(event, ManagerEvent::AdapterRemoved(path));
}

#[test]
fn test_transfer_completion_carries_outcome() {
    let path = OwnedObjectPath::try_from("/org/bluez/obex/client/session0/transfer0").unwrap();
    let done = ObexEvent::TransferCompleted {
        path: path.clone(),
        success: true,
    };
    let failed = ObexEvent::TransferCompleted {
        path,
        success: false,
    };
    assert_ne!(done, failed);
}

#[test]
fn test_transfer_events_are_copyable() {
    let event = TransferEvent::Progress(1024);
    let copy = event;
    assert_eq!(event, copy);
    assert_ne!(copy, TransferEvent::Completed);
}
