//! Generic remote-object handle.
//!
//! [`ProxyBase`] stands in for one remote object, identified by bus name,
//! object path, and interface. It mediates method calls and the
//! `org.freedesktop.DBus.Properties` contract, keeps a snapshot of
//! properties announced through `PropertiesChanged`, and fans change
//! notifications out to local subscribers.
//!
//! Handles are process-wide singletons: an explicit registry keyed by
//! `(service, path, interface)` holds a weak reference to every live handle,
//! and the factory returns the existing instance, caches and subscription
//! intact, instead of building a second transport proxy for the same object.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, Weak};

use futures::StreamExt;
use log::debug;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use zbus::fdo::PropertiesProxy;
use zbus::names::InterfaceName;
use zbus::{Connection, Proxy};
use zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::Result;
use crate::error::BluezError;
use crate::utils::lock;

const EVENT_CAPACITY: usize = 64;

/// A property mutation announced by the remote service.
#[derive(Debug, Clone)]
pub struct PropertyChanged {
    /// Path of the object whose property changed.
    pub path: OwnedObjectPath,
    /// Interface the property belongs to.
    pub interface: String,
    /// Property name.
    pub name: String,
    /// The new value.
    pub value: Arc<OwnedValue>,
}

/// The value types accepted by [`ProxyBase::set`].
///
/// The remote property contract carries variants; this closed set selects
/// the wire representation per type. Anything outside it is unrepresentable
/// rather than silently coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Str(String),
    U32(u32),
    Bool(bool),
}

impl PropertyValue {
    fn to_value(&self) -> Value<'_> {
        match self {
            PropertyValue::Str(s) => Value::from(s.as_str()),
            PropertyValue::U32(v) => Value::from(*v),
            PropertyValue::Bool(v) => Value::from(*v),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::U32(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

#[derive(Debug, Clone, Copy)]
enum FallbackValue {
    Str(&'static str),
    U16(u16),
    U32(u32),
}

impl FallbackValue {
    fn to_owned_value(self) -> Result<OwnedValue> {
        let value = match self {
            FallbackValue::Str(s) => Value::from(s),
            FallbackValue::U16(v) => Value::from(v),
            FallbackValue::U32(v) => Value::from(v),
        };
        Ok(value.try_to_owned()?)
    }
}

/// Defaults returned for properties the live service does not report.
/// Built once, never mutated. Each default carries the wire type the
/// service would use for the live value.
static PROPERTY_FALLBACKS: &[(&str, FallbackValue)] = &[
    ("Icon", FallbackValue::Str("generic")),
    ("Class", FallbackValue::U32(0)),
    ("Appearance", FallbackValue::U16(0)),
];

fn fallback_value(name: &str) -> Option<FallbackValue> {
    PROPERTY_FALLBACKS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, fb)| *fb)
}

fn apply_fallbacks(props: &mut HashMap<String, OwnedValue>) -> Result<()> {
    for (name, fb) in PROPERTY_FALLBACKS {
        if !props.contains_key(*name) {
            props.insert((*name).to_string(), fb.to_owned_value()?);
        }
    }
    Ok(())
}

type InstanceKey = (&'static str, String, &'static str);

/// Live handles, weakly held so a handle dies with its last strong reference.
static INSTANCES: LazyLock<Mutex<HashMap<InstanceKey, Weak<ProxyBase>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// A handle for one remote object.
pub struct ProxyBase {
    conn: Connection,
    path: OwnedObjectPath,
    interface: &'static str,
    interface_name: InterfaceName<'static>,
    proxy: Proxy<'static>,
    props: PropertiesProxy<'static>,
    snapshot: Arc<Mutex<HashMap<String, Arc<OwnedValue>>>>,
    events: broadcast::Sender<PropertyChanged>,
    watch: JoinHandle<()>,
}

impl ProxyBase {
    /// Returns the handle for `(service, path, interface)`, constructing it
    /// on first reference.
    ///
    /// A repeated request returns the existing instance untouched; only the
    /// first construction subscribes to the object's `PropertiesChanged`
    /// broadcast.
    pub(crate) async fn get_or_create(
        conn: &Connection,
        service: &'static str,
        path: OwnedObjectPath,
        interface: &'static str,
    ) -> Result<Arc<ProxyBase>> {
        let key = (service, path.as_str().to_string(), interface);
        if let Some(existing) = lock(&INSTANCES).get(&key).and_then(Weak::upgrade) {
            return Ok(existing);
        }

        let fresh = Arc::new(Self::connect(conn, service, path, interface).await?);

        let mut instances = lock(&INSTANCES);
        if let Some(existing) = instances.get(&key).and_then(Weak::upgrade) {
            // A concurrent constructor won the race; its subscription stands.
            return Ok(existing);
        }
        instances.retain(|_, weak| weak.strong_count() > 0);
        instances.insert(key, Arc::downgrade(&fresh));
        Ok(fresh)
    }

    async fn connect(
        conn: &Connection,
        service: &'static str,
        path: OwnedObjectPath,
        interface: &'static str,
    ) -> Result<ProxyBase> {
        let interface_name = InterfaceName::try_from(interface).map_err(zbus::Error::from)?;

        let proxy = Proxy::new(conn, service, path.as_str().to_string(), interface)
            .await
            .map_err(BluezError::from)?;
        let props = PropertiesProxy::builder(conn)
            .destination(service)
            .map_err(BluezError::from)?
            .path(path.as_str().to_string())
            .map_err(BluezError::from)?
            .build()
            .await
            .map_err(BluezError::from)?;

        let snapshot: Arc<Mutex<HashMap<String, Arc<OwnedValue>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let mut stream = props
            .receive_properties_changed()
            .await
            .map_err(BluezError::from)?;
        let watch = {
            let snapshot = Arc::clone(&snapshot);
            let events = events.clone();
            let path = path.clone();
            tokio::spawn(async move {
                while let Some(signal) = stream.next().await {
                    let args = match signal.args() {
                        Ok(args) => args,
                        Err(err) => {
                            debug!("{path}: undecodable PropertiesChanged: {err}");
                            continue;
                        }
                    };
                    if args.interface_name().as_str() != interface {
                        continue;
                    }
                    for (name, value) in args.changed_properties() {
                        let owned = match value.try_to_owned() {
                            Ok(owned) => Arc::new(owned),
                            Err(err) => {
                                debug!("{path} {name}: value not representable: {err}");
                                continue;
                            }
                        };
                        debug!("{path} {interface} {name} changed");
                        lock(&snapshot).insert((*name).to_string(), Arc::clone(&owned));
                        let _ = events.send(PropertyChanged {
                            path: path.clone(),
                            interface: interface.to_string(),
                            name: (*name).to_string(),
                            value: owned,
                        });
                    }
                }
            })
        };

        Ok(ProxyBase {
            conn: conn.clone(),
            path,
            interface,
            interface_name,
            proxy,
            props,
            snapshot,
            events,
            watch,
        })
    }

    /// The object path this handle stands in for.
    pub fn path(&self) -> &OwnedObjectPath {
        &self.path
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Subscribes to property changes on this object.
    ///
    /// Changes for one object arrive in the order the service emitted them.
    pub fn subscribe(&self) -> broadcast::Receiver<PropertyChanged> {
        self.events.subscribe()
    }

    /// Calls a method on the remote object, waiting for the reply.
    ///
    /// The wait is unbounded; a transport-reported failure surfaces as the
    /// mapped [`BluezError`].
    pub async fn call<B, R>(&self, method: &str, body: &B) -> Result<R>
    where
        B: serde::Serialize + zvariant::DynamicType,
        R: for<'d> zvariant::DynamicDeserialize<'d>,
    {
        self.proxy.call(method, body).await.map_err(BluezError::from)
    }

    /// Calls a method without waiting, delivering the outcome to exactly one
    /// of the two callbacks. There is no retry; callers that need guaranteed
    /// error handling must do it in `on_error`.
    pub fn call_background<B, R>(
        &self,
        method: &'static str,
        body: B,
        on_reply: impl FnOnce(R) + Send + 'static,
        on_error: impl FnOnce(BluezError) + Send + 'static,
    ) where
        B: serde::Serialize + zvariant::DynamicType + Send + Sync + 'static,
        R: for<'d> zvariant::DynamicDeserialize<'d> + Send + 'static,
    {
        let proxy = self.proxy.clone();
        tokio::spawn(async move {
            match proxy.call::<_, _, R>(method, &body).await {
                Ok(reply) => on_reply(reply),
                Err(err) => on_error(err.into()),
            }
        });
    }

    /// Reads one property as a raw variant.
    ///
    /// On a failed read the value comes from the change-notification
    /// snapshot if present, then from the fixed fallback table; otherwise
    /// the mapped error propagates.
    pub async fn get_value(&self, name: &str) -> Result<OwnedValue> {
        match self.props.get(self.interface_name.clone(), name).await {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Some(cached) = lock(&self.snapshot).get(name) {
                    return cached.as_ref().try_clone().map_err(BluezError::from);
                }
                if let Some(fb) = fallback_value(name) {
                    debug!("{} {name}: read failed, using fallback", self.path);
                    return fb.to_owned_value();
                }
                Err(err.into())
            }
        }
    }

    /// Reads one property, converted to `T`.
    pub async fn get<T>(&self, name: &str) -> Result<T>
    where
        T: TryFrom<OwnedValue>,
        T::Error: Into<zvariant::Error>,
    {
        let value = self.get_value(name).await?;
        T::try_from(value).map_err(|err| BluezError::from(err.into()))
    }

    /// Reads a property the remote object may not expose at all.
    ///
    /// Unknown-property errors become `None`; other failures propagate.
    pub async fn get_optional<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: TryFrom<OwnedValue>,
        T::Error: Into<zvariant::Error>,
    {
        use zbus::fdo::Error as Fdo;

        let convert =
            |value: OwnedValue| T::try_from(value).map_err(|err| BluezError::from(err.into()));

        match self.props.get(self.interface_name.clone(), name).await {
            Ok(value) => convert(value).map(Some),
            Err(Fdo::UnknownProperty(_) | Fdo::InvalidArgs(_) | Fdo::UnknownInterface(_)) => {
                match lock(&self.snapshot).get(name) {
                    Some(cached) => {
                        let value = cached.as_ref().try_clone().map_err(BluezError::from)?;
                        convert(value).map(Some)
                    }
                    None => Ok(None),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Writes one property.
    pub async fn set(&self, name: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let value = value.into();
        self.props
            .set(self.interface_name.clone(), name, value.to_value())
            .await
            .map_err(BluezError::from)
    }

    /// Fetches all properties of the interface.
    ///
    /// Every fallback-table key absent from the reply is injected with its
    /// fallback value.
    pub async fn get_all(&self) -> Result<HashMap<String, OwnedValue>> {
        let mut props = self
            .props
            .get_all(self.interface_name.clone())
            .await
            .map_err(BluezError::from)?;
        apply_fallbacks(&mut props)?;
        Ok(props)
    }
}

impl Drop for ProxyBase {
    fn drop(&mut self) {
        self.watch.abort();
    }
}

impl std::fmt::Debug for ProxyBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyBase")
            .field("path", &self.path)
            .field("interface", &self.interface)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_table_keys() {
        assert!(fallback_value("Icon").is_some());
        assert!(fallback_value("Class").is_some());
        assert!(fallback_value("Appearance").is_some());
        assert!(fallback_value("Alias").is_none());
    }

    #[test]
    fn test_fallback_values() {
        let icon = fallback_value("Icon").unwrap().to_owned_value().unwrap();
        assert_eq!(String::try_from(icon).unwrap(), "generic");

        let class = fallback_value("Class").unwrap().to_owned_value().unwrap();
        assert_eq!(u32::try_from(class).unwrap(), 0);

        let appearance = fallback_value("Appearance").unwrap().to_owned_value().unwrap();
        assert_eq!(u16::try_from(appearance).unwrap(), 0);
    }

    #[test]
    fn test_apply_fallbacks_fills_missing_keys() {
        let mut props = HashMap::new();
        apply_fallbacks(&mut props).unwrap();
        for (name, _) in PROPERTY_FALLBACKS {
            assert!(props.contains_key(*name), "missing {name}");
        }
    }

    #[test]
    fn test_apply_fallbacks_keeps_live_values() {
        let mut props = HashMap::new();
        props.insert(
            "Class".to_string(),
            Value::from(0x240404u32).try_to_owned().unwrap(),
        );
        apply_fallbacks(&mut props).unwrap();
        assert_eq!(u32::try_from(props.remove("Class").unwrap()).unwrap(), 0x240404);
        // The other fallback keys were still injected.
        assert!(props.contains_key("Icon"));
        assert!(props.contains_key("Appearance"));
    }

    #[test]
    fn test_property_value_wire_types() {
        assert!(matches!(
            PropertyValue::from("alias").to_value(),
            Value::Str(_)
        ));
        assert!(matches!(
            PropertyValue::from(7u32).to_value(),
            Value::U32(7)
        ));
        assert!(matches!(
            PropertyValue::from(true).to_value(),
            Value::Bool(true)
        ));
    }
}
