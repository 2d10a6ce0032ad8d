//! Handle for the object-push profile of a session
//! (`org.bluez.obex.ObjectPush1`).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::info;
use zbus::Connection;
use zvariant::{OwnedObjectPath, OwnedValue};

use crate::Result;
use crate::constants::{bus, interface};
use crate::error::BluezError;
use crate::proxy::ProxyBase;

/// Object push on an established session. Lives on the session's path.
#[derive(Debug, Clone)]
pub struct ObjectPush {
    base: Arc<ProxyBase>,
}

impl ObjectPush {
    pub async fn new(
        conn: &Connection,
        session: impl TryInto<OwnedObjectPath, Error: Into<BluezError>>,
    ) -> Result<ObjectPush> {
        let session = session.try_into().map_err(Into::into)?;
        let base =
            ProxyBase::get_or_create(conn, bus::OBEX, session, interface::OBEX_OBJECT_PUSH)
                .await?;
        Ok(ObjectPush { base })
    }

    pub fn session_path(&self) -> &OwnedObjectPath {
        self.base.path()
    }

    /// Queues the local file at `file` for sending.
    ///
    /// Returns the path of the transfer object the daemon created, and the
    /// object name it will push under.
    pub async fn send_file(&self, file: &str) -> Result<(OwnedObjectPath, String)> {
        let (transfer, properties): (OwnedObjectPath, HashMap<String, OwnedValue>) =
            self.base.call("SendFile", &(file,)).await?;
        let name = pushed_name(&properties).unwrap_or_else(|| local_name(file));
        info!("{}: sending {file} as {name} ({transfer})", self.base.path());
        Ok((transfer, name))
    }
}

/// The object name reported in a SendFile reply, if present and a string.
fn pushed_name(properties: &HashMap<String, OwnedValue>) -> Option<String> {
    let name: &str = properties.get("Filename")?.downcast_ref().ok()?;
    Some(name.to_string())
}

/// Final path component of the local file, used when the daemon does not
/// report a name of its own.
fn local_name(file: &str) -> String {
    Path::new(file)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zvariant::Value;

    fn props(entries: &[(&str, Value<'_>)]) -> HashMap<String, OwnedValue> {
        entries
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.try_to_owned().unwrap()))
            .collect()
    }

    #[test]
    fn test_pushed_name_from_reply() {
        let properties = props(&[("Filename", Value::from("photo.jpg"))]);
        assert_eq!(pushed_name(&properties), Some("photo.jpg".to_string()));
    }

    #[test]
    fn test_pushed_name_missing_or_mistyped() {
        assert_eq!(pushed_name(&HashMap::new()), None);

        let properties = props(&[("Filename", Value::from(1u32))]);
        assert_eq!(pushed_name(&properties), None);
    }

    #[test]
    fn test_local_name_fallback() {
        assert_eq!(local_name("/home/u/photo.jpg"), "photo.jpg");
        assert_eq!(local_name("photo.jpg"), "photo.jpg");
    }
}
