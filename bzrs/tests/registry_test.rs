//! Tests against an in-process peer.
//!
//! A point-to-point connection pair stands in for the bus: one end serves
//! an object manager and a stub transfer object, the other end runs the
//! real handles and registry. This covers the lifecycle behavior that the
//! unit tests cannot reach without a transport.

use std::os::unix::net::UnixStream;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use zbus::fdo::ObjectManager;
use zbus::object_server::InterfaceRef;
use zbus::{Connection, Guid, connection, interface};

use bzrs::Device;
use bzrs::obex::{Manager, ManagerEvent};

#[derive(Default)]
struct TransferStub {
    status: String,
    transferred: u64,
}

#[interface(name = "org.bluez.obex.Transfer1")]
impl TransferStub {
    #[zbus(property)]
    fn status(&self) -> String {
        self.status.clone()
    }

    #[zbus(property)]
    fn transferred(&self) -> u64 {
        self.transferred
    }
}

/// One served end, one client end, directly connected.
async fn peer_pair() -> zbus::Result<(Connection, Connection)> {
    let guid = Guid::generate();
    let (p0, p1) = UnixStream::pair()?;
    let served = connection::Builder::unix_stream(p0)
        .server(guid)?
        .p2p()
        .serve_at("/", ObjectManager)?
        .build();
    let client = connection::Builder::unix_stream(p1).p2p().build();
    futures::try_join!(served, client)
}

async fn next_event(events: &mut broadcast::Receiver<ManagerEvent>) -> ManagerEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no event within 5s")
        .expect("event channel closed")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_device_handles_are_singletons_per_path() {
    let (_served, client) = peer_pair().await.unwrap();

    let first = Device::new(&client, "/org/bluez/hci9/dev_00_11_22_33_44_55")
        .await
        .unwrap();
    let second = Device::new(&client, "/org/bluez/hci9/dev_00_11_22_33_44_55")
        .await
        .unwrap();
    // Identity, not value: both are the same underlying handle, so the
    // second construction reused the first one's subscription and cache.
    assert_eq!(first, second);

    let other = Device::new(&client, "/org/bluez/hci9/dev_66_77_88_99_AA_BB")
        .await
        .unwrap();
    assert_ne!(first, other);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transfer_lifecycle_start_then_complete() {
    const PATH: &str = "/org/bluez/obex/client/session0/transfer0";

    let (served, client) = peer_pair().await.unwrap();
    let manager = Manager::new(&client).await.unwrap();
    let mut events = manager.subscribe();

    served
        .object_server()
        .at(PATH, TransferStub::default())
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        ManagerEvent::TransferStarted(PATH.try_into().unwrap())
    );
    assert!(manager.transfer(PATH).is_some());

    let stub: InterfaceRef<TransferStub> =
        served.object_server().interface(PATH).await.unwrap();
    stub.get_mut().await.status = "complete".into();
    stub.get()
        .await
        .status_changed(stub.signal_emitter())
        .await
        .unwrap();

    assert_eq!(
        next_event(&mut events).await,
        ManagerEvent::TransferCompleted {
            path: PATH.try_into().unwrap(),
            success: true,
        }
    );
    // The entry was released before the completion event went out.
    assert!(manager.transfer(PATH).is_none());

    // Removing the already-finished object announces nothing further.
    served
        .object_server()
        .remove::<TransferStub, _>(PATH)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_removed_transfer_is_released_before_the_event() {
    const PATH: &str = "/org/bluez/obex/client/session1/transfer0";

    let (served, client) = peer_pair().await.unwrap();
    let manager = Manager::new(&client).await.unwrap();
    let mut events = manager.subscribe();

    served
        .object_server()
        .at(PATH, TransferStub::default())
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        ManagerEvent::TransferStarted(PATH.try_into().unwrap())
    );
    let stub: InterfaceRef<TransferStub> =
        served.object_server().interface(PATH).await.unwrap();

    served
        .object_server()
        .remove::<TransferStub, _>(PATH)
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        ManagerEvent::TransferRemoved(PATH.try_into().unwrap())
    );
    // Released before the event: the table holds nothing by the time the
    // removal is observable.
    assert!(manager.transfer(PATH).is_none());

    // A straggling property change for the vanished transfer produces no
    // further events; its watch and subscription are gone.
    stub.get_mut().await.status = "error".into();
    let _ = stub.get().await.status_changed(stub.signal_emitter()).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}
