use bzrs::{Manager, ManagerEvent, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let conn = zbus::Connection::system().await?;
    let manager = Manager::new(&conn).await?;
    let mut events = manager.subscribe();

    let adapter = manager.adapter(None).await?;
    println!("Using adapter {} ({})", adapter.path(), adapter.address().await?);

    if !adapter.powered().await? {
        println!("Powering adapter on...");
        adapter.set_powered(true).await?;
    }

    println!("Known devices:");
    for device in manager.devices().await? {
        println!(
            "  {} {} paired={}",
            device.address().await?,
            device.display_name().await?,
            device.paired().await?
        );
    }

    println!("\nDiscovering for 30 seconds...");
    adapter.start_discovery().await?;

    let listen = async {
        while let Ok(event) = events.recv().await {
            if let ManagerEvent::DeviceCreated(path) = event {
                let device = bzrs::Device::new(&conn, path).await?;
                println!("  found {} {}", device.address().await?, device.display_name().await?);
            }
        }
        Ok::<(), bzrs::BluezError>(())
    };
    let _ = tokio::time::timeout(std::time::Duration::from_secs(30), listen).await;

    adapter.stop_discovery().await?;
    Ok(())
}
