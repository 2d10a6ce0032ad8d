use futures::StreamExt;

use bzrs::Result;
use bzrs::obex::{Client, ObjectPush, Transfer, TransferEvent};

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(address), Some(file)) = (args.next(), args.next()) else {
        eprintln!("usage: send_file <address> <file>");
        std::process::exit(2);
    };

    // The transfer daemon lives on the session bus.
    let conn = zbus::Connection::session().await?;
    let client = Client::new(&conn).await?;

    println!("Connecting to {address}...");
    let session = client
        .create_session(&address, Client::ANY_SOURCE, Client::TARGET_OPP)
        .await?;

    let push = ObjectPush::new(&conn, session.clone()).await?;
    let (transfer_path, name) = push.send_file(&file).await?;
    println!("Sending {name}...");

    let transfer = Transfer::new(&conn, transfer_path).await?;
    let mut events = Box::pin(transfer.events());
    while let Some(event) = events.next().await {
        match event {
            TransferEvent::Progress(bytes) => println!("  {bytes} bytes"),
            TransferEvent::Completed => {
                println!("Done.");
                break;
            }
            TransferEvent::Error => {
                eprintln!("Transfer failed.");
                break;
            }
        }
    }

    client.remove_session(session);
    Ok(())
}
