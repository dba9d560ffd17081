// WebSocket server for draft clients.

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Identifies one accepted connection for the lifetime of the process.
pub type ConnId = u64;

/// Queued outbound messages per connection before new ones are dropped.
pub const OUTBOX_CAPACITY: usize = 64;

/// Events emitted by the WebSocket server to the application layer.
#[derive(Debug)]
pub enum WsEvent {
    /// A client finished the handshake. Text sent on `outbox` is written to
    /// it until the connection closes.
    Connected {
        conn_id: ConnId,
        addr: String,
        outbox: mpsc::Sender<String>,
    },
    Disconnected {
        conn_id: ConnId,
    },
    /// A text message from the client (raw JSON string).
    Message {
        conn_id: ConnId,
        text: String,
    },
}

/// Bind the listener on `127.0.0.1:{port}`. Port 0 picks a free port.
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    info!("WebSocket server listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept connections forever, serving each on its own task and forwarding
/// their events through `tx`. Returns once `tx`'s receiver is gone.
pub async fn run(listener: TcpListener, tx: mpsc::Sender<WsEvent>) -> anyhow::Result<()> {
    let mut next_id: ConnId = 1;

    while !tx.is_closed() {
        let (stream, addr) = listener.accept().await?;
        let conn_id = next_id;
        next_id += 1;
        info!("Accepted TCP connection {} from {}", conn_id, addr);

        let tx = tx.clone();
        tokio::spawn(serve_connection(stream, addr.to_string(), conn_id, tx));
    }

    Ok(())
}

async fn serve_connection(
    stream: TcpStream,
    addr: String,
    conn_id: ConnId,
    tx: mpsc::Sender<WsEvent>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for {addr}: {e}");
            return;
        }
    };

    let (mut write, read) = ws_stream.split();
    let (outbox, mut outbox_rx) = mpsc::channel::<String>(OUTBOX_CAPACITY);

    if tx
        .send(WsEvent::Connected {
            conn_id,
            addr: addr.clone(),
            outbox,
        })
        .await
        .is_err()
    {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(text) = outbox_rx.recv().await {
            if let Err(e) = write.send(Message::Text(text.into())).await {
                debug!("Write to connection {conn_id} failed: {e}");
                break;
            }
        }
        let _ = write.close().await;
    });

    let _ = process_message_stream(read, &tx, conn_id, &addr).await;
    let _ = tx.send(WsEvent::Disconnected { conn_id }).await;
    writer.abort();
    info!("Connection {} from {} closed", conn_id, addr);
}

/// Forward text frames from `stream` as [`WsEvent::Message`] until the client
/// closes or errors. Returns `Err(())` if the channel is closed (receiver
/// dropped), signalling the caller to stop.
///
/// Generic over the stream so it can be tested without opening TCP ports.
pub async fn process_message_stream<St>(
    mut stream: St,
    tx: &mpsc::Sender<WsEvent>,
    conn_id: ConnId,
    addr: &str,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let event = WsEvent::Message {
                    conn_id,
                    text: text.to_string(),
                };
                if tx.send(event).await.is_err() {
                    return Err(());
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Binary, Ping, Pong and raw frames carry no requests.
            }
        }
    }
    Ok(())
}
