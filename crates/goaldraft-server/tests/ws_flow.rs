// Integration tests: real WebSocket clients against the server and app loop.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use goaldraft_core::clock::SystemClock;
use goaldraft_core::db::SqliteStore;
use goaldraft_core::draft::roster::ManagerId;
use goaldraft_core::draft::state::{DraftSettings, DraftStatus};
use goaldraft_core::events::DraftEvent;
use goaldraft_core::DraftScheduler;
use goaldraft_server::app::{self, AppState};
use goaldraft_server::config::{AutopickConfig, SeedPaths};
use goaldraft_server::protocol::ServerMessage;
use goaldraft_server::{seed, ws_server};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Start the server on a free port with the shipped seed data.
async fn spawn_server() -> String {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let directory = seed::load_directory(
        &root,
        &SeedPaths {
            leagues: "defaults/leagues.toml".into(),
            titles: Some("defaults/slot_titles.csv".into()),
        },
    )
    .unwrap();
    let scheduler = DraftScheduler::new(
        Arc::new(SqliteStore::open(":memory:").unwrap()),
        Arc::new(directory),
        Arc::new(SystemClock),
        DraftSettings::default(),
    );

    let listener = ws_server::bind(0).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (ws_tx, ws_rx) = mpsc::channel(64);
    tokio::spawn(ws_server::run(listener, ws_tx));
    tokio::spawn(app::run(
        ws_rx,
        AppState::new(scheduler),
        AutopickConfig {
            enabled: false,
            sweep_interval_secs: 60,
        },
    ));
    format!("ws://{addr}")
}

async fn connect(url: &str) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    client
}

async fn send(client: &mut Client, json: &str) {
    client.send(Message::Text(json.into())).await.unwrap();
}

async fn recv(client: &mut Client) -> ServerMessage {
    loop {
        let msg = tokio::time::timeout(TIMEOUT, client.next())
            .await
            .expect("timed out waiting for server")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn request(client: &mut Client, json: &str) -> ServerMessage {
    send(client, json).await;
    recv(client).await
}

#[tokio::test]
async fn draft_round_trip_over_websocket() {
    let url = spawn_server().await;
    let mut client = connect(&url).await;

    match request(&mut client, r#"{"type":"START","league":"friends"}"#).await {
        ServerMessage::State { snapshot } => {
            assert_eq!(snapshot.state.status, DraftStatus::Active);
            assert_eq!(snapshot.managers, vec![ManagerId::from("alex"), ManagerId::from("bob")]);
        }
        other => panic!("expected state, got {other:?}"),
    }

    let reply = request(
        &mut client,
        r#"{"type":"MAKE_PICK","league":"friends","manager":"bob","owner":"alex","cadence":"weekly","slot_index":0}"#,
    )
    .await;
    match reply {
        ServerMessage::Error { code, .. } => assert_eq!(code, "not_your_turn"),
        other => panic!("expected rejection, got {other:?}"),
    }

    let reply = request(
        &mut client,
        r#"{"type":"MAKE_PICK","league":"friends","manager":"alex","owner":"bob","cadence":"yearly","slot_index":0}"#,
    )
    .await;
    assert!(matches!(reply, ServerMessage::PickAccepted { .. }));

    match request(&mut client, r#"{"type":"LIST_PICKS","league":"friends"}"#).await {
        ServerMessage::Picks { picks, .. } => {
            assert_eq!(picks.len(), 1);
            assert_eq!(picks[0].manager, ManagerId::from("alex"));
        }
        other => panic!("expected picks, got {other:?}"),
    }

    match request(&mut client, r#"{"type":"AVAILABLE_SLOTS","league":"friends"}"#).await {
        ServerMessage::Slots { slots, .. } => {
            assert_eq!(slots.len(), 13);
            let first = &slots[0];
            assert_eq!(first.title, "Run three times");
        }
        other => panic!("expected slots, got {other:?}"),
    }

    match request(&mut client, "not json at all").await {
        ServerMessage::Error { code, .. } => assert_eq!(code, "bad_request"),
        other => panic!("expected bad request, got {other:?}"),
    }
}

#[tokio::test]
async fn subscribers_hear_about_other_clients_picks() {
    let url = spawn_server().await;
    let mut watcher = connect(&url).await;
    let mut player = connect(&url).await;

    let reply = request(&mut watcher, r#"{"type":"SUBSCRIBE","league":"office"}"#).await;
    assert!(matches!(reply, ServerMessage::State { .. }));

    request(&mut player, r#"{"type":"START","league":"office"}"#).await;
    let reply = request(&mut player, r#"{"type":"AUTOPICK","league":"office"}"#).await;
    let accepted = match reply {
        ServerMessage::PickAccepted { pick, .. } => pick,
        other => panic!("expected accepted pick, got {other:?}"),
    };

    // The watcher sees the start, then the pick.
    let pick = loop {
        match recv(&mut watcher).await {
            ServerMessage::Event {
                event: DraftEvent::PickMade { pick, .. },
            } => break pick,
            ServerMessage::Event { .. } => continue,
            other => panic!("unexpected message {other:?}"),
        }
    };
    assert_eq!(pick, accepted);
    assert_eq!(pick.manager, ManagerId::from("casey"));
}
