// Application event loop: owns the scheduler, answers client requests, fans
// draft events out to subscribers, and runs the deadline sweep.

use std::collections::{HashMap, HashSet};

use goaldraft_core::draft::catalogue::GoalSlot;
use goaldraft_core::draft::roster::LeagueId;
use goaldraft_core::events::DraftEvent;
use goaldraft_core::{DraftError, DraftResult, DraftScheduler};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::AutopickConfig;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::ws_server::{ConnId, WsEvent};

struct Client {
    addr: String,
    outbox: mpsc::Sender<String>,
    subscriptions: HashSet<LeagueId>,
}

/// State owned by the app loop.
pub struct AppState {
    pub scheduler: DraftScheduler,
    clients: HashMap<ConnId, Client>,
}

impl AppState {
    pub fn new(scheduler: DraftScheduler) -> Self {
        AppState {
            scheduler,
            clients: HashMap::new(),
        }
    }

    pub fn connect(&mut self, conn_id: ConnId, addr: String, outbox: mpsc::Sender<String>) {
        info!("Client {} connected from {}", conn_id, addr);
        self.clients.insert(
            conn_id,
            Client {
                addr,
                outbox,
                subscriptions: HashSet::new(),
            },
        );
    }

    pub fn disconnect(&mut self, conn_id: ConnId) {
        if let Some(client) = self.clients.remove(&conn_id) {
            info!("Client {} ({}) disconnected", conn_id, client.addr);
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Parse and answer one raw message from a client.
    pub fn handle_text(&mut self, conn_id: ConnId, text: &str) -> ServerMessage {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.handle_request(conn_id, msg),
            Err(e) => {
                warn!("Failed to parse message from client {}: {}", conn_id, e);
                ServerMessage::bad_request(format!("invalid request: {e}"))
            }
        }
    }

    pub fn handle_request(&mut self, conn_id: ConnId, msg: ClientMessage) -> ServerMessage {
        let league = msg.league().clone();
        match self.dispatch(conn_id, msg) {
            Ok(reply) => reply,
            Err(e) => {
                if e.is_validation() {
                    debug!("Request for {} from client {} rejected: {}", league, conn_id, e);
                } else {
                    warn!("Request for {} from client {} failed: {}", league, conn_id, e);
                }
                ServerMessage::error(Some(league), &e)
            }
        }
    }

    fn dispatch(&mut self, conn_id: ConnId, msg: ClientMessage) -> DraftResult<ServerMessage> {
        let scheduler = &self.scheduler;
        match msg {
            ClientMessage::Start { league } => {
                scheduler.start(&league)?;
                Ok(ServerMessage::State {
                    snapshot: scheduler.snapshot(&league)?,
                })
            }
            ClientMessage::MakePick {
                league,
                manager,
                owner,
                cadence,
                slot_index,
            } => {
                let slot = GoalSlot::new(owner, cadence, slot_index);
                let pick = scheduler.make_pick(&league, &manager, slot)?;
                Ok(ServerMessage::PickAccepted {
                    pick,
                    snapshot: scheduler.snapshot(&league)?,
                })
            }
            ClientMessage::Autopick { league } => {
                let pick = scheduler.autopick(&league)?;
                Ok(ServerMessage::PickAccepted {
                    pick,
                    snapshot: scheduler.snapshot(&league)?,
                })
            }
            ClientMessage::GetState { league } => Ok(ServerMessage::State {
                snapshot: scheduler.snapshot(&league)?,
            }),
            ClientMessage::ListPicks { league } => {
                let picks = scheduler.picks(&league)?;
                Ok(ServerMessage::Picks { league, picks })
            }
            ClientMessage::GetTeam { league, manager } => {
                let picks = scheduler.team(&league, &manager)?;
                Ok(ServerMessage::Team {
                    league,
                    manager,
                    picks,
                })
            }
            ClientMessage::AvailableSlots { league } => {
                let slots = scheduler.available_slots(&league)?;
                Ok(ServerMessage::Slots { league, slots })
            }
            ClientMessage::Subscribe { league } => {
                let snapshot = scheduler.snapshot(&league)?;
                if let Some(client) = self.clients.get_mut(&conn_id) {
                    client.subscriptions.insert(league);
                }
                Ok(ServerMessage::State { snapshot })
            }
            ClientMessage::Unsubscribe { league } => {
                let snapshot = scheduler.snapshot(&league)?;
                if let Some(client) = self.clients.get_mut(&conn_id) {
                    client.subscriptions.remove(&league);
                }
                Ok(ServerMessage::State { snapshot })
            }
        }
    }

    /// Queue `msg` on one connection. A full or closed outbox drops it.
    pub fn send_to(&self, conn_id: ConnId, msg: &ServerMessage) {
        let Some(client) = self.clients.get(&conn_id) else {
            debug!("Dropping reply for departed client {}", conn_id);
            return;
        };
        match serde_json::to_string(msg) {
            Ok(text) => {
                if client.outbox.try_send(text).is_err() {
                    warn!("Outbox full or closed for client {}, dropping message", conn_id);
                }
            }
            Err(e) => warn!("Failed to serialize reply: {}", e),
        }
    }

    /// Send `event` to every connection subscribed to its league. Returns how
    /// many connections it was queued for.
    pub fn broadcast_event(&self, event: &DraftEvent) -> usize {
        let text = match serde_json::to_string(&ServerMessage::Event {
            event: event.clone(),
        }) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize draft event: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        for (conn_id, client) in &self.clients {
            if !client.subscriptions.contains(event.league()) {
                continue;
            }
            if client.outbox.try_send(text.clone()).is_ok() {
                delivered += 1;
            } else {
                warn!("Outbox full or closed for client {}, dropping event", conn_id);
            }
        }
        delivered
    }

    /// Autopick every lapsed turn.
    pub fn sweep(&self) -> Result<usize, DraftError> {
        let resolved = self.scheduler.sweep_expired()?;
        if !resolved.is_empty() {
            info!("Deadline sweep autopicked {} lapsed turns", resolved.len());
        }
        Ok(resolved.len())
    }
}

/// Main application event loop.
///
/// Listens with `tokio::select!` on:
/// 1. WebSocket events from clients
/// 2. Draft events from the scheduler, fanned out to subscribers
/// 3. The deadline sweep interval, when autopick is enabled
///
/// Returns when the WebSocket channel closes.
pub async fn run(
    mut ws_rx: mpsc::Receiver<WsEvent>,
    mut state: AppState,
    autopick: AutopickConfig,
) -> anyhow::Result<()> {
    info!(
        "Application event loop started (deadline sweep {})",
        if autopick.enabled { "on" } else { "off" }
    );

    let mut draft_events = state.scheduler.subscribe();
    let mut events_open = true;

    let mut sweep_interval = tokio::time::interval(autopick.sweep_interval());
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    sweep_interval.tick().await;

    loop {
        tokio::select! {
            ws_event = ws_rx.recv() => {
                match ws_event {
                    Some(WsEvent::Connected { conn_id, addr, outbox }) => {
                        state.connect(conn_id, addr, outbox);
                    }
                    Some(WsEvent::Disconnected { conn_id }) => {
                        state.disconnect(conn_id);
                    }
                    Some(WsEvent::Message { conn_id, text }) => {
                        let reply = state.handle_text(conn_id, &text);
                        state.send_to(conn_id, &reply);
                    }
                    None => {
                        info!("WebSocket channel closed, shutting down");
                        break;
                    }
                }
            }

            event = draft_events.recv(), if events_open => {
                match event {
                    Ok(event) => {
                        state.broadcast_event(&event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event fan-out lagged, {} draft events skipped", skipped);
                    }
                    Err(RecvError::Closed) => {
                        events_open = false;
                    }
                }
            }

            _ = sweep_interval.tick(), if autopick.enabled => {
                if let Err(e) = state.sweep() {
                    warn!("Deadline sweep failed: {}", e);
                }
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}
