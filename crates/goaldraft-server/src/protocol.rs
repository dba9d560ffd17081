// JSON messages exchanged with draft clients over the WebSocket.

use goaldraft_core::draft::catalogue::{Cadence, CatalogueSlot};
use goaldraft_core::draft::pick::DraftPick;
use goaldraft_core::draft::roster::{LeagueId, ManagerId};
use goaldraft_core::draft::state::DraftSnapshot;
use goaldraft_core::events::DraftEvent;
use goaldraft_core::DraftError;
use serde::{Deserialize, Serialize};

/// Code sent back for text that does not parse as a [`ClientMessage`].
pub const BAD_REQUEST: &str = "bad_request";

/// Requests from a client. Every request names the league it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Start {
        league: LeagueId,
    },
    MakePick {
        league: LeagueId,
        manager: ManagerId,
        owner: ManagerId,
        cadence: Cadence,
        slot_index: u32,
    },
    Autopick {
        league: LeagueId,
    },
    GetState {
        league: LeagueId,
    },
    ListPicks {
        league: LeagueId,
    },
    GetTeam {
        league: LeagueId,
        manager: ManagerId,
    },
    AvailableSlots {
        league: LeagueId,
    },
    /// Receive `EVENT` messages for the league on this connection.
    Subscribe {
        league: LeagueId,
    },
    Unsubscribe {
        league: LeagueId,
    },
}

impl ClientMessage {
    pub fn league(&self) -> &LeagueId {
        match self {
            ClientMessage::Start { league }
            | ClientMessage::MakePick { league, .. }
            | ClientMessage::Autopick { league }
            | ClientMessage::GetState { league }
            | ClientMessage::ListPicks { league }
            | ClientMessage::GetTeam { league, .. }
            | ClientMessage::AvailableSlots { league }
            | ClientMessage::Subscribe { league }
            | ClientMessage::Unsubscribe { league } => league,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    State {
        snapshot: DraftSnapshot,
    },
    Picks {
        league: LeagueId,
        picks: Vec<DraftPick>,
    },
    Team {
        league: LeagueId,
        manager: ManagerId,
        picks: Vec<DraftPick>,
    },
    Slots {
        league: LeagueId,
        slots: Vec<CatalogueSlot>,
    },
    PickAccepted {
        pick: DraftPick,
        snapshot: DraftSnapshot,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        league: Option<LeagueId>,
        code: String,
        message: String,
        retryable: bool,
    },
    Event {
        event: DraftEvent,
    },
}

impl ServerMessage {
    pub fn error(league: Option<LeagueId>, err: &DraftError) -> Self {
        ServerMessage::Error {
            league,
            code: err.code().to_string(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            league: None,
            code: BAD_REQUEST.to_string(),
            message: message.into(),
            retryable: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goaldraft_core::draft::pick::PickRejection;

    #[test]
    fn make_pick_parses_from_wire_format() {
        let json = r#"{"type":"MAKE_PICK","league":"friends","manager":"alex",
                       "owner":"bob","cadence":"monthly","slot_index":1}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::MakePick {
                league: LeagueId::from("friends"),
                manager: ManagerId::from("alex"),
                owner: ManagerId::from("bob"),
                cadence: Cadence::Monthly,
                slot_index: 1,
            }
        );
        assert_eq!(msg.league(), &LeagueId::from("friends"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let json = r#"{"type":"DELETE_LEAGUE","league":"friends"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn missing_league_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"START"}"#).is_err());
    }

    #[test]
    fn error_carries_code_and_human_message() {
        let err = DraftError::from(PickRejection::NotYourTurn {
            on_clock: ManagerId::from("bob"),
        });
        let msg = ServerMessage::error(Some(LeagueId::from("friends")), &err);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ERROR");
        assert_eq!(json["code"], "not_your_turn");
        assert_eq!(json["retryable"], false);
        assert!(json["message"].as_str().unwrap().contains("bob"));
    }

    #[test]
    fn bad_request_omits_league() {
        let json = serde_json::to_value(ServerMessage::bad_request("nope")).unwrap();
        assert_eq!(json["code"], BAD_REQUEST);
        assert!(json.get("league").is_none());
    }

    #[test]
    fn conflict_is_retryable_on_the_wire() {
        let msg = ServerMessage::error(None, &DraftError::Conflict);
        match msg {
            ServerMessage::Error {
                code, retryable, ..
            } => {
                assert_eq!(code, "conflict");
                assert!(retryable);
            }
            other => panic!("expected error, got {other:?}"),
        }
    }
}
