// Committed pick records and the reasons a pick attempt is turned away.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalogue::GoalSlot;
use super::roster::{LeagueId, ManagerId};

/// A single committed draft pick. Never mutated after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPick {
    pub league: LeagueId,
    /// Zero-based position in the pick sequence.
    pub pick_number: u32,
    /// The manager who made (or was credited with) the pick.
    pub manager: ManagerId,
    pub slot: GoalSlot,
    /// True when the autopick resolver chose the slot.
    #[serde(default)]
    pub autopicked: bool,
    pub created_at: DateTime<Utc>,
}

/// Why a pick attempt was rejected. These are caller errors: never retried
/// automatically, and they leave the draft untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickRejection {
    #[error("the draft is not running")]
    NotActive,

    #[error("goal slot {slot} has already been drafted")]
    AlreadyDrafted { slot: GoalSlot },

    #[error("wait your turn: {on_clock} is on the clock")]
    NotYourTurn { on_clock: ManagerId },

    #[error("no goal slot {slot} in this league")]
    UnknownSlot { slot: GoalSlot },
}

impl PickRejection {
    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            PickRejection::NotActive => "not_active",
            PickRejection::AlreadyDrafted { .. } => "already_drafted",
            PickRejection::NotYourTurn { .. } => "not_your_turn",
            PickRejection::UnknownSlot { .. } => "unknown_slot",
        }
    }
}
