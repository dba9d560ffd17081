// Draft state: status, the next pick number, and the per-pick deadline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::catalogue::SLOTS_PER_MANAGER;
use super::roster::{LeagueId, LeagueRoster, ManagerId};
use super::snake;

/// Default time each manager gets to make a pick.
pub const DEFAULT_PICK_TIME_SECS: i64 = 120;

/// Lifecycle phase of a league's draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    NotStarted,
    Active,
    Done,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::NotStarted => "not_started",
            DraftStatus::Active => "active",
            DraftStatus::Done => "done",
        }
    }

    pub fn from_str_status(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(DraftStatus::NotStarted),
            "active" => Some(DraftStatus::Active),
            "done" => Some(DraftStatus::Done),
            _ => None,
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for the turn clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftSettings {
    /// Time budget for each pick, measured from the previous commit.
    pub pick_time: Duration,
}

impl Default for DraftSettings {
    fn default() -> Self {
        DraftSettings {
            pick_time: Duration::seconds(DEFAULT_PICK_TIME_SECS),
        }
    }
}

/// The authoritative per-league draft cursor.
///
/// `pick_number` is the NEXT pick to be made and always equals the number of
/// committed picks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftState {
    pub status: DraftStatus,
    pub pick_number: u32,
    pub pick_deadline: Option<DateTime<Utc>>,
}

impl Default for DraftState {
    fn default() -> Self {
        Self::not_started()
    }
}

impl DraftState {
    pub fn not_started() -> Self {
        DraftState {
            status: DraftStatus::NotStarted,
            pick_number: 0,
            pick_deadline: None,
        }
    }

    /// A fresh draft with the first pick on the clock.
    pub fn started(now: DateTime<Utc>, settings: &DraftSettings) -> Self {
        DraftState {
            status: DraftStatus::Active,
            pick_number: 0,
            pick_deadline: Some(now + settings.pick_time),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DraftStatus::Active
    }

    /// The state after one more pick is committed at `now`.
    ///
    /// Reaching `total_picks` finishes the draft and clears the deadline.
    pub fn advanced(&self, total_picks: u32, now: DateTime<Utc>, settings: &DraftSettings) -> Self {
        let next = self.pick_number + 1;
        if next >= total_picks {
            DraftState {
                status: DraftStatus::Done,
                pick_number: next,
                pick_deadline: None,
            }
        } else {
            DraftState {
                status: DraftStatus::Active,
                pick_number: next,
                pick_deadline: Some(now + settings.pick_time),
            }
        }
    }

    /// Whether the current turn's deadline has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.pick_deadline.is_some_and(|d| now >= d)
    }
}

/// Total number of picks in a draft for a roster of `roster_size`.
pub fn total_picks(roster_size: usize) -> u32 {
    roster_size as u32 * SLOTS_PER_MANAGER
}

/// Read model handed to viewers: the state plus everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub league: LeagueId,
    pub state: DraftState,
    /// Manager whose turn it is; `None` unless the draft is active.
    pub on_clock: Option<ManagerId>,
    pub round: Option<u32>,
    pub total_picks: u32,
    pub picks_remaining: u32,
    pub managers: Vec<ManagerId>,
}

impl DraftSnapshot {
    pub fn build(league: &LeagueId, state: &DraftState, roster: &LeagueRoster) -> Self {
        let total = total_picks(roster.len());
        let (on_clock, round) = if state.is_active() {
            (
                snake::manager_on_clock(roster.managers(), state.pick_number).cloned(),
                snake::round_of(roster.len(), state.pick_number),
            )
        } else {
            (None, None)
        };
        DraftSnapshot {
            league: league.clone(),
            state: state.clone(),
            on_clock,
            round,
            total_picks: total,
            picks_remaining: total.saturating_sub(state.pick_number),
            managers: roster.managers().to_vec(),
        }
    }
}
