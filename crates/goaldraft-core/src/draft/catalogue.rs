// Goal cadences, slot identities, and the league-wide catalogue of
// draftable slots.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::roster::{LeagueRoster, ManagerId};

/// Number of goal slots every manager contributes to the draft.
pub const SLOTS_PER_MANAGER: u32 = 7;

/// How often a goal repeats. Declaration order is the autopick tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Weekly,
    Monthly,
    Yearly,
}

impl Cadence {
    pub const ALL: [Cadence; 3] = [Cadence::Weekly, Cadence::Monthly, Cadence::Yearly];

    /// Slots each manager owns for this cadence.
    pub fn slot_count(&self) -> u32 {
        match self {
            Cadence::Weekly => 3,
            Cadence::Monthly => 2,
            Cadence::Yearly => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Weekly => "weekly",
            Cadence::Monthly => "monthly",
            Cadence::Yearly => "yearly",
        }
    }

    /// Case-insensitive parse of the wire/storage name.
    pub fn from_str_cadence(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" => Some(Cadence::Weekly),
            "monthly" => Some(Cadence::Monthly),
            "yearly" => Some(Cadence::Yearly),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Cadence::Weekly => "Weekly",
            Cadence::Monthly => "Monthly",
            Cadence::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One draftable goal slot: `(owner, cadence, slot_index)`.
///
/// Field order gives the derived `Ord` its meaning; autopick relies on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GoalSlot {
    pub owner: ManagerId,
    pub cadence: Cadence,
    pub slot_index: u32,
}

impl GoalSlot {
    pub fn new(owner: impl Into<ManagerId>, cadence: Cadence, slot_index: u32) -> Self {
        GoalSlot {
            owner: owner.into(),
            cadence,
            slot_index,
        }
    }
}

impl fmt::Display for GoalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.cadence, self.slot_index)
    }
}

/// A title record as supplied by the goal-tracking collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    pub slot: GoalSlot,
    pub title: String,
}

/// A slot together with its display title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueSlot {
    pub slot: GoalSlot,
    pub title: String,
}

/// Every slot a league can draft, in ascending `(owner, cadence, slot_index)`
/// order.
///
/// The slot set is fixed by the roster: seven per manager. Collaborator
/// entries only supply titles.
#[derive(Debug, Clone, Default)]
pub struct SlotCatalogue {
    slots: Vec<CatalogueSlot>,
}

impl SlotCatalogue {
    /// The untitled catalogue for a roster.
    pub fn for_roster(roster: &LeagueRoster) -> Self {
        Self::with_titles(roster, &[])
    }

    /// Build the catalogue for `roster`, decorating slots with titles from
    /// `entries`. Entries naming an owner outside the roster or an index
    /// beyond the cadence's slot count are ignored.
    pub fn with_titles(roster: &LeagueRoster, entries: &[CatalogueEntry]) -> Self {
        let mut titles: HashMap<&GoalSlot, &str> = HashMap::new();
        for entry in entries {
            if !is_valid_slot(roster, &entry.slot) {
                warn!("Ignoring catalogue entry for unknown slot {}", entry.slot);
                continue;
            }
            titles.insert(&entry.slot, entry.title.as_str());
        }

        let mut slots = Vec::with_capacity(roster.len() * SLOTS_PER_MANAGER as usize);
        for owner in roster.managers() {
            for cadence in Cadence::ALL {
                for slot_index in 0..cadence.slot_count() {
                    let slot = GoalSlot::new(owner.clone(), cadence, slot_index);
                    let title = match titles.get(&slot) {
                        Some(t) if !t.trim().is_empty() => t.to_string(),
                        _ => default_title(cadence, slot_index),
                    };
                    slots.push(CatalogueSlot { slot, title });
                }
            }
        }

        SlotCatalogue { slots }
    }

    pub fn slots(&self) -> &[CatalogueSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, slot: &GoalSlot) -> bool {
        self.slots.binary_search_by(|s| s.slot.cmp(slot)).is_ok()
    }

    pub fn title(&self, slot: &GoalSlot) -> Option<&str> {
        self.slots
            .binary_search_by(|s| s.slot.cmp(slot))
            .ok()
            .map(|i| self.slots[i].title.as_str())
    }
}

/// Whether `slot` is one of the seven slots of a manager on `roster`.
pub fn is_valid_slot(roster: &LeagueRoster, slot: &GoalSlot) -> bool {
    roster.contains(&slot.owner) && slot.slot_index < slot.cadence.slot_count()
}

fn default_title(cadence: Cadence, slot_index: u32) -> String {
    format!("{} goal {}", cadence.label(), slot_index + 1)
}
