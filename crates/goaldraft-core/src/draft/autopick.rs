// Deterministic fallback selection for a lapsed or skipped turn.

use std::collections::HashSet;

use super::catalogue::{GoalSlot, SlotCatalogue};

/// The slot autopick assigns: the lowest `(owner, cadence, slot_index)`
/// among slots not yet drafted, from anywhere in the league.
///
/// Identical inputs always give the identical slot, so redundant callers
/// racing to resolve the same turn all try to commit the same pick.
pub fn select_slot<'a>(
    catalogue: &'a SlotCatalogue,
    drafted: &HashSet<&GoalSlot>,
) -> Option<&'a GoalSlot> {
    // Catalogue slots are already in ascending order.
    catalogue
        .slots()
        .iter()
        .map(|s| &s.slot)
        .find(|slot| !drafted.contains(slot))
}
