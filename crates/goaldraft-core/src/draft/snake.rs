// Snake draft order: round 0 runs first-to-last, round 1 last-to-first,
// and so on.

use super::roster::ManagerId;

/// The manager on the clock for the zero-based global `pick_number`.
///
/// `roster` must already be in ascending order (see `LeagueRoster`).
/// Returns `None` for an empty roster.
pub fn manager_on_clock(roster: &[ManagerId], pick_number: u32) -> Option<&ManagerId> {
    let n = roster.len();
    if n == 0 {
        return None;
    }
    let pick = pick_number as usize;
    let round = pick / n;
    let within = pick % n;
    if round % 2 == 0 {
        roster.get(within)
    } else {
        roster.get(n - 1 - within)
    }
}

/// Zero-based round that `pick_number` falls in.
pub fn round_of(roster_size: usize, pick_number: u32) -> Option<u32> {
    if roster_size == 0 {
        return None;
    }
    Some(pick_number / roster_size as u32)
}
