// The shared-state seam: where draft state and picks live between calls.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::draft::pick::DraftPick;
use crate::draft::roster::{LeagueId, LeagueRoster};
use crate::draft::state::{DraftState, DraftStatus};
use crate::error::StoreError;

/// The persisted per-league draft: state cursor plus the roster frozen at
/// start.
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueDraft {
    /// Bumped by every `reset`. A commit validated against an older
    /// generation must not land in the restarted draft.
    pub generation: u64,
    pub state: DraftState,
    pub roster: LeagueRoster,
}

/// Backend holding draft state and the pick sequence.
///
/// `commit_pick` is the only mutation of an in-progress draft and must be
/// linearizable per league: a compare-and-swap on `(generation, pick_number)`.
pub trait DraftStore: Send + Sync {
    /// `None` for a league that was never started.
    fn load(&self, league: &LeagueId) -> Result<Option<LeagueDraft>, StoreError>;

    /// Committed picks in `pick_number` order.
    fn picks(&self, league: &LeagueId) -> Result<Vec<DraftPick>, StoreError>;

    /// Discard every pick for the league and write a fresh state and roster
    /// under the next generation.
    fn reset(
        &self,
        league: &LeagueId,
        roster: &LeagueRoster,
        state: &DraftState,
    ) -> Result<(), StoreError>;

    /// Append `pick` and replace the state with `next`, but only if the
    /// stored draft is still `generation`, active at `expected_pick_number`,
    /// and the slot is still free. Otherwise returns `StoreError::Conflict`
    /// and writes nothing.
    fn commit_pick(
        &self,
        league: &LeagueId,
        generation: u64,
        expected_pick_number: u32,
        pick: &DraftPick,
        next: &DraftState,
    ) -> Result<(), StoreError>;

    /// Leagues whose draft is currently active.
    fn active_leagues(&self) -> Result<Vec<LeagueId>, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryLeague {
    draft: Option<LeagueDraft>,
    picks: Vec<DraftPick>,
}

/// Process-local store. Suitable for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    leagues: Mutex<HashMap<LeagueId, MemoryLeague>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn leagues(&self) -> Result<MutexGuard<'_, HashMap<LeagueId, MemoryLeague>>, StoreError> {
        self.leagues
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".into()))
    }
}

impl DraftStore for MemoryStore {
    fn load(&self, league: &LeagueId) -> Result<Option<LeagueDraft>, StoreError> {
        let leagues = self.leagues()?;
        Ok(leagues.get(league).and_then(|l| l.draft.clone()))
    }

    fn picks(&self, league: &LeagueId) -> Result<Vec<DraftPick>, StoreError> {
        let leagues = self.leagues()?;
        Ok(leagues
            .get(league)
            .map(|l| l.picks.clone())
            .unwrap_or_default())
    }

    fn reset(
        &self,
        league: &LeagueId,
        roster: &LeagueRoster,
        state: &DraftState,
    ) -> Result<(), StoreError> {
        let mut leagues = self.leagues()?;
        let entry = leagues.entry(league.clone()).or_default();
        let generation = entry.draft.as_ref().map_or(1, |d| d.generation + 1);
        entry.picks.clear();
        entry.draft = Some(LeagueDraft {
            generation,
            state: state.clone(),
            roster: roster.clone(),
        });
        Ok(())
    }

    fn commit_pick(
        &self,
        league: &LeagueId,
        generation: u64,
        expected_pick_number: u32,
        pick: &DraftPick,
        next: &DraftState,
    ) -> Result<(), StoreError> {
        let mut leagues = self.leagues()?;
        let Some(entry) = leagues.get_mut(league) else {
            return Err(StoreError::Conflict);
        };
        let Some(draft) = entry.draft.as_mut() else {
            return Err(StoreError::Conflict);
        };

        let cursor_matches = draft.generation == generation
            && draft.state.status == DraftStatus::Active
            && draft.state.pick_number == expected_pick_number
            && pick.pick_number == expected_pick_number
            && entry.picks.len() == expected_pick_number as usize;
        if !cursor_matches {
            return Err(StoreError::Conflict);
        }
        if entry.picks.iter().any(|p| p.slot == pick.slot) {
            return Err(StoreError::Conflict);
        }

        entry.picks.push(pick.clone());
        draft.state = next.clone();
        Ok(())
    }

    fn active_leagues(&self) -> Result<Vec<LeagueId>, StoreError> {
        let leagues = self.leagues()?;
        let mut active: Vec<LeagueId> = leagues
            .iter()
            .filter(|(_, l)| l.draft.as_ref().is_some_and(|d| d.state.is_active()))
            .map(|(id, _)| id.clone())
            .collect();
        active.sort();
        Ok(active)
    }
}
