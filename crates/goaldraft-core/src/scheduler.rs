// The draft scheduler: start, pick, autopick, and the read side.
//
// All writes go through `commit`, which hands the store a compare-and-swap
// on the draft generation and pick cursor. Everything before the commit is validation against a
// snapshot that may already be stale; the store is what makes it safe.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::directory::LeagueDirectory;
use crate::draft::autopick;
use crate::draft::catalogue::{is_valid_slot, CatalogueSlot, GoalSlot, SlotCatalogue};
use crate::draft::pick::{DraftPick, PickRejection};
use crate::draft::roster::{LeagueId, LeagueRoster, ManagerId};
use crate::draft::snake;
use crate::draft::state::{total_picks, DraftSettings, DraftSnapshot, DraftState, DraftStatus};
use crate::error::{DraftError, DraftResult, StoreError};
use crate::events::{DraftEvent, DraftEvents};
use crate::store::{DraftStore, LeagueDraft};

pub struct DraftScheduler {
    store: Arc<dyn DraftStore>,
    directory: Arc<dyn LeagueDirectory>,
    clock: Arc<dyn Clock>,
    settings: DraftSettings,
    events: DraftEvents,
}

impl DraftScheduler {
    pub fn new(
        store: Arc<dyn DraftStore>,
        directory: Arc<dyn LeagueDirectory>,
        clock: Arc<dyn Clock>,
        settings: DraftSettings,
    ) -> Self {
        DraftScheduler {
            store,
            directory,
            clock,
            settings,
            events: DraftEvents::default(),
        }
    }

    pub fn settings(&self) -> &DraftSettings {
        &self.settings
    }

    /// Receive change notifications for every league.
    pub fn subscribe(&self) -> broadcast::Receiver<DraftEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Begin a brand-new draft for `league`, discarding any previous picks.
    ///
    /// The roster is read from the directory once, here, and frozen for the
    /// life of this draft.
    pub fn start(&self, league: &LeagueId) -> DraftResult<DraftState> {
        let roster = LeagueRoster::new(self.directory.roster(league)?);
        if roster.is_empty() {
            return Err(DraftError::EmptyRoster {
                league: league.clone(),
            });
        }

        let state = DraftState::started(self.clock.now(), &self.settings);
        self.store.reset(league, &roster, &state)?;

        info!(
            "Draft started for league {}: {} managers, {} picks",
            league,
            roster.len(),
            total_picks(roster.len())
        );
        self.events.publish(DraftEvent::Started {
            league: league.clone(),
            state: state.clone(),
        });
        Ok(state)
    }

    /// Draft `slot` for `acting`.
    ///
    /// Checks, in order: the draft is running, the slot is still free, it is
    /// `acting`'s turn, and the slot exists in this league.
    pub fn make_pick(
        &self,
        league: &LeagueId,
        acting: &ManagerId,
        slot: GoalSlot,
    ) -> DraftResult<DraftPick> {
        let draft = self.active_draft(league)?;
        let picks = self.store.picks(league)?;

        if picks.iter().any(|p| p.slot == slot) {
            debug!("Rejected pick of {} in {}: already drafted", slot, league);
            return Err(PickRejection::AlreadyDrafted { slot }.into());
        }

        let on_clock = snake::manager_on_clock(draft.roster.managers(), draft.state.pick_number)
            .ok_or(PickRejection::NotActive)?;
        if on_clock != acting {
            debug!(
                "Rejected pick by {} in {}: {} is on the clock",
                acting, league, on_clock
            );
            return Err(PickRejection::NotYourTurn {
                on_clock: on_clock.clone(),
            }
            .into());
        }

        if !is_valid_slot(&draft.roster, &slot) {
            return Err(PickRejection::UnknownSlot { slot }.into());
        }

        self.commit(league, &draft, acting.clone(), slot, false)
    }

    /// Pick on behalf of whoever is on the clock, regardless of the deadline.
    pub fn autopick(&self, league: &LeagueId) -> DraftResult<DraftPick> {
        let draft = self.active_draft(league)?;
        self.autopick_for(league, &draft)
    }

    /// Autopick only if the current turn's deadline has passed.
    ///
    /// `Ok(None)` when the draft is not running or the turn has time left.
    /// The expiry check and the commit use the same snapshot, so a pick made
    /// in between turns this into a `Conflict` rather than an early autopick
    /// of the following turn.
    pub fn autopick_if_expired(&self, league: &LeagueId) -> DraftResult<Option<DraftPick>> {
        let Some(draft) = self.store.load(league)? else {
            return Ok(None);
        };
        if !draft.state.is_expired(self.clock.now()) {
            return Ok(None);
        }
        self.autopick_for(league, &draft).map(Some)
    }

    /// Resolve every active league whose turn has lapsed.
    ///
    /// Per-league failures are logged and skipped; only failing to list the
    /// active leagues is an error.
    pub fn sweep_expired(&self) -> DraftResult<Vec<DraftPick>> {
        let mut resolved = Vec::new();
        for league in self.store.active_leagues()? {
            match self.autopick_if_expired(&league) {
                Ok(Some(pick)) => resolved.push(pick),
                Ok(None) => {}
                Err(DraftError::Conflict) => {
                    debug!("Expired turn in {} was resolved by another caller", league);
                }
                Err(e) => warn!("Failed to resolve expired turn in {}: {}", league, e),
            }
        }
        Ok(resolved)
    }

    fn autopick_for(&self, league: &LeagueId, draft: &LeagueDraft) -> DraftResult<DraftPick> {
        if !draft.state.is_active() {
            return Err(PickRejection::NotActive.into());
        }
        let on_clock = snake::manager_on_clock(draft.roster.managers(), draft.state.pick_number)
            .cloned()
            .ok_or(PickRejection::NotActive)?;

        let picks = self.store.picks(league)?;
        let drafted: HashSet<&GoalSlot> = picks.iter().map(|p| &p.slot).collect();
        let catalogue = SlotCatalogue::for_roster(&draft.roster);
        // An active draft always has a free slot; running out means the
        // cursor and the pick list disagree.
        let slot = autopick::select_slot(&catalogue, &drafted)
            .cloned()
            .ok_or(PickRejection::NotActive)?;

        info!(
            "Autopicking {} for {} at pick #{} in {}",
            slot, on_clock, draft.state.pick_number, league
        );
        self.commit(league, draft, on_clock, slot, true)
    }

    fn commit(
        &self,
        league: &LeagueId,
        draft: &LeagueDraft,
        manager: ManagerId,
        slot: GoalSlot,
        autopicked: bool,
    ) -> DraftResult<DraftPick> {
        let now = self.clock.now();
        let expected = draft.state.pick_number;
        let pick = DraftPick {
            league: league.clone(),
            pick_number: expected,
            manager,
            slot,
            autopicked,
            created_at: now,
        };
        let next = draft
            .state
            .advanced(total_picks(draft.roster.len()), now, &self.settings);

        match self
            .store
            .commit_pick(league, draft.generation, expected, &pick, &next)
        {
            Ok(()) => {}
            Err(StoreError::Conflict) => {
                warn!(
                    "Pick #{} in {} by {} lost to a concurrent commit",
                    expected, league, pick.manager
                );
                return Err(DraftError::Conflict);
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            "Pick #{} in {}: {} drafted {}",
            pick.pick_number, league, pick.manager, pick.slot
        );
        self.events.publish(DraftEvent::PickMade {
            league: league.clone(),
            pick: pick.clone(),
            state: next.clone(),
        });
        if next.status == DraftStatus::Done {
            info!("Draft complete for league {}", league);
            self.events.publish(DraftEvent::Completed {
                league: league.clone(),
            });
        }
        Ok(pick)
    }

    fn active_draft(&self, league: &LeagueId) -> DraftResult<LeagueDraft> {
        match self.store.load(league)? {
            Some(draft) if draft.state.is_active() => Ok(draft),
            _ => Err(PickRejection::NotActive.into()),
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn state(&self, league: &LeagueId) -> DraftResult<DraftState> {
        Ok(self
            .store
            .load(league)?
            .map(|d| d.state)
            .unwrap_or_default())
    }

    pub fn snapshot(&self, league: &LeagueId) -> DraftResult<DraftSnapshot> {
        let draft = self.store.load(league)?;
        Ok(match draft {
            Some(d) => DraftSnapshot::build(league, &d.state, &d.roster),
            None => DraftSnapshot::build(league, &DraftState::not_started(), &LeagueRoster::default()),
        })
    }

    pub fn picks(&self, league: &LeagueId) -> DraftResult<Vec<DraftPick>> {
        Ok(self.store.picks(league)?)
    }

    /// Picks credited to one manager: their fantasy team.
    pub fn team(&self, league: &LeagueId, manager: &ManagerId) -> DraftResult<Vec<DraftPick>> {
        Ok(self
            .store
            .picks(league)?
            .into_iter()
            .filter(|p| &p.manager == manager)
            .collect())
    }

    /// Undrafted slots with their current titles.
    ///
    /// Uses the frozen roster once a draft exists, otherwise the directory's
    /// current membership.
    pub fn available_slots(&self, league: &LeagueId) -> DraftResult<Vec<CatalogueSlot>> {
        let roster = match self.store.load(league)? {
            Some(d) => d.roster,
            None => LeagueRoster::new(self.directory.roster(league)?),
        };
        let titles = self.directory.slot_titles(league)?;
        let catalogue = SlotCatalogue::with_titles(&roster, &titles);

        let picks = self.store.picks(league)?;
        let drafted: HashSet<&GoalSlot> = picks.iter().map(|p| &p.slot).collect();
        Ok(catalogue
            .slots()
            .iter()
            .filter(|s| !drafted.contains(&s.slot))
            .cloned()
            .collect())
    }
}
