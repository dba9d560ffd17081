// Read-only view of the collaborators that own league membership and goal
// titles.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::draft::catalogue::CatalogueEntry;
use crate::draft::roster::{LeagueId, ManagerId};
use crate::error::DirectoryError;

pub trait LeagueDirectory: Send + Sync {
    /// Members of the league, in any order, possibly with duplicates.
    fn roster(&self, league: &LeagueId) -> Result<Vec<ManagerId>, DirectoryError>;

    /// Display titles for goal slots across the league.
    fn slot_titles(&self, league: &LeagueId) -> Result<Vec<CatalogueEntry>, DirectoryError>;
}

#[derive(Debug, Clone, Default)]
struct LeagueListing {
    members: Vec<ManagerId>,
    titles: Vec<CatalogueEntry>,
}

/// In-memory directory, seeded at startup or by tests.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    leagues: RwLock<HashMap<LeagueId, LeagueListing>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a league's members.
    pub fn set_members(&self, league: LeagueId, members: Vec<ManagerId>) {
        let mut leagues = self.leagues.write().unwrap_or_else(|e| e.into_inner());
        leagues.entry(league).or_default().members = members;
    }

    /// Add or overwrite a slot title.
    pub fn set_title(&self, league: LeagueId, entry: CatalogueEntry) {
        let mut leagues = self.leagues.write().unwrap_or_else(|e| e.into_inner());
        let titles = &mut leagues.entry(league).or_default().titles;
        match titles.iter_mut().find(|t| t.slot == entry.slot) {
            Some(existing) => existing.title = entry.title,
            None => titles.push(entry),
        }
    }

    pub fn league_ids(&self) -> Vec<LeagueId> {
        let leagues = self.leagues.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<LeagueId> = leagues.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl LeagueDirectory for StaticDirectory {
    fn roster(&self, league: &LeagueId) -> Result<Vec<ManagerId>, DirectoryError> {
        let leagues = self.leagues.read().unwrap_or_else(|e| e.into_inner());
        leagues
            .get(league)
            .map(|l| l.members.clone())
            .ok_or_else(|| DirectoryError::UnknownLeague(league.clone()))
    }

    fn slot_titles(&self, league: &LeagueId) -> Result<Vec<CatalogueEntry>, DirectoryError> {
        let leagues = self.leagues.read().unwrap_or_else(|e| e.into_inner());
        leagues
            .get(league)
            .map(|l| l.titles.clone())
            .ok_or_else(|| DirectoryError::UnknownLeague(league.clone()))
    }
}
