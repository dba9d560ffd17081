// League identities and the frozen, ordered roster of managers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Identifier of a league. Opaque to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeagueId(String);

impl LeagueId {
    pub fn new(id: impl Into<String>) -> Self {
        LeagueId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeagueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LeagueId {
    fn from(s: &str) -> Self {
        LeagueId(s.to_string())
    }
}

/// Identity of a manager, unique within a league.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManagerId(String);

impl ManagerId {
    pub fn new(id: impl Into<String>) -> Self {
        ManagerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ManagerId {
    fn from(s: &str) -> Self {
        ManagerId(s.to_string())
    }
}

/// The managers participating in one league's draft.
///
/// Always sorted ascending by identity and free of duplicates, so the snake
/// order derived from it is deterministic no matter what order the
/// collaborator returned the members in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ManagerId>", into = "Vec<ManagerId>")]
pub struct LeagueRoster {
    managers: Vec<ManagerId>,
}

impl LeagueRoster {
    /// Build a roster from raw member ids. Empty ids are dropped.
    pub fn new(members: impl IntoIterator<Item = ManagerId>) -> Self {
        let mut seen = BTreeSet::new();
        for member in members {
            if member.as_str().is_empty() {
                warn!("Ignoring empty manager id in league roster");
                continue;
            }
            seen.insert(member);
        }
        LeagueRoster {
            managers: seen.into_iter().collect(),
        }
    }

    /// Managers in ascending order.
    pub fn managers(&self) -> &[ManagerId] {
        &self.managers
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    pub fn contains(&self, manager: &ManagerId) -> bool {
        self.managers.binary_search(manager).is_ok()
    }
}

impl From<Vec<ManagerId>> for LeagueRoster {
    fn from(members: Vec<ManagerId>) -> Self {
        LeagueRoster::new(members)
    }
}

impl From<LeagueRoster> for Vec<ManagerId> {
    fn from(roster: LeagueRoster) -> Self {
        roster.managers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ManagerId> {
        names.iter().map(|n| ManagerId::from(*n)).collect()
    }

    #[test]
    fn roster_is_sorted_and_deduplicated() {
        let roster = LeagueRoster::new(ids(&["casey", "alex", "bob", "alex"]));
        assert_eq!(roster.managers(), ids(&["alex", "bob", "casey"]).as_slice());
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn empty_ids_are_dropped() {
        let roster = LeagueRoster::new(ids(&["", "bob"]));
        assert_eq!(roster.managers(), ids(&["bob"]).as_slice());
    }

    #[test]
    fn contains_uses_identity() {
        let roster = LeagueRoster::new(ids(&["alex", "bob"]));
        assert!(roster.contains(&ManagerId::from("bob")));
        assert!(!roster.contains(&ManagerId::from("Bob")));
    }

    #[test]
    fn serde_normalizes_on_the_way_in() {
        let roster: LeagueRoster = serde_json::from_str(r#"["bob","alex","bob"]"#).unwrap();
        assert_eq!(roster.managers(), ids(&["alex", "bob"]).as_slice());
        assert_eq!(serde_json::to_string(&roster).unwrap(), r#"["alex","bob"]"#);
    }
}
