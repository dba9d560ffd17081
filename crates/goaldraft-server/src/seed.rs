// Seed data for the league directory: membership from leagues.toml, slot
// titles from a CSV file.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use goaldraft_core::directory::StaticDirectory;
use goaldraft_core::draft::catalogue::{Cadence, CatalogueEntry, GoalSlot};
use goaldraft_core::draft::roster::{LeagueId, ManagerId};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::SeedPaths;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("duplicate league `{0}` in leagues file")]
    DuplicateLeague(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueSeed {
    pub id: String,
    #[serde(default)]
    pub managers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LeaguesFile {
    #[serde(default, rename = "league")]
    leagues: Vec<LeagueSeed>,
}

/// One row of the titles CSV.
#[derive(Debug, Deserialize)]
struct TitleRow {
    league: String,
    owner: String,
    cadence: String,
    slot_index: u32,
    title: String,
}

pub fn parse_leagues(text: &str) -> Result<Vec<LeagueSeed>, toml::de::Error> {
    let file: LeaguesFile = toml::from_str(text)?;
    Ok(file.leagues)
}

/// Parse title rows, skipping malformed ones.
fn titles_from_reader<R: Read>(rdr: R) -> Result<Vec<(LeagueId, CatalogueEntry)>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut entries = Vec::new();
    for result in reader.deserialize::<TitleRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("skipping malformed title row: {}", e);
                continue;
            }
        };
        let Some(cadence) = Cadence::from_str_cadence(row.cadence.trim()) else {
            warn!("skipping title row with unknown cadence '{}'", row.cadence);
            continue;
        };
        let title = row.title.trim();
        if title.is_empty() {
            continue;
        }
        entries.push((
            LeagueId::new(row.league.trim()),
            CatalogueEntry {
                slot: GoalSlot::new(ManagerId::new(row.owner.trim()), cadence, row.slot_index),
                title: title.to_string(),
            },
        ));
    }
    Ok(entries)
}

/// Build a directory from already-parsed seed data.
pub fn build_directory(
    leagues: Vec<LeagueSeed>,
    titles: Vec<(LeagueId, CatalogueEntry)>,
) -> Result<StaticDirectory, SeedError> {
    let directory = StaticDirectory::new();
    let mut known: HashSet<LeagueId> = HashSet::new();

    for league in leagues {
        let id = LeagueId::new(league.id.trim());
        if !known.insert(id.clone()) {
            return Err(SeedError::DuplicateLeague(league.id));
        }
        let members = league
            .managers
            .iter()
            .map(|m| ManagerId::new(m.trim()))
            .collect();
        directory.set_members(id, members);
    }

    for (league, entry) in titles {
        if !known.contains(&league) {
            warn!("ignoring title for unknown league {}", league);
            continue;
        }
        directory.set_title(league, entry);
    }

    Ok(directory)
}

/// Load the seed files named in the config, relative to `base_dir`.
pub fn load_directory(base_dir: &Path, paths: &SeedPaths) -> Result<StaticDirectory, SeedError> {
    let leagues_path = base_dir.join(&paths.leagues);
    let text = std::fs::read_to_string(&leagues_path).map_err(|e| SeedError::Io {
        path: leagues_path.clone(),
        source: e,
    })?;
    let leagues = parse_leagues(&text).map_err(|e| SeedError::Toml {
        path: leagues_path.clone(),
        source: e,
    })?;

    let titles = match &paths.titles {
        Some(titles) if !titles.trim().is_empty() => {
            let titles_path = base_dir.join(titles);
            let file = std::fs::File::open(&titles_path).map_err(|e| SeedError::Io {
                path: titles_path.clone(),
                source: e,
            })?;
            titles_from_reader(file).map_err(|e| SeedError::Csv {
                path: titles_path,
                source: e,
            })?
        }
        _ => Vec::new(),
    };

    info!(
        "Seeded {} leagues and {} slot titles",
        leagues.len(),
        titles.len()
    );
    build_directory(leagues, titles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use goaldraft_core::directory::LeagueDirectory;

    const LEAGUES: &str = r#"
        [[league]]
        id = "friends"
        managers = ["bob", "alex"]

        [[league]]
        id = "solo"
        managers = ["zoe"]
    "#;

    const TITLES: &str = "\
league,owner,cadence,slot_index,title
friends,alex,weekly,0,Run three times
friends,bob,Monthly,1,Read a book
friends,bob,daily,0,Not a cadence
ghost,alex,weekly,0,Unknown league
friends,alex,weekly,notanumber,Broken
";

    #[test]
    fn parses_league_tables() {
        let leagues = parse_leagues(LEAGUES).unwrap();
        assert_eq!(leagues.len(), 2);
        assert_eq!(leagues[0].id, "friends");
        assert_eq!(leagues[0].managers, vec!["bob", "alex"]);
    }

    #[test]
    fn empty_file_has_no_leagues() {
        assert!(parse_leagues("").unwrap().is_empty());
    }

    #[test]
    fn title_rows_skip_bad_cadence_and_malformed_lines() {
        let rows = titles_from_reader(TITLES.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].1.slot, GoalSlot::new("bob", Cadence::Monthly, 1));
    }

    #[test]
    fn directory_ignores_titles_for_unknown_leagues() {
        let rows = titles_from_reader(TITLES.as_bytes()).unwrap();
        let dir = build_directory(parse_leagues(LEAGUES).unwrap(), rows).unwrap();

        let friends = LeagueId::from("friends");
        assert_eq!(dir.slot_titles(&friends).unwrap().len(), 2);
        assert_eq!(dir.roster(&friends).unwrap().len(), 2);
        assert!(dir.roster(&LeagueId::from("ghost")).is_err());
        assert_eq!(
            dir.league_ids(),
            vec![LeagueId::from("friends"), LeagueId::from("solo")]
        );
    }

    #[test]
    fn duplicate_league_is_rejected() {
        let text = r#"
            [[league]]
            id = "a"
            [[league]]
            id = "a"
        "#;
        let err = build_directory(parse_leagues(text).unwrap(), vec![]).unwrap_err();
        assert!(matches!(err, SeedError::DuplicateLeague(_)));
    }

    #[test]
    fn shipped_seed_files_load() {
        let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let paths = SeedPaths {
            leagues: "defaults/leagues.toml".into(),
            titles: Some("defaults/slot_titles.csv".into()),
        };
        let dir = load_directory(&root, &paths).unwrap();
        assert_eq!(dir.roster(&LeagueId::from("friends")).unwrap().len(), 2);
        assert_eq!(dir.roster(&LeagueId::from("office")).unwrap().len(), 4);
        assert!(!dir.slot_titles(&LeagueId::from("friends")).unwrap().is_empty());
    }
}
