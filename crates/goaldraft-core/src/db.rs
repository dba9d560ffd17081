// SQLite persistence layer for draft state and picks.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::debug;

use crate::draft::catalogue::{Cadence, GoalSlot};
use crate::draft::pick::DraftPick;
use crate::draft::roster::{LeagueId, LeagueRoster, ManagerId};
use crate::draft::state::{DraftState, DraftStatus};
use crate::error::StoreError;
use crate::store::{DraftStore, LeagueDraft};

/// Default database location inside the per-user data directory, if the
/// platform has one.
pub fn default_db_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "goaldraft")
        .map(|dirs| dirs.data_dir().join("goaldraft.db"))
}

/// SQLite-backed `DraftStore`.
///
/// Pick commits run in IMMEDIATE transactions, so two processes sharing the
/// file serialize on the write lock and the loser sees its guarded update
/// touch zero rows. The guard includes the draft generation, so a restart
/// between validation and commit also counts as losing.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database at `path` and ensure the schema exists.
    /// Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS draft_state (
                league_id     TEXT PRIMARY KEY,
                status        TEXT NOT NULL,
                pick_number   INTEGER NOT NULL,
                pick_deadline TEXT,
                roster        TEXT NOT NULL,
                generation    INTEGER NOT NULL DEFAULT 1,
                started_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS draft_picks (
                league_id   TEXT NOT NULL REFERENCES draft_state(league_id),
                pick_number INTEGER NOT NULL,
                manager_id  TEXT NOT NULL,
                owner_id    TEXT NOT NULL,
                cadence     TEXT NOT NULL,
                slot_index  INTEGER NOT NULL,
                autopicked  INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (league_id, pick_number),
                UNIQUE (league_id, owner_id, cadence, slot_index)
            );
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database mutex poisoned".into()))
    }
}

impl DraftStore for SqliteStore {
    fn load(&self, league: &LeagueId) -> Result<Option<LeagueDraft>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT status, pick_number, pick_deadline, roster, generation
                 FROM draft_state WHERE league_id = ?1",
                params![league.as_str()],
                |row| {
                    let status: String = row.get(0)?;
                    let pick_number: u32 = row.get(1)?;
                    let deadline: Option<String> = row.get(2)?;
                    let roster: String = row.get(3)?;
                    let generation: u64 = row.get(4)?;
                    Ok((status, pick_number, deadline, roster, generation))
                },
            )
            .optional()?;

        let Some((status, pick_number, deadline, roster_json, generation)) = row else {
            return Ok(None);
        };

        let status = DraftStatus::from_str_status(&status).ok_or_else(|| StoreError::Corrupt {
            field: "draft_state.status".into(),
            message: format!("unknown status {status:?}"),
        })?;
        let pick_deadline = deadline
            .map(|d| parse_timestamp(&d))
            .transpose()
            .map_err(|message| StoreError::Corrupt {
                field: "draft_state.pick_deadline".into(),
                message,
            })?;
        let roster: LeagueRoster =
            serde_json::from_str(&roster_json).map_err(|e| StoreError::Corrupt {
                field: "draft_state.roster".into(),
                message: e.to_string(),
            })?;

        Ok(Some(LeagueDraft {
            generation,
            state: DraftState {
                status,
                pick_number,
                pick_deadline,
            },
            roster,
        }))
    }

    fn picks(&self, league: &LeagueId) -> Result<Vec<DraftPick>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT pick_number, manager_id, owner_id, cadence, slot_index, autopicked, created_at
             FROM draft_picks WHERE league_id = ?1 ORDER BY pick_number",
        )?;

        let picks = stmt
            .query_map(params![league.as_str()], |row| {
                let cadence: String = row.get(3)?;
                let cadence = Cadence::from_str_cadence(&cadence).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        Type::Text,
                        format!("unknown cadence {cadence:?}").into(),
                    )
                })?;
                let created_at: String = row.get(6)?;
                let created_at = parse_timestamp(&created_at).map_err(|message| {
                    rusqlite::Error::FromSqlConversionFailure(6, Type::Text, message.into())
                })?;
                Ok(DraftPick {
                    league: league.clone(),
                    pick_number: row.get(0)?,
                    manager: ManagerId::new(row.get::<_, String>(1)?),
                    slot: GoalSlot {
                        owner: ManagerId::new(row.get::<_, String>(2)?),
                        cadence,
                        slot_index: row.get(4)?,
                    },
                    autopicked: row.get(5)?,
                    created_at,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(picks)
    }

    fn reset(
        &self,
        league: &LeagueId,
        roster: &LeagueRoster,
        state: &DraftState,
    ) -> Result<(), StoreError> {
        let roster_json = serde_json::to_string(roster).map_err(|e| StoreError::Corrupt {
            field: "draft_state.roster".into(),
            message: e.to_string(),
        })?;

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM draft_picks WHERE league_id = ?1",
            params![league.as_str()],
        )?;
        tx.execute(
            "INSERT INTO draft_state
                (league_id, status, pick_number, pick_deadline, roster, generation, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT (league_id) DO UPDATE SET
                status = excluded.status,
                pick_number = excluded.pick_number,
                pick_deadline = excluded.pick_deadline,
                roster = excluded.roster,
                generation = draft_state.generation + 1,
                started_at = excluded.started_at",
            params![
                league.as_str(),
                state.status.as_str(),
                state.pick_number,
                state.pick_deadline.map(format_timestamp),
                roster_json,
            ],
        )?;
        tx.commit()?;
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
        if pick.pick_number != expected_pick_number {
            return Err(StoreError::Conflict);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // The guarded update is the compare-and-swap on the cursor.
        let updated = tx.execute(
            "UPDATE draft_state
             SET status = ?1, pick_number = ?2, pick_deadline = ?3
             WHERE league_id = ?4 AND generation = ?5 AND pick_number = ?6
               AND status = 'active'",
            params![
                next.status.as_str(),
                next.pick_number,
                next.pick_deadline.map(format_timestamp),
                league.as_str(),
                generation,
                expected_pick_number,
            ],
        )?;
        if updated == 0 {
            debug!(
                "Pick commit for league {} lost the race at pick #{} (generation {})",
                league, expected_pick_number, generation
            );
            return Err(StoreError::Conflict);
        }

        let inserted = tx.execute(
            "INSERT INTO draft_picks
                (league_id, pick_number, manager_id, owner_id, cadence, slot_index, autopicked, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                league.as_str(),
                pick.pick_number,
                pick.manager.as_str(),
                pick.slot.owner.as_str(),
                pick.slot.cadence.as_str(),
                pick.slot.slot_index,
                pick.autopicked,
                format_timestamp(pick.created_at),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                // Dropping `tx` rolls back the cursor update.
                return Err(StoreError::Conflict);
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        Ok(())
    }

    fn active_leagues(&self) -> Result<Vec<LeagueId>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT league_id FROM draft_state WHERE status = 'active' ORDER BY league_id",
        )?;
        let leagues = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|r| r.map(LeagueId::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(leagues)
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::state::DraftSettings;
    use chrono::TimeZone;

    fn test_db() -> SqliteStore {
        SqliteStore::open(":memory:").expect("in-memory database should open")
    }

    fn league() -> LeagueId {
        LeagueId::from("friends")
    }

    fn roster() -> LeagueRoster {
        LeagueRoster::new(vec![ManagerId::from("bob"), ManagerId::from("alex")])
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 18, 0, 0).unwrap()
    }

    fn started() -> DraftState {
        DraftState::started(t0(), &DraftSettings::default())
    }

    fn sample_pick(pick_number: u32, slot: GoalSlot) -> DraftPick {
        DraftPick {
            league: league(),
            pick_number,
            manager: ManagerId::from("alex"),
            slot,
            autopicked: pick_number % 2 == 1,
            created_at: t0() + chrono::Duration::milliseconds(1_250),
        }
    }

    fn count_rows(db: &SqliteStore, table: &str) -> i64 {
        let conn = db.conn().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert!(tables.contains(&"draft_state".to_string()));
        assert!(tables.contains(&"draft_picks".to_string()));
    }

    #[test]
    fn reset_and_load_round_trip() {
        let db = test_db();
        db.reset(&league(), &roster(), &started()).unwrap();

        let loaded = db.load(&league()).unwrap().unwrap();
        assert_eq!(loaded.state, started());
        assert_eq!(loaded.roster, roster());
    }

    #[test]
    fn missing_league_loads_as_none() {
        let db = test_db();
        assert!(db.load(&league()).unwrap().is_none());
        assert!(db.picks(&league()).unwrap().is_empty());
    }

    #[test]
    fn commit_persists_pick_and_cursor() {
        let db = test_db();
        let state = started();
        db.reset(&league(), &roster(), &state).unwrap();

        let pick = sample_pick(0, GoalSlot::new("bob", Cadence::Monthly, 1));
        let next = state.advanced(14, t0(), &DraftSettings::default());
        db.commit_pick(&league(), 1, 0, &pick, &next).unwrap();

        assert_eq!(db.picks(&league()).unwrap(), vec![pick]);
        assert_eq!(db.load(&league()).unwrap().unwrap().state, next);
    }

    #[test]
    fn stale_cursor_conflicts_and_writes_nothing() {
        let db = test_db();
        let state = started();
        db.reset(&league(), &roster(), &state).unwrap();
        let next = state.advanced(14, t0(), &DraftSettings::default());
        db.commit_pick(&league(), 1, 0, &sample_pick(0, GoalSlot::new("alex", Cadence::Weekly, 0)), &next)
            .unwrap();

        let racer = sample_pick(0, GoalSlot::new("bob", Cadence::Weekly, 0));
        let err = db.commit_pick(&league(), 1, 0, &racer, &next);
        assert!(matches!(err, Err(StoreError::Conflict)));
        assert_eq!(count_rows(&db, "draft_picks"), 1);
    }

    #[test]
    fn duplicate_slot_rolls_back_cursor_update() {
        let db = test_db();
        let state = started();
        db.reset(&league(), &roster(), &state).unwrap();
        let settings = DraftSettings::default();
        let slot = GoalSlot::new("alex", Cadence::Yearly, 0);
        let next = state.advanced(14, t0(), &settings);
        db.commit_pick(&league(), 1, 0, &sample_pick(0, slot.clone()), &next)
            .unwrap();

        let after = next.advanced(14, t0(), &settings);
        let err = db.commit_pick(&league(), 1, 1, &sample_pick(1, slot), &after);
        assert!(matches!(err, Err(StoreError::Conflict)));
        assert_eq!(db.load(&league()).unwrap().unwrap().state.pick_number, 1);
    }

    #[test]
    fn commit_against_finished_draft_conflicts() {
        let db = test_db();
        let done = DraftState {
            status: DraftStatus::Done,
            pick_number: 14,
            pick_deadline: None,
        };
        db.reset(&league(), &roster(), &done).unwrap();
        let err = db.commit_pick(
            &league(),
            1,
            14,
            &sample_pick(14, GoalSlot::new("alex", Cadence::Weekly, 0)),
            &done,
        );
        assert!(matches!(err, Err(StoreError::Conflict)));
    }

    #[test]
    fn reset_clears_only_that_league() {
        let db = test_db();
        let other = LeagueId::from("rivals");
        let state = started();
        let next = state.advanced(14, t0(), &DraftSettings::default());
        for l in [league(), other.clone()] {
            db.reset(&l, &roster(), &state).unwrap();
            let mut pick = sample_pick(0, GoalSlot::new("alex", Cadence::Weekly, 0));
            pick.league = l.clone();
            db.commit_pick(&l, 1, 0, &pick, &next).unwrap();
        }

        db.reset(&league(), &roster(), &state).unwrap();
        assert!(db.picks(&league()).unwrap().is_empty());
        assert_eq!(db.picks(&other).unwrap().len(), 1);
    }

    #[test]
    fn active_leagues_reads_status_column() {
        let db = test_db();
        db.reset(&LeagueId::from("b"), &roster(), &started()).unwrap();
        db.reset(&LeagueId::from("a"), &roster(), &started()).unwrap();
        db.reset(&LeagueId::from("z"), &roster(), &DraftState::not_started())
            .unwrap();
        assert_eq!(
            db.active_leagues().unwrap(),
            vec![LeagueId::from("a"), LeagueId::from("b")]
        );
    }

    #[test]
    fn reset_bumps_generation_and_stale_commits_conflict() {
        let db = test_db();
        let state = started();
        db.reset(&league(), &roster(), &state).unwrap();
        assert_eq!(db.load(&league()).unwrap().unwrap().generation, 1);

        let restarted = LeagueRoster::new(vec![ManagerId::from("bob"), ManagerId::from("carol")]);
        db.reset(&league(), &restarted, &state).unwrap();
        let current = db.load(&league()).unwrap().unwrap();
        assert_eq!(current.generation, 2);
        assert_eq!(current.roster, restarted);

        let next = state.advanced(14, t0(), &DraftSettings::default());
        let stale = sample_pick(0, GoalSlot::new("alex", Cadence::Weekly, 0));
        let err = db.commit_pick(&league(), 1, 0, &stale, &next);
        assert!(matches!(err, Err(StoreError::Conflict)));
        assert_eq!(count_rows(&db, "draft_picks"), 0);
        assert_eq!(db.load(&league()).unwrap().unwrap(), current);
    }

    #[test]
    fn timestamps_survive_storage_at_full_precision() {
        let at = t0() + chrono::Duration::nanoseconds(1_250_000_321);
        assert_eq!(parse_timestamp(&format_timestamp(at)).unwrap(), at);
        assert_eq!(parse_timestamp(&format_timestamp(t0())).unwrap(), t0());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn deadline_reads_back_exactly() {
        let db = test_db();
        let now = t0() + chrono::Duration::nanoseconds(987_654_321);
        let state = DraftState::started(now, &DraftSettings::default());
        db.reset(&league(), &roster(), &state).unwrap();
        assert_eq!(db.load(&league()).unwrap().unwrap().state, state);
    }
}
