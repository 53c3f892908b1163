//! The snapshot selector: for a single game, the ordered set of historical
//! points-in-time a leaderboard must be captured at.
//!
//! A snapshot is the board as it stood immediately after a recorded session.
//! The default is one snapshot, the most recent qualifying session; the
//! evolution options widen that to a history.

use chrono::NaiveDateTime;

use crate::error::BoardsResult;
use crate::games::LeagueFilter;
use crate::options::{BackTo, OptionId, OptionSet};
use crate::store::Store;
use crate::time::days_before;

/// Which sessions of the base population provide snapshots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapshotRange {
    /// The single most recent session.
    Latest,
    /// The n most recent sessions (the current board plus n-1 predecessors).
    LastN(u32),
    /// Every session strictly after a time.
    After(NaiveDateTime),
    /// Every session at or after a time (the last-event window form).
    From(NaiveDateTime),
}

/// The query plan of a snapshot selection. Executed by
/// [`Store::snapshot_sessions`], newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotQuery {
    /// The game the snapshots belong to.
    pub game_id: u32,
    /// The league restriction on qualifying sessions.
    pub leagues: Option<LeagueFilter>,
    /// Upper bound on session times, when a perspective is active.
    pub as_at: Option<NaiveDateTime>,
    /// The range of sessions to capture.
    pub range: SnapshotRange,
}

/// Builds the snapshot selection plan for one game.
///
/// The day-count form of `compare_back_to` anchors on the most recent session
/// of the league population (not of the game), so one store lookup happens
/// here; everything else is pure.
pub async fn snapshot_query<S: Store>(
    store: &S,
    o: &OptionSet,
    game_id: u32,
) -> BoardsResult<SnapshotQuery> {
    let leagues = o.game_league_filter();
    let as_at = o.is_enabled(OptionId::AsAt).then_some(o.as_at).flatten();

    let range = if o.no_evolution() {
        SnapshotRange::Latest
    } else if o.is_enabled(OptionId::CompareBackTo) {
        match o.compare_back_to {
            Some(BackTo::Time(t)) => SnapshotRange::After(t),
            Some(BackTo::Days(days)) => {
                match store.latest_session_time(leagues.as_ref(), None).await? {
                    Some(latest) => match days_before(latest, days) {
                        Some(from) => SnapshotRange::From(from),
                        None => SnapshotRange::Latest,
                    },
                    // Nothing was ever played; one latest-session probe will
                    // come back empty either way.
                    None => SnapshotRange::Latest,
                }
            }
            // Enabled implies a value; fall back to the default defensively.
            None => SnapshotRange::Latest,
        }
    } else {
        SnapshotRange::LastN(o.compare_with + 1)
    };

    Ok(SnapshotQuery {
        game_id,
        leagues,
        as_at,
        range,
    })
}
