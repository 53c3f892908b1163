//! The game selector: turns an [`OptionSet`] into the ordered set of games to
//! report on.
//!
//! The selection is built as a query plan ([`GamesQuery`]), a plain value
//! accumulating predicates, ordering and limit, and executed by a single
//! terminal [`Store::games`] call. Filters shrink the candidate pool *before*
//! truncation; an inclusive game list is unioned back in after it.

use chrono::NaiveDateTime;

use crate::error::BoardsResult;
use crate::models::GameListing;
use crate::options::{OptionId, OptionSet};
use crate::store::Store;
use crate::time::day_window_start;

/// How a league or player id list combines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Matching any listed id is enough.
    Any,
    /// Every listed id must match.
    All,
}

/// A league restriction with its combination mode.
///
/// At session granularity both modes restrict candidate sessions to the listed
/// leagues; the any/all distinction matters for game admission, where `All`
/// requires a session in every listed league.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueFilter {
    /// The combination mode.
    pub mode: SetMode,
    /// The league ids.
    pub leagues: Vec<u32>,
}

/// The ordering of the selected games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameOrder {
    /// Play count then session count, both descending.
    #[default]
    Popularity,
    /// Most recent session time descending.
    Latest,
}

/// The query plan of a game selection.
///
/// Games with no qualifying session are never part of the population. The
/// store executes the predicates, the ordering and the limit in that order;
/// ties are broken by game id ascending so a plan is deterministic per run.
#[derive(Debug, Clone, Default)]
pub struct GamesQuery {
    /// Restrict the population to exactly these games.
    pub exclusive: Option<Vec<u32>>,
    /// The league restriction, applied to candidate sessions and to the
    /// aggregate annotations.
    pub leagues: Option<LeagueFilter>,
    /// Admit games with a session at or after this time (OR-combined with
    /// `played_by`).
    pub changed_since: Option<NaiveDateTime>,
    /// Admit games played by any/all of these players (OR-combined with
    /// `changed_since`).
    pub played_by: Option<(SetMode, Vec<u32>)>,
    /// Admit only games with a session at or after this time (the last-event
    /// window; AND-combined).
    pub window_start: Option<NaiveDateTime>,
    /// Upper session-time bound of the window, when a perspective is active.
    pub window_end: Option<NaiveDateTime>,
    /// The ordering to apply before truncating.
    pub order: GameOrder,
    /// Keep only the first that many games, after everything else.
    pub limit: Option<usize>,
}

/// Builds the game selection plan for the options.
///
/// The last-event window needs the time of the most recent session in the
/// (league-restricted, perspective-bounded) population first; that lookup is
/// the only store round-trip of plan construction.
pub async fn games_query<S: Store>(store: &S, o: &OptionSet) -> BoardsResult<GamesQuery> {
    let leagues = o.game_league_filter();
    let as_at = o.is_enabled(OptionId::AsAt).then_some(o.as_at).flatten();

    let mut q = GamesQuery {
        exclusive: o
            .is_enabled(OptionId::GamesEx)
            .then(|| o.games.clone()),
        leagues,
        changed_since: o
            .is_enabled(OptionId::ChangedSince)
            .then_some(o.changed_since)
            .flatten(),
        played_by: if o.is_enabled(OptionId::GamePlayersAny) {
            Some((SetMode::Any, o.game_players.clone()))
        } else if o.is_enabled(OptionId::GamePlayersAll) {
            Some((SetMode::All, o.game_players.clone()))
        } else {
            None
        },
        order: if o.is_enabled(OptionId::LatestGames) {
            GameOrder::Latest
        } else {
            GameOrder::Popularity
        },
        limit: (o.is_enabled(OptionId::TopGames) || o.is_enabled(OptionId::LatestGames))
            .then_some(o.num_games as usize),
        ..Default::default()
    };

    if o.is_enabled(OptionId::NumDays) {
        match store.latest_session_time(q.leagues.as_ref(), as_at).await? {
            Some(latest) => {
                q.window_start = day_window_start(latest, o.num_days);
                q.window_end = as_at;
            }
            None => {
                tracing::debug!("no session in population, last-event window not applied");
            }
        }
    }

    Ok(q)
}

/// Selects the games to report on.
///
/// Runs the plan, then unions the inclusive game list back in (it must survive
/// truncation), re-sorted under the active ordering and deduplicated by id.
pub async fn select_games<S: Store>(store: &S, o: &OptionSet) -> BoardsResult<Vec<GameListing>> {
    let q = games_query(store, o).await?;
    let mut games = store.games(&q).await?;

    if o.is_enabled(OptionId::GamesIn) && !o.games.is_empty() {
        let included = store
            .games(&GamesQuery {
                exclusive: Some(o.games.clone()),
                leagues: q.leagues.clone(),
                ..Default::default()
            })
            .await?;
        for g in included {
            if !games.iter().any(|have| have.id == g.id) {
                games.push(g);
            }
        }
        sort_listings(&mut games, q.order);
    }

    tracing::debug!(count = games.len(), "game selection done");
    Ok(games)
}

/// Sorts listings under a [`GameOrder`], ties broken by game id.
pub fn sort_listings(games: &mut [GameListing], order: GameOrder) {
    match order {
        GameOrder::Popularity => games.sort_by(|a, b| {
            b.play_count
                .cmp(&a.play_count)
                .then(b.session_count.cmp(&a.session_count))
                .then(a.id.cmp(&b.id))
        }),
        GameOrder::Latest => {
            games.sort_by(|a, b| b.last_play.cmp(&a.last_play).then(a.id.cmp(&b.id)))
        }
    }
}
