//! Board collation: drives the selectors, the rating store and the post-filter
//! into the nested payload served to clients, and formats the page titles.

use itertools::Itertools as _;
use serde::Serialize;

use crate::cache::{BoardCache, CacheEntry};
use crate::error::BoardsResult;
use crate::filter::apply_player_filters;
use crate::models::BoardRow;
use crate::options::{BackTo, OptionId, OptionSet};
use crate::store::Store;
use crate::time::encode_datetime;
use crate::{games, snapshots};

/// The type returned by the [`compet_rank_by_key`](CompetRankingByKeyIter::compet_rank_by_key)
/// method.
pub struct CompetitionRankingByKey<I, K, F> {
    iter: I,
    func: F,

    previous_key: Option<K>,
    rank: u32,
    offset: u32,
}

impl<I, K, F> CompetitionRankingByKey<I, K, F> {
    fn new(iter: I, func: F) -> Self {
        Self {
            iter,
            func,

            previous_key: None,
            rank: 0,
            offset: 1,
        }
    }
}

impl<I, K, F> Iterator for CompetitionRankingByKey<I, K, F>
where
    I: Iterator,
    F: FnMut(&<I as Iterator>::Item) -> K,
    K: Eq,
{
    type Item = (u32, <I as Iterator>::Item);

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.iter.next()?;
        let key = (self.func)(&next);

        match self.previous_key.take() {
            // First iteration
            None => {
                self.rank += 1;
            }
            // Same keys
            Some(previous_key) if previous_key == key => {
                self.offset += 1;
            }
            // Different keys
            _ => {
                self.rank += self.offset;
                self.offset = 1;
            }
        }

        self.previous_key = Some(key);

        Some((self.rank, next))
    }
}

/// Extends the [`Iterator`] trait by providing the [`compet_rank_by_key`][1]
/// method.
///
/// [1]: CompetRankingByKeyIter::compet_rank_by_key
pub trait CompetRankingByKeyIter: Iterator {
    /// Maps each item to a rank respecting the competition ranking system (1224).
    ///
    /// The key returned by the function is used to know when to increase the rank.
    ///
    /// ## Example
    ///
    /// ```
    /// # use boards_lib::board::CompetRankingByKeyIter as _;
    /// let scores = vec![30, 31, 31, 33, 34, 34, 34, 35, 36]
    ///     .into_iter()
    ///     .compet_rank_by_key(|i| *i)
    ///     .collect::<Vec<_>>();
    ///
    /// assert_eq!(
    ///     scores,
    ///     vec![
    ///         (1, 30),
    ///         (2, 31),
    ///         (2, 31),
    ///         (4, 33),
    ///         (5, 34),
    ///         (5, 34),
    ///         (5, 34),
    ///         (8, 35),
    ///         (9, 36),
    ///     ]
    /// );
    /// ```
    fn compet_rank_by_key<K, F>(self, f: F) -> CompetitionRankingByKey<Self, K, F>
    where
        F: FnMut(&Self::Item) -> K,
        K: Eq,
        Self: Sized,
    {
        CompetitionRankingByKey::new(self, f)
    }
}

impl<I: Iterator> CompetRankingByKeyIter for I {}

/// One captured board of a game: the leaderboard as it stood right after the
/// session recorded at `at`.
#[derive(Serialize, Clone, Debug)]
pub struct SnapshotBoard {
    /// The session time the board was captured at.
    pub at: chrono::NaiveDateTime,
    /// Total plays of the game up to that time.
    pub play_count: u32,
    /// Total sessions of the game up to that time.
    pub session_count: u32,
    /// A one-line description of the session that produced the board.
    pub detail: String,
    /// The ranked rows.
    pub rows: Vec<BoardRow>,
}

/// Every requested snapshot of one game, newest first.
#[derive(Serialize, Clone, Debug)]
pub struct GameBoards {
    /// The game ID.
    pub game_id: u32,
    /// The publisher database ID of the game.
    pub external_id: u32,
    /// The name of the game.
    pub name: String,
    /// The captured boards.
    pub snapshots: Vec<SnapshotBoard>,
}

/// The full response of a leaderboard request.
#[derive(Serialize, Debug)]
pub struct BoardsPayload {
    /// The page title describing the active filters.
    pub title: String,
    /// Subtitle lines describing perspective and evolution, `<br>`-joined.
    pub subtitle: String,
    /// The option dictionary echoing the request state.
    pub options: serde_json::Map<String, serde_json::Value>,
    /// The boards, one entry per selected game.
    pub boards: Vec<GameBoards>,
}

/// Collates the raw (pre player-filter) boards the options select.
///
/// Games whose snapshot population turns out empty are omitted from the
/// result, as are snapshots where the rating store has no board yet.
pub async fn collate_boards<S: Store>(store: &S, o: &OptionSet) -> BoardsResult<Vec<GameBoards>> {
    let leagues = o.game_league_filter();
    let selected = games::select_games(store, o).await?;

    let mut out = Vec::with_capacity(selected.len());
    for game in selected {
        let query = snapshots::snapshot_query(store, o, game.id).await?;
        let sessions = store.snapshot_sessions(&query).await?;

        let mut boards = Vec::with_capacity(sessions.len());
        for session in sessions {
            let rows = store
                .board(game.id, leagues.as_ref(), Some(session.at), o.names)
                .await?;
            if rows.is_empty() {
                continue;
            }
            let counts = store
                .play_counts(game.id, leagues.as_ref(), Some(session.at))
                .await?;
            boards.push(SnapshotBoard {
                at: session.at,
                play_count: counts.total,
                session_count: counts.sessions,
                detail: store.session_detail(session.id, o.names).await?,
                rows,
            });
        }

        if !boards.is_empty() {
            out.push(GameBoards {
                game_id: game.id,
                external_id: game.external_id,
                name: game.name,
                snapshots: boards,
            });
        }
    }

    Ok(out)
}

/// Serves a leaderboard request end to end.
///
/// Consults the cache first: when the cached option set covers the fresh one,
/// the stored raw boards are only re-passed through the post-filter.
/// Otherwise the boards are recollated and the entry replaced.
pub async fn boards_response<S: Store>(
    store: &S,
    cache: &BoardCache,
    cache_key: Option<&str>,
    o: &OptionSet,
) -> BoardsResult<BoardsPayload> {
    let cached = cache_key.and_then(|key| cache.get(key));

    let raw = match cached {
        Some(entry) if !o.needs_db(&entry.options) => {
            tracing::debug!("serving boards from cache");
            entry.boards.clone()
        }
        _ => {
            let boards = collate_boards(store, o).await?;
            if let Some(key) = cache_key {
                cache.put(
                    key.to_owned(),
                    CacheEntry {
                        options: o.clone(),
                        boards: boards.clone(),
                    },
                );
            }
            boards
        }
    };

    let boards = raw
        .into_iter()
        .map(|game| GameBoards {
            game_id: game.game_id,
            external_id: game.external_id,
            name: game.name,
            snapshots: game
                .snapshots
                .into_iter()
                .map(|snap| SnapshotBoard {
                    rows: apply_player_filters(o, &snap.rows),
                    ..snap
                })
                .collect(),
        })
        .collect();

    let (title, subtitle) = titles(store, o).await?;

    Ok(BoardsPayload {
        title,
        subtitle,
        options: o.as_dict(),
        boards,
    })
}

/// Builds the page title and subtitle describing the active filter set.
pub async fn titles<S: Store>(store: &S, o: &OptionSet) -> BoardsResult<(String, String)> {
    let leagues = if o.is_enabled(OptionId::GameLeaguesAny) || o.is_enabled(OptionId::GameLeaguesAll)
    {
        store.league_names(&o.game_leagues).await?
    } else {
        Vec::new()
    };
    let league_phrase = if leagues.len() > 1 {
        let any_all = if o.is_enabled(OptionId::GameLeaguesAny) {
            "any"
        } else {
            "all"
        };
        format!("{any_all} of the leagues")
    } else {
        "the league".to_owned()
    };

    let players = if o.is_enabled(OptionId::GamePlayersAny) || o.is_enabled(OptionId::GamePlayersAll)
    {
        store.player_names(&o.game_players, o.names).await?
    } else {
        Vec::new()
    };
    let player_phrase = if players.len() > 1 {
        let any_all = if o.is_enabled(OptionId::GamePlayersAny) {
            "any"
        } else {
            "all"
        };
        format!("{any_all} of the players")
    } else {
        "the player".to_owned()
    };

    let l = leagues.iter().join(", ");
    let p = players.iter().join(", ");

    let mut title =
        if o.is_enabled(OptionId::TopGames) || o.is_enabled(OptionId::LatestGames) {
            format!("Top {} ", o.num_games)
        } else {
            String::new()
        };

    match (players.is_empty(), leagues.is_empty()) {
        (true, true) => title.push_str("Global Leaderboards"),
        (true, false) => title.push_str(&format!("Leaderboards for {league_phrase} {l}")),
        (false, true) => title.push_str(&format!("Leaderboards for {player_phrase} {p}")),
        (false, false) => title.push_str(&format!(
            "Leaderboards for {player_phrase} {p} in {league_phrase} {l}"
        )),
    }

    let mut subtitle = Vec::new();
    if let (true, Some(at)) = (o.is_enabled(OptionId::AsAt), o.as_at) {
        subtitle.push(format!("as at {}", encode_datetime(at)));
    }
    if let (true, Some(since)) = (o.is_enabled(OptionId::ChangedSince), o.changed_since) {
        subtitle.push(format!("changed after {}", encode_datetime(since)));
    }
    if o.is_enabled(OptionId::CompareBackTo) {
        let time = match o.compare_back_to {
            Some(BackTo::Days(days)) => {
                format!("before the last game session of {days} days")
            }
            Some(BackTo::Time(t)) if Some(t) == o.changed_since => "that same time".to_owned(),
            Some(BackTo::Time(t)) => encode_datetime(t),
            None => String::new(),
        };
        subtitle.push(format!("compared back to the leaderboard as at {time}"));
    } else if o.is_enabled(OptionId::CompareWith) {
        subtitle.push(format!(
            "compared up to with {} prior leaderboards",
            o.compare_with
        ));
    }

    Ok((title, subtitle.join("<br>")))
}
