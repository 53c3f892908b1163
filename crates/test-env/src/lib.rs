//! An in-memory [`Store`] backend plus fixture builders for the test suite.
//!
//! The production backend runs on MySQL; this one holds the same entities in
//! plain vectors and executes the query plans over them, so the suite runs
//! with no external services.

use std::collections::HashMap;

use boards_lib::board::CompetRankingByKeyIter as _;
use boards_lib::error::BoardsResult;
use boards_lib::games::{GamesQuery, LeagueFilter, SetMode, sort_listings};
use boards_lib::models::{BoardRow, Game, GameListing, League, PlayCounts, Player, Session};
use boards_lib::options::NameStyle;
use boards_lib::snapshots::{SnapshotQuery, SnapshotRange};
use boards_lib::sql::format_session_detail;
use boards_lib::store::{IdCheck, Store};
use chrono::NaiveDateTime;

/// Parses a fixture datetime literal.
pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|e| panic!("bad fixture datetime `{s}`: {e}"))
}

/// One recorded play within a fixture session.
pub struct Perf {
    pub player_id: u32,
    pub rating_eta: f64,
    pub victory: bool,
}

/// A fixture session with its recorded plays.
pub struct SessionRec {
    pub id: u32,
    pub game_id: u32,
    pub league_id: u32,
    pub at: NaiveDateTime,
    pub plays: Vec<Perf>,
}

/// A fixture player with their league memberships.
pub struct PlayerRec {
    pub player: Player,
    pub leagues: Vec<u32>,
}

/// The in-memory store.
#[derive(Default)]
pub struct MemStore {
    pub games: Vec<Game>,
    pub leagues: Vec<League>,
    pub players: Vec<PlayerRec>,
    pub sessions: Vec<SessionRec>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn game(mut self, id: u32, name: &str) -> Self {
        self.games.push(Game {
            id,
            external_id: 10_000 + id,
            name: name.to_owned(),
        });
        self
    }

    pub fn league(mut self, id: u32, name: &str) -> Self {
        self.leagues.push(League {
            id,
            name: name.to_owned(),
        });
        self
    }

    pub fn player(mut self, id: u32, name: &str, leagues: &[u32]) -> Self {
        self.players.push(PlayerRec {
            player: Player {
                id,
                name: name.to_owned(),
                full_name: format!("{name} Tester"),
                external_name: name.to_lowercase(),
            },
            leagues: leagues.to_vec(),
        });
        self
    }

    /// Records a session; `plays` is `(player_id, rating_eta, victory)`.
    pub fn session(
        mut self,
        id: u32,
        game_id: u32,
        league_id: u32,
        time: &str,
        plays: &[(u32, f64, bool)],
    ) -> Self {
        self.sessions.push(SessionRec {
            id,
            game_id,
            league_id,
            at: at(time),
            plays: plays
                .iter()
                .map(|&(player_id, rating_eta, victory)| Perf {
                    player_id,
                    rating_eta,
                    victory,
                })
                .collect(),
        });
        self
    }

    fn in_leagues(leagues: Option<&LeagueFilter>, session: &SessionRec) -> bool {
        match leagues {
            Some(filter) => filter.leagues.contains(&session.league_id),
            None => true,
        }
    }

    fn render(&self, style: NameStyle, player_id: u32) -> String {
        self.players
            .iter()
            .find(|p| p.player.id == player_id)
            .map(|p| match style {
                NameStyle::Nick => p.player.name.clone(),
                NameStyle::Full => p.player.full_name.clone(),
                NameStyle::Complete => format!("{} ({})", p.player.full_name, p.player.name),
            })
            .unwrap_or_default()
    }
}

impl IdCheck for MemStore {
    async fn game_exists(&self, id: u32) -> BoardsResult<bool> {
        Ok(self.games.iter().any(|g| g.id == id))
    }

    async fn league_exists(&self, id: u32) -> BoardsResult<bool> {
        Ok(self.leagues.iter().any(|l| l.id == id))
    }

    async fn player_exists(&self, id: u32) -> BoardsResult<bool> {
        Ok(self.players.iter().any(|p| p.player.id == id))
    }
}

impl Store for MemStore {
    async fn games(&self, query: &GamesQuery) -> BoardsResult<Vec<GameListing>> {
        let mut out = Vec::new();

        for game in &self.games {
            if let Some(list) = &query.exclusive
                && !list.contains(&game.id)
            {
                continue;
            }

            let game_sessions = || self.sessions.iter().filter(|s| s.game_id == game.id);

            // Aggregates are computed under the league restriction; a game
            // with no qualifying session is out of the population.
            let candidates: Vec<&SessionRec> = game_sessions()
                .filter(|s| Self::in_leagues(query.leagues.as_ref(), s))
                .collect();
            let Some(last_play) = candidates.iter().map(|s| s.at).max() else {
                continue;
            };

            if let Some(filter) = &query.leagues
                && filter.mode == SetMode::All
                && !filter
                    .leagues
                    .iter()
                    .all(|l| game_sessions().any(|s| s.league_id == *l))
            {
                continue;
            }

            // Secondary admission: changed recently OR played by the players.
            if query.changed_since.is_some() || query.played_by.is_some() {
                let changed = query
                    .changed_since
                    .is_some_and(|t| game_sessions().any(|s| s.at >= t));
                let played = match &query.played_by {
                    Some((SetMode::Any, ids)) => {
                        game_sessions().any(|s| s.plays.iter().any(|p| ids.contains(&p.player_id)))
                    }
                    Some((SetMode::All, ids)) => ids.iter().all(|id| {
                        game_sessions().any(|s| s.plays.iter().any(|p| p.player_id == *id))
                    }),
                    None => false,
                };
                if !changed && !played {
                    continue;
                }
            }

            if let Some(start) = query.window_start
                && !game_sessions()
                    .any(|s| s.at >= start && query.window_end.is_none_or(|end| s.at <= end))
            {
                continue;
            }

            out.push(GameListing {
                id: game.id,
                external_id: game.external_id,
                name: game.name.clone(),
                last_play,
                session_count: candidates.len() as u32,
                play_count: candidates.iter().map(|s| s.plays.len() as u32).sum(),
            });
        }

        sort_listings(&mut out, query.order);
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn latest_session_time(
        &self,
        leagues: Option<&LeagueFilter>,
        as_at: Option<NaiveDateTime>,
    ) -> BoardsResult<Option<NaiveDateTime>> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| Self::in_leagues(leagues, s))
            .filter(|s| as_at.is_none_or(|bound| s.at <= bound))
            .map(|s| s.at)
            .max())
    }

    async fn snapshot_sessions(&self, query: &SnapshotQuery) -> BoardsResult<Vec<Session>> {
        let mut sessions: Vec<&SessionRec> = self
            .sessions
            .iter()
            .filter(|s| s.game_id == query.game_id)
            .filter(|s| Self::in_leagues(query.leagues.as_ref(), s))
            .filter(|s| query.as_at.is_none_or(|bound| s.at <= bound))
            .filter(|s| match query.range {
                SnapshotRange::After(t) => s.at > t,
                SnapshotRange::From(t) => s.at >= t,
                _ => true,
            })
            .collect();

        sessions.sort_by(|a, b| b.at.cmp(&a.at).then(b.id.cmp(&a.id)));
        match query.range {
            SnapshotRange::Latest => sessions.truncate(1),
            SnapshotRange::LastN(n) => sessions.truncate(n as usize),
            _ => {}
        }

        Ok(sessions
            .into_iter()
            .map(|s| Session {
                id: s.id,
                game_id: s.game_id,
                league_id: s.league_id,
                at: s.at,
            })
            .collect())
    }

    async fn board(
        &self,
        game_id: u32,
        leagues: Option<&LeagueFilter>,
        as_at: Option<NaiveDateTime>,
        names: NameStyle,
    ) -> BoardsResult<Vec<BoardRow>> {
        struct Acc {
            rating: f64,
            rated_at: NaiveDateTime,
            plays: u32,
            victories: u32,
            last_play: NaiveDateTime,
        }

        let mut per_player: HashMap<u32, Acc> = HashMap::new();
        for session in self
            .sessions
            .iter()
            .filter(|s| s.game_id == game_id)
            .filter(|s| Self::in_leagues(leagues, s))
            .filter(|s| as_at.is_none_or(|bound| s.at <= bound))
        {
            for play in &session.plays {
                let acc = per_player.entry(play.player_id).or_insert(Acc {
                    rating: play.rating_eta,
                    rated_at: session.at,
                    plays: 0,
                    victories: 0,
                    last_play: session.at,
                });
                acc.plays += 1;
                acc.victories += play.victory as u32;
                if session.at >= acc.rated_at {
                    acc.rating = play.rating_eta;
                    acc.rated_at = session.at;
                }
                acc.last_play = acc.last_play.max(session.at);
            }
        }

        let mut rated: Vec<(u32, Acc)> = per_player.into_iter().collect();
        rated.sort_by(|(a_id, a), (b_id, b)| b.rating.total_cmp(&a.rating).then(a_id.cmp(b_id)));

        Ok(rated
            .into_iter()
            .compet_rank_by_key(|(_, acc)| acc.rating.to_bits())
            .map(|(rank, (player_id, acc))| {
                let rec = self.players.iter().find(|p| p.player.id == player_id);
                BoardRow {
                    rank,
                    player_id,
                    external_name: rec
                        .map(|p| p.player.external_name.clone())
                        .unwrap_or_default(),
                    name: self.render(names, player_id),
                    rating: acc.rating,
                    play_count: acc.plays,
                    victory_count: acc.victories,
                    last_play: Some(acc.last_play),
                    league_ids: rec.map(|p| p.leagues.clone()).unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn play_counts(
        &self,
        game_id: u32,
        leagues: Option<&LeagueFilter>,
        as_at: Option<NaiveDateTime>,
    ) -> BoardsResult<PlayCounts> {
        let mut counts = PlayCounts::default();
        for session in self
            .sessions
            .iter()
            .filter(|s| s.game_id == game_id)
            .filter(|s| Self::in_leagues(leagues, s))
            .filter(|s| as_at.is_none_or(|bound| s.at <= bound))
        {
            counts.sessions += 1;
            counts.total += session.plays.len() as u32;
        }
        Ok(counts)
    }

    async fn session_detail(&self, session_id: u32, names: NameStyle) -> BoardsResult<String> {
        let Some(session) = self.sessions.iter().find(|s| s.id == session_id) else {
            return Ok(String::new());
        };
        Ok(format_session_detail(
            session
                .plays
                .iter()
                .map(|p| (self.render(names, p.player_id), p.victory)),
        ))
    }

    async fn league_names(&self, ids: &[u32]) -> BoardsResult<Vec<String>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.leagues.iter().find(|l| l.id == *id))
            .map(|l| l.name.clone())
            .collect())
    }

    async fn player_names(&self, ids: &[u32], names: NameStyle) -> BoardsResult<Vec<String>> {
        Ok(ids
            .iter()
            .filter(|id| self.players.iter().any(|p| p.player.id == **id))
            .map(|id| self.render(names, *id))
            .collect())
    }
}
