//! The MySQL/MariaDB execution of the logical query contract.
//!
//! Schema expectations: `games(id, external_id, name)`, `leagues(id, name)`,
//! `players(id, name, full_name, external_name)`,
//! `player_leagues(player_id, league_id)`,
//! `sessions(id, game_id, league_id, at)` and the rating store's recorded
//! plays in `performances(id, session_id, player_id, rating_eta, victory)`,
//! where `rating_eta` is the player's skill rating right after that play.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};

use crate::board::CompetRankingByKeyIter as _;
use crate::error::BoardsResult;
use crate::games::{GameOrder, GamesQuery, LeagueFilter, SetMode};
use crate::models::{BoardRow, GameListing, PlayCounts, Session};
use crate::options::NameStyle;
use crate::snapshots::{SnapshotQuery, SnapshotRange};
use crate::store::{IdCheck, Store};

/// A [`Store`](crate::store::Store) backed by the MySQL/MariaDB database.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Wraps an existing pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `db_url`.
    pub async fn connect(db_url: &str) -> BoardsResult<Self> {
        Ok(Self {
            pool: MySqlPool::connect(db_url).await?,
        })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn count_by_id(&self, table: &str, id: u32) -> BoardsResult<bool> {
        let mut qb = QueryBuilder::<MySql>::new("select count(*) from ");
        qb.push(table).push(" where id = ").push_bind(id);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count > 0)
    }
}

/// Renders a player name in the requested style.
fn render_name(style: NameStyle, name: &str, full_name: &str) -> String {
    match style {
        NameStyle::Nick => name.to_owned(),
        NameStyle::Full => full_name.to_owned(),
        NameStyle::Complete => format!("{full_name} ({name})"),
    }
}

/// Pushes `and <alias>.league_id in (...)` for the listed leagues.
///
/// Both combination modes restrict candidate sessions to the listed leagues;
/// the `All` admission requirement is a separate per-league exists chain.
fn push_session_leagues(
    qb: &mut QueryBuilder<'_, MySql>,
    alias: &str,
    leagues: Option<&LeagueFilter>,
) {
    if let Some(filter) = leagues
        && !filter.leagues.is_empty()
    {
        qb.push(" and ").push(alias).push(".league_id in (");
        let mut sep = qb.separated(", ");
        for id in &filter.leagues {
            sep.push_bind(*id);
        }
        qb.push(")");
    }
}

fn push_id_list(qb: &mut QueryBuilder<'_, MySql>, ids: &[u32]) {
    qb.push("(");
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
    qb.push(")");
}

#[derive(FromRow)]
struct GameListingRow {
    id: u32,
    external_id: u32,
    name: String,
    last_play: NaiveDateTime,
    session_count: i64,
    play_count: i64,
}

#[derive(FromRow)]
struct BoardQueryRow {
    player_id: u32,
    name: String,
    full_name: String,
    external_name: String,
    rating: f64,
    play_count: i64,
    victory_count: i64,
    last_play: NaiveDateTime,
}

#[derive(FromRow)]
struct CountsRow {
    total: i64,
    sessions: i64,
}

impl IdCheck for MySqlStore {
    async fn game_exists(&self, id: u32) -> BoardsResult<bool> {
        self.count_by_id("games", id).await
    }

    async fn league_exists(&self, id: u32) -> BoardsResult<bool> {
        self.count_by_id("leagues", id).await
    }

    async fn player_exists(&self, id: u32) -> BoardsResult<bool> {
        self.count_by_id("players", id).await
    }
}

impl Store for MySqlStore {
    async fn games(&self, query: &GamesQuery) -> BoardsResult<Vec<GameListing>> {
        let mut qb = QueryBuilder::<MySql>::new(
            "select g.id, g.external_id, g.name, \
             max(s.at) as last_play, \
             count(distinct s.id) as session_count, \
             count(distinct f.id) as play_count \
             from games g \
             inner join sessions s on s.game_id = g.id \
             left join performances f on f.session_id = s.id \
             where 1 = 1",
        );

        push_session_leagues(&mut qb, "s", query.leagues.as_ref());

        if let Some(games) = &query.exclusive {
            if games.is_empty() {
                qb.push(" and false");
            } else {
                qb.push(" and g.id in ");
                push_id_list(&mut qb, games);
            }
        }

        // The `all` league mode demands a session in every listed league.
        if let Some(filter) = &query.leagues
            && filter.mode == SetMode::All
        {
            for league in &filter.leagues {
                qb.push(
                    " and exists(select 1 from sessions sl \
                     where sl.game_id = g.id and sl.league_id = ",
                )
                .push_bind(*league)
                .push(")");
            }
        }

        // The secondary admission predicates OR-combine: changed recently,
        // or played by the requested players.
        match (query.changed_since, &query.played_by) {
            (None, None) => {}
            (changed, played) => {
                qb.push(" and (");
                let mut first = true;
                if let Some(since) = changed {
                    qb.push(
                        "exists(select 1 from sessions sc \
                         where sc.game_id = g.id and sc.at >= ",
                    )
                    .push_bind(since)
                    .push(")");
                    first = false;
                }
                if let Some((mode, players)) = played {
                    if !first {
                        qb.push(" or ");
                    }
                    match mode {
                        SetMode::Any => {
                            qb.push(
                                "exists(select 1 from sessions sp \
                                 inner join performances fp on fp.session_id = sp.id \
                                 where sp.game_id = g.id and fp.player_id in ",
                            );
                            push_id_list(&mut qb, players);
                            qb.push(")");
                        }
                        SetMode::All => {
                            qb.push("(1 = 1");
                            for player in players {
                                qb.push(
                                    " and exists(select 1 from sessions sp \
                                     inner join performances fp on fp.session_id = sp.id \
                                     where sp.game_id = g.id and fp.player_id = ",
                                )
                                .push_bind(*player)
                                .push(")");
                            }
                            qb.push(")");
                        }
                    }
                }
                qb.push(")");
            }
        }

        // The last-event window.
        if let Some(start) = query.window_start {
            qb.push(
                " and exists(select 1 from sessions sw \
                 where sw.game_id = g.id and sw.at >= ",
            )
            .push_bind(start);
            if let Some(end) = query.window_end {
                qb.push(" and sw.at <= ").push_bind(end);
            }
            qb.push(")");
        }

        qb.push(" group by g.id, g.external_id, g.name");

        match query.order {
            GameOrder::Popularity => {
                qb.push(" order by play_count desc, session_count desc, g.id asc");
            }
            GameOrder::Latest => {
                qb.push(" order by last_play desc, g.id asc");
            }
        }

        if let Some(limit) = query.limit {
            qb.push(" limit ").push_bind(limit as i64);
        }

        let rows: Vec<GameListingRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|r| GameListing {
                id: r.id,
                external_id: r.external_id,
                name: r.name,
                last_play: r.last_play,
                session_count: r.session_count as _,
                play_count: r.play_count as _,
            })
            .collect())
    }

    async fn latest_session_time(
        &self,
        leagues: Option<&LeagueFilter>,
        as_at: Option<NaiveDateTime>,
    ) -> BoardsResult<Option<NaiveDateTime>> {
        let mut qb = QueryBuilder::<MySql>::new("select max(s.at) from sessions s where 1 = 1");
        push_session_leagues(&mut qb, "s", leagues);
        if let Some(bound) = as_at {
            qb.push(" and s.at <= ").push_bind(bound);
        }
        let latest = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(latest)
    }

    async fn snapshot_sessions(&self, query: &SnapshotQuery) -> BoardsResult<Vec<Session>> {
        let mut qb = QueryBuilder::<MySql>::new(
            "select s.id, s.game_id, s.league_id, s.at from sessions s where s.game_id = ",
        );
        qb.push_bind(query.game_id);
        push_session_leagues(&mut qb, "s", query.leagues.as_ref());
        if let Some(bound) = query.as_at {
            qb.push(" and s.at <= ").push_bind(bound);
        }

        match query.range {
            SnapshotRange::After(t) => {
                qb.push(" and s.at > ").push_bind(t);
            }
            SnapshotRange::From(t) => {
                qb.push(" and s.at >= ").push_bind(t);
            }
            SnapshotRange::Latest | SnapshotRange::LastN(_) => {}
        }

        qb.push(" order by s.at desc, s.id desc");

        match query.range {
            SnapshotRange::Latest => {
                qb.push(" limit 1");
            }
            SnapshotRange::LastN(n) => {
                qb.push(" limit ").push_bind(n as i64);
            }
            _ => {}
        }

        let sessions = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(sessions)
    }

    async fn board(
        &self,
        game_id: u32,
        leagues: Option<&LeagueFilter>,
        as_at: Option<NaiveDateTime>,
        names: NameStyle,
    ) -> BoardsResult<Vec<BoardRow>> {
        let mut qb = QueryBuilder::<MySql>::new(
            "select t.player_id, t.name, t.full_name, t.external_name, t.rating, \
             t.play_count, t.victory_count, t.last_play from (\
             select pl.id as player_id, pl.name, pl.full_name, pl.external_name, \
             first_value(f.rating_eta) over w as rating, \
             count(*) over (partition by pl.id) as play_count, \
             cast(sum(f.victory) over (partition by pl.id) as signed) as victory_count, \
             max(s.at) over (partition by pl.id) as last_play, \
             row_number() over w as rn \
             from performances f \
             inner join sessions s on s.id = f.session_id \
             inner join players pl on pl.id = f.player_id \
             where s.game_id = ",
        );
        qb.push_bind(game_id);
        push_session_leagues(&mut qb, "s", leagues);
        if let Some(bound) = as_at {
            qb.push(" and s.at <= ").push_bind(bound);
        }
        qb.push(
            " window w as (partition by pl.id order by s.at desc, f.id desc)\
             ) t where t.rn = 1 order by t.rating desc, t.player_id asc",
        );

        let rows: Vec<BoardQueryRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        // League memberships of everyone on the board, in one go.
        let mut qb = QueryBuilder::<MySql>::new(
            "select player_id, league_id from player_leagues where player_id in ",
        );
        push_id_list(&mut qb, &rows.iter().map(|r| r.player_id).collect::<Vec<_>>());
        let memberships: Vec<(u32, u32)> = qb.build_query_as().fetch_all(&self.pool).await?;
        let mut by_player: HashMap<u32, Vec<u32>> = HashMap::new();
        for (player_id, league_id) in memberships {
            by_player.entry(player_id).or_default().push(league_id);
        }

        let board = rows
            .into_iter()
            .compet_rank_by_key(|r| r.rating.to_bits())
            .map(|(rank, r)| BoardRow {
                rank,
                player_id: r.player_id,
                name: render_name(names, &r.name, &r.full_name),
                external_name: r.external_name,
                rating: r.rating,
                play_count: r.play_count as _,
                victory_count: r.victory_count as _,
                last_play: Some(r.last_play),
                league_ids: by_player.remove(&r.player_id).unwrap_or_default(),
            })
            .collect();

        Ok(board)
    }

    async fn play_counts(
        &self,
        game_id: u32,
        leagues: Option<&LeagueFilter>,
        as_at: Option<NaiveDateTime>,
    ) -> BoardsResult<PlayCounts> {
        let mut qb = QueryBuilder::<MySql>::new(
            "select count(distinct f.id) as total, count(distinct s.id) as sessions \
             from sessions s \
             left join performances f on f.session_id = s.id \
             where s.game_id = ",
        );
        qb.push_bind(game_id);
        push_session_leagues(&mut qb, "s", leagues);
        if let Some(bound) = as_at {
            qb.push(" and s.at <= ").push_bind(bound);
        }

        let counts: CountsRow = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(PlayCounts {
            total: counts.total as _,
            sessions: counts.sessions as _,
        })
    }

    async fn session_detail(&self, session_id: u32, names: NameStyle) -> BoardsResult<String> {
        let played: Vec<(String, String, bool)> = sqlx::query_as(
            "select pl.name, pl.full_name, f.victory \
             from performances f \
             inner join players pl on pl.id = f.player_id \
             where f.session_id = ? \
             order by f.victory desc, pl.name asc",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(format_session_detail(
            played
                .iter()
                .map(|(name, full_name, victory)| (render_name(names, name, full_name), *victory)),
        ))
    }

    async fn league_names(&self, ids: &[u32]) -> BoardsResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<MySql>::new("select id, name from leagues where id in ");
        push_id_list(&mut qb, ids);
        let rows: Vec<(u32, String)> = qb.build_query_as().fetch_all(&self.pool).await?;
        let by_id: HashMap<u32, String> = rows.into_iter().collect();
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    async fn player_names(&self, ids: &[u32], names: NameStyle) -> BoardsResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb =
            QueryBuilder::<MySql>::new("select id, name, full_name from players where id in ");
        push_id_list(&mut qb, ids);
        let rows: Vec<(u32, String, String)> = qb.build_query_as().fetch_all(&self.pool).await?;
        let by_id: HashMap<u32, (String, String)> = rows
            .into_iter()
            .map(|(id, name, full_name)| (id, (name, full_name)))
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|(name, full_name)| render_name(names, name, full_name))
            .collect())
    }
}

/// Formats the "who played, who won" session summary line.
pub fn format_session_detail(played: impl Iterator<Item = (String, bool)>) -> String {
    let (winners, others): (Vec<_>, Vec<_>) = played.partition(|(_, victory)| *victory);
    let everyone = winners
        .iter()
        .chain(&others)
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let won = winners
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    if everyone.is_empty() {
        String::new()
    } else if won.is_empty() {
        format!("{everyone} played")
    } else {
        format!("{everyone} played; {won} won")
    }
}
