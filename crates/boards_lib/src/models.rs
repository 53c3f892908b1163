//! Contains all the models registered in the MySQL/MariaDB database.
//!
//! The types correspond to the raw tables in the database, so relations between
//! models are only represented by a foreign key like an ID. The league
//! memberships of a player live in a separate association table and are carried
//! on [`BoardRow`] where the filters need them.

use serde::Serialize;
use sqlx::FromRow;

/// A game in the database.
#[derive(Serialize, FromRow, Clone, Debug)]
pub struct Game {
    /// The game ID.
    pub id: u32,
    /// The ID of the game in the publisher database, echoed in payloads so the
    /// front-end can link to it.
    pub external_id: u32,
    /// The name of the game.
    pub name: String,
}

/// A league in the database.
#[derive(Serialize, FromRow, Clone, Debug)]
pub struct League {
    /// The league ID.
    pub id: u32,
    /// The name of the league.
    pub name: String,
}

/// A player in the database.
#[derive(Serialize, FromRow, Clone, Debug)]
pub struct Player {
    /// The player ID.
    pub id: u32,
    /// The player nickname.
    pub name: String,
    /// The player full name.
    pub full_name: String,
    /// The player handle on the publisher site.
    pub external_name: String,
}

/// A recorded play session in the database.
#[derive(Serialize, FromRow, Clone, Debug)]
pub struct Session {
    /// The session ID.
    pub id: u32,
    /// The ID of the game that was played.
    pub game_id: u32,
    /// The ID of the league the session was recorded in.
    pub league_id: u32,
    /// The UTC time of the session.
    pub at: chrono::NaiveDateTime,
}

/// A game as returned by the game selector: the game plus the aggregates the
/// selector ordered it by.
///
/// The aggregates are computed under the active league restriction. Games with
/// no qualifying session are never returned, so `last_play` is always known.
#[derive(FromRow, Clone, Debug)]
pub struct GameListing {
    /// The game ID.
    pub id: u32,
    /// The publisher database ID of the game.
    pub external_id: u32,
    /// The name of the game.
    pub name: String,
    /// The time of the most recent qualifying session.
    pub last_play: chrono::NaiveDateTime,
    /// The number of distinct qualifying sessions.
    pub session_count: u32,
    /// The number of distinct recorded plays across those sessions.
    pub play_count: u32,
}

/// A ranked row of a leaderboard, as produced by the rating store.
///
/// Ranks are 1-based and totally ordered; ties on rating share a rank in the
/// competition (1224) numbering.
#[derive(Serialize, Clone, Debug)]
pub struct BoardRow {
    /// The rank of the player on this board.
    pub rank: u32,
    /// The player ID.
    pub player_id: u32,
    /// The player handle on the publisher site.
    pub external_name: String,
    /// The player name, rendered in the requested style.
    pub name: String,
    /// The skill rating the board is ordered by.
    pub rating: f64,
    /// How many times the player played this game up to the snapshot time.
    pub play_count: u32,
    /// How many of those plays they won.
    pub victory_count: u32,
    /// The time of their last play, if any was recorded.
    pub last_play: Option<chrono::NaiveDateTime>,
    /// The leagues the player belongs to.
    pub league_ids: Vec<u32>,
}

/// Play totals of a game up to a perspective time.
#[derive(Serialize, FromRow, Clone, Copy, Debug, Default)]
pub struct PlayCounts {
    /// The total number of recorded plays.
    pub total: u32,
    /// The number of recorded sessions.
    pub sessions: u32,
}
