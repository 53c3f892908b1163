//! The logical query contract every persistence backend must satisfy.
//!
//! The selectors in this crate build query plans ([`GamesQuery`],
//! [`SnapshotQuery`]) and hand them to a [`Store`] for execution; nothing in
//! the core materializes a candidate set earlier than the terminal fetch. The
//! production backend is [`MySqlStore`](crate::sql::MySqlStore); the test
//! suite runs against an in-memory one.

use chrono::NaiveDateTime;

use crate::error::BoardsResult;
use crate::games::{GamesQuery, LeagueFilter};
use crate::models::{BoardRow, GameListing, PlayCounts, Session};
use crate::options::NameStyle;
use crate::snapshots::SnapshotQuery;

/// Existence checks used to validate incoming id lists.
///
/// Unknown ids in requests are silently dropped, so these are consulted for
/// every listed id at option-parsing time.
#[allow(async_fn_in_trait)]
pub trait IdCheck {
    /// Whether a game with this id exists.
    async fn game_exists(&self, id: u32) -> BoardsResult<bool>;
    /// Whether a league with this id exists.
    async fn league_exists(&self, id: u32) -> BoardsResult<bool>;
    /// Whether a player with this id exists.
    async fn player_exists(&self, id: u32) -> BoardsResult<bool>;
}

/// The query capability the leaderboard core consumes.
///
/// All reads; the core never writes. Every `as_at` parameter bounds the
/// visible history to that instant, making the computation behave as if
/// executed back then.
#[allow(async_fn_in_trait)]
pub trait Store: IdCheck {
    /// Executes a game selection plan: predicates, then ordering, then limit.
    ///
    /// Games with no qualifying session are excluded from the population
    /// entirely; ties in the ordering break by game id ascending.
    async fn games(&self, query: &GamesQuery) -> BoardsResult<Vec<GameListing>>;

    /// The time of the most recent session within a league restriction,
    /// optionally bounded by a perspective time.
    async fn latest_session_time(
        &self,
        leagues: Option<&LeagueFilter>,
        as_at: Option<NaiveDateTime>,
    ) -> BoardsResult<Option<NaiveDateTime>>;

    /// Executes a snapshot selection plan; sessions come back newest first.
    async fn snapshot_sessions(&self, query: &SnapshotQuery) -> BoardsResult<Vec<Session>>;

    /// The ranked leaderboard of a game as it stood at `as_at` (or now),
    /// restricted to sessions of the given leagues. Rows come back in rank
    /// order; an empty vec means the game had no board at that time.
    async fn board(
        &self,
        game_id: u32,
        leagues: Option<&LeagueFilter>,
        as_at: Option<NaiveDateTime>,
        names: NameStyle,
    ) -> BoardsResult<Vec<BoardRow>>;

    /// Play and session totals of a game up to `as_at` (or now).
    async fn play_counts(
        &self,
        game_id: u32,
        leagues: Option<&LeagueFilter>,
        as_at: Option<NaiveDateTime>,
    ) -> BoardsResult<PlayCounts>;

    /// A one-line human description of a session (who played, who won), shown
    /// atop the snapshot it produced.
    async fn session_detail(&self, session_id: u32, names: NameStyle) -> BoardsResult<String>;

    /// The display names of the given leagues, in input order; unknown ids are
    /// skipped.
    async fn league_names(&self, ids: &[u32]) -> BoardsResult<Vec<String>>;

    /// The display names of the given players, in input order and the given
    /// style; unknown ids are skipped.
    async fn player_names(&self, ids: &[u32], names: NameStyle) -> BoardsResult<Vec<String>>;
}
