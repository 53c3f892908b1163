//! The leaderboard options module.
//!
//! An [`OptionSet`] captures everything a client can ask of a leaderboard
//! request: which games to report on, which players to list, the perspective
//! time, the evolution (history) selection, and the presentation knobs. It is
//! built once per request from the flat key/value parameter surface and is
//! immutable afterwards; a second instance may represent a previously cached
//! configuration, compared read-only against the fresh one by
//! [`OptionSet::needs_db`].
//!
//! Options split into three enablement categories:
//!
//! * options that need explicit enabling (all game/player filters, the
//!   perspective and the evolution options), off unless the request names
//!   them;
//! * options that are always active with a default value (formatting, info and
//!   layout);
//! * mutually exclusive siblings (`games_ex`/`games_in`,
//!   `compare_with`/`compare_back_to`, each `*_any`/`*_all` pair), where
//!   enabling one forcibly disables the other.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDateTime;

use crate::error::{BoardsError, BoardsResult};
use crate::games::{LeagueFilter, SetMode};
use crate::store::IdCheck;
use crate::time::{decode_datetime, encode_datetime};

/// The closed set of recognized options.
///
/// Every request parameter key maps to exactly one of these; everything else in
/// a request is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionId {
    /// Report exclusively on the listed games.
    GamesEx,
    /// Report at least on the listed games.
    GamesIn,
    /// Report on the most popular games only.
    TopGames,
    /// Report on the most recently played games only.
    LatestGames,
    /// Games played in any of the listed leagues.
    GameLeaguesAny,
    /// Games played in all of the listed leagues.
    GameLeaguesAll,
    /// Games played by any of the listed players.
    GamePlayersAny,
    /// Games played by all of the listed players.
    GamePlayersAll,
    /// Games with a session recorded since a time.
    ChangedSince,
    /// Games played in the last event of that many days.
    NumDays,
    /// List exclusively the listed players.
    PlayersEx,
    /// List at least the listed players.
    PlayersIn,
    /// List the top of each board unconditionally.
    NumPlayersTop,
    /// List players ranked up to that far above a nominated player.
    NumPlayersAbove,
    /// List players ranked up to that far below a nominated player.
    NumPlayersBelow,
    /// List players with at least that many plays.
    MinPlays,
    /// List players who played since a time.
    PlayedSince,
    /// List players in any of the listed leagues.
    PlayerLeaguesAny,
    /// List players in all of the listed leagues.
    PlayerLeaguesAll,
    /// Compute everything as if it were this time now.
    AsAt,
    /// Compare with that many prior snapshots.
    CompareWith,
    /// Compare back to a time, or to the last event of that many days.
    CompareBackTo,
    /// Highlight the players of the session that produced a board.
    HighlightPlayers,
    /// Highlight rank changes between snapshots.
    HighlightChanges,
    /// Highlight the nominated players.
    HighlightSelected,
    /// How player names are rendered.
    Names,
    /// Where game and player names link to.
    Links,
    /// Show session details atop each board.
    Details,
    /// Show the pre-session rating analysis.
    AnalysisPre,
    /// Show the post-session rating analysis.
    AnalysisPost,
    /// Lay boards out in that many columns.
    Cols,
}

/// The option families, used for enablement and cache classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionFamily {
    /// Filters on the set of games reported on.
    GameFilter,
    /// Filters on the players listed on each board.
    PlayerFilter,
    /// The "as at" perspective.
    Perspective,
    /// Historic snapshot selection.
    Evolution,
    /// Rendering knobs, always active.
    Formatting,
    /// Ancillary information knobs, always active.
    Info,
    /// Page layout knobs, always active.
    Layout,
}

/// Classification of an option by what a change to it means for a cached
/// result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClass {
    /// Changing it never requires new data, only re-filtering/re-rendering.
    Safe,
    /// Changing it may be absorbed by the cache depending on the direction of
    /// the change.
    Exploiting,
    /// Any change forces a full recomputation.
    Invalidating,
}

impl OptionId {
    /// Every recognized option.
    pub const ALL: [OptionId; 31] = [
        OptionId::GamesEx,
        OptionId::GamesIn,
        OptionId::TopGames,
        OptionId::LatestGames,
        OptionId::GameLeaguesAny,
        OptionId::GameLeaguesAll,
        OptionId::GamePlayersAny,
        OptionId::GamePlayersAll,
        OptionId::ChangedSince,
        OptionId::NumDays,
        OptionId::PlayersEx,
        OptionId::PlayersIn,
        OptionId::NumPlayersTop,
        OptionId::NumPlayersAbove,
        OptionId::NumPlayersBelow,
        OptionId::MinPlays,
        OptionId::PlayedSince,
        OptionId::PlayerLeaguesAny,
        OptionId::PlayerLeaguesAll,
        OptionId::AsAt,
        OptionId::CompareWith,
        OptionId::CompareBackTo,
        OptionId::HighlightPlayers,
        OptionId::HighlightChanges,
        OptionId::HighlightSelected,
        OptionId::Names,
        OptionId::Links,
        OptionId::Details,
        OptionId::AnalysisPre,
        OptionId::AnalysisPost,
        OptionId::Cols,
    ];

    /// The key this option travels under in requests.
    pub fn wire_name(self) -> &'static str {
        match self {
            OptionId::GamesEx => "games_ex",
            OptionId::GamesIn => "games_in",
            OptionId::TopGames => "top_games",
            OptionId::LatestGames => "latest_games",
            OptionId::GameLeaguesAny => "game_leagues_any",
            OptionId::GameLeaguesAll => "game_leagues_all",
            OptionId::GamePlayersAny => "game_players_any",
            OptionId::GamePlayersAll => "game_players_all",
            OptionId::ChangedSince => "changed_since",
            OptionId::NumDays => "num_days",
            OptionId::PlayersEx => "players_ex",
            OptionId::PlayersIn => "players_in",
            OptionId::NumPlayersTop => "num_players_top",
            OptionId::NumPlayersAbove => "num_players_above",
            OptionId::NumPlayersBelow => "num_players_below",
            OptionId::MinPlays => "min_plays",
            OptionId::PlayedSince => "played_since",
            OptionId::PlayerLeaguesAny => "player_leagues_any",
            OptionId::PlayerLeaguesAll => "player_leagues_all",
            OptionId::AsAt => "as_at",
            OptionId::CompareWith => "compare_with",
            OptionId::CompareBackTo => "compare_back_to",
            OptionId::HighlightPlayers => "highlight_players",
            OptionId::HighlightChanges => "highlight_changes",
            OptionId::HighlightSelected => "highlight_selected",
            OptionId::Names => "names",
            OptionId::Links => "links",
            OptionId::Details => "details",
            OptionId::AnalysisPre => "analysis_pre",
            OptionId::AnalysisPost => "analysis_post",
            OptionId::Cols => "cols",
        }
    }

    /// The family this option belongs to.
    pub fn family(self) -> OptionFamily {
        use OptionId as O;
        match self {
            O::GamesEx
            | O::GamesIn
            | O::TopGames
            | O::LatestGames
            | O::GameLeaguesAny
            | O::GameLeaguesAll
            | O::GamePlayersAny
            | O::GamePlayersAll
            | O::ChangedSince
            | O::NumDays => OptionFamily::GameFilter,
            O::PlayersEx
            | O::PlayersIn
            | O::NumPlayersTop
            | O::NumPlayersAbove
            | O::NumPlayersBelow
            | O::MinPlays
            | O::PlayedSince
            | O::PlayerLeaguesAny
            | O::PlayerLeaguesAll => OptionFamily::PlayerFilter,
            O::AsAt => OptionFamily::Perspective,
            O::CompareWith | O::CompareBackTo => OptionFamily::Evolution,
            O::HighlightPlayers
            | O::HighlightChanges
            | O::HighlightSelected
            | O::Names
            | O::Links => OptionFamily::Formatting,
            O::Details | O::AnalysisPre | O::AnalysisPost => OptionFamily::Info,
            O::Cols => OptionFamily::Layout,
        }
    }

    /// Whether this option is off unless a request explicitly names it.
    ///
    /// Formatting, info and layout options are always in force; everything else
    /// needs enabling.
    pub fn needs_enabling(self) -> bool {
        !matches!(
            self.family(),
            OptionFamily::Formatting | OptionFamily::Info | OptionFamily::Layout
        )
    }

    /// The cache class of this option.
    pub fn cache_class(self) -> CacheClass {
        match self.family() {
            OptionFamily::GameFilter | OptionFamily::Evolution => CacheClass::Exploiting,
            OptionFamily::Perspective => CacheClass::Invalidating,
            _ => CacheClass::Safe,
        }
    }
}

/// How player names are rendered on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameStyle {
    /// The nickname alone.
    #[default]
    Nick,
    /// The full name alone.
    Full,
    /// The full name followed by the nickname in parentheses.
    Complete,
}

impl NameStyle {
    /// The wire literal of this style.
    pub fn as_str(self) -> &'static str {
        match self {
            NameStyle::Nick => "nick",
            NameStyle::Full => "full",
            NameStyle::Complete => "complete",
        }
    }

    /// Parses a wire literal. Unknown literals yield `None`.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "nick" => Some(NameStyle::Nick),
            "full" => Some(NameStyle::Full),
            "complete" => Some(NameStyle::Complete),
            _ => None,
        }
    }
}

/// Where game and player names on a board link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkTarget {
    /// No links.
    None,
    /// The club's own pages.
    #[default]
    Club,
    /// The publisher database.
    Bgg,
}

impl LinkTarget {
    /// The wire literal of this target.
    pub fn as_str(self) -> &'static str {
        match self {
            LinkTarget::None => "none",
            LinkTarget::Club => "club",
            LinkTarget::Bgg => "bgg",
        }
    }

    /// Parses a wire literal. Unknown literals yield `None`.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "none" => Some(LinkTarget::None),
            "club" => Some(LinkTarget::Club),
            "bgg" => Some(LinkTarget::Bgg),
            _ => None,
        }
    }
}

/// The value of the `compare_back_to` option.
///
/// A digit string encodes a day count (the length of the last event, looking
/// back from the current board); anything else must decode as a datetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackTo {
    /// Snapshots of the last event of that many days.
    Days(u32),
    /// Snapshots strictly after that time.
    Time(NaiveDateTime),
}

/// Session-derived defaults an [`OptionSet`] is seeded with.
#[derive(Debug, Clone, Default)]
pub struct SessionDefaults {
    /// The league the client prefers to see boards for.
    pub league: Option<u32>,
}

/// The full set of leaderboard options of one request. See the [module
/// documentation](self).
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSet {
    enabled: BTreeSet<OptionId>,

    /// Restrict to the listed games (exclusively or inclusively, depending on
    /// which of the two list options is enabled).
    pub games: Vec<u32>,
    /// How many games to list (most popular or latest, depending on the
    /// enabled option).
    pub num_games: u32,
    /// Restrict to games played in these leagues (any/all per the enabled
    /// option).
    pub game_leagues: Vec<u32>,
    /// Restrict to games played by these players (any/all per the enabled
    /// option).
    pub game_players: Vec<u32>,
    /// Only boards that changed since this time.
    pub changed_since: Option<NaiveDateTime>,
    /// Only games played in the last event of this many days.
    pub num_days: u32,

    /// The players to list (exclusively or inclusively).
    pub players: Vec<u32>,
    /// How many players to list unconditionally from the top of each board.
    pub num_players_top: u32,
    /// How many players above a nominated player to list as context.
    pub num_players_above: u32,
    /// How many players below a nominated player to list as context.
    pub num_players_below: u32,
    /// The minimum play count for a player to be listed.
    pub min_plays: u32,
    /// Only players who played since this time.
    pub played_since: Option<NaiveDateTime>,
    /// Restrict listed players to these leagues (any/all per the enabled
    /// option).
    pub player_leagues: Vec<u32>,

    /// Compute everything as if it were this time now.
    pub as_at: Option<NaiveDateTime>,

    /// Compare with this many prior snapshots.
    pub compare_with: u32,
    /// Compare back to a time or event window.
    pub compare_back_to: Option<BackTo>,

    /// Highlight the players of the session that produced each board.
    pub highlight_players: bool,
    /// Highlight changes between historic snapshots.
    pub highlight_changes: bool,
    /// Highlight the nominated players.
    pub highlight_selected: bool,
    /// How player names are rendered.
    pub names: NameStyle,
    /// Where game and player names link to.
    pub links: LinkTarget,

    /// Show session details atop each board.
    pub details: bool,
    /// Show the pre-session rating analysis.
    pub analysis_pre: bool,
    /// Show the post-session rating analysis.
    pub analysis_post: bool,

    /// Lay boards out in this many columns.
    pub cols: u32,
}

impl Default for OptionSet {
    /// The default set, as used to populate form controls: every value at its
    /// default, with the baseline three options enabled.
    fn default() -> Self {
        Self {
            enabled: baseline(),
            games: Vec::new(),
            num_games: 6,
            game_leagues: Vec::new(),
            game_players: Vec::new(),
            changed_since: None,
            num_days: 1,
            players: Vec::new(),
            num_players_top: 10,
            num_players_above: 2,
            num_players_below: 2,
            min_plays: 2,
            played_since: None,
            player_leagues: Vec::new(),
            as_at: None,
            compare_with: 1,
            compare_back_to: None,
            highlight_players: true,
            highlight_changes: true,
            highlight_selected: true,
            names: NameStyle::default(),
            links: LinkTarget::default(),
            details: false,
            analysis_pre: false,
            analysis_post: false,
            cols: 3,
        }
    }
}

/// The enabled set a request with no recognized option falls back to.
fn baseline() -> BTreeSet<OptionId> {
    BTreeSet::from([
        OptionId::TopGames,
        OptionId::GameLeaguesAny,
        OptionId::NumPlayersTop,
    ])
}

/// Returns the parsed value of a numeric option, if present and composed
/// entirely of digits. Anything else is silently ignored.
fn parse_num(request: &BTreeMap<String, String>, key: &str) -> Option<u32> {
    let v = request.get(key)?;
    if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    v.parse().ok()
}

/// Parses a boolean option literal.
///
/// `true`/`false` in any case are accepted; anything else is a hard error that
/// propagates to the caller. This is the single exception to the permissive
/// parsing contract: a boolean drives binary rendering logic with no safe
/// default direction.
fn parse_bool(option: &'static str, value: &str) -> BoardsResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(BoardsError::InvalidBoolean {
            option,
            value: value.to_owned(),
        }),
    }
}

/// Splits a comma-separated id list, dropping anything that isn't an id.
fn split_ids(raw: &str) -> Vec<u32> {
    raw.split(',').filter_map(|p| p.trim().parse().ok()).collect()
}

enum Entity {
    Game,
    League,
    Player,
}

/// Validates an id list against the store, silently dropping unknown ids.
async fn checked_ids<C: IdCheck>(ids: &C, entity: Entity, raw: &str) -> BoardsResult<Vec<u32>> {
    let mut out = Vec::new();
    for id in split_ids(raw) {
        let known = match entity {
            Entity::Game => ids.game_exists(id).await?,
            Entity::League => ids.league_exists(id).await?,
            Entity::Player => ids.player_exists(id).await?,
        };
        if known {
            out.push(id);
        }
    }
    Ok(out)
}

impl OptionSet {
    /// Builds an option set from the flat request parameters.
    ///
    /// `defaults` carries session preferences (currently only a preferred
    /// league). If `request` contains no recognized option key at all, the
    /// enabled set falls back to the fixed baseline; otherwise it starts empty
    /// and is built up purely from what is present.
    ///
    /// Malformed values fall back to defaults, unknown ids are dropped; the
    /// only hard failure is a malformed boolean literal.
    pub async fn from_request<C: IdCheck>(
        ids: &C,
        defaults: &SessionDefaults,
        request: &BTreeMap<String, String>,
    ) -> BoardsResult<OptionSet> {
        let mut o = OptionSet::default();

        let have_options = request
            .keys()
            .any(|k| OptionId::ALL.iter().any(|o| o.wire_name() == k.as_str()));
        if have_options {
            o.enabled = BTreeSet::new();
        }

        // ------------------------------------------------------------------
        // Game filters

        // An exclusive or inclusive game list; first recognized form wins.
        for (key, id) in [("games_ex", OptionId::GamesEx), ("games_in", OptionId::GamesIn)] {
            if let Some(v) = request.get(key) {
                let games = checked_ids(ids, Entity::Game, v).await?;
                if !games.is_empty() {
                    o.games = games;
                    o.enable(id, true);
                }
                break;
            }
        }

        // A bound on the number of games: top by popularity, or latest.
        if let Some(n) = parse_num(request, "top_games") {
            o.num_games = n;
            o.enable(OptionId::TopGames, n > 0);
        } else if let Some(n) = parse_num(request, "latest_games") {
            o.num_games = n;
            o.enable(OptionId::LatestGames, n > 0);
        }

        // League restriction on games, any or all form. An explicitly empty
        // value asks for no league filtering; a request with no recognized
        // option at all falls back to the session-preferred league.
        let league_req = [
            ("game_leagues_any", OptionId::GameLeaguesAny),
            ("game_leagues_all", OptionId::GameLeaguesAll),
        ]
        .into_iter()
        .find_map(|(key, id)| request.get(key).map(|v| (id, v)));

        match league_req {
            Some((id, v)) if !v.is_empty() => {
                let leagues = checked_ids(ids, Entity::League, v).await?;
                let ok = !leagues.is_empty();
                o.game_leagues = leagues;
                o.enable(OptionId::GameLeaguesAny, ok && id == OptionId::GameLeaguesAny);
                o.enable(OptionId::GameLeaguesAll, ok && id == OptionId::GameLeaguesAll);
            }
            Some(_) => {
                o.enable(OptionId::GameLeaguesAny, false);
                o.enable(OptionId::GameLeaguesAll, false);
            }
            None if !have_options => {
                // Baseline stays in force; seed the list from the session.
                o.game_leagues = defaults.league.into_iter().collect();
            }
            None => {}
        }

        // Games played by any/all of a player list.
        let player_req = [
            ("game_players_any", OptionId::GamePlayersAny),
            ("game_players_all", OptionId::GamePlayersAll),
        ]
        .into_iter()
        .find_map(|(key, id)| request.get(key).map(|v| (id, v)));

        if let Some((id, v)) = player_req {
            let players = checked_ids(ids, Entity::Player, v).await?;
            let ok = !players.is_empty();
            o.game_players = players;
            o.enable(OptionId::GamePlayersAny, ok && id == OptionId::GamePlayersAny);
            o.enable(OptionId::GamePlayersAll, ok && id == OptionId::GamePlayersAll);
        }

        // Only games whose boards changed since a time.
        if let Some(v) = request.get("changed_since") {
            o.changed_since = decode_datetime(v);
            o.enable(OptionId::ChangedSince, o.changed_since.is_some());
        }

        // Only games played in the last event of that many days.
        if let Some(n) = parse_num(request, "num_days") {
            o.num_days = n;
            o.enable(OptionId::NumDays, n > 0);
        }

        // ------------------------------------------------------------------
        // Player filters

        // An exclusive or inclusive player list; first recognized form wins.
        // An explicitly present but empty list falls back on the game_players
        // list, so `?game_players_any=1,2&players_ex` nominates players 1,2.
        for (key, id) in [("players_ex", OptionId::PlayersEx), ("players_in", OptionId::PlayersIn)] {
            if let Some(v) = request.get(key) {
                let players = checked_ids(ids, Entity::Player, v).await?;
                if !players.is_empty() {
                    o.players = players;
                    o.enable(id, true);
                } else if !o.game_players.is_empty() {
                    o.players = o.game_players.clone();
                    o.enable(id, true);
                }
                break;
            }
        }

        if let Some(n) = parse_num(request, "num_players_top") {
            o.num_players_top = n;
            o.enable(OptionId::NumPlayersTop, n > 0);
        }

        // Context rows around nominated players.
        if let Some(n) = parse_num(request, "num_players_above") {
            o.num_players_above = n;
            o.enable(OptionId::NumPlayersAbove, n > 0);
        }
        if let Some(n) = parse_num(request, "num_players_below") {
            o.num_players_below = n;
            o.enable(OptionId::NumPlayersBelow, n > 0);
        }

        if let Some(n) = parse_num(request, "min_plays") {
            o.min_plays = n;
            o.enable(OptionId::MinPlays, n > 0);
        }

        if let Some(v) = request.get("played_since") {
            o.played_since = decode_datetime(v);
            o.enable(OptionId::PlayedSince, o.played_since.is_some());
        }

        // League restriction on listed players; an explicitly empty value
        // falls back on the game league list when one was given.
        let pleague_req = [
            ("player_leagues_any", OptionId::PlayerLeaguesAny),
            ("player_leagues_all", OptionId::PlayerLeaguesAll),
        ]
        .into_iter()
        .find_map(|(key, id)| request.get(key).map(|v| (id, v)));

        match pleague_req {
            Some((id, v)) if !v.is_empty() => {
                let leagues = checked_ids(ids, Entity::League, v).await?;
                let ok = !leagues.is_empty();
                o.player_leagues = leagues;
                o.enable(OptionId::PlayerLeaguesAny, ok && id == OptionId::PlayerLeaguesAny);
                o.enable(OptionId::PlayerLeaguesAll, ok && id == OptionId::PlayerLeaguesAll);
            }
            Some((id, _)) if !o.game_leagues.is_empty() => {
                o.player_leagues = o.game_leagues.clone();
                o.enable(OptionId::PlayerLeaguesAny, id == OptionId::PlayerLeaguesAny);
                o.enable(OptionId::PlayerLeaguesAll, id == OptionId::PlayerLeaguesAll);
            }
            Some(_) => {
                o.enable(OptionId::PlayerLeaguesAny, false);
                o.enable(OptionId::PlayerLeaguesAll, false);
            }
            None if !have_options => {
                o.player_leagues = defaults.league.into_iter().collect();
            }
            None => {}
        }

        // ------------------------------------------------------------------
        // Perspective

        if let Some(v) = request.get("as_at") {
            o.as_at = decode_datetime(v);
            o.enable(OptionId::AsAt, o.as_at.is_some());
        }

        // ------------------------------------------------------------------
        // Evolution options. Only one selection method can be respected;
        // compare_with wins the precedence.

        if let Some(n) = parse_num(request, "compare_with") {
            o.compare_with = n;
            o.enable(OptionId::CompareWith, n > 0);
            o.enable(OptionId::CompareBackTo, false);
        } else if let Some(v) = request.get("compare_back_to") {
            o.compare_back_to = match parse_num(request, "compare_back_to") {
                Some(days) if days > 0 => Some(BackTo::Days(days)),
                Some(_) => None,
                None => decode_datetime(v).map(BackTo::Time),
            };
            o.enable(OptionId::CompareBackTo, o.compare_back_to.is_some());
            o.enable(OptionId::CompareWith, false);
        }

        // ------------------------------------------------------------------
        // Info options

        if let Some(v) = request.get("details") {
            o.details = parse_bool("details", v)?;
        }
        if let Some(v) = request.get("analysis_pre") {
            o.analysis_pre = parse_bool("analysis_pre", v)?;
        }
        if let Some(v) = request.get("analysis_post") {
            o.analysis_post = parse_bool("analysis_post", v)?;
        }

        // ------------------------------------------------------------------
        // Formatting options

        if let Some(v) = request.get("highlight_players") {
            o.highlight_players = parse_bool("highlight_players", v)?;
        }
        if let Some(v) = request.get("highlight_changes") {
            o.highlight_changes = parse_bool("highlight_changes", v)?;
        }
        if let Some(v) = request.get("highlight_selected") {
            o.highlight_selected = parse_bool("highlight_selected", v)?;
        }

        if let Some(v) = request.get("names") {
            if let Some(style) = NameStyle::from_str_opt(v) {
                o.names = style;
            }
        }
        if let Some(v) = request.get("links") {
            if let Some(target) = LinkTarget::from_str_opt(v) {
                o.links = target;
            }
        }

        // ------------------------------------------------------------------
        // Layout options

        if let Some(n) = parse_num(request, "cols") {
            o.cols = n;
        }

        debug_assert!(o.exclusivity_holds());
        Ok(o)
    }

    fn enable(&mut self, id: OptionId, on: bool) {
        if on {
            self.enabled.insert(id);
        } else {
            self.enabled.remove(&id);
        }
    }

    /// Whether an option is in force: always true for the always-active
    /// families, the enabled status for the rest.
    pub fn is_enabled(&self, id: OptionId) -> bool {
        if id.needs_enabling() {
            self.enabled.contains(&id)
        } else {
            true
        }
    }

    /// The enabled options that need enabling, in a stable order.
    pub fn enabled_options(&self) -> impl Iterator<Item = OptionId> + '_ {
        self.enabled.iter().copied()
    }

    /// Checks that no mutually exclusive pair is simultaneously enabled.
    ///
    /// The constructor upholds this by design; it is asserted defensively
    /// because the selectors would build contradictory plans otherwise.
    pub fn exclusivity_holds(&self) -> bool {
        let pairs = [
            (OptionId::GamesEx, OptionId::GamesIn),
            (OptionId::TopGames, OptionId::LatestGames),
            (OptionId::GameLeaguesAny, OptionId::GameLeaguesAll),
            (OptionId::GamePlayersAny, OptionId::GamePlayersAll),
            (OptionId::PlayersEx, OptionId::PlayersIn),
            (OptionId::PlayerLeaguesAny, OptionId::PlayerLeaguesAll),
            (OptionId::CompareWith, OptionId::CompareBackTo),
        ];
        pairs
            .iter()
            .all(|&(a, b)| !(self.is_enabled(a) && self.is_enabled(b)))
    }

    /// The active league restriction on games, if any.
    pub fn game_league_filter(&self) -> Option<LeagueFilter> {
        if self.game_leagues.is_empty() {
            None
        } else if self.is_enabled(OptionId::GameLeaguesAny) {
            Some(LeagueFilter {
                mode: SetMode::Any,
                leagues: self.game_leagues.clone(),
            })
        } else if self.is_enabled(OptionId::GameLeaguesAll) {
            Some(LeagueFilter {
                mode: SetMode::All,
                leagues: self.game_leagues.clone(),
            })
        } else {
            None
        }
    }

    /// True if no evolution option is enabled.
    pub fn no_evolution(&self) -> bool {
        !(self.is_enabled(OptionId::CompareWith) || self.is_enabled(OptionId::CompareBackTo))
    }

    /// True if any player filter is enabled.
    pub fn any_player_filters(&self) -> bool {
        [
            OptionId::PlayersEx,
            OptionId::PlayersIn,
            OptionId::NumPlayersTop,
            OptionId::NumPlayersAbove,
            OptionId::NumPlayersBelow,
            OptionId::MinPlays,
            OptionId::PlayedSince,
            OptionId::PlayerLeaguesAny,
            OptionId::PlayerLeaguesAll,
        ]
        .into_iter()
        .any(|id| self.is_enabled(id))
    }

    /// True if the player was nominated specifically to be listed.
    pub fn player_is_nominated(&self, player_id: u32) -> bool {
        (self.is_enabled(OptionId::PlayersIn) || self.is_enabled(OptionId::PlayersEx))
            && self.players.contains(&player_id)
    }

    /// Evaluates the per-player inclusion criteria.
    ///
    /// An explicitly included player always passes. A league restriction is a
    /// hard veto. The remaining criteria (min plays, played since) combine
    /// with OR when a top-N slice is active, since any one qualifying reason
    /// admits, and with AND when the full board is shown.
    pub fn player_passes(
        &self,
        player_id: u32,
        play_count: u32,
        last_play: Option<NaiveDateTime>,
        league_ids: &[u32],
    ) -> bool {
        if self.is_enabled(OptionId::PlayersIn) && self.players.contains(&player_id) {
            return true;
        }

        if self.is_enabled(OptionId::PlayerLeaguesAny)
            && !self.player_leagues.iter().any(|l| league_ids.contains(l))
        {
            return false;
        } else if self.is_enabled(OptionId::PlayerLeaguesAll)
            && !self.player_leagues.iter().all(|l| league_ids.contains(l))
        {
            return false;
        }

        let mut criteria = Vec::new();
        if self.is_enabled(OptionId::MinPlays) {
            criteria.push(play_count >= self.min_plays);
        }
        if self.is_enabled(OptionId::PlayedSince) {
            criteria.push(match (last_play, self.played_since) {
                (Some(last), Some(since)) => last >= since,
                _ => false,
            });
        }

        if self.is_enabled(OptionId::NumPlayersTop) {
            criteria.iter().any(|&c| c)
        } else {
            criteria.iter().all(|&c| c)
        }
    }

    /// Decides whether serving this option set requires the database, given
    /// the option set a cached result was computed with.
    ///
    /// The cache can be reused alone when the game filters and the evolution
    /// options only narrowed relative to the cached state and the perspective
    /// is untouched. A differing enablement status on any compared pair is
    /// conservatively treated as a widening.
    pub fn needs_db(&self, cached: &OptionSet) -> bool {
        fn enabled_among(o: &OptionSet, ids: &[OptionId]) -> Vec<OptionId> {
            ids.iter().copied().filter(|&i| o.is_enabled(i)).collect()
        }

        let is_subset = |ids: &[OptionId], get: fn(&OptionSet) -> &[u32]| -> bool {
            let now = enabled_among(self, ids);
            if now != enabled_among(cached, ids) {
                return false;
            }
            if now.is_empty() {
                return true;
            }
            let then: HashSet<u32> = get(cached).iter().copied().collect();
            get(self).iter().all(|id| then.contains(id))
        };

        let is_lower = |ids: &[OptionId], get: fn(&OptionSet) -> u32| -> bool {
            let now = enabled_among(self, ids);
            if now != enabled_among(cached, ids) {
                return false;
            }
            now.is_empty() || get(self) <= get(cached)
        };

        let is_later = |id: OptionId, get: fn(&OptionSet) -> Option<NaiveDateTime>| -> bool {
            if self.is_enabled(id) != cached.is_enabled(id) {
                return false;
            }
            if !self.is_enabled(id) {
                return true;
            }
            match (get(self), get(cached)) {
                (Some(now), Some(then)) => now >= then,
                _ => false,
            }
        };

        // Game filters: the new request must describe a subset of the cached
        // game population.
        let games_need_db = !(is_subset(&[OptionId::GamesEx, OptionId::GamesIn], |o| {
            o.games.as_slice()
        }) && is_subset(&[OptionId::GameLeaguesAny, OptionId::GameLeaguesAll], |o| {
            o.game_leagues.as_slice()
        }) && is_subset(&[OptionId::GamePlayersAny, OptionId::GamePlayersAll], |o| {
            o.game_players.as_slice()
        })
            && is_lower(&[OptionId::TopGames, OptionId::LatestGames], |o| o.num_games)
            && is_lower(&[OptionId::NumDays], |o| o.num_days)
            && is_later(OptionId::ChangedSince, |o| o.changed_since));

        // Evolution options: the new request must ask for a shorter history.
        let back_to_ok = {
            let id = OptionId::CompareBackTo;
            if self.is_enabled(id) != cached.is_enabled(id) {
                false
            } else if !self.is_enabled(id) {
                true
            } else {
                match (self.compare_back_to, cached.compare_back_to) {
                    (Some(BackTo::Time(now)), Some(BackTo::Time(then))) => now >= then,
                    (Some(BackTo::Days(now)), Some(BackTo::Days(then))) => now <= then,
                    _ => false,
                }
            }
        };
        let evo_needs_db =
            !(is_lower(&[OptionId::CompareWith], |o| o.compare_with) && back_to_ok);

        // Any change in perspective invalidates the cache wholesale.
        let as_at_changed = self.is_enabled(OptionId::AsAt) != cached.is_enabled(OptionId::AsAt)
            || (self.is_enabled(OptionId::AsAt) && self.as_at != cached.as_at);

        games_need_db || evo_needs_db || as_at_changed
    }

    /// A flat, JSON-safe mapping of every option's current value, used to
    /// populate UI controls and echo state back to the client.
    ///
    /// Every field is enumerated by hand: dates become fixed-format strings,
    /// id lists arrays, enum-like values their wire literals. The `enabled`
    /// key lists the enabled option names.
    pub fn as_dict(&self) -> serde_json::Map<String, serde_json::Value> {
        use serde_json::{Value, json};

        let date = |d: Option<NaiveDateTime>| match d {
            Some(d) => Value::String(encode_datetime(d)),
            None => Value::Null,
        };

        let mut d = serde_json::Map::new();
        d.insert("games".to_owned(), json!(self.games));
        d.insert("num_games".to_owned(), json!(self.num_games));
        d.insert("game_leagues".to_owned(), json!(self.game_leagues));
        d.insert("game_players".to_owned(), json!(self.game_players));
        d.insert("changed_since".to_owned(), date(self.changed_since));
        d.insert("num_days".to_owned(), json!(self.num_days));
        d.insert("players".to_owned(), json!(self.players));
        d.insert("num_players_top".to_owned(), json!(self.num_players_top));
        d.insert("num_players_above".to_owned(), json!(self.num_players_above));
        d.insert("num_players_below".to_owned(), json!(self.num_players_below));
        d.insert("min_plays".to_owned(), json!(self.min_plays));
        d.insert("played_since".to_owned(), date(self.played_since));
        d.insert("player_leagues".to_owned(), json!(self.player_leagues));
        d.insert("as_at".to_owned(), date(self.as_at));
        d.insert("compare_with".to_owned(), json!(self.compare_with));
        d.insert(
            "compare_back_to".to_owned(),
            match self.compare_back_to {
                Some(BackTo::Days(n)) => json!(n),
                Some(BackTo::Time(t)) => Value::String(encode_datetime(t)),
                None => Value::Null,
            },
        );
        d.insert("highlight_players".to_owned(), json!(self.highlight_players));
        d.insert("highlight_changes".to_owned(), json!(self.highlight_changes));
        d.insert("highlight_selected".to_owned(), json!(self.highlight_selected));
        d.insert("names".to_owned(), json!(self.names.as_str()));
        d.insert("links".to_owned(), json!(self.links.as_str()));
        d.insert("details".to_owned(), json!(self.details));
        d.insert("analysis_pre".to_owned(), json!(self.analysis_pre));
        d.insert("analysis_post".to_owned(), json!(self.analysis_post));
        d.insert("cols".to_owned(), json!(self.cols));
        d.insert(
            "enabled".to_owned(),
            json!(
                self.enabled
                    .iter()
                    .map(|o| o.wire_name())
                    .collect::<Vec<_>>()
            ),
        );
        d
    }

    /// Rebuilds the flat request parameters that would reconstruct this option
    /// set: one key per enabled option plus the always-active values.
    pub fn to_request(&self) -> BTreeMap<String, String> {
        let join = |ids: &[u32]| {
            ids.iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };

        let mut r = BTreeMap::new();
        for id in self.enabled.iter().copied() {
            let value = match id {
                OptionId::GamesEx | OptionId::GamesIn => join(&self.games),
                OptionId::TopGames | OptionId::LatestGames => self.num_games.to_string(),
                OptionId::GameLeaguesAny | OptionId::GameLeaguesAll => join(&self.game_leagues),
                OptionId::GamePlayersAny | OptionId::GamePlayersAll => join(&self.game_players),
                OptionId::ChangedSince => match self.changed_since {
                    Some(d) => encode_datetime(d),
                    None => continue,
                },
                OptionId::NumDays => self.num_days.to_string(),
                OptionId::PlayersEx | OptionId::PlayersIn => join(&self.players),
                OptionId::NumPlayersTop => self.num_players_top.to_string(),
                OptionId::NumPlayersAbove => self.num_players_above.to_string(),
                OptionId::NumPlayersBelow => self.num_players_below.to_string(),
                OptionId::MinPlays => self.min_plays.to_string(),
                OptionId::PlayedSince => match self.played_since {
                    Some(d) => encode_datetime(d),
                    None => continue,
                },
                OptionId::PlayerLeaguesAny | OptionId::PlayerLeaguesAll => {
                    join(&self.player_leagues)
                }
                OptionId::AsAt => match self.as_at {
                    Some(d) => encode_datetime(d),
                    None => continue,
                },
                OptionId::CompareWith => self.compare_with.to_string(),
                OptionId::CompareBackTo => match self.compare_back_to {
                    Some(BackTo::Days(n)) => n.to_string(),
                    Some(BackTo::Time(t)) => encode_datetime(t),
                    None => continue,
                },
                // Always-active options never sit in the enabled set.
                _ => continue,
            };
            r.insert(id.wire_name().to_owned(), value);
        }

        r.insert("highlight_players".to_owned(), self.highlight_players.to_string());
        r.insert("highlight_changes".to_owned(), self.highlight_changes.to_string());
        r.insert("highlight_selected".to_owned(), self.highlight_selected.to_string());
        r.insert("names".to_owned(), self.names.as_str().to_owned());
        r.insert("links".to_owned(), self.links.as_str().to_owned());
        r.insert("details".to_owned(), self.details.to_string());
        r.insert("analysis_pre".to_owned(), self.analysis_pre.to_string());
        r.insert("analysis_post".to_owned(), self.analysis_post.to_string());
        r.insert("cols".to_owned(), self.cols.to_string());
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ids below 100 exist; everything else is unknown.
    struct StubIds;

    impl IdCheck for StubIds {
        async fn game_exists(&self, id: u32) -> BoardsResult<bool> {
            Ok(id < 100)
        }
        async fn league_exists(&self, id: u32) -> BoardsResult<bool> {
            Ok(id < 100)
        }
        async fn player_exists(&self, id: u32) -> BoardsResult<bool> {
            Ok(id < 100)
        }
    }

    fn params(kv: &[(&str, &str)]) -> BTreeMap<String, String> {
        kv.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn opts(kv: &[(&str, &str)]) -> OptionSet {
        OptionSet::from_request(&StubIds, &SessionDefaults::default(), &params(kv))
            .await
            .unwrap()
    }

    fn enabled(o: &OptionSet) -> Vec<OptionId> {
        o.enabled_options().collect()
    }

    #[tokio::test]
    async fn empty_request_uses_baseline() {
        let o = OptionSet::from_request(
            &StubIds,
            &SessionDefaults { league: Some(3) },
            &BTreeMap::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            enabled(&o),
            vec![
                OptionId::TopGames,
                OptionId::GameLeaguesAny,
                OptionId::NumPlayersTop
            ]
        );
        assert_eq!(o.game_leagues, vec![3]);
    }

    #[tokio::test]
    async fn unrecognized_keys_keep_baseline() {
        let o = opts(&[("utm_source", "mail"), ("tab", "2")]).await;
        assert_eq!(
            enabled(&o),
            vec![
                OptionId::TopGames,
                OptionId::GameLeaguesAny,
                OptionId::NumPlayersTop
            ]
        );
    }

    #[tokio::test]
    async fn any_recognized_key_clears_baseline() {
        let o = opts(&[("min_plays", "3")]).await;
        assert_eq!(enabled(&o), vec![OptionId::MinPlays]);
        assert_eq!(o.min_plays, 3);
        // The unsubmitted options keep their default values regardless.
        assert_eq!(o.num_games, 6);
        assert!(!o.is_enabled(OptionId::TopGames));
    }

    #[tokio::test]
    async fn exclusive_siblings_first_form_wins() {
        let o = opts(&[("games_ex", "1,2"), ("games_in", "3")]).await;
        assert!(o.is_enabled(OptionId::GamesEx));
        assert!(!o.is_enabled(OptionId::GamesIn));
        assert_eq!(o.games, vec![1, 2]);

        let o = opts(&[("compare_with", "2"), ("compare_back_to", "7")]).await;
        assert!(o.is_enabled(OptionId::CompareWith));
        assert!(!o.is_enabled(OptionId::CompareBackTo));

        let o = opts(&[("game_leagues_any", "1"), ("game_leagues_all", "2")]).await;
        assert!(o.is_enabled(OptionId::GameLeaguesAny));
        assert!(!o.is_enabled(OptionId::GameLeaguesAll));
        assert!(o.exclusivity_holds());
    }

    #[tokio::test]
    async fn non_digit_numbers_are_ignored() {
        let o = opts(&[("top_games", "lots"), ("min_plays", "3")]).await;
        assert!(!o.is_enabled(OptionId::TopGames));
        assert_eq!(o.num_games, 6);
    }

    #[tokio::test]
    async fn zero_disables_numeric_options() {
        let o = opts(&[("top_games", "0")]).await;
        assert!(!o.is_enabled(OptionId::TopGames));
        assert_eq!(o.num_games, 0);
    }

    #[tokio::test]
    async fn malformed_dates_stay_unset() {
        let o = opts(&[("changed_since", "not-a-date"), ("min_plays", "1")]).await;
        assert!(!o.is_enabled(OptionId::ChangedSince));
        assert_eq!(o.changed_since, None);
    }

    #[tokio::test]
    async fn mangled_dates_decode() {
        let o = opts(&[("as_at", "2021-06-01+20-30-00")]).await;
        assert!(o.is_enabled(OptionId::AsAt));
        assert_eq!(
            o.as_at,
            Some(
                chrono::NaiveDateTime::parse_from_str("2021-06-01 20:30:00", "%Y-%m-%d %H:%M:%S")
                    .unwrap()
            )
        );
    }

    #[tokio::test]
    async fn unknown_ids_are_dropped() {
        let o = opts(&[("games_ex", "1,250,7")]).await;
        assert_eq!(o.games, vec![1, 7]);
        assert!(o.is_enabled(OptionId::GamesEx));

        // A list of only unknown ids leaves the option disabled.
        let o = opts(&[("games_ex", "250,300")]).await;
        assert!(!o.is_enabled(OptionId::GamesEx));
    }

    #[tokio::test]
    async fn empty_player_list_falls_back_on_game_players() {
        let o = opts(&[("game_players_any", "4,5"), ("players_ex", "")]).await;
        assert!(o.is_enabled(OptionId::PlayersEx));
        assert_eq!(o.players, vec![4, 5]);
    }

    #[tokio::test]
    async fn empty_player_leagues_fall_back_on_game_leagues() {
        let o = opts(&[("game_leagues_any", "2,3"), ("player_leagues_all", "")]).await;
        assert!(o.is_enabled(OptionId::PlayerLeaguesAll));
        assert!(!o.is_enabled(OptionId::PlayerLeaguesAny));
        assert_eq!(o.player_leagues, vec![2, 3]);
    }

    #[tokio::test]
    async fn empty_league_value_disables_filtering() {
        let o = opts(&[("game_leagues_any", ""), ("min_plays", "1")]).await;
        assert!(!o.is_enabled(OptionId::GameLeaguesAny));
        assert!(!o.is_enabled(OptionId::GameLeaguesAll));
    }

    #[tokio::test]
    async fn compare_back_to_digit_means_days() {
        let o = opts(&[("compare_back_to", "7")]).await;
        assert_eq!(o.compare_back_to, Some(BackTo::Days(7)));

        let o = opts(&[("compare_back_to", "2021-01-01 00:00:00")]).await;
        assert!(matches!(o.compare_back_to, Some(BackTo::Time(_))));
    }

    #[tokio::test]
    async fn bad_boolean_is_a_hard_error() {
        let err = OptionSet::from_request(
            &StubIds,
            &SessionDefaults::default(),
            &params(&[("details", "yes")]),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            BoardsError::InvalidBoolean {
                option: "details",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn booleans_parse_any_case() {
        let o = opts(&[("details", "TRUE"), ("highlight_players", "False")]).await;
        assert!(o.details);
        assert!(!o.highlight_players);
    }

    #[tokio::test]
    async fn unknown_enum_literals_keep_defaults() {
        let o = opts(&[("names", "shouty"), ("links", "elsewhere")]).await;
        assert_eq!(o.names, NameStyle::Nick);
        assert_eq!(o.links, LinkTarget::Club);
    }

    #[tokio::test]
    async fn round_trip_through_request_params() {
        let o = opts(&[
            ("games_in", "1,2"),
            ("top_games", "4"),
            ("game_leagues_any", "3"),
            ("players_in", "8,9"),
            ("num_players_top", "5"),
            ("min_plays", "2"),
            ("played_since", "2020-05-01 12:00:00"),
            ("as_at", "2021-06-01 20:30:00"),
            ("compare_back_to", "2021-01-01 00:00:00"),
            ("names", "complete"),
            ("details", "true"),
            ("cols", "4"),
        ])
        .await;

        let rebuilt = OptionSet::from_request(&StubIds, &SessionDefaults::default(), &o.to_request())
            .await
            .unwrap();
        assert_eq!(rebuilt, o);
    }

    #[tokio::test]
    async fn player_passes_or_vs_and_semantics() {
        let since = "2021-01-01 00:00:00";
        let since_dt =
            chrono::NaiveDateTime::parse_from_str(since, "%Y-%m-%d %H:%M:%S").unwrap();
        let early = since_dt - chrono::Duration::days(10);

        // Top-N active: meeting any one criterion admits.
        let o = opts(&[
            ("num_players_top", "3"),
            ("min_plays", "5"),
            ("played_since", since),
        ])
        .await;
        assert!(o.player_passes(1, 9, Some(early), &[]));
        assert!(o.player_passes(1, 1, Some(since_dt), &[]));
        assert!(!o.player_passes(1, 1, Some(early), &[]));

        // Full board: every criterion must hold.
        let o = opts(&[("min_plays", "5"), ("played_since", since)]).await;
        assert!(!o.player_passes(1, 9, Some(early), &[]));
        assert!(o.player_passes(1, 9, Some(since_dt), &[]));
    }

    #[tokio::test]
    async fn player_passes_league_veto_and_nomination() {
        let o = opts(&[("player_leagues_any", "1,2"), ("players_in", "42")]).await;
        // An explicitly included player passes regardless.
        assert!(o.player_passes(42, 0, None, &[]));
        // Anyone else must intersect the leagues.
        assert!(!o.player_passes(7, 10, None, &[9]));
        assert!(o.player_passes(7, 10, None, &[2, 9]));

        assert!(o.player_is_nominated(42));
        assert!(!o.player_is_nominated(7));

        let o = opts(&[("player_leagues_all", "1,2")]).await;
        assert!(!o.player_passes(7, 10, None, &[1]));
        assert!(o.player_passes(7, 10, None, &[1, 2, 3]));
    }

    #[tokio::test]
    async fn oracle_narrowing_game_count_reuses_cache() {
        let cached = opts(&[("top_games", "10"), ("game_leagues_any", "1,2")]).await;
        let narrower = opts(&[("top_games", "5"), ("game_leagues_any", "1,2")]).await;
        let wider = opts(&[("top_games", "15"), ("game_leagues_any", "1,2")]).await;

        assert!(!narrower.needs_db(&cached));
        assert!(wider.needs_db(&cached));
    }

    #[tokio::test]
    async fn oracle_league_subset_rules() {
        let cached = opts(&[("game_leagues_any", "1,2")]).await;

        assert!(!opts(&[("game_leagues_any", "1")]).await.needs_db(&cached));
        assert!(opts(&[("game_leagues_any", "1,3")]).await.needs_db(&cached));
        // Same list under the other mode is not a subset.
        assert!(opts(&[("game_leagues_all", "1")]).await.needs_db(&cached));
        // Newly enabling a filter that wasn't cached forces the database.
        assert!(
            opts(&[("game_leagues_any", "1"), ("games_ex", "1")])
                .await
                .needs_db(&cached)
        );
    }

    #[tokio::test]
    async fn oracle_cache_safe_options_never_need_db() {
        let cached = opts(&[("top_games", "10")]).await;
        let fresh = opts(&[
            ("top_games", "10"),
            ("min_plays", "4"),
            ("num_players_top", "3"),
            ("details", "true"),
            ("cols", "2"),
        ])
        .await;
        assert!(!fresh.needs_db(&cached));
    }

    #[tokio::test]
    async fn oracle_any_as_at_change_needs_db() {
        let plain = opts(&[("top_games", "10")]).await;
        let at_a = opts(&[("top_games", "10"), ("as_at", "2021-06-01 20:30:00")]).await;
        let at_b = opts(&[("top_games", "10"), ("as_at", "2021-06-02 20:30:00")]).await;

        assert!(at_a.needs_db(&plain));
        assert!(plain.needs_db(&at_a));
        assert!(at_b.needs_db(&at_a));
        assert!(!at_a.needs_db(&at_a));
    }

    #[tokio::test]
    async fn oracle_evolution_rules() {
        let cached = opts(&[("compare_with", "3")]).await;
        assert!(!opts(&[("compare_with", "2")]).await.needs_db(&cached));
        assert!(opts(&[("compare_with", "4")]).await.needs_db(&cached));
        assert!(opts(&[("compare_back_to", "7")]).await.needs_db(&cached));

        let cached = opts(&[("compare_back_to", "2021-01-01 00:00:00")]).await;
        assert!(
            !opts(&[("compare_back_to", "2021-02-01 00:00:00")])
                .await
                .needs_db(&cached)
        );
        assert!(
            opts(&[("compare_back_to", "2020-12-01 00:00:00")])
                .await
                .needs_db(&cached)
        );

        let cached = opts(&[("compare_back_to", "7")]).await;
        assert!(!opts(&[("compare_back_to", "5")]).await.needs_db(&cached));
        assert!(opts(&[("compare_back_to", "9")]).await.needs_db(&cached));
    }

    #[tokio::test]
    async fn oracle_changed_since_narrowing() {
        let cached = opts(&[("changed_since", "2021-01-01 00:00:00")]).await;
        assert!(
            !opts(&[("changed_since", "2021-03-01 00:00:00")])
                .await
                .needs_db(&cached)
        );
        assert!(
            opts(&[("changed_since", "2020-01-01 00:00:00")])
                .await
                .needs_db(&cached)
        );
        assert!(opts(&[("min_plays", "1")]).await.needs_db(&cached));
    }

    #[tokio::test]
    async fn as_dict_lists_every_option() {
        let o = opts(&[("top_games", "4"), ("as_at", "2021-06-01 20:30:00")]).await;
        let d = o.as_dict();

        for id in OptionId::ALL {
            // The two num_games spellings and the compare pair share a value
            // slot; the dict carries the backing fields plus `enabled`.
            let key = match id {
                OptionId::GamesEx | OptionId::GamesIn => "games",
                OptionId::TopGames | OptionId::LatestGames => "num_games",
                OptionId::PlayersEx | OptionId::PlayersIn => "players",
                OptionId::GameLeaguesAny | OptionId::GameLeaguesAll => "game_leagues",
                OptionId::GamePlayersAny | OptionId::GamePlayersAll => "game_players",
                OptionId::PlayerLeaguesAny | OptionId::PlayerLeaguesAll => "player_leagues",
                other => other.wire_name(),
            };
            assert!(d.contains_key(key), "missing {key}");
        }
        assert_eq!(d["num_games"], serde_json::json!(4));
        assert_eq!(d["as_at"], serde_json::json!("2021-06-01 20:30:00"));
        assert_eq!(
            d["enabled"],
            serde_json::json!(["top_games", "as_at"])
        );
    }
}
