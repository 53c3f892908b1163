//! The leaderboard post-filter: reduces a full ranked board to the rows the
//! options ask to display, preserving relative rank order.

use crate::models::BoardRow;
use crate::options::{OptionId, OptionSet};

/// Applies the player filters to a full ranked board.
///
/// Rows are evaluated in list order, rank ascending:
///
/// 1. with an exclusive player list, a row is admitted iff its player is
///    listed, and no other rule applies;
/// 2. a top-N slice admits unconditionally until full;
/// 3. a row whose player passes the inclusion criteria is admitted;
/// 4. otherwise a row within the configured rank distance of a nominated
///    player is admitted as context.
///
/// Admission is idempotent per row: a row that several rules admit appears
/// once. With no player filter enabled the board is returned unmodified.
/// Applying the filter to its own output changes nothing.
pub fn apply_player_filters(o: &OptionSet, board: &[BoardRow]) -> Vec<BoardRow> {
    if !o.any_player_filters() {
        return board.to_vec();
    }

    let mut out: Vec<BoardRow> = Vec::new();

    for (i, row) in board.iter().enumerate() {
        // An exclusive player list overrides every other rule.
        if o.is_enabled(OptionId::PlayersEx) {
            if o.players.contains(&row.player_id) {
                out.push(row.clone());
            }
            continue;
        }

        if o.is_enabled(OptionId::NumPlayersTop) && (out.len() as u32) < o.num_players_top {
            out.push(row.clone());
            continue;
        }

        if o.player_passes(row.player_id, row.play_count, row.last_play, &row.league_ids) {
            out.push(row.clone());
            continue;
        }

        // Proximity to a nominated player wins inclusion as context. Ranks are
        // 1-based while the list is 0-based; the row of rank r sits at index
        // r-1, so the windows run over indices relative to i.
        let admit = (o.is_enabled(OptionId::NumPlayersAbove)
            && board
                .iter()
                .skip(i + 1)
                .take(o.num_players_above as usize)
                .any(|below| o.player_is_nominated(below.player_id)))
            || (o.is_enabled(OptionId::NumPlayersBelow)
                && board[i.saturating_sub(o.num_players_below as usize)..i]
                    .iter()
                    .any(|above| o.player_is_nominated(above.player_id)));

        if admit {
            out.push(row.clone());
        }
    }

    out
}
