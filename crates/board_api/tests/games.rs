
use base::{club, game_ids, opts};
use boards_lib::games::select_games;
use test_env::MemStore;

#[tokio::test]
async fn popularity_order_by_default() -> anyhow::Result<()> {
    let store = club();
    let o = opts(&store, &[("min_plays", "1")]).await;

    let games = select_games(&store, &o).await?;
    assert_eq!(game_ids(&games), vec![1, 2]);
    assert_eq!(games[0].play_count, 10);
    assert_eq!(games[0].session_count, 5);
    Ok(())
}

#[tokio::test]
async fn top_games_truncates_after_ordering() -> anyhow::Result<()> {
    let store = club();
    let o = opts(&store, &[("top_games", "1")]).await;

    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![1]);
    Ok(())
}

#[tokio::test]
async fn filters_shrink_the_pool_before_truncation() -> anyhow::Result<()> {
    // League 2 excludes the popular game; the single slot must go to game 2,
    // never to game 1 re-admitted post-truncation.
    let store = club();
    let o = opts(&store, &[("game_leagues_any", "2"), ("top_games", "1")]).await;

    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![2]);
    Ok(())
}

#[tokio::test]
async fn latest_games_orders_by_recency() -> anyhow::Result<()> {
    let store = club();
    let o = opts(&store, &[("latest_games", "2")]).await;

    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![2, 1]);
    Ok(())
}

#[tokio::test]
async fn exclusive_list_restricts_population() -> anyhow::Result<()> {
    let store = club();
    let o = opts(&store, &[("games_ex", "2")]).await;

    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![2]);
    Ok(())
}

#[tokio::test]
async fn inclusive_list_survives_truncation() -> anyhow::Result<()> {
    let store = club();
    let o = opts(&store, &[("top_games", "1"), ("games_in", "2")]).await;

    // Game 2 would be truncated away; the inclusive list unions it back in,
    // re-sorted under the popularity ordering.
    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![1, 2]);
    Ok(())
}

#[tokio::test]
async fn last_event_window_admits_recent_games_only() -> anyhow::Result<()> {
    let store = club();

    // The most recent session is on June 6th; a 1-day window starts at that
    // day's midnight and only game 2 has a session in it.
    let o = opts(&store, &[("num_days", "1")]).await;
    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![2]);

    // A 2-day window reaches back to June 5th and catches game 1 too.
    let o = opts(&store, &[("num_days", "2")]).await;
    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![1, 2]);
    Ok(())
}

#[tokio::test]
async fn last_event_window_respects_perspective() -> anyhow::Result<()> {
    let store = club();

    // As at June 5th, the latest session is game 1's; game 2's June 6th
    // session is beyond the perspective bound.
    let o = opts(
        &store,
        &[("num_days", "1"), ("as_at", "2021-06-05 23:59:59")],
    )
    .await;
    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![1]);
    Ok(())
}

#[tokio::test]
async fn changed_since_and_played_by_combine_as_or() -> anyhow::Result<()> {
    let store = club();

    let o = opts(&store, &[("changed_since", "2021-06-06 00:00:00")]).await;
    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![2]);

    // Game 1 didn't change since then but Alice played it: one qualifying
    // reason admits.
    let o = opts(
        &store,
        &[
            ("changed_since", "2021-06-06 00:00:00"),
            ("game_players_any", "1"),
        ],
    )
    .await;
    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![1, 2]);
    Ok(())
}

#[tokio::test]
async fn played_by_all_requires_every_player() -> anyhow::Result<()> {
    let store = club();

    let o = opts(&store, &[("game_players_all", "1,2")]).await;
    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![1]);

    // No game was played by both Alice and Carol.
    let o = opts(&store, &[("game_players_all", "1,3")]).await;
    assert!(select_games(&store, &o).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn league_all_mode_requires_membership_in_every_league() -> anyhow::Result<()> {
    // A dedicated fixture: game 2 is played in both leagues, game 1 only in
    // the first.
    let store = MemStore::new()
        .league(1, "Monday Night")
        .league(2, "Weekend")
        .player(1, "Alice", &[1])
        .player(2, "Bob", &[1, 2])
        .game(1, "Terra Nova")
        .session(1, 1, 1, "2021-06-01 20:00:00", &[(1, 25.0, true)])
        .game(2, "Deep Sea")
        .session(2, 2, 1, "2021-06-02 20:00:00", &[(2, 20.0, true)])
        .session(3, 2, 2, "2021-06-03 20:00:00", &[(2, 21.0, true)]);

    let o = opts(&store, &[("game_leagues_all", "1,2")]).await;
    assert_eq!(game_ids(&select_games(&store, &o).await?), vec![2]);
    Ok(())
}
