
use base::{club, opts};
use boards_lib::board::{self, GameBoards, SnapshotBoard};
use boards_lib::cache::{BoardCache, CacheEntry};
use boards_lib::models::BoardRow;
use boards_lib::store::Store as _;
use test_env::at;

fn marker_boards(player_count: u32) -> Vec<GameBoards> {
    vec![GameBoards {
        game_id: 999,
        external_id: 10_999,
        name: "Marker".to_owned(),
        snapshots: vec![SnapshotBoard {
            at: at("2021-06-05 20:00:00"),
            play_count: 0,
            session_count: 0,
            detail: String::new(),
            rows: (1..=player_count)
                .map(|rank| BoardRow {
                    rank,
                    player_id: rank,
                    external_name: String::new(),
                    name: format!("player{rank}"),
                    rating: 30.0 - rank as f64,
                    play_count: 5,
                    victory_count: 0,
                    last_play: None,
                    league_ids: vec![1],
                })
                .collect(),
        }],
    }]
}

#[tokio::test]
async fn payload_has_the_three_tiers() -> anyhow::Result<()> {
    let store = club();
    let cache = BoardCache::new();
    let o = opts(&store, &[("top_games", "2")]).await;

    let payload = board::boards_response(&store, &cache, None, &o).await?;

    assert_eq!(payload.boards.len(), 2);
    let game = &payload.boards[0];
    assert_eq!((game.game_id, game.external_id), (1, 10_001));
    assert_eq!(game.name, "Terra Nova");

    // One snapshot by default: the board right after the last session.
    assert_eq!(game.snapshots.len(), 1);
    let snap = &game.snapshots[0];
    assert_eq!(snap.at, at("2021-06-05 20:00:00"));
    assert_eq!((snap.play_count, snap.session_count), (10, 5));
    assert!(snap.detail.contains("Alice"));

    // Ranked rows, rating descending.
    let ranks: Vec<(u32, u32)> = snap.rows.iter().map(|r| (r.rank, r.player_id)).collect();
    assert_eq!(ranks, vec![(1, 1), (2, 2)]);
    assert_eq!(snap.rows[0].play_count, 5);
    assert_eq!(snap.rows[0].victory_count, 4);

    // The option dictionary echoes the request state.
    assert_eq!(payload.options["num_games"], serde_json::json!(2));
    Ok(())
}

#[tokio::test]
async fn boards_are_captured_as_at_snapshot_time() -> anyhow::Result<()> {
    let store = club();

    // Two snapshots back, the board must show the ratings as of June 4th.
    let rows = store
        .board(1, None, Some(at("2021-06-04 20:00:00")), Default::default())
        .await?;
    assert_eq!(rows[0].rating, 27.0);
    assert_eq!(rows[0].play_count, 4);
    Ok(())
}

#[tokio::test]
async fn tied_ratings_share_a_rank() -> anyhow::Result<()> {
    let store = test_env::MemStore::new()
        .league(1, "Monday Night")
        .player(1, "Alice", &[1])
        .player(2, "Bob", &[1])
        .player(3, "Carol", &[1])
        .game(1, "Terra Nova")
        .session(
            1,
            1,
            1,
            "2021-06-01 20:00:00",
            &[(1, 25.0, true), (2, 25.0, false), (3, 20.0, false)],
        );

    let rows = store.board(1, None, None, Default::default()).await?;
    let ranks: Vec<u32> = rows.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 1, 3]);
    Ok(())
}

#[tokio::test]
async fn narrowing_request_is_served_from_cache() -> anyhow::Result<()> {
    let store = club();
    let cache = BoardCache::new();

    let cached = opts(&store, &[("top_games", "10")]).await;
    cache.put(
        "sid".to_owned(),
        CacheEntry {
            options: cached,
            boards: marker_boards(3),
        },
    );

    // Narrower: the marker entry is reused as-is.
    let o = opts(&store, &[("top_games", "5")]).await;
    let payload = board::boards_response(&store, &cache, Some("sid"), &o).await?;
    assert_eq!(payload.boards[0].game_id, 999);

    // Wider: recollated from the store, and the entry replaced.
    let o = opts(&store, &[("top_games", "15")]).await;
    let payload = board::boards_response(&store, &cache, Some("sid"), &o).await?;
    assert_eq!(payload.boards[0].game_id, 1);
    assert_eq!(cache.get("sid").unwrap().boards[0].game_id, 1);
    Ok(())
}

#[tokio::test]
async fn cache_safe_changes_only_refilter_cached_rows() -> anyhow::Result<()> {
    let store = club();
    let cache = BoardCache::new();

    cache.put(
        "sid".to_owned(),
        CacheEntry {
            options: opts(&store, &[("top_games", "10")]).await,
            boards: marker_boards(8),
        },
    );

    // Player filters are cache safe: the cached raw rows are re-passed
    // through the post-filter only.
    let o = opts(&store, &[("top_games", "10"), ("num_players_top", "2")]).await;
    let payload = board::boards_response(&store, &cache, Some("sid"), &o).await?;
    assert_eq!(payload.boards[0].game_id, 999);
    assert_eq!(payload.boards[0].snapshots[0].rows.len(), 2);
    Ok(())
}

#[tokio::test]
async fn perspective_change_always_recomputes() -> anyhow::Result<()> {
    let store = club();
    let cache = BoardCache::new();

    cache.put(
        "sid".to_owned(),
        CacheEntry {
            options: opts(&store, &[("top_games", "10")]).await,
            boards: marker_boards(3),
        },
    );

    let o = opts(
        &store,
        &[("top_games", "10"), ("as_at", "2021-06-03 23:59:59")],
    )
    .await;
    let payload = board::boards_response(&store, &cache, Some("sid"), &o).await?;
    assert_ne!(payload.boards[0].game_id, 999);
    Ok(())
}

#[tokio::test]
async fn no_cache_key_means_no_cache_participation() -> anyhow::Result<()> {
    let store = club();
    let cache = BoardCache::new();

    let o = opts(&store, &[("top_games", "2")]).await;
    board::boards_response(&store, &cache, None, &o).await?;
    assert!(cache.get("sid").is_none());
    Ok(())
}

#[tokio::test]
async fn titles_describe_the_active_filters() -> anyhow::Result<()> {
    let store = club();
    let cache = BoardCache::new();

    let o = opts(
        &store,
        &[
            ("top_games", "3"),
            ("game_leagues_any", "1,2"),
            ("as_at", "2021-06-05 20:00:00"),
            ("compare_with", "2"),
        ],
    )
    .await;
    let payload = board::boards_response(&store, &cache, None, &o).await?;

    assert_eq!(
        payload.title,
        "Top 3 Leaderboards for any of the leagues Monday Night, Weekend"
    );
    assert_eq!(
        payload.subtitle,
        "as at 2021-06-05 20:00:00<br>compared up to with 2 prior leaderboards"
    );
    Ok(())
}

#[tokio::test]
async fn evolution_produces_one_board_per_snapshot() -> anyhow::Result<()> {
    let store = club();
    let cache = BoardCache::new();

    let o = opts(&store, &[("games_ex", "1"), ("compare_with", "2")]).await;
    let payload = board::boards_response(&store, &cache, None, &o).await?;

    assert_eq!(payload.boards.len(), 1);
    let snaps = &payload.boards[0].snapshots;
    assert_eq!(snaps.len(), 3);
    // Newest first, and the historical boards carry the historical ratings.
    assert_eq!(snaps[0].at, at("2021-06-05 20:00:00"));
    assert_eq!(snaps[2].at, at("2021-06-03 20:00:00"));
    assert_eq!(snaps[2].rows[0].rating, 26.5);
    assert_eq!((snaps[2].play_count, snaps[2].session_count), (6, 3));
    Ok(())
}
