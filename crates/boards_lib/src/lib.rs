//! The core crate of the club leaderboards infrastructure.
//!
//! This crate turns the flat option surface of a leaderboard request into an
//! [`OptionSet`](options::OptionSet), selects the games and historical
//! snapshots to report on as lazy query plans, has a [`Store`](store::Store)
//! execute them, post-filters the ranked rows and assembles the nested
//! payload. The shared [`BoardCache`](cache::BoardCache) is consulted whenever
//! a previously computed result still covers the request.
//!
//! If you wish to see the crate of the server program itself, take a look at
//! the `board_api` package.

#![warn(missing_docs)]

pub mod board;
pub mod cache;
pub mod error;
pub mod filter;
pub mod games;
pub mod models;
pub mod options;
pub mod snapshots;
pub mod sql;
pub mod store;
pub mod time;

/// The MySQL/MariaDB pool type.
pub type MySqlPool = sqlx::MySqlPool;
