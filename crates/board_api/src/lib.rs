//! The library of the club leaderboards API server. See the `boards_lib` crate
//! for the core logic.

mod env;
mod error;
mod http;

pub use env::{env, init_env};
pub use error::{ApiErrorKind, ApiErrorResponse, ApiResult, ApiResultExt};
pub use http::{api_route, json, not_found};
