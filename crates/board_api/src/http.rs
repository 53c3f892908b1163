//! Module used to serve the leaderboard routes.

use std::collections::BTreeMap;

use actix_web::web::Data;
use actix_web::{HttpRequest, HttpResponse, Responder, Scope, web};
use boards_lib::board;
use boards_lib::cache::BoardCache;
use boards_lib::options::{OptionSet, SessionDefaults};
use boards_lib::sql::MySqlStore;
use serde::Serialize;

use crate::{ApiErrorKind, ApiResult, ApiResultExt as _};

/// Converts the provided body to a `200 OK` JSON response.
pub fn json<T: Serialize, E>(obj: T) -> Result<HttpResponse, E> {
    Ok(HttpResponse::Ok().json(obj))
}

pub fn api_route() -> Scope {
    web::scope("")
        .route("/boards", web::get().to(boards_get))
        .route("/boards", web::post().to(boards_post))
}

/// The actix route handler for the Not Found response.
pub async fn not_found() -> ApiResult<&'static str> {
    Err(ApiErrorKind::EndpointNotFound)
}

async fn boards_get(
    req: HttpRequest,
    web::Query(params): web::Query<BTreeMap<String, String>>,
    store: Data<MySqlStore>,
    cache: Data<BoardCache>,
) -> ApiResult<impl Responder> {
    serve_boards(&req, params, store.get_ref(), cache.get_ref()).await
}

async fn boards_post(
    req: HttpRequest,
    web::Form(params): web::Form<BTreeMap<String, String>>,
    store: Data<MySqlStore>,
    cache: Data<BoardCache>,
) -> ApiResult<impl Responder> {
    serve_boards(&req, params, store.get_ref(), cache.get_ref()).await
}

/// The leaderboards provider.
///
/// The option surface is the flat parameter mapping (querystring or form
/// body); the session-preferred league comes from the `league` cookie and the
/// cache key from the `board_sid` cookie. Without one, the request doesn't
/// participate in caching.
async fn serve_boards(
    req: &HttpRequest,
    mut params: BTreeMap<String, String>,
    store: &MySqlStore,
    cache: &BoardCache,
) -> ApiResult<HttpResponse> {
    // The impact quick view presets a last-event comparison: the window length
    // doubles as the compare-back-to day count.
    if let Some(days) = params.remove("impact") {
        let days = if days.bytes().all(|b| b.is_ascii_digit()) && !days.is_empty() {
            days
        } else {
            "1".to_owned()
        };
        params.insert("num_days".to_owned(), days.clone());
        params.insert("compare_back_to".to_owned(), days);
    }

    let defaults = SessionDefaults {
        league: req.cookie("league").and_then(|c| c.value().parse().ok()),
    };

    let options = OptionSet::from_request(store, &defaults, &params)
        .await
        .with_api_err()?;

    let cache_key = req.cookie("board_sid").map(|c| c.value().to_owned());
    let payload = board::boards_response(store, cache, cache_key.as_deref(), &options)
        .await
        .with_api_err()?;

    json(payload)
}
