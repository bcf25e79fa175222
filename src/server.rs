//! `GET /search/{name}` over the imported games.

use crate::core;
use crate::db::Store;
use crate::lib::GameRecord;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use failure::Error;
use log::{debug, error, info};
use serde_derive::Serialize;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SearchResponse {
    #[serde(rename = "Game Name")]
    pub game_name: String,
    #[serde(rename = "Game Owners")]
    pub game_owners: i64,
    #[serde(rename = "MetaCritic Score")]
    pub meta_critic_score: i64,
    #[serde(rename = "Recommendations")]
    pub recommendations: i64,
    #[serde(rename = "Release Date")]
    pub release_date: String,
    #[serde(rename = "Required Age")]
    pub required_age: i64,
    #[serde(rename = "Systems")]
    pub systems: String,
    #[serde(rename = "Player Estimate")]
    pub player_estimate: i64,
}

impl From<GameRecord> for SearchResponse {
    fn from(game: GameRecord) -> SearchResponse {
        SearchResponse {
            game_name: game.name,
            game_owners: game.owner_count,
            meta_critic_score: game.meta_critic_score,
            recommendations: game.recommendations,
            release_date: game.release_date,
            required_age: game.required_age,
            systems: game.systems,
            player_estimate: game.player_estimate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Store failure for a single request.
pub struct LookupError(Error);

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: self.0.to_string() }),
        )
            .into_response()
    }
}

/// GET /search/:name
///
/// A miss answers 200 with an all-empty record, same as a hit.
async fn search(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SearchResponse>, LookupError> {
    let store = state.store.clone();
    let lookup = name.clone();
    let found = tokio::task::spawn_blocking(move || core::find_game(&store, &lookup))
        .await
        .map_err(|e| LookupError(failure::err_msg(format!("Lookup task failed: {}", e))))?;
    match found {
        Ok(Some(game)) => Ok(Json(game.into())),
        Ok(None) => {
            debug!("No game named {:?}", name);
            Ok(Json(GameRecord::default().into()))
        }
        Err(e) => {
            error!("Lookup of {:?} failed: {}", name, e);
            Err(LookupError(e))
        }
    }
}

pub fn router(store: Arc<Store>) -> Router {
    Router::new()
        .route("/search/:name", get(search))
        .with_state(AppState { store })
}

/// Serves until `shutdown` resolves. The store is dropped on return.
pub async fn serve(store: Arc<Store>, address: &str,
        shutdown: impl Future<Output = ()> + Send + 'static) -> Result<(), Error> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Server stopped");
    Ok(())
}
