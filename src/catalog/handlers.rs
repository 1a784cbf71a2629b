//! Catalog route handlers.

use std::sync::LazyLock;

use axum::extract::{Path, State};
use axum::Json;

use crate::catalog::models::Game;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::{get_logger, Fields, Logger};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| get_logger(module_path!()));

/// Variant name of a store error, for the `error_type` log field.
fn error_type(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Configuration(_) => "Configuration",
        sqlx::Error::Database(_) => "Database",
        sqlx::Error::Io(_) => "Io",
        sqlx::Error::RowNotFound => "RowNotFound",
        sqlx::Error::ColumnDecode { .. } => "ColumnDecode",
        sqlx::Error::Decode(_) => "Decode",
        sqlx::Error::PoolTimedOut => "PoolTimedOut",
        sqlx::Error::PoolClosed => "PoolClosed",
        _ => "Other",
    }
}

pub async fn list_games(State(state): State<AppState>) -> Result<Json<Vec<Game>>, ApiError> {
    match state.catalog.list_games().await {
        Ok(games) => {
            LOGGER.info(
                format!("Retrieved {} games", games.len()),
                Fields::new().with("game_count", games.len()),
            );
            Ok(Json(games))
        }
        Err(err) => {
            LOGGER.error(
                format!("Error retrieving games: {err}"),
                Fields::new().with("error_type", error_type(&err)),
                Some(&err),
            );
            Err(ApiError::Internal("Failed to retrieve games"))
        }
    }
}

/// `id` is taken as text so that a non-numeric id is reported like any
/// other missing game.
pub async fn get_game(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Game>, ApiError> {
    let Ok(id) = raw_id.parse::<i64>() else {
        LOGGER.warning(
            format!("Game not found: {raw_id}"),
            Fields::new().with("game_id", &raw_id),
        );
        return Err(ApiError::NotFound("Game not found"));
    };

    match state.catalog.get_game(id).await {
        Ok(Some(game)) => {
            LOGGER.info(
                format!("Retrieved game: {}", game.title),
                Fields::new()
                    .with("game_id", id)
                    .with("game_title", &game.title),
            );
            Ok(Json(game))
        }
        Ok(None) => {
            LOGGER.warning(
                format!("Game not found: {id}"),
                Fields::new().with("game_id", id),
            );
            Err(ApiError::NotFound("Game not found"))
        }
        Err(err) => {
            LOGGER.error(
                format!("Error retrieving game {id}: {err}"),
                Fields::new()
                    .with("game_id", id)
                    .with("error_type", error_type(&err)),
                Some(&err),
            );
            Err(ApiError::Internal("Failed to retrieve game"))
        }
    }
}
