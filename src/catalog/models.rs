//! Catalog data types.

use serde::{Deserialize, Serialize};

/// Publisher or category reference embedded in a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: i64,
    pub name: String,
}

/// A game as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub star_rating: Option<f64>,
    pub publisher: Option<Reference>,
    pub category: Option<Reference>,
}

/// Flat row produced by the outer-joined catalog query.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct GameRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub star_rating: Option<f64>,
    pub publisher_id: Option<i64>,
    pub publisher_name: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
}

fn reference(id: Option<i64>, name: Option<String>) -> Option<Reference> {
    match (id, name) {
        (Some(id), Some(name)) => Some(Reference { id, name }),
        _ => None,
    }
}

impl From<GameRow> for Game {
    fn from(row: GameRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            star_rating: row.star_rating,
            publisher: reference(row.publisher_id, row.publisher_name),
            category: reference(row.category_id, row.category_name),
        }
    }
}
