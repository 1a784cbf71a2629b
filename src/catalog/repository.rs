//! SQLite-backed catalog queries.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::catalog::models::{Game, GameRow};
use crate::config::DatabaseConfig;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS publishers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS games (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        star_rating REAL,
        publisher_id INTEGER REFERENCES publishers(id),
        category_id INTEGER REFERENCES categories(id)
    )
    "#,
];

const SELECT_GAMES: &str = r#"
    SELECT g.id, g.title, g.description, g.star_rating,
           p.id AS publisher_id, p.name AS publisher_name,
           c.id AS category_id, c.name AS category_name
    FROM games g
    LEFT OUTER JOIN publishers p ON g.publisher_id = p.id
    LEFT OUTER JOIN categories c ON g.category_id = c.id
"#;

/// (publisher, category, title, description, star rating)
const SAMPLE_GAMES: [(&str, &str, &str, &str, f64); 4] = [
    (
        "Tailspin Studios",
        "Strategy",
        "Orbit Tycoon",
        "Build a logistics empire between moons.",
        4.6,
    ),
    (
        "Tailspin Studios",
        "Puzzle",
        "Gear Garden",
        "Grow machines from cogs and sunlight.",
        4.1,
    ),
    (
        "Northwind Games",
        "Party",
        "Pillow Fort Royale",
        "Last fort standing wins the living room.",
        3.9,
    ),
    (
        "Northwind Games",
        "Strategy",
        "Harbor Lights",
        "Guide ships home through the fog.",
        4.3,
    ),
];

/// Read access to games with their publisher and category.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Open a pool for `config.url`.
    ///
    /// In-memory databases exist per connection, so they are pinned to a
    /// single long-lived connection.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options = if config.url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };
        let pool = options.connect(&config.url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn list_games(&self) -> Result<Vec<Game>, sqlx::Error> {
        let rows = sqlx::query_as::<_, GameRow>(&format!("{SELECT_GAMES} ORDER BY g.id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Game::from).collect())
    }

    pub async fn get_game(&self, id: i64) -> Result<Option<Game>, sqlx::Error> {
        let row = sqlx::query_as::<_, GameRow>(&format!("{SELECT_GAMES} WHERE g.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Game::from))
    }

    /// Insert a publisher or return the id of the existing one.
    pub async fn upsert_publisher(&self, name: &str) -> Result<i64, sqlx::Error> {
        self.upsert_lookup("publishers", name).await
    }

    /// Insert a category or return the id of the existing one.
    pub async fn upsert_category(&self, name: &str) -> Result<i64, sqlx::Error> {
        self.upsert_lookup("categories", name).await
    }

    async fn upsert_lookup(&self, table: &'static str, name: &str) -> Result<i64, sqlx::Error> {
        sqlx::query(&format!("INSERT OR IGNORE INTO {table} (name) VALUES (?)"))
            .bind(name)
            .execute(&self.pool)
            .await?;
        sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE name = ?"))
            .bind(name)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn insert_game(
        &self,
        title: &str,
        description: &str,
        star_rating: Option<f64>,
        publisher_id: Option<i64>,
        category_id: Option<i64>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO games (title, description, star_rating, publisher_id, category_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(title)
        .bind(description)
        .bind(star_rating)
        .bind(publisher_id)
        .bind(category_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Populate an empty catalog with sample games. Returns how many were
    /// inserted (0 when games already exist).
    pub async fn seed_sample_data(&self) -> Result<usize, sqlx::Error> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM games")
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        for (publisher, category, title, description, rating) in SAMPLE_GAMES {
            let publisher_id = self.upsert_publisher(publisher).await?;
            let category_id = self.upsert_category(category).await?;
            self.insert_game(title, description, Some(rating), Some(publisher_id), Some(category_id))
                .await?;
        }
        Ok(SAMPLE_GAMES.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_repo() -> CatalogRepository {
        let config = DatabaseConfig {
            url: "sqlite::memory:".into(),
            ..DatabaseConfig::default()
        };
        let repo = CatalogRepository::connect(&config).await.unwrap();
        repo.init_schema().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let repo = memory_repo().await;
        assert!(repo.list_games().await.unwrap().is_empty());
        assert!(repo.get_game(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_outer_joins_keep_games_without_lookups() {
        let repo = memory_repo().await;
        let publisher = repo.upsert_publisher("Tailspin Studios").await.unwrap();
        let with = repo
            .insert_game("Orbit Tycoon", "Space", Some(4.6), Some(publisher), None)
            .await
            .unwrap();
        let without = repo
            .insert_game("Loose Game", "No lookups", None, None, None)
            .await
            .unwrap();

        let games = repo.list_games().await.unwrap();
        assert_eq!(games.len(), 2);

        let first = repo.get_game(with).await.unwrap().unwrap();
        assert_eq!(first.publisher.unwrap().name, "Tailspin Studios");
        assert!(first.category.is_none());

        let second = repo.get_game(without).await.unwrap().unwrap();
        assert!(second.publisher.is_none());
        assert!(second.star_rating.is_none());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let repo = memory_repo().await;
        assert_eq!(repo.seed_sample_data().await.unwrap(), SAMPLE_GAMES.len());
        assert_eq!(repo.seed_sample_data().await.unwrap(), 0);

        let games = repo.list_games().await.unwrap();
        assert_eq!(games.len(), SAMPLE_GAMES.len());
        assert!(games.iter().all(|g| g.publisher.is_some() && g.category.is_some()));
    }

    #[tokio::test]
    async fn test_upsert_returns_existing_id() {
        let repo = memory_repo().await;
        let a = repo.upsert_category("Puzzle").await.unwrap();
        let b = repo.upsert_category("Puzzle").await.unwrap();
        assert_eq!(a, b);
    }
}
