use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Schema applied at startup. All lifecycle rules live here: lookup
/// references are nulled when the referenced row goes away, many-to-many
/// link rows are removed with either endpoint.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS positions (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS task_types (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS tags (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS teams (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS project_teams (
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    team_id    INTEGER NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    PRIMARY KEY (project_id, team_id)
);

CREATE TABLE IF NOT EXISTS workers (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL DEFAULT '',
    first_name    TEXT NOT NULL DEFAULT '',
    last_name     TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,
    position_id   INTEGER REFERENCES positions(id) ON DELETE SET NULL,
    team_id       INTEGER REFERENCES teams(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,
    description  TEXT NOT NULL DEFAULT '',
    deadline     TEXT NOT NULL,
    is_completed INTEGER NOT NULL DEFAULT 0,
    priority     TEXT NOT NULL,
    task_type_id INTEGER REFERENCES task_types(id) ON DELETE SET NULL,
    project_id   INTEGER REFERENCES projects(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS task_assignees (
    task_id   INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    worker_id INTEGER NOT NULL REFERENCES workers(id) ON DELETE CASCADE,
    PRIMARY KEY (task_id, worker_id)
);

CREATE TABLE IF NOT EXISTS task_tags (
    task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    tag_id  INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (task_id, tag_id)
);
"#;

pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        log::info!("Connecting to database...");

        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid DATABASE_URL")?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database exists per connection, so the pool must not
        // open a second one.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to the database")?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to apply database schema")?;

        log::info!("Database connection established");

        Ok(Database { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Failed to execute health check query")?;

        if result == 1 {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Database health check failed"))
        }
    }

    /// Aggregate counts shown on the home screen.
    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let row: (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM tasks),
                (SELECT COUNT(*) FROM workers),
                (SELECT COUNT(*) FROM positions),
                (SELECT COUNT(*) FROM projects),
                (SELECT COUNT(*) FROM tasks WHERE is_completed = 1)
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to get database statistics")?;

        let (tasks, workers, positions, projects, completed_tasks) = row;

        Ok(DatabaseStats {
            tasks,
            workers,
            positions,
            projects,
            completed_tasks,
            incomplete_tasks: tasks - completed_tasks,
        })
    }

    /// Create the initial worker when the table is empty, so a fresh
    /// deployment has an account to log in with.
    pub async fn bootstrap_worker(&self, username: &str, password: &str) -> Result<()> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workers")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count workers")?;

        if existing > 0 {
            return Ok(());
        }

        let password_hash =
            bcrypt::hash(password, bcrypt::DEFAULT_COST).context("Failed to hash password")?;

        sqlx::query("INSERT INTO workers (username, password_hash) VALUES ($1, $2)")
            .bind(username)
            .bind(&password_hash)
            .execute(&self.pool)
            .await
            .context("Failed to create bootstrap worker")?;

        log::info!("Created bootstrap worker: {}", username);
        Ok(())
    }
}

#[derive(Debug)]
pub struct DatabaseStats {
    pub tasks: i64,
    pub workers: i64,
    pub positions: i64,
    pub projects: i64,
    pub completed_tasks: i64,
    pub incomplete_tasks: i64,
}

impl DatabaseStats {
    pub fn log_stats(&self) {
        log::info!(
            "Database statistics: {} tasks ({} completed), {} workers, {} positions, {} projects",
            self.tasks,
            self.completed_tasks,
            self.workers,
            self.positions,
            self.projects
        );
    }
}

#[cfg(test)]
pub async fn test_db() -> Database {
    Database::new("sqlite::memory:")
        .await
        .expect("in-memory database")
}
