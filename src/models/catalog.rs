use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;

use crate::utils::errors::ServiceError;

/// Simple named lookup tables (positions, task types, tags, teams) share one
/// CRUD implementation parameterized by this trait instead of a copy per
/// entity.
pub trait Catalog {
    const TABLE: &'static str;
    /// Label used in user-facing messages.
    const ENTITY: &'static str;
}

pub struct Position;
pub struct TaskType;
pub struct Tag;
pub struct Team;

impl Catalog for Position {
    const TABLE: &'static str = "positions";
    const ENTITY: &'static str = "Position";
}

impl Catalog for TaskType {
    const TABLE: &'static str = "task_types";
    const ENTITY: &'static str = "Task type";
}

impl Catalog for Tag {
    const TABLE: &'static str = "tags";
    const ENTITY: &'static str = "Tag";
}

impl Catalog for Team {
    const TABLE: &'static str = "teams";
    const ENTITY: &'static str = "Team";
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NameRequest {
    pub name: String,
}

fn required_name(name: &str, entity: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "{} name is required",
            entity
        )));
    }
    Ok(name.to_string())
}

pub async fn list<C: Catalog>(pool: &SqlitePool) -> Result<Vec<CatalogEntry>, ServiceError> {
    let sql = format!("SELECT id, name FROM {} ORDER BY name", C::TABLE);
    Ok(sqlx::query_as::<_, CatalogEntry>(&sql).fetch_all(pool).await?)
}

pub async fn find<C: Catalog>(pool: &SqlitePool, id: i64) -> Result<CatalogEntry, ServiceError> {
    let sql = format!("SELECT id, name FROM {} WHERE id = $1", C::TABLE);
    sqlx::query_as::<_, CatalogEntry>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("{} not found", C::ENTITY)))
}

pub async fn create<C: Catalog>(pool: &SqlitePool, name: &str) -> Result<CatalogEntry, ServiceError> {
    let name = required_name(name, C::ENTITY)?;

    let sql = format!("INSERT INTO {} (name) VALUES ($1) RETURNING id, name", C::TABLE);
    sqlx::query_as::<_, CatalogEntry>(&sql)
        .bind(&name)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => ServiceError::ValidationError(
                format!("{} '{}' already exists", C::ENTITY, name),
            ),
            _ => e.into(),
        })
}

pub async fn update<C: Catalog>(
    pool: &SqlitePool,
    id: i64,
    name: &str,
) -> Result<CatalogEntry, ServiceError> {
    let name = required_name(name, C::ENTITY)?;

    let sql = format!(
        "UPDATE {} SET name = $1 WHERE id = $2 RETURNING id, name",
        C::TABLE
    );
    sqlx::query_as::<_, CatalogEntry>(&sql)
        .bind(&name)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => ServiceError::ValidationError(
                format!("{} '{}' already exists", C::ENTITY, name),
            ),
            _ => ServiceError::from(e),
        })?
        .ok_or_else(|| ServiceError::NotFound(format!("{} not found", C::ENTITY)))
}

/// Deletes the row; dependent foreign keys are nulled by the schema, never
/// cascaded as deletions.
pub async fn delete<C: Catalog>(pool: &SqlitePool, id: i64) -> Result<(), ServiceError> {
    let sql = format!("DELETE FROM {} WHERE id = $1", C::TABLE);
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound(format!("{} not found", C::ENTITY)));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Projects

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    /// Team ids linked to the new project.
    pub teams: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub teams: Vec<String>,
}

impl Project {
    pub async fn create(
        pool: &SqlitePool,
        req: &CreateProjectRequest,
    ) -> Result<ProjectResponse, ServiceError> {
        let name = required_name(&req.name, "Project")?;
        let description = req.description.clone().unwrap_or_default();
        let team_ids = req.teams.clone().unwrap_or_default();

        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            "INSERT INTO projects (name, description) VALUES ($1, $2)
             RETURNING id, name, description",
        )
        .bind(&name)
        .bind(&description)
        .fetch_one(&mut *tx)
        .await?;

        let mut teams = Vec::new();
        for team_id in &team_ids {
            let team = sqlx::query_as::<_, CatalogEntry>("SELECT id, name FROM teams WHERE id = $1")
                .bind(team_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!("Team {} not found", team_id))
                })?;

            sqlx::query("INSERT INTO project_teams (project_id, team_id) VALUES ($1, $2)")
                .bind(project.id)
                .bind(team.id)
                .execute(&mut *tx)
                .await?;
            teams.push(team.name);
        }

        tx.commit().await?;

        Ok(ProjectResponse {
            id: project.id,
            name: project.name,
            description: project.description,
            teams,
        })
    }
}

// ---------------------------------------------------------------------------
// Teams

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTeamRequest {
    pub name: String,
    /// Worker ids to move into the new team.
    pub members: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeamResponse {
    pub id: i64,
    pub name: String,
    pub members: Vec<String>,
}

/// Creates a team and moves each listed worker into it. The insert and every
/// member reassignment commit together or not at all.
pub async fn create_team(
    pool: &SqlitePool,
    req: &CreateTeamRequest,
) -> Result<TeamResponse, ServiceError> {
    let name = required_name(&req.name, "Team")?;
    let member_ids = req.members.clone().unwrap_or_default();

    let mut tx = pool.begin().await?;

    let team = sqlx::query_as::<_, CatalogEntry>(
        "INSERT INTO teams (name) VALUES ($1) RETURNING id, name",
    )
    .bind(&name)
    .fetch_one(&mut *tx)
    .await?;

    for worker_id in &member_ids {
        let updated = sqlx::query("UPDATE workers SET team_id = $1 WHERE id = $2")
            .bind(team.id)
            .bind(worker_id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(ServiceError::ValidationError(format!(
                "Worker {} not found",
                worker_id
            )));
        }
    }

    let members: Vec<String> =
        sqlx::query_scalar("SELECT username FROM workers WHERE team_id = $1 ORDER BY username")
            .bind(team.id)
            .fetch_all(&mut *tx)
            .await?;

    tx.commit().await?;

    Ok(TeamResponse {
        id: team.id,
        name: team.name,
        members,
    })
}

/// Usernames of workers holding a position, shown before the position is
/// deleted.
pub async fn workers_with_position(
    pool: &SqlitePool,
    position_id: i64,
) -> Result<Vec<String>, ServiceError> {
    Ok(sqlx::query_scalar(
        "SELECT username FROM workers WHERE position_id = $1 ORDER BY username",
    )
    .bind(position_id)
    .fetch_all(pool)
    .await?)
}
