use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;

use crate::models::task::Task;
use crate::utils::errors::ServiceError;
use crate::utils::filter::contains_pattern;
use crate::utils::pagination::offset;
use crate::utils::patch::nullable_field;

pub const WORKER_PAGE_SIZE: u32 = 5;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Worker {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub position_id: Option<i64>,
    pub team_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkerResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub position: Option<String>,
    pub team: Option<String>,
}

impl WorkerResponse {
    pub async fn build(pool: &SqlitePool, worker: Worker) -> Result<WorkerResponse, ServiceError> {
        let position = match worker.position_id {
            Some(id) => sqlx::query_scalar("SELECT name FROM positions WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?,
            None => None,
        };
        let team = match worker.team_id {
            Some(id) => sqlx::query_scalar("SELECT name FROM teams WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?,
            None => None,
        };

        Ok(WorkerResponse {
            id: worker.id,
            username: worker.username,
            email: worker.email,
            first_name: worker.first_name,
            last_name: worker.last_name,
            position,
            team,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWorkerRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position_id: Option<i64>,
    pub team_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateWorkerRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Omitted leaves the field alone; an explicit `null` clears it.
    #[serde(default, deserialize_with = "nullable_field")]
    pub position_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable_field")]
    pub team_id: Option<Option<i64>>,
}

/// Everything the worker detail screen shows: the worker's open and completed
/// tasks plus, when they belong to a team, the team roster and its projects.
#[derive(Debug, Serialize, ToSchema)]
pub struct WorkerDetailResponse {
    pub worker: WorkerResponse,
    pub assigned_tasks: Vec<Task>,
    pub completed_tasks: Vec<Task>,
    pub team_members: Vec<String>,
    pub projects: Vec<String>,
}

const WORKER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, position_id, team_id";

impl Worker {
    /// Worker list: always ascending by username, optional case-insensitive
    /// username filter. An empty filter matches everything.
    pub async fn paged(
        pool: &SqlitePool,
        username_filter: &str,
        page: u32,
    ) -> Result<(Vec<Worker>, i64), ServiceError> {
        let pattern = contains_pattern(username_filter);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM workers WHERE LOWER(username) LIKE $1 ESCAPE '\\'",
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        let sql = format!(
            "SELECT {} FROM workers WHERE LOWER(username) LIKE $1 ESCAPE '\\'
             ORDER BY username LIMIT $2 OFFSET $3",
            WORKER_COLUMNS
        );
        let workers = sqlx::query_as::<_, Worker>(&sql)
            .bind(&pattern)
            .bind(WORKER_PAGE_SIZE as i64)
            .bind(offset(page, WORKER_PAGE_SIZE))
            .fetch_all(pool)
            .await?;

        Ok((workers, total))
    }

    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Worker, ServiceError> {
        let sql = format!("SELECT {} FROM workers WHERE id = $1", WORKER_COLUMNS);
        sqlx::query_as::<_, Worker>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Worker not found".to_string()))
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<Worker>, ServiceError> {
        let sql = format!("SELECT {} FROM workers WHERE username = $1", WORKER_COLUMNS);
        Ok(sqlx::query_as::<_, Worker>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn create(pool: &SqlitePool, req: &CreateWorkerRequest) -> Result<Worker, ServiceError> {
        let username = req.username.trim();
        if username.is_empty() {
            return Err(ServiceError::ValidationError("Username is required".to_string()));
        }
        if req.password.trim().is_empty() {
            return Err(ServiceError::ValidationError("Password is required".to_string()));
        }

        let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)?;

        let sql = format!(
            "INSERT INTO workers (username, email, first_name, last_name, password_hash, position_id, team_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            WORKER_COLUMNS
        );
        sqlx::query_as::<_, Worker>(&sql)
            .bind(username)
            .bind(req.email.clone().unwrap_or_default())
            .bind(req.first_name.clone().unwrap_or_default())
            .bind(req.last_name.clone().unwrap_or_default())
            .bind(&password_hash)
            .bind(req.position_id)
            .bind(req.team_id)
            .fetch_one(pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    ServiceError::ValidationError(format!("Username '{}' is already taken", username))
                }
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    ServiceError::ValidationError("Referenced position or team does not exist".to_string())
                }
                _ => e.into(),
            })
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        req: &UpdateWorkerRequest,
    ) -> Result<Worker, ServiceError> {
        Worker::find(pool, id).await?;

        if let Some(ref username) = req.username {
            if username.trim().is_empty() {
                return Err(ServiceError::ValidationError("Username is required".to_string()));
            }
        }

        let has_updates = req.username.is_some()
            || req.email.is_some()
            || req.first_name.is_some()
            || req.last_name.is_some()
            || req.position_id.is_some()
            || req.team_id.is_some();
        if !has_updates {
            return Worker::find(pool, id).await;
        }

        let mut builder = sqlx::QueryBuilder::new("UPDATE workers SET id = id");
        if let Some(ref username) = req.username {
            builder.push(", username = ").push_bind(username.trim().to_string());
        }
        if let Some(ref email) = req.email {
            builder.push(", email = ").push_bind(email);
        }
        if let Some(ref first_name) = req.first_name {
            builder.push(", first_name = ").push_bind(first_name);
        }
        if let Some(ref last_name) = req.last_name {
            builder.push(", last_name = ").push_bind(last_name);
        }
        // Binding the inner Option writes NULL when the request body carried
        // an explicit null.
        if let Some(position_id) = req.position_id {
            builder.push(", position_id = ").push_bind(position_id);
        }
        if let Some(team_id) = req.team_id {
            builder.push(", team_id = ").push_bind(team_id);
        }
        builder.push(" WHERE id = ").push_bind(id);

        builder.build().execute(pool).await.map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ServiceError::ValidationError("Username is already taken".to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ServiceError::ValidationError("Referenced position or team does not exist".to_string())
            }
            _ => e.into(),
        })?;

        Worker::find(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM workers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Worker not found".to_string()));
        }
        Ok(())
    }

    pub async fn detail(pool: &SqlitePool, id: i64) -> Result<WorkerDetailResponse, ServiceError> {
        let worker = Worker::find(pool, id).await?;
        let team_id = worker.team_id;

        let assigned_tasks = Worker::tasks_by_completion(pool, id, false).await?;
        let completed_tasks = Worker::tasks_by_completion(pool, id, true).await?;

        let (team_members, projects) = match team_id {
            Some(team_id) => {
                let members: Vec<String> = sqlx::query_scalar(
                    "SELECT username FROM workers WHERE team_id = $1 ORDER BY username",
                )
                .bind(team_id)
                .fetch_all(pool)
                .await?;

                let projects: Vec<String> = sqlx::query_scalar(
                    "SELECT p.name FROM projects p
                     JOIN project_teams pt ON p.id = pt.project_id
                     WHERE pt.team_id = $1
                     ORDER BY p.name",
                )
                .bind(team_id)
                .fetch_all(pool)
                .await?;

                (members, projects)
            }
            None => (Vec::new(), Vec::new()),
        };

        Ok(WorkerDetailResponse {
            worker: WorkerResponse::build(pool, worker).await?,
            assigned_tasks,
            completed_tasks,
            team_members,
            projects,
        })
    }

    async fn tasks_by_completion(
        pool: &SqlitePool,
        worker_id: i64,
        completed: bool,
    ) -> Result<Vec<Task>, ServiceError> {
        let sql = "SELECT t.id, t.name, t.description, t.deadline, t.is_completed, t.priority,
                          t.task_type_id, t.project_id
                   FROM tasks t
                   JOIN task_assignees ta ON t.id = ta.task_id
                   WHERE ta.worker_id = $1 AND t.is_completed = $2
                   ORDER BY t.id";
        Ok(sqlx::query_as::<_, Task>(sql)
            .bind(worker_id)
            .bind(completed)
            .fetch_all(pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_db;
    use crate::models::catalog;
    use crate::models::task::{CreateTaskRequest, Task};
    use chrono::NaiveDate;

    async fn seed_worker(pool: &SqlitePool, username: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO workers (username, password_hash) VALUES ($1, 'x') RETURNING id",
        )
        .bind(username)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[actix_web::test]
    async fn list_is_ordered_by_username_regardless_of_filter() {
        let db = test_db().await;
        for name in ["worker_c", "worker_a", "worker_b", "other"] {
            seed_worker(&db.pool, name).await;
        }

        let (all, total) = Worker::paged(&db.pool, "", 1).await.unwrap();
        assert_eq!(total, 4);
        let names: Vec<&str> = all.iter().map(|w| w.username.as_str()).collect();
        assert_eq!(names, vec!["other", "worker_a", "worker_b", "worker_c"]);

        let (filtered, total) = Worker::paged(&db.pool, "WORKER", 1).await.unwrap();
        assert_eq!(total, 3);
        let names: Vec<&str> = filtered.iter().map(|w| w.username.as_str()).collect();
        assert_eq!(names, vec!["worker_a", "worker_b", "worker_c"]);
    }

    #[actix_web::test]
    async fn list_pages_are_five_workers_long() {
        let db = test_db().await;
        for i in 0..6 {
            seed_worker(&db.pool, &format!("worker_{}", i)).await;
        }

        let (page1, total) = Worker::paged(&db.pool, "", 1).await.unwrap();
        assert_eq!(total, 6);
        assert_eq!(page1.len(), 5);
        assert_eq!(page1[0].username, "worker_0");

        let (page2, _) = Worker::paged(&db.pool, "", 2).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].username, "worker_5");
    }

    #[actix_web::test]
    async fn filter_wildcards_match_literally() {
        let db = test_db().await;
        seed_worker(&db.pool, "dev_ops").await;
        seed_worker(&db.pool, "devxops").await;

        let (found, total) = Worker::paged(&db.pool, "dev_", 1).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].username, "dev_ops");
    }

    #[actix_web::test]
    async fn explicit_null_clears_the_team() {
        let db = test_db().await;
        let worker_id = seed_worker(&db.pool, "jdoe").await;
        let team = catalog::create_team(
            &db.pool,
            &catalog::CreateTeamRequest {
                name: "Dev Team".to_string(),
                members: Some(vec![worker_id]),
            },
        )
        .await
        .unwrap();

        // An omitted field leaves the team in place.
        let update: UpdateWorkerRequest =
            serde_json::from_str(r#"{"first_name": "Jane"}"#).unwrap();
        let worker = Worker::update(&db.pool, worker_id, &update).await.unwrap();
        assert_eq!(worker.team_id, Some(team.id));

        // An explicit null clears it.
        let update: UpdateWorkerRequest =
            serde_json::from_str(r#"{"team_id": null}"#).unwrap();
        let worker = Worker::update(&db.pool, worker_id, &update).await.unwrap();
        assert_eq!(worker.team_id, None);
    }

    #[actix_web::test]
    async fn duplicate_username_is_a_validation_error() {
        let db = test_db().await;
        seed_worker(&db.pool, "jdoe").await;

        let err = Worker::create(
            &db.pool,
            &CreateWorkerRequest {
                username: "jdoe".to_string(),
                password: "pass1234".to_string(),
                email: None,
                first_name: None,
                last_name: None,
                position_id: None,
                team_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[actix_web::test]
    async fn detail_aggregates_tasks_team_and_projects() {
        let db = test_db().await;

        // Position "Developer", team "Dev Team", worker "jdoe", task "Fix bug".
        let position = catalog::create::<catalog::Position>(&db.pool, "Developer")
            .await
            .unwrap();
        let worker_id = seed_worker(&db.pool, "jdoe").await;
        sqlx::query("UPDATE workers SET position_id = $1 WHERE id = $2")
            .bind(position.id)
            .bind(worker_id)
            .execute(&db.pool)
            .await
            .unwrap();

        let team = catalog::create_team(
            &db.pool,
            &catalog::CreateTeamRequest {
                name: "Dev Team".to_string(),
                members: Some(vec![worker_id]),
            },
        )
        .await
        .unwrap();

        catalog::Project::create(
            &db.pool,
            &catalog::CreateProjectRequest {
                name: "Bug Tracker".to_string(),
                description: None,
                teams: Some(vec![team.id]),
            },
        )
        .await
        .unwrap();

        Task::create(
            &db.pool,
            &CreateTaskRequest {
                name: "Fix bug".to_string(),
                description: None,
                deadline: NaiveDate::from_ymd_opt(2024, 7, 21).unwrap(),
                priority: "High".to_string(),
                task_type_id: None,
                project_id: None,
                assignees: Some(vec![worker_id]),
                tags: None,
            },
        )
        .await
        .unwrap();

        let detail = Worker::detail(&db.pool, worker_id).await.unwrap();
        assert_eq!(detail.worker.position.as_deref(), Some("Developer"));
        assert_eq!(detail.worker.team.as_deref(), Some("Dev Team"));
        assert_eq!(detail.assigned_tasks.len(), 1);
        assert_eq!(detail.assigned_tasks[0].name, "Fix bug");
        assert!(detail.completed_tasks.is_empty());
        assert_eq!(detail.team_members, vec!["jdoe"]);
        assert_eq!(detail.projects, vec!["Bug Tracker"]);
    }

    #[actix_web::test]
    async fn detail_without_team_has_no_members_or_projects() {
        let db = test_db().await;
        let worker_id = seed_worker(&db.pool, "solo").await;

        let detail = Worker::detail(&db.pool, worker_id).await.unwrap();
        assert_eq!(detail.worker.team, None);
        assert!(detail.team_members.is_empty());
        assert!(detail.projects.is_empty());
    }

    #[actix_web::test]
    async fn missing_worker_is_not_found() {
        let db = test_db().await;
        let err = Worker::find(&db.pool, 7).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
