use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;

use crate::utils::errors::ServiceError;
use crate::utils::filter::contains_pattern;
use crate::utils::pagination::offset;
use crate::utils::patch::nullable_field;

pub const TASK_PAGE_SIZE: u32 = 5;
pub const COMPLETED_TASK_PAGE_SIZE: u32 = 10;

/// Fixed priority scale, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Urgent,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "Urgent",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    pub fn parse(value: &str) -> Result<Priority, ServiceError> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == value)
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Invalid priority '{}', expected one of Urgent, High, Medium, Low",
                    value
                ))
            })
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub deadline: NaiveDate,
    pub is_completed: bool,
    pub priority: String,
    pub task_type_id: Option<i64>,
    pub project_id: Option<i64>,
}

impl Task {
    /// Label used throughout list screens and delete summaries.
    pub fn display_label(&self) -> String {
        format!(
            "{} ({}, due {}) - {}",
            self.name,
            self.priority,
            self.deadline,
            if self.is_completed { "Completed" } else { "In Progress" }
        )
    }

    pub fn formatted_deadline(&self) -> String {
        self.deadline.format("%d-%m-%Y").to_string()
    }
}

/// Tasks with a deadline on or before this date get highlighted on the
/// assigned-task screen.
pub fn deadline_warning_date(today: NaiveDate) -> NaiveDate {
    today + Duration::days(3)
}

/// Share of completed tasks, rounded to whole percent; 0 when there are no
/// tasks at all.
pub fn completion_percentage(total: i64, completed: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (completed as f64 * 100.0 / total as f64).round() as i64
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub name: String,
    pub description: Option<String>,
    pub deadline: NaiveDate,
    pub priority: String,
    pub task_type_id: Option<i64>,
    pub project_id: Option<i64>,
    pub assignees: Option<Vec<i64>>,
    pub tags: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub is_completed: Option<bool>,
    pub priority: Option<String>,
    /// Omitted leaves the field alone; an explicit `null` clears it.
    #[serde(default, deserialize_with = "nullable_field")]
    pub task_type_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable_field")]
    pub project_id: Option<Option<i64>>,
    pub assignees: Option<Vec<i64>>,
    pub tags: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub deadline: NaiveDate,
    pub formatted_deadline: String,
    pub is_completed: bool,
    pub priority: String,
    pub label: String,
    pub task_type: Option<String>,
    pub project: Option<String>,
    pub tags: Vec<String>,
    pub assignees: Vec<String>,
}

impl TaskResponse {
    pub async fn build(pool: &SqlitePool, task: Task) -> Result<TaskResponse, ServiceError> {
        let task_type = match task.task_type_id {
            Some(id) => sqlx::query_scalar("SELECT name FROM task_types WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?,
            None => None,
        };

        let project = match task.project_id {
            Some(id) => sqlx::query_scalar("SELECT name FROM projects WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?,
            None => None,
        };

        let tags: Vec<String> = sqlx::query_scalar(
            "SELECT t.name FROM tags t
             JOIN task_tags tt ON t.id = tt.tag_id
             WHERE tt.task_id = $1
             ORDER BY t.name",
        )
        .bind(task.id)
        .fetch_all(pool)
        .await?;

        let assignees = Task::assignee_usernames(pool, task.id).await?;

        Ok(TaskResponse {
            formatted_deadline: task.formatted_deadline(),
            label: task.display_label(),
            id: task.id,
            name: task.name,
            description: task.description,
            deadline: task.deadline,
            is_completed: task.is_completed,
            priority: task.priority,
            task_type,
            project,
            tags,
            assignees,
        })
    }
}

const TASK_COLUMNS: &str =
    "id, name, description, deadline, is_completed, priority, task_type_id, project_id";

impl Task {
    /// Main task list: most recently created first, optional case-insensitive
    /// name filter. An empty filter matches everything.
    pub async fn paged(
        pool: &SqlitePool,
        name_filter: &str,
        page: u32,
    ) -> Result<(Vec<Task>, i64), ServiceError> {
        let pattern = contains_pattern(name_filter);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks WHERE LOWER(name) LIKE $1 ESCAPE '\\'",
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        let sql = format!(
            "SELECT {} FROM tasks WHERE LOWER(name) LIKE $1 ESCAPE '\\'
             ORDER BY id DESC LIMIT $2 OFFSET $3",
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(&pattern)
            .bind(TASK_PAGE_SIZE as i64)
            .bind(offset(page, TASK_PAGE_SIZE))
            .fetch_all(pool)
            .await?;

        Ok((tasks, total))
    }

    /// Completed tasks in store order.
    pub async fn completed_page(
        pool: &SqlitePool,
        page: u32,
    ) -> Result<(Vec<Task>, i64), ServiceError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE is_completed = 1")
            .fetch_one(pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM tasks WHERE is_completed = 1 LIMIT $1 OFFSET $2",
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(COMPLETED_TASK_PAGE_SIZE as i64)
            .bind(offset(page, COMPLETED_TASK_PAGE_SIZE))
            .fetch_all(pool)
            .await?;

        Ok((tasks, total))
    }

    /// Every task assigned to the worker, most recently created first.
    pub async fn assigned_to(pool: &SqlitePool, worker_id: i64) -> Result<Vec<Task>, ServiceError> {
        let sql = format!(
            "SELECT t.{} FROM tasks t
             JOIN task_assignees ta ON t.id = ta.task_id
             WHERE ta.worker_id = $1
             ORDER BY t.id DESC",
            TASK_COLUMNS.replace(", ", ", t.")
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(worker_id)
            .fetch_all(pool)
            .await?)
    }

    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Task, ServiceError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))
    }

    /// Overall completion percentage shown on the task list screen.
    pub async fn completed_percentage(pool: &SqlitePool) -> Result<i64, ServiceError> {
        let (total, completed): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_completed), 0) FROM tasks",
        )
        .fetch_one(pool)
        .await?;
        Ok(completion_percentage(total, completed))
    }

    pub async fn create(pool: &SqlitePool, req: &CreateTaskRequest) -> Result<Task, ServiceError> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError("Task name is required".to_string()));
        }
        let priority = Priority::parse(&req.priority)?;

        let mut tx = pool.begin().await?;

        let sql = format!(
            "INSERT INTO tasks (name, description, deadline, priority, task_type_id, project_id)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            TASK_COLUMNS
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(name)
            .bind(req.description.clone().unwrap_or_default())
            .bind(req.deadline)
            .bind(priority.as_str())
            .bind(req.task_type_id)
            .bind(req.project_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(reference_error)?;

        for worker_id in req.assignees.iter().flatten() {
            sqlx::query("INSERT INTO task_assignees (task_id, worker_id) VALUES ($1, $2)")
                .bind(task.id)
                .bind(worker_id)
                .execute(&mut *tx)
                .await
                .map_err(reference_error)?;
        }

        for tag_id in req.tags.iter().flatten() {
            sqlx::query("INSERT INTO task_tags (task_id, tag_id) VALUES ($1, $2)")
                .bind(task.id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .map_err(reference_error)?;
        }

        tx.commit().await?;
        Ok(task)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        req: &UpdateTaskRequest,
    ) -> Result<Task, ServiceError> {
        Task::find(pool, id).await?;

        if let Some(ref name) = req.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError("Task name is required".to_string()));
            }
        }
        if let Some(ref priority) = req.priority {
            Priority::parse(priority)?;
        }

        let mut tx = pool.begin().await?;

        let has_field_updates = req.name.is_some()
            || req.description.is_some()
            || req.deadline.is_some()
            || req.is_completed.is_some()
            || req.priority.is_some()
            || req.task_type_id.is_some()
            || req.project_id.is_some();

        if has_field_updates {
            let mut builder = sqlx::QueryBuilder::new("UPDATE tasks SET id = id");
            if let Some(ref name) = req.name {
                builder.push(", name = ").push_bind(name.trim().to_string());
            }
            if let Some(ref description) = req.description {
                builder.push(", description = ").push_bind(description);
            }
            if let Some(deadline) = req.deadline {
                builder.push(", deadline = ").push_bind(deadline);
            }
            if let Some(is_completed) = req.is_completed {
                builder.push(", is_completed = ").push_bind(is_completed);
            }
            if let Some(ref priority) = req.priority {
                builder.push(", priority = ").push_bind(priority);
            }
            // Binding the inner Option writes NULL when the request body
            // carried an explicit null.
            if let Some(task_type_id) = req.task_type_id {
                builder.push(", task_type_id = ").push_bind(task_type_id);
            }
            if let Some(project_id) = req.project_id {
                builder.push(", project_id = ").push_bind(project_id);
            }
            builder.push(" WHERE id = ").push_bind(id);

            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(reference_error)?;
        }

        if let Some(ref assignees) = req.assignees {
            sqlx::query("DELETE FROM task_assignees WHERE task_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for worker_id in assignees {
                sqlx::query("INSERT INTO task_assignees (task_id, worker_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(worker_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(reference_error)?;
            }
        }

        if let Some(ref tags) = req.tags {
            sqlx::query("DELETE FROM task_tags WHERE task_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for tag_id in tags {
                sqlx::query("INSERT INTO task_tags (task_id, tag_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(tag_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(reference_error)?;
            }
        }

        tx.commit().await?;
        Task::find(pool, id).await
    }

    /// Deletes the task and returns the usernames of the workers that were
    /// assigned to it. Assignment and tag rows go with the task.
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<Vec<String>, ServiceError> {
        let assignees = Task::assignee_usernames(pool, id).await?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Task not found".to_string()));
        }
        Ok(assignees)
    }

    pub async fn assignee_usernames(
        pool: &SqlitePool,
        task_id: i64,
    ) -> Result<Vec<String>, ServiceError> {
        Ok(sqlx::query_scalar(
            "SELECT w.username FROM workers w
             JOIN task_assignees ta ON w.id = ta.worker_id
             WHERE ta.task_id = $1
             ORDER BY w.username",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?)
    }

    /// Display labels of the tasks holding a task type, shown before the type
    /// is deleted.
    pub async fn with_task_type(
        pool: &SqlitePool,
        task_type_id: i64,
    ) -> Result<Vec<String>, ServiceError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE task_type_id = $1 ORDER BY id",
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(task_type_id)
            .fetch_all(pool)
            .await?;
        Ok(tasks.iter().map(Task::display_label).collect())
    }
}

fn reference_error(err: sqlx::Error) -> ServiceError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            ServiceError::ValidationError("Referenced record does not exist".to_string())
        }
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_db;

    fn sample_task(name: &str, priority: &str, completed: bool) -> Task {
        Task {
            id: 1,
            name: name.to_string(),
            description: String::new(),
            deadline: NaiveDate::from_ymd_opt(2024, 7, 21).unwrap(),
            is_completed: completed,
            priority: priority.to_string(),
            task_type_id: None,
            project_id: None,
        }
    }

    fn request(name: &str, priority: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            name: name.to_string(),
            description: None,
            deadline: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            priority: priority.to_string(),
            task_type_id: None,
            project_id: None,
            assignees: None,
            tags: None,
        }
    }

    #[test]
    fn display_label_tracks_completion_state() {
        let task = sample_task("Implement new feature", "High", false);
        assert_eq!(
            task.display_label(),
            "Implement new feature (High, due 2024-07-21) - In Progress"
        );

        let done = sample_task("Implement new feature", "High", true);
        assert_eq!(
            done.display_label(),
            "Implement new feature (High, due 2024-07-21) - Completed"
        );
    }

    #[test]
    fn formatted_deadline_is_day_month_year() {
        let task = sample_task("Submit report", "Medium", false);
        assert_eq!(task.formatted_deadline(), "21-07-2024");
    }

    #[test]
    fn completion_percentage_guards_empty_store() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(2, 1), 50);
        assert_eq!(completion_percentage(3, 1), 33);
        assert_eq!(completion_percentage(3, 2), 67);
    }

    #[test]
    fn warning_date_is_three_days_out() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 18).unwrap();
        assert_eq!(
            deadline_warning_date(today),
            NaiveDate::from_ymd_opt(2024, 7, 21).unwrap()
        );
    }

    #[test]
    fn priority_outside_enum_is_rejected() {
        assert!(Priority::parse("Urgent").is_ok());
        let err = Priority::parse("Critical").unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[actix_web::test]
    async fn list_is_most_recent_first_and_filterable() {
        let db = test_db().await;
        Task::create(&db.pool, &request("Test Task", "High")).await.unwrap();
        Task::create(&db.pool, &request("Another", "Low")).await.unwrap();

        // Empty filter returns everything, newest first.
        let (all, total) = Task::paged(&db.pool, "", 1).await.unwrap();
        assert_eq!(total, 2);
        let names: Vec<&str> = all.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Another", "Test Task"]);

        // Name filter is a case-insensitive substring match.
        let (found, total) = Task::paged(&db.pool, "test task", 1).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].name, "Test Task");
    }

    #[actix_web::test]
    async fn list_pages_are_five_tasks_long() {
        let db = test_db().await;
        for i in 0..6 {
            Task::create(&db.pool, &request(&format!("Task {}", i), "Medium"))
                .await
                .unwrap();
        }

        let (page1, total) = Task::paged(&db.pool, "", 1).await.unwrap();
        assert_eq!(total, 6);
        assert_eq!(page1.len(), 5);
        assert_eq!(page1[0].name, "Task 5");

        let (page2, _) = Task::paged(&db.pool, "", 2).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].name, "Task 0");
    }

    #[actix_web::test]
    async fn completed_listing_only_shows_completed() {
        let db = test_db().await;
        let open = Task::create(&db.pool, &request("Open", "Low")).await.unwrap();
        let done = Task::create(&db.pool, &request("Done", "Low")).await.unwrap();
        Task::update(
            &db.pool,
            done.id,
            &UpdateTaskRequest {
                name: None,
                description: None,
                deadline: None,
                is_completed: Some(true),
                priority: None,
                task_type_id: None,
                project_id: None,
                assignees: None,
                tags: None,
            },
        )
        .await
        .unwrap();

        let (completed, total) = Task::completed_page(&db.pool, 1).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(completed[0].name, "Done");
        assert!(completed.iter().all(|t| t.id != open.id));

        assert_eq!(Task::completed_percentage(&db.pool).await.unwrap(), 50);
    }

    #[actix_web::test]
    async fn completed_pages_are_ten_tasks_long() {
        let db = test_db().await;
        for i in 0..11 {
            let task = Task::create(&db.pool, &request(&format!("Task {}", i), "Low"))
                .await
                .unwrap();
            sqlx::query("UPDATE tasks SET is_completed = 1 WHERE id = $1")
                .bind(task.id)
                .execute(&db.pool)
                .await
                .unwrap();
        }

        let (page1, total) = Task::completed_page(&db.pool, 1).await.unwrap();
        assert_eq!(total, 11);
        assert_eq!(page1.len(), 10);
        // Store order, oldest first.
        assert_eq!(page1[0].name, "Task 0");

        let (page2, _) = Task::completed_page(&db.pool, 2).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].name, "Task 10");
    }

    #[actix_web::test]
    async fn filter_wildcards_match_literally() {
        let db = test_db().await;
        Task::create(&db.pool, &request("50% done", "Low")).await.unwrap();
        Task::create(&db.pool, &request("50 percent", "Low")).await.unwrap();

        let (found, total) = Task::paged(&db.pool, "50%", 1).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].name, "50% done");
    }

    #[actix_web::test]
    async fn explicit_null_clears_the_project() {
        let db = test_db().await;
        let project: i64 = sqlx::query_scalar(
            "INSERT INTO projects (name) VALUES ('Website') RETURNING id",
        )
        .fetch_one(&db.pool)
        .await
        .unwrap();

        let mut req = request("Task", "High");
        req.project_id = Some(project);
        let task = Task::create(&db.pool, &req).await.unwrap();

        // An omitted field leaves the project in place.
        let update: UpdateTaskRequest = serde_json::from_str(r#"{"name": "Renamed"}"#).unwrap();
        let task = Task::update(&db.pool, task.id, &update).await.unwrap();
        assert_eq!(task.project_id, Some(project));

        // An explicit null clears it.
        let update: UpdateTaskRequest =
            serde_json::from_str(r#"{"project_id": null}"#).unwrap();
        let task = Task::update(&db.pool, task.id, &update).await.unwrap();
        assert_eq!(task.project_id, None);
    }

    #[actix_web::test]
    async fn assigned_listing_is_scoped_to_the_worker() {
        let db = test_db().await;
        let worker: i64 = sqlx::query_scalar(
            "INSERT INTO workers (username, password_hash) VALUES ('jdoe', 'x') RETURNING id",
        )
        .fetch_one(&db.pool)
        .await
        .unwrap();

        let mut mine = request("Mine", "High");
        mine.assignees = Some(vec![worker]);
        Task::create(&db.pool, &mine).await.unwrap();
        Task::create(&db.pool, &request("Not mine", "Low")).await.unwrap();

        let assigned = Task::assigned_to(&db.pool, worker).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].name, "Mine");
    }

    #[actix_web::test]
    async fn create_rejects_unknown_assignee() {
        let db = test_db().await;
        let mut req = request("Task", "High");
        req.assignees = Some(vec![404]);

        let err = Task::create(&db.pool, &req).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[actix_web::test]
    async fn delete_reports_assignees_and_clears_links() {
        let db = test_db().await;
        let worker: i64 = sqlx::query_scalar(
            "INSERT INTO workers (username, password_hash) VALUES ('jdoe', 'x') RETURNING id",
        )
        .fetch_one(&db.pool)
        .await
        .unwrap();

        let mut req = request("Fix bug", "High");
        req.assignees = Some(vec![worker]);
        let task = Task::create(&db.pool, &req).await.unwrap();

        let affected = Task::delete(&db.pool, task.id).await.unwrap();
        assert_eq!(affected, vec!["jdoe"]);

        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM task_assignees")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(links, 0);

        let err = Task::delete(&db.pool, task.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[actix_web::test]
    async fn deleting_project_leaves_tasks_without_one() {
        let db = test_db().await;
        let project: i64 = sqlx::query_scalar(
            "INSERT INTO projects (name) VALUES ('Website') RETURNING id",
        )
        .fetch_one(&db.pool)
        .await
        .unwrap();

        let mut req = request("Task", "High");
        req.project_id = Some(project);
        let task = Task::create(&db.pool, &req).await.unwrap();

        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project)
            .execute(&db.pool)
            .await
            .unwrap();

        let reloaded = Task::find(&db.pool, task.id).await.unwrap();
        assert_eq!(reloaded.project_id, None);
    }
}
