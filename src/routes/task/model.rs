use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;

pub const MAX_TITLE_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Created,
    InProgress,
    Done,
    Cancelled,
    Expired,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
            TaskStatus::Cancelled => "CANCELLED",
            TaskStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(TaskStatus::Created),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            "CANCELLED" => Ok(TaskStatus::Cancelled),
            "EXPIRED" => Ok(TaskStatus::Expired),
            other => Err(AppError::Validation(format!(
                "Invalid status value: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

/// Task about to expire, joined with its owner's address.
#[derive(Debug, Clone, FromRow)]
pub struct ExpiringTask {
    pub id: i64,
    pub title: String,
    pub expires_at: DateTime<Utc>,
    pub owner_email: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskFilter {
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub status: Option<TaskStatus>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct DeleteTaskParams {
    pub hard_delete: Option<String>,
}

impl DeleteTaskParams {
    pub fn is_hard(&self) -> bool {
        self.hard_delete
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateTaskRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        validate_description(&self.description)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    /// Absent leaves the deadline alone, `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl UpdateTaskRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }

    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status.as_str().to_string();
        }
        if let Some(expires_at) = self.expires_at {
            task.expires_at = expires_at;
        }
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title: This field may not be blank.".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title: Ensure this field has no more than {MAX_TITLE_LEN} characters."
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.trim().is_empty() {
        return Err(AppError::Validation(
            "description: This field may not be blank.".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct TaskSummary {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Task> for TaskSummary {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            status: task.status,
            expires_at: task.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Task> for TaskDetail {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            expires_at: task.expires_at,
        }
    }
}

impl Task {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Turns a lookup result into the task `user_id` may act on: a missing
    /// task is 404, someone else's task is 403.
    pub fn ensure_owned(found: Option<Task>, task_id: i64, user_id: Uuid) -> Result<Task, AppError> {
        let task = found.ok_or_else(|| {
            tracing::error!("Task with ID {} not found.", task_id);
            AppError::TaskNotFound(task_id)
        })?;

        if !task.is_owned_by(user_id) {
            tracing::error!(
                "Unauthorized access to task ID {} by user ID {}.",
                task_id,
                user_id
            );
            return Err(AppError::Forbidden);
        }

        Ok(task)
    }

    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, description, status, created_at, updated_at, expires_at, active
            FROM tasks
            WHERE owner_id = $1
              AND active = $2
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .bind(filter.is_active)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(pool)
        .await
    }

    /// Looks a task up by id regardless of owner or soft-deletion.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, description, status, created_at, updated_at, expires_at, active
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        owner_id: Uuid,
        req: CreateTaskRequest,
    ) -> Result<Self, sqlx::Error> {
        let status = req.status.unwrap_or(TaskStatus::Created);

        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (owner_id, title, description, status, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, title, description, status, created_at, updated_at, expires_at, active
            "#,
        )
        .bind(owner_id)
        .bind(req.title)
        .bind(req.description)
        .bind(status.as_str())
        .bind(req.expires_at)
        .fetch_one(pool)
        .await
    }

    /// Writes back every editable field of `self`.
    pub async fn save(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = $1, description = $2, status = $3, expires_at = $4, active = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING id, owner_id, title, description, status, created_at, updated_at, expires_at, active
            "#,
        )
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.status)
        .bind(self.expires_at)
        .bind(self.active)
        .bind(self.id)
        .fetch_one(pool)
        .await
    }

    pub async fn soft_delete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn hard_delete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_status(
        pool: &PgPool,
        id: i64,
        status: TaskStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Active tasks whose deadline has passed but are not yet marked expired.
    pub async fn find_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, description, status, created_at, updated_at, expires_at, active
            FROM tasks
            WHERE expires_at < $1
              AND active = TRUE
              AND status <> 'EXPIRED'
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await
    }

    /// Untouched tasks expiring in `(now, until]`.
    pub async fn find_expiring_between(
        pool: &PgPool,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ExpiringTask>, sqlx::Error> {
        sqlx::query_as::<_, ExpiringTask>(
            r#"
            SELECT t.id, t.title, t.expires_at, u.email AS owner_email
            FROM tasks t
            JOIN users u ON u.id = t.owner_id
            WHERE t.expires_at > $1
              AND t.expires_at <= $2
              AND t.status = 'CREATED'
            "#,
        )
        .bind(now)
        .bind(until)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn task() -> Task {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Task {
            id: 1,
            owner_id: Uuid::nil(),
            title: "Write report".into(),
            description: "Quarterly numbers".into(),
            status: "CREATED".into(),
            created_at: at,
            updated_at: at,
            expires_at: Some(at),
            active: true,
        }
    }

    #[test]
    fn missing_task_is_not_found() {
        let err = Task::ensure_owned(None, 42, Uuid::nil()).unwrap_err();
        assert!(matches!(err, AppError::TaskNotFound(42)));
    }

    #[test]
    fn foreign_task_is_forbidden() {
        let err = Task::ensure_owned(Some(task()), 1, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn owner_gets_the_task() {
        let owned = Task::ensure_owned(Some(task()), 1, Uuid::nil()).unwrap();
        assert_eq!(owned.id, 1);
    }

    #[test]
    fn status_round_trips_through_json() {
        let status: TaskStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(status, TaskStatus::InProgress);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"IN_PROGRESS\"");
        assert_eq!("EXPIRED".parse::<TaskStatus>().unwrap(), TaskStatus::Expired);
        assert!("TODO".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn partial_update_touches_only_given_fields() {
        let mut t = task();
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"status": "DONE"}"#).unwrap();
        req.apply(&mut t);

        assert_eq!(t.status, "DONE");
        assert_eq!(t.title, "Write report");
        assert!(t.expires_at.is_some());
    }

    #[test]
    fn null_deadline_clears_it() {
        let mut t = task();
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"expires_at": null}"#).unwrap();
        assert_eq!(req.expires_at, Some(None));

        req.apply(&mut t);
        assert!(t.expires_at.is_none());
    }

    #[test]
    fn blank_or_long_titles_are_rejected() {
        let blank = CreateTaskRequest {
            title: "  ".into(),
            description: "d".into(),
            status: None,
            expires_at: None,
        };
        assert!(matches!(blank.validate(), Err(AppError::Validation(_))));

        let long = UpdateTaskRequest {
            title: Some("x".repeat(MAX_TITLE_LEN + 1)),
            ..Default::default()
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn hard_delete_flag_is_case_insensitive() {
        let params = |v: Option<&str>| DeleteTaskParams {
            hard_delete: v.map(str::to_string),
        };

        assert!(params(Some("TRUE")).is_hard());
        assert!(params(Some("true")).is_hard());
        assert!(!params(Some("1")).is_hard());
        assert!(!params(None).is_hard());
    }

    #[test]
    fn filter_defaults_to_active_tasks() {
        let filter: TaskFilter = serde_json::from_str("{}").unwrap();
        assert!(filter.is_active);
        assert!(filter.status.is_none());
    }
}
