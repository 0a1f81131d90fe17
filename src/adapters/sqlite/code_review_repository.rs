//! SQLite implementation of the CodeReviewRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CodeReview, Finding, ReviewStatus};
use crate::domain::ports::CodeReviewRepository;

#[derive(Clone)]
pub struct SqliteCodeReviewRepository {
    pool: SqlitePool,
}

impl SqliteCodeReviewRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CodeReviewRepository for SqliteCodeReviewRepository {
    async fn create(&self, review: &CodeReview) -> DomainResult<()> {
        let findings_json = serde_json::to_string(&review.findings)?;

        sqlx::query(
            r#"INSERT INTO code_reviews (id, task_id, review_task_id, quality_score, findings,
               status, cost_tokens, created_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(review.id.to_string())
        .bind(review.task_id.to_string())
        .bind(review.review_task_id.map(|id| id.to_string()))
        .bind(review.quality_score)
        .bind(&findings_json)
        .bind(status_str(review.status))
        .bind(review.cost_tokens as i64)
        .bind(review.created_at.to_rfc3339())
        .bind(review.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, review: &CodeReview) -> DomainResult<()> {
        let findings_json = serde_json::to_string(&review.findings)?;

        let result = sqlx::query(
            r#"UPDATE code_reviews SET review_task_id = ?, quality_score = ?, findings = ?,
               status = ?, cost_tokens = ?, completed_at = ?
               WHERE id = ?"#,
        )
        .bind(review.review_task_id.map(|id| id.to_string()))
        .bind(review.quality_score)
        .bind(&findings_json)
        .bind(status_str(review.status))
        .bind(review.cost_tokens as i64)
        .bind(review.completed_at.map(|t| t.to_rfc3339()))
        .bind(review.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::Database(format!("code review not found: {}", review.id)));
        }

        Ok(())
    }

    async fn get_for_task(&self, task_id: Uuid) -> DomainResult<Option<CodeReview>> {
        let row: Option<ReviewRow> =
            sqlx::query_as("SELECT * FROM code_reviews WHERE task_id = ? ORDER BY created_at DESC LIMIT 1")
                .bind(task_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }
}

const fn status_str(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Pending => "pending",
        ReviewStatus::Approved => "approved",
        ReviewStatus::NeedsFixes => "needs_fixes",
        ReviewStatus::Rejected => "rejected",
    }
}

fn parse_status(s: &str) -> DomainResult<ReviewStatus> {
    match s {
        "pending" => Ok(ReviewStatus::Pending),
        "approved" => Ok(ReviewStatus::Approved),
        "needs_fixes" => Ok(ReviewStatus::NeedsFixes),
        "rejected" => Ok(ReviewStatus::Rejected),
        other => Err(DomainError::Serialization(format!("unknown review status: {other}"))),
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: String,
    task_id: String,
    review_task_id: Option<String>,
    quality_score: f64,
    findings: String,
    status: String,
    cost_tokens: i64,
    created_at: String,
    completed_at: Option<String>,
}

impl TryFrom<ReviewRow> for CodeReview {
    type Error = DomainError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let findings: Vec<Finding> =
            serde_json::from_str(&row.findings).map_err(|e| DomainError::Serialization(e.to_string()))?;

        Ok(Self {
            id: super::parse_uuid(&row.id)?,
            task_id: super::parse_uuid(&row.task_id)?,
            review_task_id: super::parse_optional_uuid(row.review_task_id)?,
            quality_score: row.quality_score,
            findings,
            status: parse_status(&row.status)?,
            cost_tokens: row.cost_tokens as u64,
            created_at: super::parse_datetime(&row.created_at)?,
            completed_at: super::parse_optional_datetime(row.completed_at)?,
        })
    }
}
