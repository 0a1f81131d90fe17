//! Code review repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::CodeReview;

#[async_trait]
pub trait CodeReviewRepository: Send + Sync {
    async fn create(&self, review: &CodeReview) -> DomainResult<()>;
    async fn update(&self, review: &CodeReview) -> DomainResult<()>;
    async fn get_for_task(&self, task_id: Uuid) -> DomainResult<Option<CodeReview>>;
}
