use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

pub type RepoResult<T> = Result<T, AppError>;

/// Soft-delete aware storage for one kind of user record.
///
/// Reads only see live rows (`is_deleted = false`) unless a method says
/// otherwise. Writes are single statements, so they are atomic against the
/// store. Uniqueness is left to the store and surfaces as
/// [`AppError::DuplicateIdentity`].
#[async_trait]
pub trait Repository: Send + Sync {
    type Entity: Send;
    /// Input to `create`; the id is generated when not supplied.
    type New: Send;
    /// Partial update; `None` fields are left untouched.
    type Changes: Send;

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<Self::Entity>>;

    /// Live rows in creation order.
    async fn get_all(&self) -> RepoResult<Vec<Self::Entity>>;

    /// Rows with `created_at` in `[start, end]`.
    async fn filter_by_dates(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        include_deleted: bool,
    ) -> RepoResult<Vec<Self::Entity>>;

    async fn create(&self, new: Self::New) -> RepoResult<Self::Entity>;

    /// Refreshes `updated_at`. Returns `None` when no live row has `id`.
    async fn update(&self, id: Uuid, changes: Self::Changes) -> RepoResult<Option<Self::Entity>>;

    /// Sets the tombstone and returns the row, other fields untouched.
    /// Returns `None` when no live row has `id`.
    async fn soft_delete(&self, id: Uuid) -> RepoResult<Option<Self::Entity>>;
}
