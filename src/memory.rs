//! In-memory repository used by the unit tests.
//!
//! Mirrors the Postgres tables: live-row uniqueness is checked under the same
//! lock as the write, so concurrent writers race the way they would on the
//! partial unique indexes.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::AuthUserRepository;
use crate::auth::repo_types::{AuthUser, AuthUserChanges, NewAuthUser};
use crate::error::AppError;
use crate::repository::{RepoResult, Repository};
use crate::users::repo_types::{NewUser, User, UserChanges};

pub trait Row: Clone + Send + Sync + 'static {
    type New: Send;
    type Changes: Send;

    fn build(new: Self::New, now: OffsetDateTime) -> Self;
    fn apply(&mut self, changes: Self::Changes, now: OffsetDateTime);
    fn id(&self) -> Uuid;
    fn created_at(&self) -> OffsetDateTime;
    fn is_deleted(&self) -> bool;
    fn mark_deleted(&mut self);
    /// Whether two live rows would violate a unique index.
    fn clashes_with(&self, other: &Self) -> bool;
}

pub struct MemoryTable<T> {
    rows: Mutex<Vec<T>>,
}

impl<T: Row> MemoryTable<T> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    fn find_live<P: Fn(&T) -> bool>(&self, pred: P) -> Option<T> {
        let rows = self.rows.lock().unwrap();
        rows.iter().find(|r| !r.is_deleted() && pred(*r)).cloned()
    }
}

fn clashes<T: Row>(rows: &[T], candidate: &T) -> bool {
    rows.iter()
        .any(|r| !r.is_deleted() && r.id() != candidate.id() && r.clashes_with(candidate))
}

#[async_trait]
impl<T: Row> Repository for MemoryTable<T> {
    type Entity = T;
    type New = T::New;
    type Changes = T::Changes;

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<T>> {
        Ok(self.find_live(|r| r.id() == id))
    }

    async fn get_all(&self) -> RepoResult<Vec<T>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter(|r| !r.is_deleted()).cloned().collect())
    }

    async fn filter_by_dates(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        include_deleted: bool,
    ) -> RepoResult<Vec<T>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.created_at() >= start && r.created_at() <= end)
            .filter(|r| include_deleted || !r.is_deleted())
            .cloned()
            .collect())
    }

    async fn create(&self, new: T::New) -> RepoResult<T> {
        let row = T::build(new, OffsetDateTime::now_utc());
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.id() == row.id()) || clashes(rows.as_slice(), &row) {
            return Err(AppError::DuplicateIdentity);
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: T::Changes) -> RepoResult<Option<T>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(idx) = rows.iter().position(|r| r.id() == id && !r.is_deleted()) else {
            return Ok(None);
        };
        let mut next = rows[idx].clone();
        next.apply(changes, OffsetDateTime::now_utc());
        if clashes(rows.as_slice(), &next) {
            return Err(AppError::DuplicateIdentity);
        }
        rows[idx] = next.clone();
        Ok(Some(next))
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<Option<T>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.id() == id && !r.is_deleted()) else {
            return Ok(None);
        };
        row.mark_deleted();
        Ok(Some(row.clone()))
    }
}

#[async_trait]
impl AuthUserRepository for MemoryTable<AuthUser> {
    async fn get_by_username(&self, username: &str) -> RepoResult<Option<AuthUser>> {
        Ok(self.find_live(|r| r.username == username))
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<AuthUser>> {
        Ok(self.find_live(|r| r.email == email))
    }
}

impl Row for User {
    type New = NewUser;
    type Changes = UserChanges;

    fn build(new: NewUser, now: OffsetDateTime) -> Self {
        User {
            id: new.id.unwrap_or_else(Uuid::new_v4),
            username: new.username,
            email: new.email,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    fn apply(&mut self, changes: UserChanges, now: OffsetDateTime) {
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }

    fn clashes_with(&self, other: &Self) -> bool {
        self.email == other.email
    }
}

impl Row for AuthUser {
    type New = NewAuthUser;
    type Changes = AuthUserChanges;

    fn build(new: NewAuthUser, now: OffsetDateTime) -> Self {
        AuthUser {
            id: new.id.unwrap_or_else(Uuid::new_v4),
            username: new.username,
            email: new.email,
            hashed_password: new.hashed_password,
            is_active: new.is_active,
            is_superuser: new.is_superuser,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    fn apply(&mut self, changes: AuthUserChanges, now: OffsetDateTime) {
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(hashed_password) = changes.hashed_password {
            self.hashed_password = hashed_password;
        }
        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }
        if let Some(is_superuser) = changes.is_superuser {
            self.is_superuser = is_superuser;
        }
        self.updated_at = now;
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }

    fn clashes_with(&self, other: &Self) -> bool {
        self.email == other.email || self.username == other.username
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration as TimeDuration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            id: None,
            username: "someone".into(),
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamps() {
        let table = MemoryTable::<User>::new();
        let user = table.create(new_user("a@x.com")).await.unwrap();
        assert_eq!(user.created_at, user.updated_at);
        assert!(!user.is_deleted);
        assert_eq!(table.get_by_id(user.id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn create_keeps_a_supplied_id() {
        let table = MemoryTable::<User>::new();
        let id = Uuid::new_v4();
        let user = table
            .create(NewUser {
                id: Some(id),
                ..new_user("a@x.com")
            })
            .await
            .unwrap();
        assert_eq!(user.id, id);
    }

    #[tokio::test]
    async fn update_never_resurrects() {
        let table = MemoryTable::<User>::new();
        let user = table.create(new_user("a@x.com")).await.unwrap();
        table.soft_delete(user.id).await.unwrap();

        let res = table
            .update(
                user.id,
                UserChanges {
                    username: Some("back".into()),
                    email: None,
                },
            )
            .await
            .unwrap();
        assert!(res.is_none());
        assert!(table.get_by_id(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_into_a_live_email_clashes() {
        let table = MemoryTable::<User>::new();
        table.create(new_user("a@x.com")).await.unwrap();
        let b = table.create(new_user("b@x.com")).await.unwrap();

        let err = table
            .update(
                b.id,
                UserChanges {
                    username: None,
                    email: Some("a@x.com".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateIdentity));
    }

    #[tokio::test]
    async fn filter_by_dates_is_inclusive_and_honours_tombstones() {
        let table = MemoryTable::<User>::new();
        let a = table.create(new_user("a@x.com")).await.unwrap();
        let b = table.create(new_user("b@x.com")).await.unwrap();
        table.soft_delete(b.id).await.unwrap();

        let live = table
            .filter_by_dates(a.created_at, b.created_at, false)
            .await
            .unwrap();
        assert_eq!(live.iter().map(|u| u.id).collect::<Vec<_>>(), vec![a.id]);

        let all = table
            .filter_by_dates(a.created_at, b.created_at, true)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let none = table
            .filter_by_dates(
                b.created_at + TimeDuration::seconds(1),
                b.created_at + TimeDuration::seconds(2),
                true,
            )
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn get_all_preserves_insertion_order() {
        let table = MemoryTable::<User>::new();
        let a = table.create(new_user("a@x.com")).await.unwrap();
        let b = table.create(new_user("b@x.com")).await.unwrap();
        let ids: Vec<_> = table.get_all().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }
}
