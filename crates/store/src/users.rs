//! User repository trait.

use async_trait::async_trait;
use common::UserId;

use crate::entities::{NewUser, User, UserUpdate};
use crate::error::Result;
use crate::page::{Page, PageRequest};

/// Read/write access to user identities.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a user. Fails with [`StoreError::DuplicateIdentity`] if the
    /// username or email is already taken.
    ///
    /// [`StoreError::DuplicateIdentity`]: crate::StoreError::DuplicateIdentity
    async fn create_user(&self, new: NewUser) -> Result<User>;

    /// Looks up a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Lists users ordered by creation time.
    async fn list_users(&self, page: PageRequest) -> Result<Page<User>>;

    /// Applies a partial update. Returns `None` when the user does not
    /// exist; uniqueness violations fail as on create.
    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<Option<User>>;

    /// Deletes a user. Returns `false` when the user does not exist.
    /// A user that still owns orders cannot be deleted
    /// ([`StoreError::Constraint`]).
    ///
    /// [`StoreError::Constraint`]: crate::StoreError::Constraint
    async fn delete_user(&self, id: UserId) -> Result<bool>;

    /// Total number of users.
    async fn count_users(&self) -> Result<u64>;
}
