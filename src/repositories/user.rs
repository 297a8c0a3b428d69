//! # User Repository
//!
//! Account storage. Credentials are stored as argon2 hashes; hashing happens
//! in [`crate::auth`] before anything reaches this layer.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::user::{ActiveModel as UserActiveModel, Column, Model as UserModel};
use crate::models::{Role, User};

/// Data for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_staff: bool,
    pub password_hash: String,
}

/// Repository for user accounts
pub struct UserRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Insert a new account; duplicate usernames or emails surface as a conflict.
    pub async fn create(&self, new_user: NewUser) -> Result<UserModel, RepositoryError> {
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(new_user.username),
            email: Set(new_user.email),
            role: Set(new_user.role),
            is_staff: Set(new_user.is_staff),
            password_hash: Set(new_user.password_hash),
            created_at: Set(Utc::now().into()),
        };

        user.insert(self.db).await.map_err(|err| {
            let err = RepositoryError::database_error(err);
            if err.is_unique_violation() {
                RepositoryError::conflict("A user with that username or email already exists.")
            } else {
                err
            }
        })
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(user_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserModel>, RepositoryError> {
        User::find()
            .filter(Column::Username.eq(username))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool, RepositoryError> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    pub async fn email_taken(&self, email: &str) -> Result<bool, RepositoryError> {
        let found = User::find()
            .filter(Column::Email.eq(email))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_fixtures::setup_test_db;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            role: Role::Candidate,
            is_staff: false,
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let db = setup_test_db().await;
        let repo = UserRepository::new(&db);

        let created = repo
            .create(new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let by_name = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_name.role, Role::Candidate);

        let by_id = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "alice@example.com");

        assert!(repo.username_taken("alice").await.unwrap());
        assert!(repo.email_taken("alice@example.com").await.unwrap());
        assert!(!repo.username_taken("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let db = setup_test_db().await;
        let repo = UserRepository::new(&db);

        repo.create(new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        let err = repo
            .create(new_user("alice", "other@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
    }
}
