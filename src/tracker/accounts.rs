//! User accounts
//!
//! Passwords never reach the store: they are replaced by
//! [`digest_password`] before any insert or update.

use tracing::info;

use super::{Tracker, required, resolve_user};
use crate::core::{NewUser, Role, User, UserChange, digest_password};
use crate::error::{Result, TrackerError};
use crate::storage::{IsolationLevel, repository};

impl Tracker {
    /// Register a user with the least-privileged role; returns its id
    pub async fn register_user(&self, request: NewUser) -> Result<i64> {
        request.validate()?;
        let username = request.username.trim();
        let email = request.email.trim();
        let password_hash = digest_password(&request.password);

        let mut tx = self.db.begin(IsolationLevel::Serializable).await?;
        let outcome: Result<i64> = async {
            let username_taken = repository::find_user(tx.conn(), username).await?.is_some();
            let email_taken = repository::find_user_by_email(tx.conn(), email)
                .await?
                .is_some();
            if username_taken || email_taken {
                return Err(TrackerError::UsernameOrEmailTaken {
                    username: username.to_string(),
                    email: email.to_string(),
                });
            }
            repository::insert_user(tx.conn(), username, email, &password_hash, Role::default())
                .await
        }
        .await;

        let id = tx.finish(outcome).await?;
        info!(id, username, "User registered");
        Ok(id)
    }

    /// Overwrite the supplied, non-blank fields of a user
    pub async fn change_user(&self, username: &str, change: UserChange) -> Result<()> {
        let username = required("user", username)?;
        let change = change.normalized();

        let mut tx = self.db.begin(IsolationLevel::RepeatableRead).await?;
        let outcome: Result<()> = async {
            let user = resolve_user(tx.conn(), username).await?;

            if let Some(ref email) = change.email {
                let email = email.trim();
                if let Some(holder) = repository::find_user_by_email(tx.conn(), email).await? {
                    if holder.id != user.id {
                        return Err(TrackerError::UsernameOrEmailTaken {
                            username: user.username,
                            email: email.to_string(),
                        });
                    }
                }
                repository::update_user_email(tx.conn(), user.id, email).await?;
            }

            if let Some(ref password) = change.password {
                repository::update_user_password(tx.conn(), user.id, &digest_password(password))
                    .await?;
            }
            Ok(())
        }
        .await;

        tx.finish(outcome).await?;
        info!(
            username,
            email = change.email.is_some(),
            password = change.password.is_some(),
            "User changed"
        );
        Ok(())
    }

    /// Overwrite a user's role
    pub async fn change_user_role(&self, username: &str, role: Role) -> Result<()> {
        let username = required("user", username)?;

        let mut tx = self.db.begin(IsolationLevel::RepeatableRead).await?;
        let outcome: Result<()> = async {
            let user = resolve_user(tx.conn(), username).await?;
            repository::update_user_role(tx.conn(), user.id, role).await
        }
        .await;

        tx.finish(outcome).await?;
        info!(username, %role, "User role changed");
        Ok(())
    }

    /// Delete a user and the memberships it holds; returns its id
    ///
    /// Tickets and log entries keep the user's id.
    pub async fn delete_user(&self, username: &str) -> Result<i64> {
        let username = required("user", username)?;

        let mut tx = self.db.begin(IsolationLevel::RepeatableRead).await?;
        let outcome: Result<i64> = async {
            let user = resolve_user(tx.conn(), username).await?;
            repository::delete_memberships_of_user(tx.conn(), user.id).await?;
            repository::delete_user(tx.conn(), user.id).await?;
            Ok(user.id)
        }
        .await;

        let id = tx.finish(outcome).await?;
        info!(id, username, "User deleted");
        Ok(id)
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<User>> {
        let mut conn = self.db.pool().acquire().await?;
        repository::find_user(&mut conn, username).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let mut conn = self.db.pool().acquire().await?;
        repository::list_users(&mut conn).await
    }
}
