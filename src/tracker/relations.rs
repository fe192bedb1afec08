//! Systems, categories and category memberships

use tracing::info;

use super::{Tracker, required, resolve_user};
use crate::core::{CategoryKey, CategoryView, System};
use crate::error::{Result, TrackerError};
use crate::storage::{IsolationLevel, repository};

impl Tracker {
    /// Add a system; returns its id
    pub async fn add_system(&self, name: &str) -> Result<i64> {
        let name = required("name", name)?;

        let mut tx = self.db.begin(IsolationLevel::Serializable).await?;
        let outcome: Result<i64> = async {
            if let Some(existing) = repository::find_system(tx.conn(), name).await? {
                return Err(TrackerError::AlreadyExists {
                    entity: "System",
                    key: name.to_string(),
                    id: existing.id,
                });
            }
            repository::insert_system(tx.conn(), name).await
        }
        .await;

        let id = tx.finish(outcome).await?;
        info!(id, system = name, "System added");
        Ok(id)
    }

    /// Rename a system; returns its id
    pub async fn rename_system(&self, old_name: &str, new_name: &str) -> Result<i64> {
        let old_name = required("old name", old_name)?;
        let new_name = required("new name", new_name)?;

        let mut tx = self.db.begin(IsolationLevel::RepeatableRead).await?;
        let outcome: Result<i64> = async {
            let system = repository::find_system(tx.conn(), old_name)
                .await?
                .ok_or_else(|| TrackerError::SystemNotFound(old_name.to_string()))?;
            if repository::find_system(tx.conn(), new_name).await?.is_some() {
                return Err(TrackerError::NameConflict {
                    entity: "System",
                    name: new_name.to_string(),
                });
            }
            repository::rename_system(tx.conn(), system.id, new_name).await?;
            Ok(system.id)
        }
        .await;

        let id = tx.finish(outcome).await?;
        info!(id, old_name, new_name, "System renamed");
        Ok(id)
    }

    /// Delete a system; its categories and tickets are left in place
    pub async fn delete_system(&self, name: &str) -> Result<i64> {
        let name = required("name", name)?;

        let mut tx = self.db.begin(IsolationLevel::RepeatableRead).await?;
        let outcome: Result<i64> = async {
            let system = repository::find_system(tx.conn(), name)
                .await?
                .ok_or_else(|| TrackerError::SystemNotFound(name.to_string()))?;
            repository::delete_system(tx.conn(), system.id).await?;
            Ok(system.id)
        }
        .await;

        let id = tx.finish(outcome).await?;
        info!(id, system = name, "System deleted");
        Ok(id)
    }

    /// Add a category to an existing system; returns its id
    pub async fn add_category(&self, system: &str, name: &str) -> Result<i64> {
        let system_name = required("system", system)?;
        let name = required("name", name)?;

        let mut tx = self.db.begin(IsolationLevel::Serializable).await?;
        let outcome: Result<i64> = async {
            let system = repository::find_system(tx.conn(), system_name)
                .await?
                .ok_or_else(|| TrackerError::SystemNotFound(system_name.to_string()))?;
            if let Some(existing) = repository::find_category(tx.conn(), name, system.id).await? {
                return Err(TrackerError::AlreadyExists {
                    entity: "Category",
                    key: format!("{name} in {system_name}"),
                    id: existing.id,
                });
            }
            repository::insert_category(tx.conn(), name, system.id).await
        }
        .await;

        let id = tx.finish(outcome).await?;
        info!(id, system = system_name, category = name, "Category added");
        Ok(id)
    }

    /// Rename a category within its system; returns its id
    pub async fn rename_category(&self, system: &str, old_name: &str, new_name: &str) -> Result<i64> {
        let system_name = required("system", system)?;
        let old_name = required("old name", old_name)?;
        let new_name = required("new name", new_name)?;

        let mut tx = self.db.begin(IsolationLevel::RepeatableRead).await?;
        let outcome: Result<i64> = async {
            let system = repository::find_system(tx.conn(), system_name)
                .await?
                .ok_or_else(|| TrackerError::SystemNotFound(system_name.to_string()))?;
            let category = repository::find_category(tx.conn(), old_name, system.id)
                .await?
                .ok_or_else(|| TrackerError::CategoryNotFound {
                    name: old_name.to_string(),
                    system: Some(system_name.to_string()),
                })?;
            if repository::find_category(tx.conn(), new_name, system.id)
                .await?
                .is_some()
            {
                return Err(TrackerError::NameConflict {
                    entity: "Category",
                    name: new_name.to_string(),
                });
            }
            repository::rename_category(tx.conn(), category.id, new_name).await?;
            Ok(category.id)
        }
        .await;

        let id = tx.finish(outcome).await?;
        info!(id, system = system_name, old_name, new_name, "Category renamed");
        Ok(id)
    }

    /// Delete a category and the memberships granted on it
    ///
    /// Tickets filed under the category keep their category id.
    pub async fn delete_category(&self, system: &str, name: &str) -> Result<i64> {
        let system_name = required("system", system)?;
        let name = required("name", name)?;

        let mut tx = self.db.begin(IsolationLevel::RepeatableRead).await?;
        let outcome: Result<i64> = async {
            let system = repository::find_system(tx.conn(), system_name)
                .await?
                .ok_or_else(|| TrackerError::SystemNotFound(system_name.to_string()))?;
            let category = repository::find_category(tx.conn(), name, system.id)
                .await?
                .ok_or_else(|| TrackerError::CategoryNotFound {
                    name: name.to_string(),
                    system: Some(system_name.to_string()),
                })?;
            repository::delete_memberships_of_category(tx.conn(), category.id).await?;
            repository::delete_category(tx.conn(), category.id).await?;
            Ok(category.id)
        }
        .await;

        let id = tx.finish(outcome).await?;
        info!(id, system = system_name, category = name, "Category deleted");
        Ok(id)
    }

    /// Grant `username` assignment eligibility in a category; returns the
    /// membership id
    pub async fn assign_user_to_category(&self, username: &str, category: &CategoryKey) -> Result<i64> {
        let username = required("user", username)?;
        let system_name = required("system", &category.system)?;
        let category_name = required("category", &category.name)?;

        let mut tx = self.db.begin(IsolationLevel::Serializable).await?;
        let outcome: Result<i64> = async {
            let user = resolve_user(tx.conn(), username).await?;
            let category = super::resolve_category(tx.conn(), category_name, Some(system_name)).await?;
            if let Some(existing) = repository::find_membership(tx.conn(), user.id, category.id).await? {
                return Err(TrackerError::AlreadyExists {
                    entity: "Membership",
                    key: format!("{username} in {category_name}"),
                    id: existing.id,
                });
            }
            repository::insert_membership(tx.conn(), user.id, category.id).await
        }
        .await;

        let id = tx.finish(outcome).await?;
        info!(id, user = username, category = category_name, "Membership granted");
        Ok(id)
    }

    /// Revoke a membership; returns the removed membership id
    pub async fn unassign_user_from_category(
        &self,
        username: &str,
        category: &CategoryKey,
    ) -> Result<i64> {
        let username = required("user", username)?;
        let system_name = required("system", &category.system)?;
        let category_name = required("category", &category.name)?;

        let mut tx = self.db.begin(IsolationLevel::Serializable).await?;
        let outcome: Result<i64> = async {
            let user = resolve_user(tx.conn(), username).await?;
            let category = super::resolve_category(tx.conn(), category_name, Some(system_name)).await?;
            let membership = repository::find_membership(tx.conn(), user.id, category.id)
                .await?
                .ok_or_else(|| TrackerError::MembershipNotFound {
                    user: username.to_string(),
                    category: category_name.to_string(),
                })?;
            repository::delete_membership(tx.conn(), membership.id).await?;
            Ok(membership.id)
        }
        .await;

        let id = tx.finish(outcome).await?;
        info!(id, user = username, category = category_name, "Membership revoked");
        Ok(id)
    }

    pub async fn list_systems(&self) -> Result<Vec<System>> {
        let mut conn = self.db.pool().acquire().await?;
        repository::list_systems(&mut conn).await
    }

    /// Categories of one system, or of every system when `system` is `None`
    pub async fn list_categories(&self, system: Option<&str>) -> Result<Vec<CategoryView>> {
        let mut conn = self.db.pool().acquire().await?;
        let system_id = match system {
            Some(name) => Some(
                repository::find_system(&mut conn, name)
                    .await?
                    .ok_or_else(|| TrackerError::SystemNotFound(name.to_string()))?
                    .id,
            ),
            None => None,
        };
        repository::list_categories(&mut conn, system_id).await
    }

    /// Categories a user may be assigned tickets in
    pub async fn categories_of(&self, username: &str) -> Result<Vec<CategoryView>> {
        let mut conn = self.db.pool().acquire().await?;
        let user = resolve_user(&mut conn, username).await?;
        repository::categories_of_user(&mut conn, user.id).await
    }
}
