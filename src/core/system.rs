use serde::{Deserialize, Serialize};

/// A system owns categories and tickets; its name is globally unique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    pub id: i64,
    pub name: String,
}

/// A category groups tickets inside one system
///
/// `(name, system_id)` is unique; the same category name may exist in
/// several systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub system_id: i64,
}

/// Category together with its owning system's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    pub system_id: i64,
    pub system: Option<String>,
}

/// Grant linking a user to a category; required before assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
}

/// Key addressing a category by its natural identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryKey {
    pub name: String,
    pub system: String,
}

impl CategoryKey {
    #[must_use]
    pub fn new(name: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system: system.into(),
        }
    }
}
