//! Domain types for the inventory and audit subsystems with strong typing.
//!
//! Identifiers are wrapped in newtypes so an account id can never be passed
//! where a category or item id is expected, and audit vocabulary is a closed
//! set of enums rather than free-form strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a company account (the tenant).
///
/// Every inventory read and write is scoped by this id.
///
/// # Examples
///
/// ```rust
/// use inventory_master::domain::AccountId;
///
/// let id = AccountId::new(7);
/// assert_eq!(id.value(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountId(i32);

impl AccountId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AccountId> for i32 {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl From<i32> for AccountId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for AccountId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Error returned when a stored audit label does not match a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

/// What happened to an entity, as recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Created,
    Added,
    Took,
    Updated,
    Deleted,
}

impl ActivityAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Added => "added",
            Self::Took => "took",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityAction {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "added" => Ok(Self::Added),
            "took" => Ok(Self::Took),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            other => Err(UnknownLabel {
                kind: "activity action",
                value: other.to_string(),
            }),
        }
    }
}

/// Kind of entity an activity entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Category,
    #[default]
    Item,
}

impl EntityType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Item => "item",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(Self::Category),
            "item" => Ok(Self::Item),
            other => Err(UnknownLabel {
                kind: "entity type",
                value: other.to_string(),
            }),
        }
    }
}

/// Direction of a quantity adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustDirection {
    Add,
    Take,
}

impl AdjustDirection {
    /// Applies `amount` to `current`. Taking never drops below zero.
    #[must_use]
    pub fn apply(self, current: f64, amount: f64) -> f64 {
        match self {
            Self::Add => current + amount,
            Self::Take => (current - amount).max(0.0),
        }
    }

    #[must_use]
    pub const fn action(self) -> ActivityAction {
        match self {
            Self::Add => ActivityAction::Added,
            Self::Take => ActivityAction::Took,
        }
    }
}
