//! Wire types for the budget service.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Budget value meaning "no spending ceiling".
pub const UNLIMITED_BUDGET: i64 = -1;

/// A remote API-key operation, used to label errors and mock call logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `GET {base}/keyView`
    ListSummaries,
    /// `GET {base}/key`
    ListFull,
    /// `POST {base}/key`
    Create,
    /// `PUT {base}/key?id={id}`
    Update,
    /// `DELETE {base}/key?id={id}`
    Delete,
}

impl Operation {
    /// HTTP status the service returns when the operation succeeds.
    #[must_use]
    pub fn success_status(&self) -> u16 {
        match self {
            Self::Create => 201,
            Self::ListSummaries | Self::ListFull | Self::Update | Self::Delete => 200,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ListSummaries => "list API key summaries",
            Self::ListFull => "list API keys",
            Self::Create => "create API key",
            Self::Update => "update API key",
            Self::Delete => "delete API key",
        };
        f.write_str(text)
    }
}

/// An API-key record as returned by the listing endpoints.
///
/// The summary listing never carries `key`; the full listing does.
#[derive(Clone, PartialEq, Deserialize)]
pub struct KeyRecord {
    /// Service-assigned id
    #[serde(deserialize_with = "whole")]
    pub id: i64,
    /// Display name, unique in practice
    pub name: String,
    /// Spending ceiling; [`UNLIMITED_BUDGET`] for none
    #[serde(deserialize_with = "integral")]
    pub budget: i64,
    /// Spend accrued so far
    #[serde(default)]
    pub costs: f64,
    /// Creation timestamp as reported by the service
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last use timestamp; absent for unused keys
    #[serde(default)]
    pub last_used_at: Option<String>,
    /// Secret key material
    #[serde(default)]
    pub key: Option<String>,
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("budget", &self.budget)
            .field("costs", &self.costs)
            .field("created_at", &self.created_at)
            .field("last_used_at", &self.last_used_at)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Response to a successful create.
#[derive(Clone, PartialEq, Deserialize)]
pub struct CreatedKey {
    /// Id of the new key
    #[serde(deserialize_with = "whole")]
    pub id: i64,
    /// Secret key material, when the service returns it on create
    #[serde(default, alias = "key_value")]
    pub key: Option<String>,
}

impl fmt::Debug for CreatedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedKey")
            .field("id", &self.id)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewKey<'a> {
    /// Display name
    pub name: &'a str,
    /// Spending ceiling
    pub budget: i64,
}

/// Body of an update request: exactly the fields being changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyPatch {
    /// New display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New spending ceiling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<i64>,
}

impl KeyPatch {
    /// A patch that only changes the budget.
    #[must_use]
    pub fn budget(budget: i64) -> Self {
        Self {
            name: None,
            budget: Some(budget),
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.budget.is_none()
    }
}

/// Accept integral JSON numbers written either as integers or as floats.
///
/// The service stores numbers as doubles, so `1000` may come back as
/// `1000.0`. Fractions are truncated.
fn integral<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(serde::de::Error::custom("expected a finite number"));
    }
    Ok(value.trunc() as i64)
}

/// Like [`integral`], but a fractional value is an error instead of being
/// truncated. Used for ids, where `1.5` must not match record `1`.
fn whole<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(serde::de::Error::custom(format!(
            "expected a whole number, got {}",
            value
        )));
    }
    Ok(value as i64)
}
